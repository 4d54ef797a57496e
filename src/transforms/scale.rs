//! Scale - per-sample amplitude mapping.
//!
//! Modes:
//! - `linear`: `factor * x + shift`
//! - `square`: `x * x`
//! - `absolute`: `|x|`
//! - `power`: `x ^ exponent`
//!
//! `factor` and `shift` are enabled only in `linear` mode, `exponent` only
//! in `power` mode. Undefined inputs produce undefined outputs.

use crate::error::{Result, TransformError};
use crate::provider::{compute_samples, AcquiredInputs, AnyProvider, BoundInput};
use crate::registry::TransformDefinition;
use crate::schema::{Descriptor, Parameter, UpdateRule};
use crate::source::DataSource;
use crate::transforms::BuiltinProvider;
use crate::types::{is_undefined, OutputKind, PositionKey, SampleInterval, UNDEFINED_SAMPLE};

pub const NAME: &str = "Scale";

const MODES: &[&str] = &["linear", "square", "absolute", "power"];

/// Resolved scale operation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScaleMode {
    Linear { factor: f64, shift: f64 },
    Square,
    Absolute,
    Power { exponent: f64 },
}

impl ScaleMode {
    #[inline]
    pub fn apply(&self, x: f64) -> f64 {
        if is_undefined(x) {
            return UNDEFINED_SAMPLE;
        }
        match *self {
            ScaleMode::Linear { factor, shift } => factor * x + shift,
            ScaleMode::Square => x * x,
            ScaleMode::Absolute => x.abs(),
            ScaleMode::Power { exponent } => x.powf(exponent),
        }
    }
}

pub fn definition() -> TransformDefinition {
    TransformDefinition {
        name: NAME,
        description: "Maps every sample through a linear, square, absolute or power law.",
        schema,
        factory: create,
    }
}

fn create(descriptor: &Descriptor) -> Result<AnyProvider> {
    let provider = ScaleProvider::new(descriptor)?;
    Ok(AnyProvider::Builtin(BuiltinProvider::Scale(provider)))
}

pub fn schema() -> Result<Descriptor> {
    let mut d = Descriptor::new(NAME);
    d.add_param(Parameter::choice("mode", MODES, 0).with_label("Operation"))?;
    d.add_param(
        Parameter::float("factor", 1.0)
            .with_limits(-1000.0, 1000.0)
            .with_label("Factor"),
    )?;
    d.add_param(
        Parameter::float("shift", 0.0)
            .with_limits(-1.0e6, 1.0e6)
            .with_label("Shift"),
    )?;
    d.add_param(
        Parameter::float("exponent", 2.0)
            .with_limits(-10.0, 10.0)
            .with_label("Exponent"),
    )?;
    d.add_input("Input", true);
    d.set_output_kind(OutputKind::Amplitude);
    d.set_update_rule(UpdateRule {
        triggers: &["mode"],
        rule: update_rule,
    });
    Ok(d)
}

fn update_rule(d: &Descriptor) -> Vec<(&'static str, bool)> {
    let mode = d.get_option("mode").unwrap_or("linear");
    vec![
        ("factor", mode == "linear"),
        ("shift", mode == "linear"),
        ("exponent", mode == "power"),
    ]
}

/// Scale provider. Parallel-safe: the mode is fixed at construction and the
/// acquisition buffer is per instance.
pub struct ScaleProvider {
    mode: ScaleMode,
    inputs: Vec<BoundInput>,
    acquired: Option<AcquiredInputs>,
}

impl ScaleProvider {
    pub fn new(descriptor: &Descriptor) -> Result<Self> {
        let mode = match descriptor.get_option("mode")? {
            "linear" => ScaleMode::Linear {
                factor: descriptor.get("factor")?,
                shift: descriptor.get("shift")?,
            },
            "square" => ScaleMode::Square,
            "absolute" => ScaleMode::Absolute,
            "power" => ScaleMode::Power {
                exponent: descriptor.get("exponent")?,
            },
            other => {
                return Err(TransformError::InvalidDescriptor {
                    transform: NAME.to_string(),
                    reason: format!("unsupported mode '{}'", other),
                });
            }
        };
        Ok(Self {
            mode,
            inputs: BoundInput::from_descriptor(descriptor),
            acquired: None,
        })
    }

    pub fn name(&self) -> &str {
        NAME
    }

    pub fn mode(&self) -> ScaleMode {
        self.mode
    }

    pub fn parallel_safe(&self) -> bool {
        true
    }

    pub fn acquire(
        &mut self,
        source: &dyn DataSource,
        position: PositionKey,
        interval: SampleInterval,
    ) -> Result<()> {
        self.acquired = Some(AcquiredInputs::fetch(
            source,
            &self.inputs,
            position,
            interval,
        )?);
        Ok(())
    }

    pub fn compute(
        &mut self,
        output: &mut [f64],
        position: PositionKey,
        interval: SampleInterval,
    ) -> Result<()> {
        let mode = self.mode;
        compute_samples(&mut self.acquired, output, position, interval, |inputs, i| {
            Ok(mode.apply(inputs.sample(0, i)))
        })
    }
}
