//! Expression - per-sample Rhai expression.
//!
//! ## Script variables
//!
//! - `value` / `raw` - The current input sample
//! - `sample` - Absolute sample index (integer)
//!
//! ## Helper functions
//!
//! - `clip(value, lo, hi)` - Clamp into `[lo, hi]`
//! - `deadband(value, center, width)` - Snap to `center` within `width / 2`
//! - `db(value)` - `20 * log10(|value|)`
//!
//! The script is compiled once when the provider is built; a syntax error
//! leaves the provider not-OK. Runtime errors fail only the position being
//! computed. Undefined inputs produce undefined outputs without running the
//! script.
//!
//! ## Example
//!
//! ```rhai
//! // Rectify and scale
//! abs(value) * 0.5
//! ```

use crate::error::{Result, ResultExt, TransformError};
use crate::provider::{compute_samples, AcquiredInputs, AnyProvider, BoundInput};
use crate::registry::TransformDefinition;
use crate::schema::{Descriptor, Parameter, UpdateRule};
use crate::source::DataSource;
use crate::transforms::BuiltinProvider;
use crate::types::{is_undefined, OutputKind, PositionKey, SampleInterval, UNDEFINED_SAMPLE};
use rhai::{Dynamic, Engine, Scope, AST};

pub const NAME: &str = "Expression";

pub fn definition() -> TransformDefinition {
    TransformDefinition {
        name: NAME,
        description: "Evaluates a Rhai expression of `value` and `sample` for every sample.",
        schema,
        factory: create,
    }
}

fn create(descriptor: &Descriptor) -> Result<AnyProvider> {
    let provider = ExpressionProvider::new(descriptor)?;
    Ok(AnyProvider::Builtin(BuiltinProvider::Expression(provider)))
}

pub fn schema() -> Result<Descriptor> {
    let mut d = Descriptor::new(NAME);
    d.add_param(Parameter::string("expression", "value").with_label("Expression"))?;
    d.add_param(Parameter::boolean("clamp", false).with_label("Clamp output"))?;
    d.add_param(Parameter::float("clamp_min", -1.0e6).with_label("Minimum"))?;
    d.add_param(Parameter::float("clamp_max", 1.0e6).with_label("Maximum"))?;
    d.add_input("Input", true);
    d.set_output_kind(OutputKind::Dimensionless);
    d.set_update_rule(UpdateRule {
        triggers: &["clamp"],
        rule: update_rule,
    });
    Ok(d)
}

fn update_rule(d: &Descriptor) -> Vec<(&'static str, bool)> {
    let clamp = d.get::<bool>("clamp").unwrap_or(false);
    vec![("clamp_min", clamp), ("clamp_max", clamp)]
}

/// Build the Rhai engine with safety limits and helper functions.
fn build_engine() -> Engine {
    let mut engine = Engine::new();
    engine.set_max_expr_depths(64, 64);
    engine.set_max_call_levels(32);
    engine.set_max_operations(10_000);
    engine.set_max_string_size(10_000);
    engine.set_max_array_size(1_000);
    engine.set_max_map_size(1_000);

    engine.register_fn("clip", |value: f64, lo: f64, hi: f64| -> f64 {
        value.max(lo).min(hi)
    });
    engine.register_fn("deadband", |value: f64, center: f64, width: f64| -> f64 {
        if (value - center).abs() < width / 2.0 {
            center
        } else {
            value
        }
    });
    engine.register_fn("db", |value: f64| -> f64 { 20.0 * value.abs().log10() });
    engine
}

/// Expression provider.
///
/// Parallel-safe: the engine and compiled AST are immutable after
/// construction, and every evaluation uses a call-local scope.
pub struct ExpressionProvider {
    engine: Engine,
    ast: AST,
    clamp: Option<(f64, f64)>,
    inputs: Vec<BoundInput>,
    acquired: Option<AcquiredInputs>,
}

impl ExpressionProvider {
    pub fn new(descriptor: &Descriptor) -> Result<Self> {
        let source: String = descriptor.get("expression")?;
        let engine = build_engine();
        let ast = engine
            .compile(&source)
            .map_err(|e| TransformError::Script(format!("Compile error: {}", e)))?;

        let clamp = if descriptor.get::<bool>("clamp")? {
            let lo: f64 = descriptor.get("clamp_min")?;
            let hi: f64 = descriptor.get("clamp_max")?;
            if lo > hi {
                return Err(TransformError::InvalidDescriptor {
                    transform: NAME.to_string(),
                    reason: format!("clamp_min {} exceeds clamp_max {}", lo, hi),
                });
            }
            Some((lo, hi))
        } else {
            None
        };

        Ok(Self {
            engine,
            ast,
            clamp,
            inputs: BoundInput::from_descriptor(descriptor),
            acquired: None,
        })
    }

    pub fn name(&self) -> &str {
        NAME
    }

    pub fn parallel_safe(&self) -> bool {
        true
    }

    /// Evaluate the expression for one sample.
    pub fn evaluate(&self, value: f64, sample: usize) -> Result<f64> {
        if is_undefined(value) {
            return Ok(UNDEFINED_SAMPLE);
        }
        let mut scope = Scope::new();
        scope.push("value", value);
        scope.push("raw", value);
        scope.push("sample", sample as i64);

        let result = self
            .engine
            .eval_ast_with_scope::<Dynamic>(&mut scope, &self.ast)
            .context("Execution error")?;
        let out = if let Ok(f) = result.as_float() {
            f
        } else if let Ok(i) = result.as_int() {
            i as f64
        } else {
            return Err(TransformError::Script(
                "Expression must return a numeric value".to_string(),
            ));
        };
        Ok(match self.clamp {
            Some((lo, hi)) if !is_undefined(out) => out.max(lo).min(hi),
            _ => out,
        })
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
        let mut acquired = self.acquired.take();
        compute_samples(&mut acquired, output, position, interval, |inputs, i| {
            self.evaluate(inputs.sample(0, i), i)
                .map_err(|e| TransformError::Compute {
                    position,
                    message: format!("sample {}: {}", i, e),
                })
        })
    }
}
