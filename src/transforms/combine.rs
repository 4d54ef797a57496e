//! Combine - sample-wise arithmetic on two input traces.
//!
//! Inputs: `First` (required) and `Second` (optional). An unbound or
//! unavailable `Second` reads as all-undefined.
//!
//! Undefined handling: by default any undefined operand yields an undefined
//! output. With `undefined_as_zero` set, undefined operands read as `0.0`
//! instead. Division by a divisor smaller than `epsilon` in magnitude yields
//! undefined in both cases.

use crate::error::{Result, TransformError};
use crate::provider::{compute_samples, AcquiredInputs, AnyProvider, BoundInput};
use crate::registry::TransformDefinition;
use crate::schema::{Descriptor, Parameter, UpdateRule};
use crate::source::DataSource;
use crate::transforms::BuiltinProvider;
use crate::types::{is_undefined, OutputKind, PositionKey, SampleInterval, UNDEFINED_SAMPLE};

pub const NAME: &str = "Combine";

const OPERATIONS: &[&str] = &["add", "subtract", "multiply", "divide", "mean"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Add,
    Subtract,
    Multiply,
    Divide,
    Mean,
}

impl Operation {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "add" => Some(Operation::Add),
            "subtract" => Some(Operation::Subtract),
            "multiply" => Some(Operation::Multiply),
            "divide" => Some(Operation::Divide),
            "mean" => Some(Operation::Mean),
            _ => None,
        }
    }
}

pub fn definition() -> TransformDefinition {
    TransformDefinition {
        name: NAME,
        description: "Adds, subtracts, multiplies, divides or averages two traces sample by sample.",
        schema,
        factory: create,
    }
}

fn create(descriptor: &Descriptor) -> Result<AnyProvider> {
    let provider = CombineProvider::new(descriptor)?;
    Ok(AnyProvider::Builtin(BuiltinProvider::Combine(provider)))
}

pub fn schema() -> Result<Descriptor> {
    let mut d = Descriptor::new(NAME);
    d.add_param(Parameter::choice("operation", OPERATIONS, 0).with_label("Operation"))?;
    d.add_param(
        Parameter::boolean("undefined_as_zero", false)
            .with_label("Treat undefined as zero")
            .optional(),
    )?;
    d.add_param(
        Parameter::float("epsilon", 1.0e-12)
            .with_limits(0.0, 1.0)
            .with_label("Minimum divisor")
            .optional(),
    )?;
    d.add_input("First", true);
    d.add_input("Second", false);
    d.set_output_kind(OutputKind::Amplitude);
    d.set_update_rule(UpdateRule {
        triggers: &["operation"],
        rule: update_rule,
    });
    Ok(d)
}

fn update_rule(d: &Descriptor) -> Vec<(&'static str, bool)> {
    let divide = d.get_option("operation").is_ok_and(|op| op == "divide");
    vec![("epsilon", divide)]
}

/// Combine provider. Parallel-safe.
pub struct CombineProvider {
    operation: Operation,
    undefined_as_zero: bool,
    epsilon: f64,
    inputs: Vec<BoundInput>,
    acquired: Option<AcquiredInputs>,
}

impl CombineProvider {
    pub fn new(descriptor: &Descriptor) -> Result<Self> {
        let name = descriptor.get_option("operation")?;
        let operation =
            Operation::from_name(name).ok_or_else(|| TransformError::InvalidDescriptor {
                transform: NAME.to_string(),
                reason: format!("unsupported operation '{}'", name),
            })?;
        Ok(Self {
            operation,
            undefined_as_zero: descriptor.get("undefined_as_zero")?,
            epsilon: descriptor.get("epsilon")?,
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

    /// Combine one pair of samples.
    #[inline]
    pub fn apply(&self, a: f64, b: f64) -> f64 {
        let (a, b) = if self.undefined_as_zero {
            (zero_if_undefined(a), zero_if_undefined(b))
        } else {
            (a, b)
        };
        if is_undefined(a) || is_undefined(b) {
            return UNDEFINED_SAMPLE;
        }
        match self.operation {
            Operation::Add => a + b,
            Operation::Subtract => a - b,
            Operation::Multiply => a * b,
            Operation::Divide => {
                if b.abs() < self.epsilon || b == 0.0 {
                    UNDEFINED_SAMPLE
                } else {
                    a / b
                }
            }
            Operation::Mean => 0.5 * (a + b),
        }
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
            Ok(self.apply(inputs.sample(0, i), inputs.sample(1, i)))
        })
    }
}

#[inline]
fn zero_if_undefined(v: f64) -> f64 {
    if is_undefined(v) {
        0.0
    } else {
        v
    }
}
