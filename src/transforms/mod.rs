//! Built-in transform implementations.
//!
//! Each transform module exposes a `schema()` building its descriptor with
//! defaults applied, and a `definition()` for the registry. Adding a
//! transform means adding a variant here plus its definition in
//! [`builtin_definitions`].

pub mod combine;
pub mod expression;
pub mod scale;

pub use combine::CombineProvider;
pub use expression::ExpressionProvider;
pub use scale::{ScaleMode, ScaleProvider};

use crate::error::Result;
use crate::registry::TransformDefinition;
use crate::source::DataSource;
use crate::types::{PositionKey, SampleInterval};

/// Definitions of every built-in transform, in registration order.
pub fn builtin_definitions() -> Vec<TransformDefinition> {
    vec![
        scale::definition(),
        combine::definition(),
        expression::definition(),
    ]
}

/// Enum dispatch for built-in providers.
pub enum BuiltinProvider {
    Scale(ScaleProvider),
    Combine(CombineProvider),
    Expression(ExpressionProvider),
}

impl BuiltinProvider {
    pub fn name(&self) -> &str {
        match self {
            BuiltinProvider::Scale(p) => p.name(),
            BuiltinProvider::Combine(p) => p.name(),
            BuiltinProvider::Expression(p) => p.name(),
        }
    }

    pub fn parallel_safe(&self) -> bool {
        match self {
            BuiltinProvider::Scale(p) => p.parallel_safe(),
            BuiltinProvider::Combine(p) => p.parallel_safe(),
            BuiltinProvider::Expression(p) => p.parallel_safe(),
        }
    }

    pub fn acquire(
        &mut self,
        source: &dyn DataSource,
        position: PositionKey,
        interval: SampleInterval,
    ) -> Result<()> {
        match self {
            BuiltinProvider::Scale(p) => p.acquire(source, position, interval),
            BuiltinProvider::Combine(p) => p.acquire(source, position, interval),
            BuiltinProvider::Expression(p) => p.acquire(source, position, interval),
        }
    }

    pub fn compute(
        &mut self,
        output: &mut [f64],
        position: PositionKey,
        interval: SampleInterval,
    ) -> Result<()> {
        match self {
            BuiltinProvider::Scale(p) => p.compute(output, position, interval),
            BuiltinProvider::Combine(p) => p.compute(output, position, interval),
            BuiltinProvider::Expression(p) => p.compute(output, position, interval),
        }
    }
}
