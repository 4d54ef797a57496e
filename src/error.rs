//! Error handling for tracecalc
//!
//! This module defines the error taxonomy shared by the schema, registry,
//! provider and scheduler layers, plus a Result alias.
//!
//! Errors fall into four categories (see [`ErrorCategory`]):
//!
//! - **Configuration** - bad parameters, unknown transforms, invalid descriptors.
//!   Surfaced before a run starts; the run does not begin.
//! - **Acquisition** - an input trace is unavailable at one position.
//! - **Compute** - invalid sample range or a per-position invariant violation.
//! - **RegistryConflict** - a transform name registered twice.
//!
//! Acquisition and compute errors are local to a position and never abort a run.

use crate::types::PositionKey;
use thiserror::Error;

/// Main error type for tracecalc operations
#[derive(Error, Debug)]
pub enum TransformError {
    /// Parameter key not present in the descriptor
    #[error("Unknown parameter '{key}' in transform '{transform}'")]
    UnknownParameter { transform: String, key: String },

    /// Parameter key added twice to a descriptor
    #[error("Duplicate parameter '{key}' in transform '{transform}'")]
    DuplicateParameter { transform: String, key: String },

    /// Value does not match the parameter's declared type
    #[error("Type mismatch for parameter '{key}': expected {expected}, got {found}")]
    TypeMismatch {
        key: String,
        expected: String,
        found: String,
    },

    /// Value outside the parameter's inclusive limits
    #[error("Value {value} for parameter '{key}' is outside [{min}, {max}]")]
    OutOfRange {
        key: String,
        value: f64,
        min: f64,
        max: f64,
    },

    /// Input slot label not present in the descriptor
    #[error("Unknown input '{label}' in transform '{transform}'")]
    UnknownInput { transform: String, label: String },

    /// No factory registered under this name
    #[error("Unknown transform '{0}'")]
    UnknownTransform(String),

    /// Transform name registered twice
    #[error("Transform '{0}' is already registered")]
    DuplicateName(String),

    /// Descriptor failed validation
    #[error("Invalid descriptor for '{transform}': {reason}")]
    InvalidDescriptor { transform: String, reason: String },

    /// Persisted state does not fit any registered schema
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    /// Provider used while not in a ready state
    #[error("Provider for '{transform}' is not ready: {reason}")]
    ProviderNotReady { transform: String, reason: String },

    /// Negative sample start or count, or an output buffer of the wrong size
    #[error("Invalid sample range: start={start}, count={count}")]
    InvalidRange { start: i64, count: i64 },

    /// Input trace unavailable at a position
    #[error("Input '{input}' unavailable at {position}")]
    Acquisition { input: String, position: PositionKey },

    /// Per-position computation failure
    #[error("Compute failed at {position}: {message}")]
    Compute {
        position: PositionKey,
        message: String,
    },

    /// Sink rejected a finished trace window
    #[error("Storage failed at {position}: {message}")]
    Storage {
        position: PositionKey,
        message: String,
    },

    /// Errors related to Rhai expression compilation or evaluation
    #[error("Script error: {0}")]
    Script(String),

    /// Errors related to configuration loading/saving
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<TransformError>,
    },
}

/// Coarse classification used by the scheduler and by callers deciding
/// whether a failure is fatal to a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Acquisition,
    Compute,
    RegistryConflict,
    Io,
}

impl TransformError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        TransformError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Create a script error from a Rhai error
    pub fn from_rhai_error(err: Box<rhai::EvalAltResult>) -> Self {
        TransformError::Script(err.to_string())
    }

    /// Category of this error, looking through any context wrappers.
    pub fn category(&self) -> ErrorCategory {
        match self {
            TransformError::WithContext { source, .. } => source.category(),
            TransformError::Acquisition { .. } => ErrorCategory::Acquisition,
            TransformError::InvalidRange { .. }
            | TransformError::Compute { .. }
            | TransformError::Storage { .. } => ErrorCategory::Compute,
            TransformError::DuplicateName(_) => ErrorCategory::RegistryConflict,
            TransformError::Io(_) => ErrorCategory::Io,
            _ => ErrorCategory::Configuration,
        }
    }

    /// Whether this error is local to one position (the run continues).
    pub fn is_position_local(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::Acquisition | ErrorCategory::Compute
        )
    }
}

impl From<serde_json::Error> for TransformError {
    fn from(err: serde_json::Error) -> Self {
        TransformError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for TransformError {
    fn from(err: toml::de::Error) -> Self {
        TransformError::Serialization(err.to_string())
    }
}

impl From<toml::ser::Error> for TransformError {
    fn from(err: toml::ser::Error) -> Self {
        TransformError::Serialization(err.to_string())
    }
}

/// Result type alias for tracecalc operations
pub type Result<T> = std::result::Result<T, TransformError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, Box<rhai::EvalAltResult>> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| TransformError::from_rhai_error(e).with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| TransformError::from_rhai_error(e).with_context(f()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TransformError::UnknownTransform("Sharpen".to_string());
        assert_eq!(err.to_string(), "Unknown transform 'Sharpen'");
    }

    #[test]
    fn test_error_with_context() {
        let err = TransformError::Config("missing worker count".to_string());
        let with_ctx = err.with_context("Failed to load engine.toml");
        assert!(with_ctx.to_string().contains("Failed to load engine.toml"));
        assert_eq!(with_ctx.category(), ErrorCategory::Configuration);
    }

    #[test]
    fn test_out_of_range_display() {
        let err = TransformError::OutOfRange {
            key: "factor".to_string(),
            value: 5000.0,
            min: -1000.0,
            max: 1000.0,
        };
        assert!(err.to_string().contains("factor"));
        assert!(err.to_string().contains("5000"));
    }

    #[test]
    fn test_categories() {
        let pos = PositionKey::new(10, 20);
        let acq = TransformError::Acquisition {
            input: "Input".into(),
            position: pos,
        };
        assert_eq!(acq.category(), ErrorCategory::Acquisition);
        assert!(acq.is_position_local());

        let range = TransformError::InvalidRange { start: -1, count: 4 };
        assert_eq!(range.category(), ErrorCategory::Compute);
        assert!(range.is_position_local());

        let dup = TransformError::DuplicateName("Scale".into());
        assert_eq!(dup.category(), ErrorCategory::RegistryConflict);
        assert!(!dup.is_position_local());

        let wrapped = acq.with_context("position 10/20");
        assert!(wrapped.is_position_local());
    }
}
