//! Parameter slots: key, declared type, default, limits and enabled flag.

use crate::error::{Result, TransformError};
use crate::schema::value::ParamValue;
use serde::{Deserialize, Serialize};

/// Declared type of a parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParamKind {
    Bool,
    Int,
    Float,
    String,
    /// One of a fixed list of named options, stored as an index.
    Enum { options: Vec<String> },
}

impl ParamKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            ParamKind::Bool => "bool",
            ParamKind::Int => "int",
            ParamKind::Float => "float",
            ParamKind::String => "string",
            ParamKind::Enum { .. } => "enum",
        }
    }
}

/// Inclusive numeric limits.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Limits {
    pub min: f64,
    pub max: f64,
}

impl Limits {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    #[inline]
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// A named, typed value slot owned by a descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    key: String,
    label: String,
    kind: ParamKind,
    default: ParamValue,
    limits: Option<Limits>,
    value: ParamValue,
    enabled: bool,
    optional: bool,
}

impl Parameter {
    fn new(key: &str, kind: ParamKind, default: ParamValue) -> Self {
        Self {
            key: key.to_string(),
            label: key.to_string(),
            kind,
            value: default.clone(),
            default,
            limits: None,
            enabled: true,
            optional: false,
        }
    }

    pub fn float(key: &str, default: f64) -> Self {
        Self::new(key, ParamKind::Float, ParamValue::Float(default))
    }

    pub fn int(key: &str, default: i64) -> Self {
        Self::new(key, ParamKind::Int, ParamValue::Int(default))
    }

    pub fn boolean(key: &str, default: bool) -> Self {
        Self::new(key, ParamKind::Bool, ParamValue::Bool(default))
    }

    pub fn string(key: &str, default: &str) -> Self {
        Self::new(key, ParamKind::String, ParamValue::String(default.to_string()))
    }

    /// An enumerated parameter; `default` indexes into `options`.
    pub fn choice(key: &str, options: &[&str], default: usize) -> Self {
        let options = options.iter().map(|s| s.to_string()).collect();
        Self::new(key, ParamKind::Enum { options }, ParamValue::Enum(default))
    }

    pub fn with_limits(mut self, min: f64, max: f64) -> Self {
        self.limits = Some(Limits::new(min, max));
        self
    }

    pub fn with_label(mut self, label: &str) -> Self {
        self.label = label.to_string();
        self
    }

    /// Missing from persisted state without a warning.
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn kind(&self) -> &ParamKind {
        &self.kind
    }

    pub fn default_value(&self) -> &ParamValue {
        &self.default
    }

    pub fn limits(&self) -> Option<Limits> {
        self.limits
    }

    pub fn value(&self) -> &ParamValue {
        &self.value
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_optional(&self) -> bool {
        self.optional
    }

    /// Option names for enum parameters.
    pub fn options(&self) -> &[String] {
        match &self.kind {
            ParamKind::Enum { options } => options,
            _ => &[],
        }
    }

    /// Name of the currently selected option, for enum parameters.
    pub fn selected_option(&self) -> Option<&str> {
        self.value
            .as_enum()
            .and_then(|i| self.options().get(i))
            .map(String::as_str)
    }

    pub(crate) fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Store a new value.
    ///
    /// The type is always checked; limits only while enabled. On error the
    /// previous value is kept.
    pub fn set(&mut self, value: ParamValue) -> Result<()> {
        let value = self.coerce(value)?;
        if self.enabled {
            self.check_limits(&value)?;
        }
        self.value = value;
        Ok(())
    }

    /// Store a value with only the type checked. Used for batch loads,
    /// where limits are checked once the enabled flags are final.
    pub(crate) fn restore(&mut self, value: ParamValue) -> Result<()> {
        self.value = self.coerce(value)?;
        Ok(())
    }

    /// Restore the default value.
    pub fn reset(&mut self) {
        self.value = self.default.clone();
    }

    /// Check the current value. Disabled parameters always pass.
    pub fn validate(&self) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }
        self.coerce(self.value.clone())?;
        self.check_limits(&self.value)
    }

    /// Convert `value` to this parameter's declared type, or fail with
    /// `TypeMismatch`.
    ///
    /// Ints widen to floats; enums accept an index or an option name.
    /// Floats must be finite.
    pub fn coerce(&self, value: ParamValue) -> Result<ParamValue> {
        match (&self.kind, value) {
            (ParamKind::Bool, v @ ParamValue::Bool(_)) => Ok(v),
            (ParamKind::Int, v @ ParamValue::Int(_)) => Ok(v),
            (ParamKind::Float, ParamValue::Float(f)) if !f.is_finite() => {
                Err(TransformError::TypeMismatch {
                    key: self.key.clone(),
                    expected: "finite float".to_string(),
                    found: f.to_string(),
                })
            }
            (ParamKind::Float, v @ ParamValue::Float(_)) => Ok(v),
            (ParamKind::Float, ParamValue::Int(i)) => Ok(ParamValue::Float(i as f64)),
            (ParamKind::String, v @ ParamValue::String(_)) => Ok(v),
            (ParamKind::Enum { options }, ParamValue::Enum(i)) => {
                self.enum_index(options, i as i64).map(ParamValue::Enum)
            }
            (ParamKind::Enum { options }, ParamValue::Int(i)) => {
                self.enum_index(options, i).map(ParamValue::Enum)
            }
            (ParamKind::Enum { options }, ParamValue::String(name)) => options
                .iter()
                .position(|o| o.eq_ignore_ascii_case(&name))
                .map(ParamValue::Enum)
                .ok_or_else(|| TransformError::TypeMismatch {
                    key: self.key.clone(),
                    expected: format!("one of [{}]", options.join(", ")),
                    found: format!("\"{}\"", name),
                }),
            (_, other) => Err(self.mismatch(&other)),
        }
    }

    fn enum_index(&self, options: &[String], index: i64) -> Result<usize> {
        if index < 0 || index as usize >= options.len() {
            return Err(TransformError::OutOfRange {
                key: self.key.clone(),
                value: index as f64,
                min: 0.0,
                max: options.len().saturating_sub(1) as f64,
            });
        }
        Ok(index as usize)
    }

    fn check_limits(&self, value: &ParamValue) -> Result<()> {
        let (Some(limits), Some(v)) = (self.limits, value.as_float()) else {
            return Ok(());
        };
        if !limits.contains(v) {
            return Err(TransformError::OutOfRange {
                key: self.key.clone(),
                value: v,
                min: limits.min,
                max: limits.max,
            });
        }
        Ok(())
    }

    fn mismatch(&self, found: &ParamValue) -> TransformError {
        TransformError::TypeMismatch {
            key: self.key.clone(),
            expected: self.kind.type_name().to_string(),
            found: found.type_name().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_limits_inclusive() {
        let mut p = Parameter::float("factor", 1.0).with_limits(-1000.0, 1000.0);
        assert!(p.set(ParamValue::Float(1000.0)).is_ok());
        assert!(p.set(ParamValue::Float(-1000.0)).is_ok());
        assert!(matches!(
            p.set(ParamValue::Float(1000.5)),
            Err(TransformError::OutOfRange { .. })
        ));
        assert_eq!(p.value(), &ParamValue::Float(-1000.0));
    }

    #[test]
    fn test_type_mismatch_keeps_value() {
        let mut p = Parameter::float("shift", 0.0);
        let err = p.set(ParamValue::Bool(true)).unwrap_err();
        assert!(matches!(err, TransformError::TypeMismatch { .. }));
        assert_eq!(p.value(), &ParamValue::Float(0.0));
    }

    #[test]
    fn test_disabled_skips_limits_but_not_type() {
        let mut p = Parameter::float("factor", 1.0).with_limits(-10.0, 10.0);
        p.set_enabled(false);
        assert!(p.set(ParamValue::Float(50.0)).is_ok());
        assert!(p.validate().is_ok());
        assert!(p.set(ParamValue::String("x".into())).is_err());

        p.set_enabled(true);
        assert!(p.validate().is_err());
    }

    #[test]
    fn test_enum_coercion() {
        let mut p = Parameter::choice("mode", &["linear", "square"], 0);
        p.set(ParamValue::String("Square".into())).unwrap();
        assert_eq!(p.value(), &ParamValue::Enum(1));
        assert_eq!(p.selected_option(), Some("square"));

        p.set(ParamValue::Int(0)).unwrap();
        assert_eq!(p.selected_option(), Some("linear"));

        assert!(matches!(
            p.set(ParamValue::Enum(2)),
            Err(TransformError::OutOfRange { .. })
        ));
        assert!(matches!(
            p.set(ParamValue::String("cube".into())),
            Err(TransformError::TypeMismatch { .. })
        ));
        assert_eq!(p.selected_option(), Some("linear"));
    }

    #[test]
    fn test_non_finite_float_rejected() {
        let mut p = Parameter::float("clamp_min", -1.0);
        for v in [f64::NEG_INFINITY, f64::INFINITY, f64::NAN] {
            assert!(matches!(
                p.set(ParamValue::Float(v)),
                Err(TransformError::TypeMismatch { .. })
            ));
        }
        p.set_enabled(false);
        assert!(p.set(ParamValue::Float(f64::INFINITY)).is_err());
        assert_eq!(p.value(), &ParamValue::Float(-1.0));
    }

    #[test]
    fn test_int_widens_into_float_slot() {
        let mut p = Parameter::float("shift", 0.0);
        p.set(ParamValue::Int(100)).unwrap();
        assert_eq!(p.value(), &ParamValue::Float(100.0));
    }

    proptest! {
        #[test]
        fn test_limits_property(
            lo in -1.0e6f64..0.0,
            span in 0.0f64..1.0e6,
            v in -3.0e6f64..3.0e6,
        ) {
            let hi = lo + span;
            let mut p = Parameter::float("x", lo).with_limits(lo, hi);
            let accepted = p.set(ParamValue::Float(v)).is_ok();
            prop_assert_eq!(accepted, v >= lo && v <= hi);
            if !accepted {
                prop_assert_eq!(p.value(), &ParamValue::Float(lo));
            }
        }
    }
}
