//! Typed parameter values and the generic accessor trait.
//!
//! [`ParamValue`] is the tagged value stored in every parameter slot.
//! [`FromParamValue`] lets callers read a slot as a concrete Rust type
//! (`descriptor.get::<f64>("factor")`) without a getter per type.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A parameter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    /// Index into the parameter's option list.
    Enum(usize),
}

impl ParamValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParamValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            ParamValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Float view. Integers widen.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            ParamValue::Float(v) => Some(*v),
            ParamValue::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_enum(&self) -> Option<usize> {
        match self {
            ParamValue::Enum(v) => Some(*v),
            _ => None,
        }
    }

    /// Short name of the value's variant, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            ParamValue::Bool(_) => "bool",
            ParamValue::Int(_) => "int",
            ParamValue::Float(_) => "float",
            ParamValue::String(_) => "string",
            ParamValue::Enum(_) => "enum",
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Bool(v) => write!(f, "{}", v),
            ParamValue::Int(v) => write!(f, "{}", v),
            ParamValue::Float(v) => write!(f, "{}", v),
            ParamValue::String(v) => write!(f, "\"{}\"", v),
            ParamValue::Enum(v) => write!(f, "#{}", v),
        }
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        ParamValue::Bool(v)
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Int(v)
    }
}

impl From<i32> for ParamValue {
    fn from(v: i32) -> Self {
        ParamValue::Int(v as i64)
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Float(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::String(v.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        ParamValue::String(v)
    }
}

/// Conversion from a stored [`ParamValue`] into a concrete type.
pub trait FromParamValue: Sized {
    /// Name of the expected type, for `TypeMismatch` errors.
    const EXPECTED: &'static str;

    fn from_param(value: &ParamValue) -> Option<Self>;
}

impl FromParamValue for f64 {
    const EXPECTED: &'static str = "float";

    fn from_param(value: &ParamValue) -> Option<Self> {
        value.as_float()
    }
}

impl FromParamValue for i64 {
    const EXPECTED: &'static str = "int";

    fn from_param(value: &ParamValue) -> Option<Self> {
        value.as_int()
    }
}

impl FromParamValue for bool {
    const EXPECTED: &'static str = "bool";

    fn from_param(value: &ParamValue) -> Option<Self> {
        value.as_bool()
    }
}

impl FromParamValue for String {
    const EXPECTED: &'static str = "string";

    fn from_param(value: &ParamValue) -> Option<Self> {
        value.as_str().map(str::to_string)
    }
}

impl FromParamValue for usize {
    const EXPECTED: &'static str = "enum";

    fn from_param(value: &ParamValue) -> Option<Self> {
        value.as_enum()
    }
}
