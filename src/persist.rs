//! Persisted transform state.
//!
//! A [`PersistedTransform`] is the transform name, a key → value map of
//! parameters and a label → source map of input bindings. It serializes to
//! JSON (for embedding in host project files) and TOML (for job files).
//!
//! Enum parameters persist as their option index. Loading is lenient about
//! keys: unknown keys are ignored and missing keys keep their default, each
//! with a warning. A value of the wrong type, a value out of range once the
//! update rule has run, or an unknown transform name is an error.

use crate::error::{Result, ResultExt, TransformError};
use crate::registry::Registry;
use crate::schema::{Descriptor, ParamValue};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One persisted parameter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PersistedValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl From<&ParamValue> for PersistedValue {
    fn from(value: &ParamValue) -> Self {
        match value {
            ParamValue::Bool(b) => PersistedValue::Bool(*b),
            ParamValue::Int(i) => PersistedValue::Int(*i),
            ParamValue::Float(f) => PersistedValue::Float(*f),
            ParamValue::String(s) => PersistedValue::Text(s.clone()),
            ParamValue::Enum(i) => PersistedValue::Int(*i as i64),
        }
    }
}

impl From<PersistedValue> for ParamValue {
    fn from(value: PersistedValue) -> Self {
        match value {
            PersistedValue::Bool(b) => ParamValue::Bool(b),
            PersistedValue::Int(i) => ParamValue::Int(i),
            PersistedValue::Float(f) => ParamValue::Float(f),
            PersistedValue::Text(s) => ParamValue::String(s),
        }
    }
}

/// Serializable snapshot of a configured descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedTransform {
    pub name: String,
    #[serde(default)]
    pub params: BTreeMap<String, PersistedValue>,
    #[serde(default)]
    pub inputs: BTreeMap<String, String>,
}

/// Result of [`PersistedTransform::load`].
#[derive(Debug, Clone)]
pub struct LoadedTransform {
    pub descriptor: Descriptor,
    /// Non-fatal problems found while loading.
    pub warnings: Vec<String>,
}

impl PersistedTransform {
    /// Snapshot every parameter value (enabled or not) and every bound input.
    pub fn from_descriptor(descriptor: &Descriptor) -> Self {
        let params = descriptor
            .params()
            .iter()
            .map(|p| (p.key().to_string(), PersistedValue::from(p.value())))
            .collect();
        let inputs = descriptor
            .inputs()
            .iter()
            .filter_map(|slot| {
                slot.binding
                    .as_ref()
                    .map(|source| (slot.label.clone(), source.clone()))
            })
            .collect();
        Self {
            name: descriptor.name().to_string(),
            params,
            inputs,
        }
    }

    /// Rebuild a descriptor through `registry`.
    pub fn load(&self, registry: &Registry) -> Result<LoadedTransform> {
        if !registry.contains(&self.name) {
            return Err(TransformError::SchemaMismatch(format!(
                "no registered transform named '{}'",
                self.name
            )));
        }
        let mut descriptor = registry.descriptor(&self.name)?;
        let mut warnings = Vec::new();

        for param in descriptor.params() {
            if !param.is_optional() && !self.params.contains_key(param.key()) {
                warnings.push(format!(
                    "parameter '{}' missing, using default {}",
                    param.key(),
                    param.default_value()
                ));
            }
        }

        let mut values = Vec::with_capacity(self.params.len());
        for (key, value) in &self.params {
            if descriptor.param(key).is_err() {
                warnings.push(format!("unknown parameter '{}' ignored", key));
                continue;
            }
            values.push((key.as_str(), ParamValue::from(value.clone())));
        }
        descriptor
            .set_values(values)
            .context(format!("Failed to load '{}'", self.name))?;

        for (label, source) in &self.inputs {
            if descriptor.input(label).is_err() {
                return Err(TransformError::SchemaMismatch(format!(
                    "'{}' has no input named '{}'",
                    self.name, label
                )));
            }
            descriptor.bind_input(label, source.clone())?;
        }

        for warning in &warnings {
            tracing::warn!("{}: {}", self.name, warning);
        }
        Ok(LoadedTransform {
            descriptor,
            warnings,
        })
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}
