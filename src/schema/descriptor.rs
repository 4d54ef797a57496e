//! Descriptor: the schema and binding instance of one transform.
//!
//! A descriptor owns the ordered parameter list, the ordered input slots
//! and the declared output kind. Its only moving parts after construction
//! are parameter values, input bindings and the enabled flags that the
//! transform's [`UpdateRule`] derives from the current values.

use crate::error::{Result, TransformError};
use crate::schema::parameter::Parameter;
use crate::schema::value::{FromParamValue, ParamValue};
use crate::types::OutputKind;
use std::fmt;

/// A named input slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputSlot {
    pub label: String,
    pub required: bool,
    /// Position-independent reference to a data source, if bound.
    pub binding: Option<String>,
}

impl InputSlot {
    pub fn is_bound(&self) -> bool {
        self.binding.is_some()
    }
}

/// Pure mapping from the current parameter values to enabled flags.
///
/// `rule` is re-evaluated after every successful `set_value` on one of the
/// `triggers` keys, and once when the rule is installed.
#[derive(Clone, Copy)]
pub struct UpdateRule {
    pub triggers: &'static [&'static str],
    pub rule: fn(&Descriptor) -> Vec<(&'static str, bool)>,
}

impl fmt::Debug for UpdateRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpdateRule")
            .field("triggers", &self.triggers)
            .finish()
    }
}

/// Schema and bindings of one transform instance.
#[derive(Debug, Clone)]
pub struct Descriptor {
    name: String,
    params: Vec<Parameter>,
    inputs: Vec<InputSlot>,
    output_kind: OutputKind,
    update_rule: Option<UpdateRule>,
}

impl Descriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
            inputs: Vec::new(),
            output_kind: OutputKind::default(),
            update_rule: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    // ── Schema building ──

    /// Append a parameter. Keys must be unique and defaults must satisfy
    /// their own limits.
    pub fn add_param(&mut self, param: Parameter) -> Result<()> {
        if self.params.iter().any(|p| p.key() == param.key()) {
            return Err(TransformError::DuplicateParameter {
                transform: self.name.clone(),
                key: param.key().to_string(),
            });
        }
        param.validate().map_err(|e| TransformError::InvalidDescriptor {
            transform: self.name.clone(),
            reason: format!("bad default: {}", e),
        })?;
        self.params.push(param);
        Ok(())
    }

    /// Append an input slot. Returns its index.
    pub fn add_input(&mut self, label: &str, required: bool) -> usize {
        self.inputs.push(InputSlot {
            label: label.to_string(),
            required,
            binding: None,
        });
        self.inputs.len() - 1
    }

    pub fn set_output_kind(&mut self, kind: OutputKind) {
        self.output_kind = kind;
    }

    pub fn output_kind(&self) -> OutputKind {
        self.output_kind
    }

    /// Install the update rule and evaluate it against the current values.
    pub fn set_update_rule(&mut self, rule: UpdateRule) {
        self.update_rule = Some(rule);
        self.apply_update_rule();
    }

    // ── Parameters ──

    pub fn params(&self) -> &[Parameter] {
        &self.params
    }

    pub fn param(&self, key: &str) -> Result<&Parameter> {
        self.params
            .iter()
            .find(|p| p.key() == key)
            .ok_or_else(|| self.unknown_param(key))
    }

    fn param_mut(&mut self, key: &str) -> Result<&mut Parameter> {
        match self.params.iter().position(|p| p.key() == key) {
            Some(i) => Ok(&mut self.params[i]),
            None => Err(self.unknown_param(key)),
        }
    }

    pub fn value(&self, key: &str) -> Result<&ParamValue> {
        self.param(key).map(Parameter::value)
    }

    /// Typed read of a parameter value.
    pub fn get<T: FromParamValue>(&self, key: &str) -> Result<T> {
        let value = self.value(key)?;
        T::from_param(value).ok_or_else(|| TransformError::TypeMismatch {
            key: key.to_string(),
            expected: T::EXPECTED.to_string(),
            found: value.type_name().to_string(),
        })
    }

    /// Name of the selected option of an enum parameter.
    pub fn get_option(&self, key: &str) -> Result<&str> {
        let param = self.param(key)?;
        param
            .selected_option()
            .ok_or_else(|| TransformError::TypeMismatch {
                key: key.to_string(),
                expected: "enum".to_string(),
                found: param.value().type_name().to_string(),
            })
    }

    /// Set a parameter value and re-run the update rule if the key
    /// participates in it.
    ///
    /// A rejected value leaves the previous value in place.
    pub fn set_value(&mut self, key: &str, value: impl Into<ParamValue>) -> Result<()> {
        let param = self.param_mut(key)?;
        param.set(value.into())?;
        let enabled = param.is_enabled();

        let triggers = self.update_rule.map(|r| r.triggers).unwrap_or(&[]);
        if enabled && triggers.iter().any(|t| *t == key) {
            self.apply_update_rule();
        }
        Ok(())
    }

    /// Set several values as one edit.
    ///
    /// Types are checked per value. If an enabled trigger key is part of the
    /// batch the update rule runs once at the end. Then every enabled
    /// parameter is range checked. On error nothing is changed.
    pub fn set_values<I, K>(&mut self, values: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, ParamValue)>,
        K: AsRef<str>,
    {
        let triggers = self.update_rule.map(|r| r.triggers).unwrap_or(&[]);
        let mut staged = self.clone();
        let mut triggered = false;
        for (key, value) in values {
            let key = key.as_ref();
            let param = staged.param_mut(key)?;
            param.restore(value)?;
            triggered |= param.is_enabled() && triggers.iter().any(|t| *t == key);
        }
        if triggered {
            staged.apply_update_rule();
        }
        for param in &staged.params {
            param.validate()?;
        }
        *self = staged;
        Ok(())
    }

    /// Toggle a parameter's enabled flag. Idempotent.
    pub fn set_param_enabled(&mut self, key: &str, enabled: bool) -> Result<()> {
        self.param_mut(key)?.set_enabled(enabled);
        Ok(())
    }

    pub fn is_param_enabled(&self, key: &str) -> Result<bool> {
        self.param(key).map(Parameter::is_enabled)
    }

    /// Reset every parameter to its default and re-derive enabled flags.
    pub fn reset_to_defaults(&mut self) {
        for param in &mut self.params {
            param.reset();
        }
        self.apply_update_rule();
    }

    fn apply_update_rule(&mut self) {
        let Some(rule) = self.update_rule else {
            return;
        };
        for (key, enabled) in (rule.rule)(self) {
            match self.params.iter().position(|p| p.key() == key) {
                Some(i) => self.params[i].set_enabled(enabled),
                None => {
                    tracing::warn!(
                        "Update rule of '{}' names unknown parameter '{}'",
                        self.name,
                        key
                    );
                }
            }
        }
    }

    // ── Inputs ──

    pub fn inputs(&self) -> &[InputSlot] {
        &self.inputs
    }

    pub fn input(&self, label: &str) -> Result<&InputSlot> {
        self.inputs
            .iter()
            .find(|s| s.label == label)
            .ok_or_else(|| self.unknown_input(label))
    }

    /// Bind an input slot to a data-source reference.
    pub fn bind_input(&mut self, label: &str, source: impl Into<String>) -> Result<()> {
        let slot = self.input_mut(label)?;
        slot.binding = Some(source.into());
        Ok(())
    }

    pub fn unbind_input(&mut self, label: &str) -> Result<()> {
        self.input_mut(label)?.binding = None;
        Ok(())
    }

    fn input_mut(&mut self, label: &str) -> Result<&mut InputSlot> {
        match self.inputs.iter().position(|s| s.label == label) {
            Some(i) => Ok(&mut self.inputs[i]),
            None => Err(self.unknown_input(label)),
        }
    }

    // ── Validation ──

    /// Every required input bound and every enabled parameter in range.
    pub fn validate(&self) -> Result<()> {
        if let Some(slot) = self.inputs.iter().find(|s| s.required && !s.is_bound()) {
            return Err(TransformError::InvalidDescriptor {
                transform: self.name.clone(),
                reason: format!("required input '{}' is not bound", slot.label),
            });
        }
        for param in &self.params {
            param.validate()?;
        }
        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    fn unknown_param(&self, key: &str) -> TransformError {
        TransformError::UnknownParameter {
            transform: self.name.clone(),
            key: key.to_string(),
        }
    }

    fn unknown_input(&self, label: &str) -> TransformError {
        TransformError::UnknownInput {
            transform: self.name.clone(),
            label: label.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mode_rule(d: &Descriptor) -> Vec<(&'static str, bool)> {
        let linear = d.get_option("mode").map(|m| m == "linear").unwrap_or(true);
        vec![("gain", linear)]
    }

    fn sample() -> Descriptor {
        let mut d = Descriptor::new("Test");
        d.add_param(Parameter::choice("mode", &["linear", "square"], 1))
            .unwrap();
        d.add_param(Parameter::float("gain", 1.0).with_limits(0.0, 10.0))
            .unwrap();
        d.add_param(Parameter::boolean("flag", false)).unwrap();
        d.add_input("Input", true);
        d.add_input("Aux", false);
        d.set_update_rule(UpdateRule {
            triggers: &["mode"],
            rule: mode_rule,
        });
        d
    }

    #[test]
    fn test_rule_runs_on_install() {
        let d = sample();
        assert!(!d.is_param_enabled("gain").unwrap());
    }

    #[test]
    fn test_rule_runs_on_trigger() {
        let mut d = sample();
        d.set_value("mode", "linear").unwrap();
        assert!(d.is_param_enabled("gain").unwrap());
        d.set_value("mode", ParamValue::Enum(1)).unwrap();
        assert!(!d.is_param_enabled("gain").unwrap());
    }

    #[test]
    fn test_duplicate_param_rejected() {
        let mut d = Descriptor::new("Test");
        d.add_param(Parameter::float("a", 0.0)).unwrap();
        assert!(matches!(
            d.add_param(Parameter::int("a", 0)),
            Err(TransformError::DuplicateParameter { .. })
        ));
    }

    #[test]
    fn test_bad_default_rejected() {
        let mut d = Descriptor::new("Test");
        let err = d
            .add_param(Parameter::float("a", 50.0).with_limits(0.0, 1.0))
            .unwrap_err();
        assert!(matches!(err, TransformError::InvalidDescriptor { .. }));
    }

    #[test]
    fn test_unknown_parameter() {
        let mut d = sample();
        assert!(matches!(
            d.set_value("nope", 1.0),
            Err(TransformError::UnknownParameter { .. })
        ));
        assert!(matches!(
            d.value("nope"),
            Err(TransformError::UnknownParameter { .. })
        ));
    }

    #[test]
    fn test_typed_accessor() {
        let d = sample();
        assert_eq!(d.get::<f64>("gain").unwrap(), 1.0);
        assert!(!d.get::<bool>("flag").unwrap());
        assert_eq!(d.get::<usize>("mode").unwrap(), 1);
        assert!(matches!(
            d.get::<bool>("gain"),
            Err(TransformError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_validity_requires_bound_inputs() {
        let mut d = sample();
        assert!(!d.is_valid());
        d.bind_input("Input", "amplitude").unwrap();
        assert!(d.is_valid());
        d.unbind_input("Input").unwrap();
        assert!(!d.is_valid());
        assert!(d.bind_input("Missing", "x").is_err());
    }

    #[test]
    fn test_disabled_param_excluded_from_validation() {
        let mut d = sample();
        d.bind_input("Input", "amplitude").unwrap();
        d.set_value("gain", 99.0).unwrap();
        assert_eq!(d.get::<f64>("gain").unwrap(), 99.0);
        assert!(d.is_valid());

        d.set_value("mode", "linear").unwrap();
        assert!(d.validate().is_err());
    }

    #[test]
    fn test_set_values_is_order_independent() {
        let mut d = sample();
        // gain is disabled in square mode, so 99 is accepted as long as the
        // final mode is square, whichever order the keys arrive in.
        d.set_values(vec![
            ("gain", ParamValue::Float(99.0)),
            ("mode", ParamValue::Enum(1)),
        ])
        .unwrap();
        assert_eq!(d.get::<f64>("gain").unwrap(), 99.0);

        let err = d
            .set_values(vec![
                ("gain", ParamValue::Float(50.0)),
                ("mode", ParamValue::Enum(0)),
            ])
            .unwrap_err();
        assert!(matches!(err, TransformError::OutOfRange { .. }));
        assert_eq!(d.get::<f64>("gain").unwrap(), 99.0);
        assert_eq!(d.get::<usize>("mode").unwrap(), 1);
    }

    #[test]
    fn test_disabled_trigger_does_not_run_rule() {
        let mut d = sample();
        d.set_param_enabled("mode", false).unwrap();
        d.set_value("mode", "linear").unwrap();
        assert_eq!(d.get_option("mode").unwrap(), "linear");
        assert!(!d.is_param_enabled("gain").unwrap());

        d.set_param_enabled("mode", true).unwrap();
        d.set_value("mode", "linear").unwrap();
        assert!(d.is_param_enabled("gain").unwrap());
    }

    #[test]
    fn test_set_values_runs_rule_only_for_enabled_triggers() {
        let mut d = sample();
        d.set_param_enabled("mode", false).unwrap();
        d.set_values(vec![("mode", ParamValue::Enum(0))]).unwrap();
        assert!(!d.is_param_enabled("gain").unwrap());

        // No trigger in the batch: a manual flag survives.
        d.set_param_enabled("mode", true).unwrap();
        d.set_param_enabled("gain", true).unwrap();
        d.set_values(vec![("flag", ParamValue::Bool(true))]).unwrap();
        assert!(d.is_param_enabled("gain").unwrap());

        d.set_values(vec![("mode", ParamValue::Enum(1))]).unwrap();
        assert!(!d.is_param_enabled("gain").unwrap());
    }

    #[test]
    fn test_set_enabled_idempotent() {
        let mut d = sample();
        d.set_param_enabled("flag", false).unwrap();
        d.set_param_enabled("flag", false).unwrap();
        assert!(!d.is_param_enabled("flag").unwrap());
        d.set_param_enabled("flag", true).unwrap();
        assert!(d.is_param_enabled("flag").unwrap());
    }

    #[test]
    fn test_reset_to_defaults() {
        let mut d = sample();
        d.set_value("mode", "linear").unwrap();
        d.set_value("gain", 4.0).unwrap();
        d.reset_to_defaults();
        assert_eq!(d.get::<usize>("mode").unwrap(), 1);
        assert_eq!(d.get::<f64>("gain").unwrap(), 1.0);
        assert!(!d.is_param_enabled("gain").unwrap());
    }
}
