//! Editor data transfer object.
//!
//! A flat list of fields with widget hints that a parameter editor renders.
//! The state keeps a private copy of the descriptor so that editing a
//! trigger parameter (say `mode`) immediately re-evaluates which fields are
//! enabled, the same way the descriptor itself would.
//!
//! Storing back writes only the fields that are enabled at that point.
//! Disabled parameters keep whatever value the target descriptor holds.

use crate::error::{Result, TransformError};
use crate::schema::{Descriptor, ParamKind, ParamValue, Parameter};

/// How a field should be presented.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldWidget {
    /// Numeric spin box, with a range when the parameter declares limits.
    Spin {
        min: Option<f64>,
        max: Option<f64>,
        integer: bool,
    },
    /// Check box.
    Check,
    /// Drop-down over the option names.
    Choice { options: Vec<String> },
    /// Free text.
    Text,
}

impl FieldWidget {
    fn for_param(param: &Parameter) -> Self {
        let (min, max) = match param.limits() {
            Some(l) => (Some(l.min), Some(l.max)),
            None => (None, None),
        };
        match param.kind() {
            ParamKind::Bool => FieldWidget::Check,
            ParamKind::Int => FieldWidget::Spin {
                min,
                max,
                integer: true,
            },
            ParamKind::Float => FieldWidget::Spin {
                min,
                max,
                integer: false,
            },
            ParamKind::String => FieldWidget::Text,
            ParamKind::Enum { options } => FieldWidget::Choice {
                options: options.clone(),
            },
        }
    }
}

/// One editable parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct EditorField {
    pub key: String,
    pub label: String,
    pub value: ParamValue,
    pub default: ParamValue,
    pub enabled: bool,
    pub widget: FieldWidget,
}

/// Editor view of one descriptor.
#[derive(Debug, Clone)]
pub struct EditorState {
    transform: String,
    fields: Vec<EditorField>,
    working: Descriptor,
}

impl EditorState {
    /// Snapshot every parameter of `descriptor`.
    pub fn load_from_descriptor(descriptor: &Descriptor) -> Self {
        let fields = descriptor
            .params()
            .iter()
            .map(|p| EditorField {
                key: p.key().to_string(),
                label: p.label().to_string(),
                value: p.value().clone(),
                default: p.default_value().clone(),
                enabled: p.is_enabled(),
                widget: FieldWidget::for_param(p),
            })
            .collect();
        Self {
            transform: descriptor.name().to_string(),
            fields,
            working: descriptor.clone(),
        }
    }

    pub fn transform(&self) -> &str {
        &self.transform
    }

    pub fn fields(&self) -> &[EditorField] {
        &self.fields
    }

    pub fn field(&self, key: &str) -> Option<&EditorField> {
        self.fields.iter().find(|f| f.key == key)
    }

    /// Edit one field. The value is checked exactly as
    /// [`Descriptor::set_value`] would; on error nothing changes.
    pub fn set(&mut self, key: &str, value: impl Into<ParamValue>) -> Result<()> {
        self.working.set_value(key, value)?;
        self.sync_fields();
        Ok(())
    }

    /// Put one field back to its default.
    pub fn reset_field_to_default(&mut self, key: &str) -> Result<()> {
        let default = self
            .field(key)
            .map(|f| f.default.clone())
            .ok_or_else(|| TransformError::UnknownParameter {
                transform: self.transform.clone(),
                key: key.to_string(),
            })?;
        self.set(key, default)
    }

    fn sync_fields(&mut self) {
        for field in &mut self.fields {
            if let Ok(param) = self.working.param(&field.key) {
                field.value = param.value().clone();
                field.enabled = param.is_enabled();
            }
        }
    }

    /// Write every enabled field into `descriptor` as one edit.
    ///
    /// Fails with `SchemaMismatch` if `descriptor` belongs to another
    /// transform. On error `descriptor` is unchanged.
    pub fn store_to_descriptor(&self, descriptor: &mut Descriptor) -> Result<()> {
        if descriptor.name() != self.transform {
            return Err(TransformError::SchemaMismatch(format!(
                "editor for '{}' cannot store into '{}'",
                self.transform,
                descriptor.name()
            )));
        }
        let values = self
            .fields
            .iter()
            .filter(|f| f.enabled)
            .map(|f| (f.key.as_str(), f.value.clone()));
        descriptor.set_values(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Registry;

    #[test]
    fn test_roundtrip_reproduces_enabled_values() {
        let registry = Registry::with_builtins();
        let mut d = registry.descriptor("Scale").unwrap();
        d.set_value("factor", 4.0).unwrap();
        d.set_value("shift", 12.5).unwrap();

        let state = EditorState::load_from_descriptor(&d);
        let mut target = registry.descriptor("Scale").unwrap();
        state.store_to_descriptor(&mut target).unwrap();

        for param in d.params().iter().filter(|p| p.is_enabled()) {
            assert_eq!(target.value(param.key()).unwrap(), param.value());
        }
    }

    #[test]
    fn test_disabled_params_not_overwritten() {
        let registry = Registry::with_builtins();
        let mut d = registry.descriptor("Scale").unwrap();
        d.set_value("factor", 7.0).unwrap();
        d.set_value("mode", "square").unwrap();

        // Editor state taken from a default descriptor in square mode:
        // factor is disabled there and holds its default.
        let mut source = registry.descriptor("Scale").unwrap();
        source.set_value("mode", "square").unwrap();
        let state = EditorState::load_from_descriptor(&source);
        assert!(!state.field("factor").unwrap().enabled);

        state.store_to_descriptor(&mut d).unwrap();
        assert_eq!(d.get::<f64>("factor").unwrap(), 7.0);
    }

    #[test]
    fn test_trigger_edit_updates_enabled_flags() {
        let registry = Registry::with_builtins();
        let d = registry.descriptor("Scale").unwrap();
        let mut state = EditorState::load_from_descriptor(&d);
        assert!(state.field("factor").unwrap().enabled);
        assert!(!state.field("exponent").unwrap().enabled);

        state.set("mode", "power").unwrap();
        assert!(!state.field("factor").unwrap().enabled);
        assert!(state.field("exponent").unwrap().enabled);

        state.set("exponent", 3.0).unwrap();
        let mut target = registry.descriptor("Scale").unwrap();
        state.store_to_descriptor(&mut target).unwrap();
        assert_eq!(target.get_option("mode").unwrap(), "power");
        assert_eq!(target.get::<f64>("exponent").unwrap(), 3.0);
    }

    #[test]
    fn test_invalid_edit_rejected() {
        let registry = Registry::with_builtins();
        let d = registry.descriptor("Scale").unwrap();
        let mut state = EditorState::load_from_descriptor(&d);
        assert!(state.set("factor", 5000.0).is_err());
        assert_eq!(state.field("factor").unwrap().value, ParamValue::Float(1.0));
        assert!(state.set("nonexistent", 1.0).is_err());
    }

    #[test]
    fn test_reset_field() {
        let registry = Registry::with_builtins();
        let d = registry.descriptor("Combine").unwrap();
        let mut state = EditorState::load_from_descriptor(&d);
        state.set("operation", "divide").unwrap();
        state.set("epsilon", 0.5).unwrap();
        state.reset_field_to_default("epsilon").unwrap();
        assert_eq!(
            state.field("epsilon").unwrap().value,
            ParamValue::Float(1.0e-12)
        );
    }

    #[test]
    fn test_widget_hints() {
        let registry = Registry::with_builtins();
        let d = registry.descriptor("Combine").unwrap();
        let state = EditorState::load_from_descriptor(&d);
        assert!(matches!(
            state.field("operation").unwrap().widget,
            FieldWidget::Choice { ref options } if options.len() == 5
        ));
        assert_eq!(state.field("undefined_as_zero").unwrap().widget, FieldWidget::Check);
        assert_eq!(
            state.field("epsilon").unwrap().widget,
            FieldWidget::Spin {
                min: Some(0.0),
                max: Some(1.0),
                integer: false
            }
        );
    }

    #[test]
    fn test_store_into_other_transform_rejected() {
        let registry = Registry::with_builtins();
        let state = EditorState::load_from_descriptor(&registry.descriptor("Scale").unwrap());
        let mut other = registry.descriptor("Combine").unwrap();
        assert!(matches!(
            state.store_to_descriptor(&mut other),
            Err(TransformError::SchemaMismatch(_))
        ));
    }
}
