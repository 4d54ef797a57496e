//! Test data builders for creating test objects

use std::ops::RangeInclusive;
use tracecalc::{Descriptor, ParamValue, PositionKey, Registry};

/// Builder for configured descriptors
pub struct DescriptorBuilder {
    transform: String,
    values: Vec<(String, ParamValue)>,
    bindings: Vec<(String, String)>,
}

impl DescriptorBuilder {
    pub fn new(transform: &str) -> Self {
        Self {
            transform: transform.to_string(),
            values: Vec::new(),
            bindings: Vec::new(),
        }
    }

    pub fn param(mut self, key: &str, value: impl Into<ParamValue>) -> Self {
        self.values.push((key.to_string(), value.into()));
        self
    }

    pub fn input(mut self, label: &str, source: &str) -> Self {
        self.bindings.push((label.to_string(), source.to_string()));
        self
    }

    /// Apply values in order through `set_value`, then bind inputs
    pub fn build(self, registry: &Registry) -> Descriptor {
        let mut d = registry
            .descriptor(&self.transform)
            .expect("transform is registered");
        for (key, value) in self.values {
            d.set_value(&key, value).expect("valid parameter value");
        }
        for (label, source) in self.bindings {
            d.bind_input(&label, source).expect("known input label");
        }
        d
    }
}

/// Inclusive inline x crossline grid, inline-major
pub fn position_grid(
    inlines: RangeInclusive<i32>,
    crosslines: RangeInclusive<i32>,
) -> Vec<PositionKey> {
    inlines
        .flat_map(|il| crosslines.clone().map(move |xl| PositionKey::new(il, xl)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_builder() {
        let registry = Registry::with_builtins();
        let d = DescriptorBuilder::new("Scale")
            .param("factor", 2.0)
            .input("Input", "amp")
            .build(&registry);

        assert_eq!(d.get::<f64>("factor").unwrap(), 2.0);
        assert!(d.is_valid());
    }
}
