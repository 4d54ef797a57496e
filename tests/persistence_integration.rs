//! Editor and persisted-state round trips across crate boundaries

mod common;

use common::builders::DescriptorBuilder;
use tempfile::TempDir;
use tracecalc::{EditorState, ParamValue, PersistedTransform, Registry, TransformError};

#[test]
fn test_editor_then_persist_then_reload() {
    let registry = Registry::with_builtins();
    let d = DescriptorBuilder::new("Expression")
        .param("expression", "clip(value * 2.0, -1.0, 1.0)")
        .input("Input", "amplitude")
        .build(&registry);

    let mut editor = EditorState::load_from_descriptor(&d);
    editor.set("clamp", true).unwrap();
    editor.set("clamp_min", -0.5).unwrap();

    let mut edited = d.clone();
    editor.store_to_descriptor(&mut edited).unwrap();
    assert!(edited.is_param_enabled("clamp_min").unwrap());

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("expression.json");
    std::fs::write(&path, PersistedTransform::from_descriptor(&edited).to_json().unwrap())
        .unwrap();

    let content = std::fs::read_to_string(&path).unwrap();
    let loaded = PersistedTransform::from_json(&content)
        .unwrap()
        .load(&registry)
        .unwrap();
    assert!(loaded.warnings.is_empty());

    let restored = loaded.descriptor;
    for param in edited.params() {
        assert_eq!(
            restored.value(param.key()).unwrap(),
            param.value(),
            "parameter {}",
            param.key()
        );
        assert_eq!(
            restored.is_param_enabled(param.key()).unwrap(),
            param.is_enabled()
        );
    }
    assert!(registry.create(&restored).unwrap().is_ok());
}

#[test]
fn test_editor_roundtrip_for_every_builtin() {
    let registry = Registry::with_builtins();
    for name in registry.names() {
        let d = registry.descriptor(&name).unwrap();
        let editor = EditorState::load_from_descriptor(&d);
        assert_eq!(editor.fields().len(), d.params().len());

        let mut target = registry.descriptor(&name).unwrap();
        editor.store_to_descriptor(&mut target).unwrap();
        for param in d.params().iter().filter(|p| p.is_enabled()) {
            assert_eq!(target.value(param.key()).unwrap(), param.value());
        }
    }
}

#[test]
fn test_bad_literal_type_is_error() {
    let registry = Registry::with_builtins();
    let toml = r#"
name = "Scale"

[params]
factor = "large"
"#;
    let err = PersistedTransform::from_toml(toml)
        .unwrap()
        .load(&registry)
        .unwrap_err();
    assert!(err.to_string().contains("factor"));
}

#[test]
fn test_malformed_json_is_serialization_error() {
    assert!(matches!(
        PersistedTransform::from_json("{ \"name\": "),
        Err(TransformError::Serialization(_))
    ));
}

#[test]
fn test_enum_persists_as_index() {
    let registry = Registry::with_builtins();
    let d = DescriptorBuilder::new("Combine")
        .param("operation", "multiply")
        .input("First", "a")
        .build(&registry);
    let persisted = PersistedTransform::from_descriptor(&d);
    assert_eq!(
        ParamValue::from(persisted.params["operation"].clone()),
        ParamValue::Int(2)
    );
}
