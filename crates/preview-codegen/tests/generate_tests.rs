use preview_codegen::{generate, resolve, render, PreviewConfig, ResolveError};
use preview_test_utils::ReactProject;
use preview_value::{ConfigError, Value};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn card_project(config: &str) -> ReactProject {
    ReactProject::new()
        .with_component("src/Card.tsx", "Card")
        .with_config("src/preview.yaml", config)
}

#[test]
fn card_with_string_label() {
    let project = card_project("source: Card.tsx\nprops:\n  label: {kind: string, value: Hi}\n");
    let output = generate(&project.path("src/preview.yaml"), &project.path("src/index.jsx")).unwrap();

    assert!(output.starts_with("// This content was auto-generated!"));
    assert!(output.contains("import Card from './Card';"));
    assert!(output.contains(r#"<Card label="Hi" />"#));
    assert!(output.contains(r#"<div style={{"height":"auto","width":"auto"}}>"#));
}

#[test]
fn generation_is_deterministic() {
    let project = card_project(
        "source: Card.tsx\nimportStyle: named\nstyle: {color: red}\nprops:\n  \
         onClick: {kind: function, spec: {parameters: [e], returnExpressions: [e]}}\n  \
         items: [1, two, {kind: null}]\n",
    );
    let config_path = project.path("src/preview.yaml");
    let entry = project.path("src/index.tsx");

    let first = generate(&config_path, &entry).unwrap();
    let second = generate(&config_path, &entry).unwrap();
    assert_eq!(first, second);
    assert!(first.contains("import {Card} from './Card';"));
    assert!(first.contains(r#"onClick={(e) => { return e; }} items={[1,"two",null]}"#));
}

#[test]
fn module_path_follows_entry_location() {
    let project = ReactProject::new().with_card();
    let config_path = project.path("src/components/preview.yaml");

    let from_src = generate(&config_path, &project.path("src/index.jsx")).unwrap();
    assert!(from_src.contains("from './components/Card'"));

    let from_app = generate(&config_path, &project.path("app/main.jsx")).unwrap();
    assert!(from_app.contains("from '../src/components/Card'"));
}

#[test]
fn missing_component_is_not_found() {
    let project = ReactProject::new().with_config("src/preview.yaml", "source: Missing.tsx\n");
    let err = generate(&project.path("src/preview.yaml"), &project.path("src/index.jsx")).unwrap_err();
    assert!(matches!(err, ResolveError::NotFound { what: "component file", .. }));
}

#[test]
fn numeric_file_name_needs_override() {
    let project = ReactProject::new()
        .with_component("src/123.tsx", "Numbered")
        .with_config("src/preview.yaml", "source: 123.tsx\n");
    let config_path = project.path("src/preview.yaml");
    let entry = project.path("src/index.jsx");

    let err = generate(&config_path, &entry).unwrap_err();
    assert!(matches!(err, ResolveError::Config(ConfigError::InvalidIdentifier(_))));

    project.write("src/preview.yaml", "source: 123.tsx\ncomponentName: Numbered\n");
    let output = generate(&config_path, &entry).unwrap();
    assert!(output.contains("import Numbered from './123';"));
}

#[test]
fn unknown_kind_fails_resolution() {
    let project = card_project("source: Card.tsx\nprops:\n  when: {kind: date, value: today}\n");
    let err = generate(&project.path("src/preview.yaml"), &project.path("src/index.jsx")).unwrap_err();
    assert!(matches!(err, ResolveError::Config(ConfigError::UnknownKind { .. })));
}

#[test]
fn descriptor_exposes_interpreted_props() {
    let project = card_project("source: Card.tsx\nlegacyNullProps: true\nprops: {empty: ~}\n");
    let config_path = project.path("src/preview.yaml");
    let config = PreviewConfig::load(&config_path).unwrap();
    let descriptor = resolve(&config, &config_path, &project.path("src/index.jsx")).unwrap();
    assert_eq!(descriptor.props["empty"], Value::empty_object());
    assert!(render(&descriptor).contains("empty={{}}"));
}

proptest! {
    #[test]
    fn prop_render_is_stable_for_any_label(label in any::<String>()) {
        let project = card_project("source: Card.tsx\n");
        let config_path = project.path("src/preview.yaml");
        let mut config = PreviewConfig::load(&config_path).unwrap();
        let mut props = serde_yaml::Mapping::new();
        props.insert("label".into(), label.clone().into());
        config.props = Some(serde_yaml::Value::Mapping(props));

        let entry = project.path("src/index.jsx");
        let first = render(&resolve(&config, &config_path, &entry).unwrap());
        let second = render(&resolve(&config, &config_path, &entry).unwrap());
        prop_assert_eq!(&first, &second);
        let rendered_label = preview_codegen::render::render_prop("label", &Value::String(label));
        prop_assert!(first.contains(&rendered_label));
    }
}
