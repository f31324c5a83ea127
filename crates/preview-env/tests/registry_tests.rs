use preview_env::{EnvError, Registry, StateLayout};
use preview_test_utils::ReactProject;
use preview_value::ConfigError;
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn registry(project: &ReactProject) -> Registry {
    Registry::new(StateLayout::new(project.state_dir()))
}

#[test]
fn register_uses_file_stem_by_default() {
    let project = ReactProject::new()
        .with_component("src/Card.tsx", "Card")
        .with_config("src/card.yaml", "source: Card.tsx\n");
    let registry = registry(&project);

    let entry = registry.register(&project.path("src/card.yaml")).unwrap();
    assert_eq!(entry.id, "card");
    assert!(entry.path.is_absolute());
    assert_eq!(registry.lookup("card").unwrap(), Some(entry.path.clone()));
    assert_eq!(registry.entries().unwrap(), vec![entry]);
}

#[test]
fn explicit_id_and_last_registration_wins() {
    let project = ReactProject::new()
        .with_config("a/preview.yaml", "source: A.tsx\nid: shared\n")
        .with_config("b/preview.yaml", "source: B.tsx\nid: shared\n");
    let registry = registry(&project);

    registry.register(&project.path("a/preview.yaml")).unwrap();
    let second = registry.register(&project.path("b/preview.yaml")).unwrap();

    assert_eq!(registry.lookup("shared").unwrap(), Some(second.path));
    assert_eq!(registry.entries().unwrap().len(), 1);
}

#[test]
fn unusable_ids_are_config_errors() {
    let project = ReactProject::new().with_config("preview.yaml", "source: A.tsx\nid: ../escape\n");
    let err = registry(&project).register(&project.path("preview.yaml")).unwrap_err();
    assert!(matches!(err, EnvError::Config(ConfigError::InvalidField { field: "id", .. })));
}

#[test]
fn register_missing_config_is_not_found() {
    let project = ReactProject::new();
    let err = registry(&project).register(&project.path("nope.yaml")).unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn unregister_removes_and_reports_missing() {
    let project = ReactProject::new().with_config("x.yaml", "source: X.tsx\n");
    let registry = registry(&project);
    registry.register(&project.path("x.yaml")).unwrap();

    registry.unregister("x").unwrap();
    assert_eq!(registry.lookup("x").unwrap(), None);
    assert!(matches!(registry.unregister("x"), Err(EnvError::NotFound { .. })));
}

proptest! {
    #[test]
    fn prop_registered_ids_resolve(id in "[A-Za-z0-9_-][A-Za-z0-9_.-]{0,20}") {
        prop_assume!(id != "." && id != "..");
        let project = ReactProject::new().with_config("preview.yaml", &format!("source: A.tsx\nid: '{id}'\n"));
        let registry = registry(&project);
        let entry = registry.register(&project.path("preview.yaml")).unwrap();
        prop_assert_eq!(&entry.id, &id);
        prop_assert_eq!(registry.lookup(&id).unwrap(), Some(entry.path));
    }
}
