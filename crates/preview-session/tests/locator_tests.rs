use preview_env::{Registry, StateLayout};
use preview_session::{LocateError, Locator};
use preview_test_utils::ReactProject;
use pretty_assertions::assert_eq;

fn registry(project: &ReactProject) -> Registry {
    Registry::new(StateLayout::new(project.state_dir()))
}

fn locate(project: &ReactProject, target: &str, answer: bool) -> Result<std::path::PathBuf, LocateError> {
    let registry = registry(project);
    let mut confirm = |_: &str| answer;
    Locator::new(project.root(), &registry, &mut confirm).locate(target)
}

#[test]
fn directory_with_configuration() {
    let project = ReactProject::new().with_card();
    let config = locate(&project, "src/components", false).unwrap();
    assert_eq!(config, project.path("src/components/preview.yaml"));
}

#[test]
fn directory_without_configuration_is_not_scaffolded() {
    let project = ReactProject::new().with_component("src/widgets/Widget.tsx", "Widget");
    let err = locate(&project, "src/widgets", true).unwrap_err();
    assert!(matches!(err, LocateError::MissingConfig { .. }));
    assert!(!project.exists("src/widgets/preview.yaml"));
}

#[test]
fn configuration_file_is_used_directly() {
    let project = ReactProject::new()
        .with_component("src/Card.tsx", "Card")
        .with_config("src/card.yml", "source: Card.tsx\n");
    assert_eq!(locate(&project, "src/card.yml", false).unwrap(), project.path("src/card.yml"));
}

#[test]
fn component_file_uses_sibling_configuration() {
    let project = ReactProject::new().with_card();
    let config = locate(&project, "src/components/Card.tsx", false).unwrap();
    assert_eq!(config, project.path("src/components/preview.yaml"));
}

#[test]
fn component_without_configuration_is_scaffolded_on_request() {
    let project = ReactProject::new().with_component("src/Button.jsx", "Button");
    let mut asked = Vec::new();
    let result = {
        let registry = registry(&project);
        let mut confirm = |question: &str| {
            asked.push(question.to_string());
            true
        };
        Locator::new(project.root(), &registry, &mut confirm).locate("src/Button.jsx")
    };

    assert_eq!(result.unwrap(), project.path("src/preview.yaml"));
    assert_eq!(project.read("src/preview.yaml"), "source: Button.jsx\nprops: {}\n");
    assert_eq!(asked.len(), 1);
    assert!(asked[0].contains("preview.yaml"));
}

#[test]
fn declined_scaffold_aborts_without_writing() {
    let project = ReactProject::new().with_component("src/Button.jsx", "Button");
    let err = locate(&project, "src/Button.jsx", false).unwrap_err();
    assert!(matches!(err, LocateError::Aborted { .. }));
    assert!(!project.exists("src/preview.yaml"));
}

#[test]
fn other_files_without_configuration() {
    let project = ReactProject::new();
    project.write("src/notes.txt", "hello");
    let err = locate(&project, "src/notes.txt", true).unwrap_err();
    assert!(matches!(err, LocateError::MissingConfig { .. }));
}

#[test]
fn registered_id_is_looked_up() {
    let project = ReactProject::new()
        .with_component("src/Card.tsx", "Card")
        .with_config("src/card.yaml", "source: Card.tsx\n");
    let entry = registry(&project).register(&project.path("src/card.yaml")).unwrap();
    assert_eq!(entry.id, "card");

    assert_eq!(locate(&project, "card", false).unwrap(), entry.path);
}

#[test]
fn unknown_target() {
    let project = ReactProject::new();
    let err = locate(&project, "nothing-here", true).unwrap_err();
    assert!(matches!(err, LocateError::NotFound { target } if target == "nothing-here"));
}
