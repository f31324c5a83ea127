#![cfg(unix)]

use preview_codegen::Language;
use preview_env::{MarkerStore, RunningInstanceMarker, StateLayout};
use preview_session::{
    DevCommand, PreviewError, PreviewErrorKind, PreviewSession, SessionError, SessionState,
    Settings, Signal,
};
use preview_test_utils::{ReactProject, ORIGINAL_ENTRY};
use pretty_assertions::assert_eq;
use std::fs;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

const CONFIG: &str = "src/components/preview.yaml";

fn settings(project: &ReactProject, script: &str) -> Settings {
    Settings::new(project.root()).with_command(DevCommand::new("sh", ["-c", script]))
}

fn session(project: &ReactProject, script: &str) -> PreviewSession {
    PreviewSession::new(settings(project, script), &project.path(CONFIG)).unwrap()
}

/// Markers and backups left in the state directory
fn leftovers(project: &ReactProject) -> Vec<String> {
    match fs::read_dir(project.state_dir().join("temp")) {
        Ok(dir) => dir
            .map(|item| item.unwrap().file_name().to_string_lossy().into_owned())
            .collect(),
        Err(_) => Vec::new(),
    }
}

#[tokio::test]
async fn child_exit_code_is_reported_after_restoring() {
    let project = ReactProject::new().with_card().with_entry("index.jsx");
    // Exits 3 only if the generated entry was in place while it ran
    let session = session(&project, "grep -q \"import Card from './components/Card'\" src/index.jsx && exit 3; exit 4");
    assert_eq!(session.entry_file(), project.path("src/index.jsx"));
    let states = session.subscribe();

    let err = session.run_until(std::future::pending).await.unwrap_err();
    assert!(matches!(err, SessionError::ChildExit { code: Some(3) }));
    assert_eq!(PreviewError::from(err).exit_code(), 3);

    assert_eq!(project.read("src/index.jsx"), ORIGINAL_ENTRY);
    assert_eq!(*states.borrow(), SessionState::Idle);
    assert!(leftovers(&project).is_empty());
}

#[tokio::test]
async fn generated_entry_is_removed_when_there_was_none() {
    let project = ReactProject::new().with_card();
    let session = session(&project, "test -f src/index.jsx");

    session.run_until(std::future::pending).await.unwrap();
    assert!(!project.exists("src/index.jsx"));
    assert!(leftovers(&project).is_empty());
}

#[tokio::test]
async fn typescript_projects_replace_index_tsx() {
    let project = ReactProject::typescript().with_card().with_entry("index.tsx");
    let session = session(&project, "grep -q 'DO NOT ATTEMPT TO EDIT' src/index.tsx");
    assert_eq!(session.language(), Language::Ts);

    session.run_until(std::future::pending).await.unwrap();
    assert_eq!(project.read("src/index.tsx"), ORIGINAL_ENTRY);
}

#[tokio::test]
async fn second_session_is_refused_and_touches_nothing() {
    let project = ReactProject::new().with_card().with_entry("index.jsx");
    let store = MarkerStore::new(StateLayout::new(project.state_dir()));
    let held = store
        .acquire(&RunningInstanceMarker::new(
            &project.path("src/index.jsx"),
            project.root(),
            Language::Js,
        ))
        .unwrap();

    let session = session(&project, "exit 0");
    let states = session.subscribe();
    let err = session.run_until(std::future::pending).await.unwrap_err();

    assert!(err.is_conflict());
    assert_eq!(PreviewError::from(err).kind(), PreviewErrorKind::Conflict);
    assert_eq!(*states.borrow(), SessionState::Aborted);
    assert_eq!(project.read("src/index.jsx"), ORIGINAL_ENTRY);
    assert!(held.is_file());
    assert_eq!(leftovers(&project).len(), 1);
}

#[tokio::test]
async fn invalid_configuration_touches_nothing() {
    let project = ReactProject::new()
        .with_card()
        .with_entry("index.jsx")
        .with_config(CONFIG, "source: Card.tsx\nprops:\n  x: {kind: date, value: 1}\n");

    let err = session(&project, "exit 0")
        .run_until(std::future::pending)
        .await
        .unwrap_err();
    assert_eq!(PreviewError::from(err).kind(), PreviewErrorKind::Config);
    assert_eq!(project.read("src/index.jsx"), ORIGINAL_ENTRY);
    assert!(leftovers(&project).is_empty());
}

#[tokio::test]
async fn shutdown_signal_restores_and_reports() {
    let project = ReactProject::new().with_card().with_entry("index.jsx");
    let session = session(&project, "sleep 30");

    let err = session
        .run_until(|| async { Signal::Interrupt })
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::Interrupted(Signal::Interrupt)));
    assert_eq!(PreviewError::from(err).exit_code(), 130);
    assert_eq!(project.read("src/index.jsx"), ORIGINAL_ENTRY);
    assert!(leftovers(&project).is_empty());
}

#[tokio::test]
async fn shutdown_is_armed_before_the_entry_is_replaced() {
    let project = ReactProject::new().with_card().with_entry("index.jsx");
    let session = session(&project, "sleep 30");
    let entry = project.path("src/index.jsx");
    let armed_on_original = Arc::new(AtomicBool::new(false));

    let seen = Arc::clone(&armed_on_original);
    let err = session
        .run_until(move || {
            let original = fs::read_to_string(&entry).unwrap() == ORIGINAL_ENTRY;
            seen.store(original, Ordering::SeqCst);
            async { Signal::Terminate }
        })
        .await
        .unwrap_err();

    assert!(armed_on_original.load(Ordering::SeqCst));
    assert_eq!(PreviewError::from(err).exit_code(), 143);
    assert_eq!(project.read("src/index.jsx"), ORIGINAL_ENTRY);
    assert!(leftovers(&project).is_empty());
}

#[tokio::test]
async fn spawn_failure_restores() {
    let project = ReactProject::new().with_card().with_entry("index.jsx");
    let settings = Settings::new(project.root())
        .with_command(DevCommand::new("react-preview-no-such-dev-server", Vec::<String>::new()));
    let session = PreviewSession::new(settings, &project.path(CONFIG)).unwrap();

    let err = session.run_until(std::future::pending).await.unwrap_err();
    assert!(matches!(err, SessionError::Spawn { .. }));
    assert_eq!(project.read("src/index.jsx"), ORIGINAL_ENTRY);
    assert!(leftovers(&project).is_empty());
}

#[tokio::test]
async fn configuration_edits_regenerate_the_entry() {
    let project = ReactProject::new().with_card().with_entry("index.jsx");
    let session = session(&project, "sleep 30");
    let config = project.path(CONFIG);
    let entry = project.path("src/index.jsx");
    let regenerated = Arc::new(AtomicBool::new(false));

    let seen = Arc::clone(&regenerated);
    let err = session
        .run_until(move || async move {
            assert!(fs::read_to_string(&entry).unwrap().contains("label=\"Hi\""));
            tokio::time::sleep(Duration::from_millis(200)).await;
            fs::write(
                &config,
                "source: Card.tsx\nprops:\n  label: {kind: string, value: Bye}\n",
            )
            .unwrap();

            for _ in 0..200 {
                if fs::read_to_string(&entry).unwrap().contains("label=\"Bye\"") {
                    seen.store(true, Ordering::SeqCst);
                    break;
                }
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
            Signal::Terminate
        })
        .await
        .unwrap_err();

    assert!(regenerated.load(Ordering::SeqCst));
    assert_eq!(PreviewError::from(err).exit_code(), 143);
    assert_eq!(project.read("src/index.jsx"), ORIGINAL_ENTRY);
}

#[test]
fn missing_entry_directory() {
    let project = ReactProject::new().with_card();
    let settings = settings(&project, "exit 0").with_entry_dir("does/not/exist");
    let err = PreviewSession::new(settings, &project.path(CONFIG)).err().unwrap();
    assert_eq!(PreviewError::from(err).kind(), PreviewErrorKind::NotFound);
}
