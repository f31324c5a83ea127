//! Subcommand handlers

use anyhow::{bail, Context};
use clap::ArgMatches;
use preview_env::{recover, Registry, RecoveryAction, StateLayout};
use preview_session::{DevCommand, Locator, PreviewError, PreviewSession, Settings, StdinConfirm};
use preview_value::ConfigError;
use std::path::PathBuf;
use tracing::debug;

pub(crate) async fn dispatch(matches: &ArgMatches) -> anyhow::Result<()> {
    let Some((name, args)) = matches.subcommand() else {
        bail!("no command given");
    };
    let working_dir = std::env::current_dir().context("cannot determine the working directory")?;
    let mut settings = Settings::new(working_dir).with_env();
    if let Some(dir) = args.get_one::<PathBuf>("state-dir") {
        settings = settings.with_state_dir(dir);
    }
    debug!(command = name, state_dir = %settings.state_dir().display(), "dispatching");

    match name {
        "run" => run(settings, args).await?,
        "init" => init(&settings, args)?,
        "register" => register(&settings, args)?,
        "unregister" => unregister(&settings, args)?,
        "list" => list(&settings)?,
        "recover" => recover_sessions(&settings)?,
        other => bail!("unknown command '{other}'"),
    }
    Ok(())
}

async fn run(mut settings: Settings, args: &ArgMatches) -> Result<(), PreviewError> {
    if let Some(dir) = args.get_one::<PathBuf>("entry-dir") {
        settings = settings.with_entry_dir(dir);
    }
    if let Some(line) = args.get_one::<String>("command") {
        let command = DevCommand::parse(line)
            .ok_or_else(|| ConfigError::invalid_field("command", "must not be empty"))?;
        settings = settings.with_command(command);
    }
    let target = args
        .get_one::<String>("target")
        .map(String::as_str)
        .unwrap_or_default();

    let registry = Registry::new(settings.layout());
    let config = Locator::new(settings.working_dir(), &registry, &mut StdinConfirm).locate(target)?;
    PreviewSession::new(settings, &config)?.run().await?;
    Ok(())
}

fn init(settings: &Settings, args: &ArgMatches) -> anyhow::Result<()> {
    let layout = args
        .get_one::<PathBuf>("directory")
        .map_or_else(|| settings.layout(), |dir| StateLayout::new(settings.working_dir().join(dir)));
    layout.init().map_err(PreviewError::from)?;
    println!("Initialized preview environment at {}", layout.root().display());
    Ok(())
}

fn register(settings: &Settings, args: &ArgMatches) -> anyhow::Result<()> {
    let Some(config) = args.get_one::<PathBuf>("config") else {
        bail!("missing configuration path");
    };
    let entry = Registry::new(settings.layout())
        .register(&settings.working_dir().join(config))
        .map_err(PreviewError::from)?;
    println!("Registered '{}' -> {}", entry.id, entry.path.display());
    Ok(())
}

fn unregister(settings: &Settings, args: &ArgMatches) -> anyhow::Result<()> {
    let Some(id) = args.get_one::<String>("id") else {
        bail!("missing id");
    };
    Registry::new(settings.layout())
        .unregister(id)
        .map_err(PreviewError::from)?;
    println!("Unregistered '{id}'");
    Ok(())
}

fn list(settings: &Settings) -> anyhow::Result<()> {
    let entries = Registry::new(settings.layout())
        .entries()
        .map_err(PreviewError::from)?;
    if entries.is_empty() {
        eprintln!("No registered previews");
    }
    for entry in entries {
        println!("{}\t{}", entry.id, entry.path.display());
    }
    Ok(())
}

fn recover_sessions(settings: &Settings) -> anyhow::Result<()> {
    let outcomes = recover(&settings.layout()).map_err(PreviewError::from)?;
    if outcomes.is_empty() {
        println!("Nothing to recover");
        return Ok(());
    }

    let mut failed = 0;
    for outcome in &outcomes {
        let entry = outcome.entry_file.display();
        match &outcome.action {
            RecoveryAction::Restored(_) => println!("Restored {entry}"),
            RecoveryAction::RemovedGenerated => println!("Removed generated {entry}"),
            RecoveryAction::Untouched => println!("Cleared stale session for {entry}"),
            RecoveryAction::Failed(reason) => {
                failed += 1;
                eprintln!("Could not restore {entry}: {reason}");
            }
        }
    }
    if failed > 0 {
        bail!(
            "{failed} session(s) could not be recovered; markers kept in {}",
            settings.layout().temp_dir().display()
        );
    }
    Ok(())
}
