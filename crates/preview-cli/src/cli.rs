//! Argument definitions

use clap::{value_parser, Arg, ArgAction, Command};
use std::path::PathBuf;

pub(crate) fn command() -> Command {
    Command::new("react-preview")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Preview a single React component by temporarily replacing the app entry file")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("state-dir")
                .long("state-dir")
                .global(true)
                .value_name("DIR")
                .value_parser(value_parser!(PathBuf))
                .help("State directory (default: ./preview, or $REACT_PREVIEW_HOME)"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .global(true)
                .action(ArgAction::Count)
                .help("More log output; repeat for more"),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .global(true)
                .action(ArgAction::SetTrue)
                .conflicts_with("verbose")
                .help("Only log errors"),
        )
        .subcommand(
            Command::new("run")
                .about("Preview a component until the dev server exits")
                .arg(
                    Arg::new("target")
                        .required(true)
                        .help("preview.yaml, a directory holding one, a component file, or a registered id"),
                )
                .arg(
                    Arg::new("entry-dir")
                        .value_name("ENTRY_DIRECTORY")
                        .value_parser(value_parser!(PathBuf))
                        .help("Directory holding the app entry file (default: ./src)"),
                )
                .arg(
                    Arg::new("command")
                        .long("command")
                        .value_name("CMD")
                        .help("Dev server command line (default: yarn/npm run start)"),
                ),
        )
        .subcommand(
            Command::new("init")
                .about("Create the state directory")
                .arg(
                    Arg::new("directory")
                        .value_parser(value_parser!(PathBuf))
                        .help("Where to create it (default: the state directory)"),
                ),
        )
        .subcommand(
            Command::new("register")
                .about("Register a preview configuration under its id")
                .arg(
                    Arg::new("config")
                        .required(true)
                        .value_name("CONFIG_PATH")
                        .value_parser(value_parser!(PathBuf)),
                ),
        )
        .subcommand(
            Command::new("unregister")
                .about("Remove a registration")
                .arg(Arg::new("id").required(true)),
        )
        .subcommand(Command::new("list").about("List registered previews"))
        .subcommand(
            Command::new("recover")
                .about("Restore entry files left replaced by a session that did not exit cleanly"),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn definition_is_consistent() {
        command().debug_assert();
    }

    #[test]
    fn run_arguments() {
        let matches = command()
            .try_get_matches_from(["react-preview", "-vv", "run", "card", "app/src", "--command", "pnpm dev"])
            .unwrap();
        assert_eq!(matches.get_count("verbose"), 2);
        let (name, run) = matches.subcommand().unwrap();
        assert_eq!(name, "run");
        assert_eq!(run.get_one::<String>("target").unwrap(), "card");
        assert_eq!(run.get_one::<PathBuf>("entry-dir").unwrap(), &PathBuf::from("app/src"));
        assert_eq!(run.get_one::<String>("command").unwrap(), "pnpm dev");
    }

    #[test]
    fn global_flags_after_subcommand() {
        let matches = command()
            .try_get_matches_from(["react-preview", "list", "--state-dir", "/tmp/state", "-q"])
            .unwrap();
        let (_, list) = matches.subcommand().unwrap();
        assert_eq!(list.get_one::<PathBuf>("state-dir").unwrap(), &PathBuf::from("/tmp/state"));
        assert!(list.get_flag("quiet"));
    }

    #[test]
    fn quiet_and_verbose_conflict() {
        assert!(command()
            .try_get_matches_from(["react-preview", "-q", "-v", "list"])
            .is_err());
    }

    #[test]
    fn run_requires_target() {
        assert!(command().try_get_matches_from(["react-preview", "run"]).is_err());
    }
}
