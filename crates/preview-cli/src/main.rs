//! `react-preview` command line
//!
//! Exit status follows the dev server: its own exit code when it fails,
//! 130/143 after SIGINT/SIGTERM, 1 for any other error.

mod cli;
mod commands;
mod logging;

use preview_session::{PreviewError, PreviewErrorKind};
use std::process::ExitCode;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let matches = cli::command().get_matches();
    let (verbose, quiet) = matches
        .subcommand()
        .map_or((0, false), |(_, args)| (args.get_count("verbose"), args.get_flag("quiet")));
    logging::init(verbose, quiet);

    match commands::dispatch(&matches).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let preview = e.downcast_ref::<PreviewError>();
            if preview.map(PreviewError::kind) != Some(PreviewErrorKind::Interrupted) {
                eprintln!("Error: {e:#}");
            }
            let code = preview.map_or(1, PreviewError::exit_code);
            ExitCode::from(u8::try_from(code).unwrap_or(1))
        }
    }
}
