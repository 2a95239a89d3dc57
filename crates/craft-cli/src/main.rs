//! craft binary entrypoint.
//!
//! Starts the interactive shell, or runs a single command with `exec`.

use std::io;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::debug;

use craft_cli::cli::{Cli, Commands};
use craft_cli::config::ShellConfig;
use craft_cli::{CliError, Shell, fleet, logging, output};
use craft_shell::history::HistoryFile;
use craft_shell::repl::{self, EditorSource, cluster_prompt};
use craft_shell::{Dispatch, Outcome, Session};

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(&cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<ExitCode, CliError> {
    let mut config = ShellConfig::load(cli.config.as_deref())?;
    cli.apply(&mut config);
    config.validate()?;

    output::set_color(config.color && std::env::var_os("NO_COLOR").is_none());

    let session = Session::new(config.default_cluster.as_str()).with_toggles(cli.verbose, cli.debug);
    let log = logging::init(session.effective_level())?;
    let fleet = fleet::connect(&config.fleet)?;

    let shell = Shell::new(&config, session, fleet, io::stdout())?;
    // The subscriber already starts at the right level; only the fleet needs telling.
    shell.sync_log_level();
    let mut shell = shell.with_log_sink(Arc::new(log));

    match cli.command() {
        Commands::Interactive => {
            let history = config.history_path().map(HistoryFile::new);
            debug!(history = ?history.as_ref().map(HistoryFile::path), "starting shell");
            let mut source = EditorSource::new(shell.registry(), history)?;
            repl::run(&mut source, cluster_prompt, &mut shell, &mut io::stderr())?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Exec { line } => match shell.dispatch(&line.join(" ")) {
            Outcome::Failed(e) => {
                eprintln!("Error - {e}.");
                Ok(ExitCode::FAILURE)
            }
            Outcome::Continue | Outcome::Terminate => Ok(ExitCode::SUCCESS),
        },
    }
}
