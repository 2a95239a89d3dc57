//! Command-line argument parsing with clap.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::ShellConfig;

/// craft - interactive shell for game-server fleets.
#[derive(Parser, Debug, Clone)]
#[command(name = "craft")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (default: <config dir>/craft/config.toml).
    #[arg(short, long, env = "CRAFT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Fleet API endpoint.
    #[arg(short, long, env = "CRAFT_ENDPOINT")]
    pub endpoint: Option<String>,

    /// Use an in-memory fleet instead of the API; overrides any endpoint.
    #[arg(long)]
    pub offline: bool,

    /// Cluster to start in.
    #[arg(long, env = "CRAFT_CLUSTER")]
    pub cluster: Option<String>,

    /// History file.
    #[arg(long)]
    pub history: Option<PathBuf>,

    /// Start with verbose logging on.
    #[arg(short, long)]
    pub verbose: bool,

    /// Start with debug logging on.
    #[arg(short, long)]
    pub debug: bool,

    /// Disable colored output.
    #[arg(long)]
    pub no_color: bool,

    /// What to do; defaults to the interactive shell.
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Read commands from the terminal until `exit`.
    Interactive,

    /// Run a single shell command and exit.
    ///
    /// Example: `craft exec server list prod`
    Exec {
        /// The command line, word by word.
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        line: Vec<String>,
    },
}

impl Cli {
    /// Overlay command-line settings on `config`.
    pub fn apply(&self, config: &mut ShellConfig) {
        if self.offline {
            config.fleet.endpoint = None;
        } else if let Some(endpoint) = &self.endpoint {
            config.fleet.endpoint = Some(endpoint.clone());
        }
        if let Some(cluster) = &self.cluster {
            config.default_cluster.clone_from(cluster);
        }
        if let Some(history) = &self.history {
            config.history_file = Some(history.clone());
        }
        if self.no_color {
            config.color = false;
        }
    }

    /// The command to run.
    pub fn command(&self) -> Commands {
        self.command.clone().unwrap_or(Commands::Interactive)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("craft").chain(args.iter().copied()))
            .expect("valid arguments")
    }

    #[test]
    fn no_subcommand_is_interactive() {
        assert_eq!(parse(&[]).command(), Commands::Interactive);
    }

    #[test]
    fn exec_keeps_flags_in_the_line() {
        let cli = parse(&["exec", "server", "start", "--useFullURI", "steve", "w", "s3://x"]);
        assert_eq!(
            cli.command(),
            Commands::Exec {
                line: ["server", "start", "--useFullURI", "steve", "w", "s3://x"]
                    .map(String::from)
                    .to_vec()
            }
        );
    }

    #[test]
    fn exec_needs_a_line() {
        assert!(Cli::try_parse_from(["craft", "exec"]).is_err());
    }

    #[test]
    fn offline_clears_the_endpoint() {
        let mut config = ShellConfig::default();
        config.fleet.endpoint = Some("http://fleet:8080".into());
        parse(&["--offline"]).apply(&mut config);
        assert_eq!(config.fleet.endpoint, None);
    }

    #[test]
    fn overrides_apply() {
        let mut config = ShellConfig::default();
        parse(&["-e", "https://fleet", "--cluster", "prod", "--no-color"]).apply(&mut config);
        assert_eq!(config.fleet.endpoint.as_deref(), Some("https://fleet"));
        assert_eq!(config.default_cluster, "prod");
        assert!(!config.color);
    }

    #[test]
    fn offline_wins_over_endpoint() {
        let mut config = ShellConfig::default();
        parse(&["--offline", "-e", "http://x"]).apply(&mut config);
        assert_eq!(config.fleet.endpoint, None);
    }
}
