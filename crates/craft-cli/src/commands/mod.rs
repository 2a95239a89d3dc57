//! Shell command implementations.
//!
//! A parsed line is first turned into a typed [`Action`]; each group of
//! commands then has an executor:
//! - [`session`] - help, toggles, `use` and the exit report
//! - [`cluster`] - cluster listing and status
//! - [`env`] - container environment
//! - [`proxy`] - proxies and DNS
//! - [`server`] - game-server lifecycle
//! - [`archive`] - archived snapshots

pub mod archive;
pub mod cluster;
pub mod env;
pub mod proxy;
pub mod server;
pub mod session;

pub use archive::{ArchiveAction, ArchiveCommand};
pub use cluster::{ClusterAction, ClusterCommand};
pub use env::{EnvAction, EnvCommand};
pub use proxy::{ProxyAction, ProxyCommand};
pub use server::{ServerAction, ServerCommand};

use craft_shell::{ParseError, ParsedCommand};

use crate::error::CliError;
use crate::fleet::{LaunchProxy, LaunchServer, RestartServer, StartServer};

/// What a parsed line asks the shell to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// `help [<command>...]`.
    Help {
        /// Command path to describe; empty for everything.
        path: Vec<String>,
    },
    /// `debug`.
    ToggleDebug,
    /// `verbose`.
    ToggleVerbose,
    /// `exit` / `quit`.
    Quit,
    /// `use <cluster>` / `cluster use <cluster>`.
    Use {
        /// The cluster as typed.
        cluster: String,
    },
    /// `cluster ...`.
    Cluster(ClusterAction),
    /// `env ...`.
    Env(EnvAction),
    /// `proxy ...` and `dns`.
    Proxy(ProxyAction),
    /// `server ...`.
    Server(ServerAction),
    /// `archive ...`.
    Archive(ArchiveAction),
}

impl Action {
    /// Translate `parsed` into an action. Omitted `<cluster>` arguments
    /// resolve to `current`.
    ///
    /// # Errors
    ///
    /// Returns [`CliError::Unhandled`] for a path with no handler.
    pub fn from_parsed(parsed: &ParsedCommand, current: &str) -> Result<Self, CliError> {
        let args = parsed.args();
        let req = |name: &str| required(parsed, name);
        let cluster = || args.str("cluster").unwrap_or(current).to_string();

        Ok(match parsed.full_path() {
            "help" => Self::Help {
                path: ["command", "subcommand"]
                    .into_iter()
                    .filter_map(|name| args.str(name))
                    .map(str::to_string)
                    .collect(),
            },
            "debug" => Self::ToggleDebug,
            "verbose" => Self::ToggleVerbose,
            "exit" | "quit" => Self::Quit,
            "use" | "cluster use" => Self::Use {
                cluster: req("cluster")?,
            },

            "cluster list" => Self::Cluster(ClusterAction::List),
            "cluster status" => Self::Cluster(ClusterAction::Status { cluster: cluster() }),

            "env list" => Self::Env(EnvAction::List {
                server: req("server-name")?,
                cluster: cluster(),
            }),

            "proxy list" => Self::Proxy(ProxyAction::List { cluster: cluster() }),
            "proxy launch" => Self::Proxy(ProxyAction::Launch(LaunchProxy {
                proxy_name: req("proxy-name")?,
                cluster: cluster(),
                task: req("ecs-task")?,
            })),
            "proxy attach" => Self::Proxy(ProxyAction::Attach {
                proxy: req("proxy-name")?,
                cluster: cluster(),
            }),
            "proxy dns" => Self::Proxy(ProxyAction::Dns {
                proxy: req("proxy-name")?,
                cluster: cluster(),
            }),
            "dns" => Self::Proxy(ProxyAction::Records),

            "server launch" => Self::Server(ServerAction::Launch(LaunchServer {
                user: req("user")?,
                server_name: req("server-name")?,
                cluster: cluster(),
                task: req("ecs-task")?,
            })),
            "server start" => Self::Server(ServerAction::Start(StartServer {
                user: req("user")?,
                server_name: req("server-name")?,
                snapshot: req("snapshot")?,
                use_full_uri: args.flag("useFullURI"),
                cluster: cluster(),
                task: req("ecs-task")?,
            })),
            "server restart" => Self::Server(ServerAction::Restart(RestartServer {
                server_name: req("server-name")?,
                proxy: req("proxy")?,
                snapshot: args.str("snapshot").map(str::to_string),
                cluster: cluster(),
                task: req("ecs-task")?,
            })),
            "server terminate" => Self::Server(ServerAction::Terminate {
                server: req("server-name")?,
                cluster: cluster(),
            }),
            "server list" => Self::Server(ServerAction::List { cluster: cluster() }),
            "server status" => Self::Server(ServerAction::Status { cluster: cluster() }),
            "server describe" => Self::Server(ServerAction::Describe {
                server: req("server")?,
                cluster: cluster(),
            }),
            "server proxy" => Self::Server(ServerAction::Proxy {
                server: req("server")?,
                proxy: req("proxy")?,
                cluster: cluster(),
            }),
            "server unproxy" => Self::Server(ServerAction::Unproxy {
                server: req("server")?,
                proxy: req("proxy")?,
                cluster: cluster(),
            }),

            "archive list" => Self::Archive(ArchiveAction::List {
                user: req("user")?,
                bucket: req("bucket")?,
            }),

            other => return Err(CliError::Unhandled(other.to_string())),
        })
    }
}

fn required(parsed: &ParsedCommand, name: &str) -> Result<String, CliError> {
    parsed
        .args()
        .str(name)
        .map(str::to_string)
        .ok_or_else(|| {
            CliError::Parse(ParseError::MissingArgument {
                command: parsed.full_path().to_string(),
                arg: name.to_string(),
            })
        })
}

#[cfg(test)]
mod tests {
    use craft_shell::Registry;
    use test_case::test_case;

    use super::*;
    use crate::config::ShellConfig;
    use crate::table::command_table;

    fn action(line: &str) -> Action {
        let registry =
            Registry::from_specs(command_table(&ShellConfig::default())).expect("valid table");
        let parsed = registry.parse(line).expect("parse").expect("command");
        Action::from_parsed(&parsed, "minecraft").expect("action")
    }

    #[test]
    fn every_leaf_has_a_handler() {
        let registry =
            Registry::from_specs(command_table(&ShellConfig::default())).expect("valid table");
        for handle in registry.commands() {
            if registry.children(&handle).next().is_some() {
                continue;
            }
            let mut line = handle.full_path().to_string();
            for arg in registry.args(&handle) {
                if arg.is_required() {
                    line.push_str(" x");
                }
            }
            let parsed = registry.parse(&line).expect("parse").expect("command");
            assert_eq!(parsed.full_path(), handle.full_path());
            assert!(
                Action::from_parsed(&parsed, "minecraft").is_ok(),
                "no handler for {line}"
            );
        }
    }

    #[test_case("quit", Action::Quit ; "quit")]
    #[test_case("exit", Action::Quit ; "exit")]
    #[test_case("debug", Action::ToggleDebug ; "debug")]
    #[test_case("use prod", Action::Use { cluster: "prod".into() } ; "use")]
    #[test_case("cluster use prod", Action::Use { cluster: "prod".into() } ; "cluster use")]
    #[test_case("help server start", Action::Help { path: vec!["server".into(), "start".into()] } ; "help path")]
    #[test_case("dns", Action::Proxy(ProxyAction::Records) ; "dns")]
    fn simple_actions(line: &str, expected: Action) {
        assert_eq!(action(line), expected);
    }

    #[test]
    fn omitted_cluster_uses_current() {
        assert_eq!(
            action("server list"),
            Action::Server(ServerAction::List {
                cluster: "minecraft".into()
            })
        );
        assert_eq!(
            action("server list prod"),
            Action::Server(ServerAction::List {
                cluster: "prod".into()
            })
        );
    }

    #[test]
    fn start_binds_flag_and_defaults() {
        let Action::Server(ServerAction::Start(request)) =
            action("server start --useFullURI steve world s3://b/w.tgz")
        else {
            panic!("expected server start");
        };
        assert!(request.use_full_uri);
        assert_eq!(request.snapshot, "s3://b/w.tgz");
        assert_eq!(request.cluster, "minecraft");
        assert_eq!(request.task, "minecraft-ecs");
    }

    #[test]
    fn restart_snapshot_is_optional() {
        let Action::Server(ServerAction::Restart(request)) = action("server restart world hub")
        else {
            panic!("expected server restart");
        };
        assert_eq!(request.snapshot, None);
        assert_eq!(request.proxy, "hub");
    }
}
