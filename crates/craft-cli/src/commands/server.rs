//! Game-server command implementation.
//!
//! Provides subcommands for:
//! - Launching servers with a fresh world or from a snapshot
//! - Restarting and terminating servers
//! - Listing and describing servers
//! - Routing proxies to servers

use std::io::Write;

use chrono::Utc;

use crate::error::CliError;
use crate::fleet::{Fleet, LaunchServer, RestartServer, ServerTask, StartServer};
use crate::output::{Message, ServerList, ServerStatus, TableDisplay};

/// `server` subcommands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerAction {
    /// Fresh world.
    Launch(LaunchServer),
    /// World from a snapshot.
    Start(StartServer),
    /// Replace a running server.
    Restart(RestartServer),
    /// Stop a server.
    Terminate {
        /// Server to stop.
        server: String,
        /// Cluster it runs in.
        cluster: String,
    },
    /// Servers in a cluster.
    List {
        /// Cluster to list.
        cluster: String,
    },
    /// Servers with task, uptime and proxies.
    Status {
        /// Cluster to list.
        cluster: String,
    },
    /// One server in detail.
    Describe {
        /// Server to describe.
        server: String,
        /// Cluster it runs in.
        cluster: String,
    },
    /// Route a proxy to a server.
    Proxy {
        /// Server to route to.
        server: String,
        /// Proxy to route from.
        proxy: String,
        /// Cluster both run in.
        cluster: String,
    },
    /// Stop routing a proxy to a server.
    Unproxy {
        /// Server to remove.
        server: String,
        /// Proxy to remove it from.
        proxy: String,
        /// Cluster both run in.
        cluster: String,
    },
}

/// Server command executor.
pub struct ServerCommand<'a> {
    fleet: &'a dyn Fleet,
}

impl<'a> ServerCommand<'a> {
    /// Create a server command.
    pub fn new(fleet: &'a dyn Fleet) -> Self {
        Self { fleet }
    }

    /// Execute a server subcommand.
    ///
    /// # Errors
    ///
    /// Returns an error if the fleet call or writing fails.
    pub fn execute<W: Write>(&self, writer: &mut W, action: &ServerAction) -> Result<(), CliError> {
        match action {
            ServerAction::Launch(request) => {
                let task = self.fleet.launch_server(request)?;
                started("Launched", &task).write_table(writer)
            }
            ServerAction::Start(request) => {
                let task = self.fleet.start_server(request)?;
                started("Started", &task).write_table(writer)
            }
            ServerAction::Restart(request) => {
                let task = self.fleet.restart_server(request)?;
                Message::success(format!(
                    "Restarted server {} (task {}) behind proxy {}",
                    task.name, task.task_id, request.proxy
                ))
                .write_table(writer)
            }
            ServerAction::Terminate { server, cluster } => {
                let task = self.fleet.terminate_server(cluster, server)?;
                Message::success(format!(
                    "Terminated server {} (task {}) in cluster {cluster}",
                    task.name, task.task_id
                ))
                .write_table(writer)
            }
            ServerAction::List { cluster } => {
                let servers = self.fleet.list_servers(cluster)?;
                ServerList {
                    cluster,
                    servers: &servers,
                }
                .write_table(writer)
            }
            ServerAction::Status { cluster } => {
                let servers = self.fleet.list_servers(cluster)?;
                ServerStatus {
                    cluster,
                    servers: &servers,
                    now: Utc::now(),
                }
                .write_table(writer)
            }
            ServerAction::Describe { server, cluster } => {
                self.fleet.describe_server(cluster, server)?.write_table(writer)
            }
            ServerAction::Proxy {
                server,
                proxy,
                cluster,
            } => {
                self.fleet.add_server_to_proxy(cluster, server, proxy)?;
                Message::success(format!("Server {server} is now behind proxy {proxy}"))
                    .write_table(writer)
            }
            ServerAction::Unproxy {
                server,
                proxy,
                cluster,
            } => {
                self.fleet.remove_server_from_proxy(cluster, server, proxy)?;
                Message::success(format!("Server {server} removed from proxy {proxy}"))
                    .write_table(writer)
            }
        }
    }
}

fn started(verb: &str, task: &ServerTask) -> Message {
    let mut text = format!(
        "{verb} server {} for {} in cluster {} (task {})",
        task.name, task.user, task.cluster, task.task_id
    );
    if let Some(address) = &task.address {
        text.push_str(&format!(" at {address}"));
    }
    Message::success(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FleetError;
    use crate::fleet::{LaunchProxy, MemoryFleet, ProxyControl};
    use crate::output::set_color;

    fn fleet() -> MemoryFleet {
        MemoryFleet::new("craft.test").with_cluster("minecraft", 1)
    }

    fn run(fleet: &MemoryFleet, action: &ServerAction) -> Result<String, CliError> {
        set_color(false);
        let mut out = Vec::new();
        ServerCommand::new(fleet).execute(&mut out, action)?;
        Ok(String::from_utf8(out).expect("utf8"))
    }

    fn launch(fleet: &MemoryFleet, name: &str) -> String {
        run(
            fleet,
            &ServerAction::Launch(LaunchServer {
                user: "steve".into(),
                server_name: name.into(),
                cluster: "minecraft".into(),
                task: "minecraft-ecs".into(),
            }),
        )
        .expect("launch")
    }

    #[test]
    fn launch_reports_address() {
        let out = launch(&fleet(), "world");
        assert_eq!(
            out,
            "Launched server world for steve in cluster minecraft (task task-000001) at 10.0.1.1:25565\n"
        );
    }

    #[test]
    fn list_and_status_show_running_servers() {
        let fleet = fleet();
        launch(&fleet, "world");
        let list = run(
            &fleet,
            &ServerAction::List {
                cluster: "minecraft".into(),
            },
        )
        .expect("list");
        assert!(list.lines().any(|l| l.starts_with("world") && l.contains("RUNNING")));

        let status = run(
            &fleet,
            &ServerAction::Status {
                cluster: "minecraft".into(),
            },
        )
        .expect("status");
        assert!(status.contains("task-000001"));
        assert!(status.contains("0m"));
    }

    #[test]
    fn terminate_unknown_server_fails() {
        let err = run(
            &fleet(),
            &ServerAction::Terminate {
                server: "ghost".into(),
                cluster: "minecraft".into(),
            },
        )
        .unwrap_err();
        assert!(matches!(err, CliError::Fleet(FleetError::ServerNotFound { .. })));
    }

    #[test]
    fn proxy_then_describe() {
        let fleet = fleet();
        launch(&fleet, "world");
        fleet
            .launch_proxy(&LaunchProxy {
                proxy_name: "hub".into(),
                cluster: "minecraft".into(),
                task: "bungee-ecs".into(),
            })
            .expect("proxy");

        let out = run(
            &fleet,
            &ServerAction::Proxy {
                server: "world".into(),
                proxy: "hub".into(),
                cluster: "minecraft".into(),
            },
        )
        .expect("proxy");
        assert_eq!(out, "Server world is now behind proxy hub\n");

        let out = run(
            &fleet,
            &ServerAction::Describe {
                server: "world".into(),
                cluster: "minecraft".into(),
            },
        )
        .expect("describe");
        assert!(out.starts_with("Server world"));
        assert!(out.contains("Proxies:"));
        assert!(out.contains("hub"));
    }

    #[test]
    fn restart_names_the_proxy() {
        let fleet = fleet();
        launch(&fleet, "world");
        fleet
            .launch_proxy(&LaunchProxy {
                proxy_name: "hub".into(),
                cluster: "minecraft".into(),
                task: "bungee-ecs".into(),
            })
            .expect("proxy");
        let out = run(
            &fleet,
            &ServerAction::Restart(RestartServer {
                server_name: "world".into(),
                proxy: "hub".into(),
                snapshot: None,
                cluster: "minecraft".into(),
                task: "minecraft-ecs".into(),
            }),
        )
        .expect("restart");
        assert!(out.starts_with("Restarted server world"));
        assert!(out.trim_end().ends_with("behind proxy hub"));
    }
}
