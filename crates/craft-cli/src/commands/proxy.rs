//! Proxy and DNS command implementation.

use std::io::Write;

use crate::error::CliError;
use crate::fleet::{Fleet, LaunchProxy};
use crate::output::{DnsList, Message, ProxyList, TableDisplay};

/// `proxy` subcommands, plus the top-level `dns`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProxyAction {
    /// Proxies in a cluster.
    List {
        /// Cluster to list.
        cluster: String,
    },
    /// Start a proxy.
    Launch(LaunchProxy),
    /// Bind the proxy's DNS name to its address.
    Attach {
        /// Proxy to attach.
        proxy: String,
        /// Cluster it runs in.
        cluster: String,
    },
    /// Show the proxy's DNS record.
    Dns {
        /// Proxy to look up.
        proxy: String,
        /// Cluster it runs in.
        cluster: String,
    },
    /// Every record in the zone.
    Records,
}

/// Proxy command executor.
pub struct ProxyCommand<'a> {
    fleet: &'a dyn Fleet,
}

impl<'a> ProxyCommand<'a> {
    /// Create a proxy command.
    pub fn new(fleet: &'a dyn Fleet) -> Self {
        Self { fleet }
    }

    /// Execute a proxy subcommand.
    ///
    /// # Errors
    ///
    /// Returns an error if the fleet call or writing fails.
    pub fn execute<W: Write>(&self, writer: &mut W, action: &ProxyAction) -> Result<(), CliError> {
        match action {
            ProxyAction::List { cluster } => {
                let proxies = self.fleet.list_proxies(cluster)?;
                ProxyList {
                    cluster,
                    proxies: &proxies,
                }
                .write_table(writer)
            }
            ProxyAction::Launch(request) => {
                let proxy = self.fleet.launch_proxy(request)?;
                Message::success(format!(
                    "Launched proxy {} in cluster {} (task {}) at {}",
                    proxy.name,
                    proxy.cluster,
                    proxy.task_id,
                    proxy.address.as_deref().unwrap_or("pending")
                ))
                .write_table(writer)
            }
            ProxyAction::Attach { proxy, cluster } => {
                let record = self.fleet.attach_proxy(cluster, proxy)?;
                Message::success(format!(
                    "Attached proxy {proxy}: {} -> {}",
                    record.name, record.value
                ))
                .write_table(writer)
            }
            ProxyAction::Dns { proxy, cluster } => match self.fleet.proxy_dns(cluster, proxy)? {
                Some(record) => Message::info(format!(
                    "{} {} {} (ttl {})",
                    record.name, record.kind, record.value, record.ttl
                ))
                .write_table(writer),
                None => Message::warn(format!(
                    "proxy '{proxy}' has no DNS record; run 'proxy attach {proxy}'"
                ))
                .write_table(writer),
            },
            ProxyAction::Records => {
                let records = self.fleet.dns_records()?;
                DnsList(&records).write_table(writer)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fleet::MemoryFleet;
    use crate::output::set_color;

    fn run(fleet: &MemoryFleet, action: &ProxyAction) -> String {
        set_color(false);
        let mut out = Vec::new();
        ProxyCommand::new(fleet)
            .execute(&mut out, action)
            .expect("proxy command");
        String::from_utf8(out).expect("utf8")
    }

    fn launch(fleet: &MemoryFleet) {
        run(
            fleet,
            &ProxyAction::Launch(LaunchProxy {
                proxy_name: "hub".into(),
                cluster: "minecraft".into(),
                task: "bungee-ecs".into(),
            }),
        );
    }

    #[test]
    fn launch_then_list() {
        let fleet = MemoryFleet::new("craft.test").with_cluster("minecraft", 1);
        launch(&fleet);
        let out = run(
            &fleet,
            &ProxyAction::List {
                cluster: "minecraft".into(),
            },
        );
        assert!(out.lines().any(|l| l.starts_with("hub")));
    }

    #[test]
    fn dns_before_attach_warns() {
        let fleet = MemoryFleet::new("craft.test").with_cluster("minecraft", 1);
        launch(&fleet);
        let out = run(
            &fleet,
            &ProxyAction::Dns {
                proxy: "hub".into(),
                cluster: "minecraft".into(),
            },
        );
        assert!(out.starts_with("Warning: proxy 'hub' has no DNS record"));
    }

    #[test]
    fn attach_shows_up_in_records() {
        let fleet = MemoryFleet::new("craft.test").with_cluster("minecraft", 1);
        launch(&fleet);
        let out = run(
            &fleet,
            &ProxyAction::Attach {
                proxy: "hub".into(),
                cluster: "minecraft".into(),
            },
        );
        assert!(out.contains("hub.craft.test -> 10.0.1.1"));

        let out = run(&fleet, &ProxyAction::Records);
        assert!(out.lines().any(|l| l.starts_with("hub.craft.test")));
    }

    #[test]
    fn no_records_says_so() {
        let fleet = MemoryFleet::new("craft.test");
        assert_eq!(run(&fleet, &ProxyAction::Records), "No DNS records\n");
    }
}
