//! The shell's command table.
//!
//! Every command the shell understands is declared here. Handlers are
//! matched on the full path (`"server launch"`) in [`crate::commands`].

use craft_shell::{ArgSpec, CommandSpec, Hook};

use crate::config::ShellConfig;

/// `<cluster>`: optional, switches the current cluster when typed.
fn cluster_arg() -> ArgSpec {
    ArgSpec::positional("cluster", "Cluster to use; defaults to the current cluster.")
        .hook(Hook::SwitchCluster)
}

fn task_arg(default: &str) -> ArgSpec {
    ArgSpec::positional("ecs-task", "Task definition to run.").default_value(default)
}

fn required(name: &str, help: &str) -> ArgSpec {
    ArgSpec::positional(name, help).required()
}

/// Build the full command table, filling defaults from `config`.
pub fn command_table(config: &ShellConfig) -> Vec<CommandSpec> {
    vec![
        CommandSpec::new("help", "List commands, or show usage for one.")
            .arg(ArgSpec::positional("command", "Command to describe."))
            .arg(ArgSpec::positional("subcommand", "Subcommand to describe.")),
        CommandSpec::new("debug", "Toggle debug output."),
        CommandSpec::new("verbose", "Toggle verbose output."),
        CommandSpec::new("exit", "Exit the program."),
        CommandSpec::new("quit", "Exit the program."),
        CommandSpec::new("use", "Make a cluster the current cluster.").arg(
            ArgSpec::positional("cluster", "Cluster to switch to.")
                .required()
                .hook(Hook::SwitchCluster),
        ),
        CommandSpec::new("cluster", "Cluster commands.")
            .subcommand(CommandSpec::new("list", "List clusters and their instance counts."))
            .subcommand(
                CommandSpec::new("status", "Show instances and tasks of a cluster.")
                    .arg(cluster_arg()),
            )
            .subcommand(
                CommandSpec::new("use", "Make a cluster the current cluster.").arg(
                    ArgSpec::positional("cluster", "Cluster to switch to.")
                        .required()
                        .hook(Hook::SwitchCluster),
                ),
            ),
        CommandSpec::new("env", "Container environment commands.").subcommand(
            CommandSpec::new("list", "List the environment of a server.")
                .arg(required("server-name", "Server to inspect."))
                .arg(cluster_arg()),
        ),
        CommandSpec::new("proxy", "Proxy commands.")
            .subcommand(CommandSpec::new("list", "List proxies.").arg(cluster_arg()))
            .subcommand(
                CommandSpec::new("launch", "Launch a proxy.")
                    .arg(required("proxy-name", "Name of the proxy."))
                    .arg(cluster_arg())
                    .arg(task_arg(&config.proxy_task)),
            )
            .subcommand(
                CommandSpec::new("attach", "Point the proxy's DNS name at its address.")
                    .arg(required("proxy-name", "Proxy to attach."))
                    .arg(cluster_arg()),
            )
            .subcommand(
                CommandSpec::new("dns", "Show the DNS record of a proxy.")
                    .arg(required("proxy-name", "Proxy to look up."))
                    .arg(cluster_arg()),
            ),
        CommandSpec::new("server", "Game-server commands.")
            .subcommand(
                CommandSpec::new("launch", "Launch a server with a fresh world.")
                    .arg(required("user", "Owner of the server."))
                    .arg(required("server-name", "Name of the server."))
                    .arg(cluster_arg())
                    .arg(task_arg(&config.server_task)),
            )
            .subcommand(
                CommandSpec::new("start", "Start a server from a snapshot.")
                    .arg(ArgSpec::flag("useFullURI", "Treat the snapshot as a full URI."))
                    .arg(required("user", "Owner of the server."))
                    .arg(required("server-name", "Name of the server."))
                    .arg(required("snapshot", "Snapshot to restore."))
                    .arg(cluster_arg())
                    .arg(task_arg(&config.server_task)),
            )
            .subcommand(
                CommandSpec::new("restart", "Replace a server and register it with a proxy.")
                    .arg(required("server-name", "Server to restart."))
                    .arg(required("proxy", "Proxy to register with."))
                    .arg(ArgSpec::positional("snapshot", "Snapshot to restore."))
                    .arg(cluster_arg())
                    .arg(task_arg(&config.server_task)),
            )
            .subcommand(
                CommandSpec::new("terminate", "Stop a server.")
                    .arg(required("server-name", "Server to stop."))
                    .arg(cluster_arg()),
            )
            .subcommand(CommandSpec::new("list", "List servers.").arg(cluster_arg()))
            .subcommand(
                CommandSpec::new("status", "Show servers with uptime and proxies.")
                    .arg(cluster_arg()),
            )
            .subcommand(
                CommandSpec::new("describe", "Show one server in detail.")
                    .arg(required("server", "Server to describe."))
                    .arg(cluster_arg()),
            )
            .subcommand(
                CommandSpec::new("proxy", "Route a proxy to a server.")
                    .arg(required("server", "Server to route to."))
                    .arg(required("proxy", "Proxy to route from."))
                    .arg(cluster_arg()),
            )
            .subcommand(
                CommandSpec::new("unproxy", "Stop routing a proxy to a server.")
                    .arg(required("server", "Server to remove."))
                    .arg(required("proxy", "Proxy to remove it from."))
                    .arg(cluster_arg()),
            ),
        CommandSpec::new("dns", "List DNS records."),
        CommandSpec::new("archive", "Snapshot archive commands.").subcommand(
            CommandSpec::new("list", "List a user's archived snapshots.")
                .arg(required("user", "Owner of the archives."))
                .arg(
                    ArgSpec::positional("bucket", "Bucket to look in.")
                        .default_value(&config.archive_bucket),
                ),
        ),
    ]
}
