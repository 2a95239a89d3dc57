//! Fleet collaborators.
//!
//! The shell talks to the outside world through four narrow traits:
//! - [`ClusterInventory`] - cluster names and instance status
//! - [`ServerLifecycle`] - game-server tasks
//! - [`ProxyControl`] - proxy tasks, their DNS records and server membership
//! - [`SnapshotStore`] - archived world snapshots
//!
//! [`Fleet`] bundles them together with [`LogLevelSink`] so the shell can
//! hold a single `Arc<dyn Fleet>`. Two implementations ship: [`MemoryFleet`]
//! for offline use and tests, and [`HttpFleet`] for a fleet API endpoint.

pub mod http;
pub mod memory;

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use craft_shell::{ClusterSource, LogLevelSink, LookupError};
use serde::{Deserialize, Serialize};

use crate::config::FleetConfig;
use crate::error::{CliError, FleetError};

pub use http::HttpFleet;
pub use memory::MemoryFleet;

/// Task status reported for a running server or proxy.
pub const STATUS_RUNNING: &str = "RUNNING";
/// Task status reported once a task has been stopped.
pub const STATUS_STOPPED: &str = "STOPPED";

/// One row of `cluster list`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterSummary {
    /// Cluster name.
    pub name: String,
    /// `ACTIVE` or `INACTIVE`.
    pub status: String,
    /// Container instances registered with the cluster.
    pub registered_instances: u32,
    /// Tasks waiting for placement.
    pub pending_tasks: u32,
    /// Tasks currently running.
    pub running_tasks: u32,
}

/// A container instance backing a cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerInstance {
    /// Instance identifier.
    pub id: String,
    /// Agent status.
    pub status: String,
    /// Public address, if the instance has one.
    pub public_ip: Option<String>,
    /// Tasks running on this instance.
    pub running_tasks: u32,
}

/// Output of `cluster status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterDetail {
    /// Aggregate counters.
    pub summary: ClusterSummary,
    /// Instances in the cluster.
    pub instances: Vec<ContainerInstance>,
}

/// A game-server task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerTask {
    /// Server name, unique within its cluster.
    pub name: String,
    /// Owning user.
    pub user: String,
    /// Cluster the task runs in.
    pub cluster: String,
    /// Task definition it was launched from.
    pub task_definition: String,
    /// Task identifier.
    pub task_id: String,
    /// Task status.
    pub status: String,
    /// `host:port` players connect to.
    pub address: Option<String>,
    /// Snapshot the world was restored from.
    pub snapshot: Option<String>,
    /// When the task started.
    pub started_at: Option<DateTime<Utc>>,
    /// Proxies that route to this server.
    #[serde(default)]
    pub proxies: Vec<String>,
}

/// A container environment variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvVar {
    /// Variable name.
    pub name: String,
    /// Variable value.
    pub value: String,
}

/// A proxy task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyTask {
    /// Proxy name, unique within its cluster.
    pub name: String,
    /// Cluster the task runs in.
    pub cluster: String,
    /// Task definition it was launched from.
    pub task_definition: String,
    /// Task identifier.
    pub task_id: String,
    /// Task status.
    pub status: String,
    /// `host:port` of the proxy.
    pub address: Option<String>,
    /// DNS name bound to the proxy, once attached.
    pub dns_name: Option<String>,
    /// Servers behind this proxy.
    #[serde(default)]
    pub servers: Vec<String>,
}

/// A DNS resource record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsRecord {
    /// Fully qualified name.
    pub name: String,
    /// Record type, e.g. `A`.
    pub kind: String,
    /// Record value.
    pub value: String,
    /// Time to live in seconds.
    pub ttl: u32,
}

/// An archived world snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Archive {
    /// Owning user.
    pub user: String,
    /// Snapshot name, usable as `<snapshot>` in `server start`.
    pub name: String,
    /// Object key within the bucket.
    pub key: String,
    /// Bucket the snapshot lives in.
    pub bucket: String,
    /// Size in bytes.
    pub size_bytes: u64,
    /// Last modification time.
    pub last_modified: DateTime<Utc>,
}

/// `server launch`: a fresh world.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchServer {
    /// Owning user.
    pub user: String,
    /// Server name.
    pub server_name: String,
    /// Target cluster.
    pub cluster: String,
    /// Task definition.
    pub task: String,
}

/// `server start`: a world restored from a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartServer {
    /// Owning user.
    pub user: String,
    /// Server name.
    pub server_name: String,
    /// Snapshot name, or a full URI when `use_full_uri` is set.
    pub snapshot: String,
    /// Treat `snapshot` as a full URI.
    pub use_full_uri: bool,
    /// Target cluster.
    pub cluster: String,
    /// Task definition.
    pub task: String,
}

/// `server restart`: replace a running server and re-register it with a proxy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestartServer {
    /// Server to replace.
    pub server_name: String,
    /// Proxy to register the new task with.
    pub proxy: String,
    /// Snapshot to restore; the current one is reused when absent.
    pub snapshot: Option<String>,
    /// Cluster the server runs in.
    pub cluster: String,
    /// Task definition for the new task.
    pub task: String,
}

/// `proxy launch`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchProxy {
    /// Proxy name.
    pub proxy_name: String,
    /// Target cluster.
    pub cluster: String,
    /// Task definition.
    pub task: String,
}

/// Cluster names and their status.
pub trait ClusterInventory {
    /// Every cluster.
    fn list_clusters(&self) -> Result<Vec<ClusterSummary>, FleetError>;

    /// Counters and instances of one cluster.
    fn describe_cluster(&self, cluster: &str) -> Result<ClusterDetail, FleetError>;
}

/// Game-server tasks.
pub trait ServerLifecycle {
    /// Start a server with a fresh world.
    fn launch_server(&self, request: &LaunchServer) -> Result<ServerTask, FleetError>;

    /// Start a server from a snapshot.
    fn start_server(&self, request: &StartServer) -> Result<ServerTask, FleetError>;

    /// Replace a running server.
    fn restart_server(&self, request: &RestartServer) -> Result<ServerTask, FleetError>;

    /// Stop a server; returns the stopped task.
    fn terminate_server(&self, cluster: &str, server: &str) -> Result<ServerTask, FleetError>;

    /// Servers in a cluster.
    fn list_servers(&self, cluster: &str) -> Result<Vec<ServerTask>, FleetError>;

    /// One server.
    fn describe_server(&self, cluster: &str, server: &str) -> Result<ServerTask, FleetError>;

    /// Container environment of a server.
    fn server_env(&self, cluster: &str, server: &str) -> Result<Vec<EnvVar>, FleetError>;
}

/// Proxy tasks and their routing.
pub trait ProxyControl {
    /// Proxies in a cluster.
    fn list_proxies(&self, cluster: &str) -> Result<Vec<ProxyTask>, FleetError>;

    /// Start a proxy.
    fn launch_proxy(&self, request: &LaunchProxy) -> Result<ProxyTask, FleetError>;

    /// Point the proxy's DNS name at its current address.
    fn attach_proxy(&self, cluster: &str, proxy: &str) -> Result<DnsRecord, FleetError>;

    /// The proxy's DNS record, if it has been attached.
    fn proxy_dns(&self, cluster: &str, proxy: &str) -> Result<Option<DnsRecord>, FleetError>;

    /// Route `proxy` to `server`.
    fn add_server_to_proxy(&self, cluster: &str, server: &str, proxy: &str)
        -> Result<(), FleetError>;

    /// Stop routing `proxy` to `server`.
    fn remove_server_from_proxy(
        &self,
        cluster: &str,
        server: &str,
        proxy: &str,
    ) -> Result<(), FleetError>;

    /// Every record in the managed zone.
    fn dns_records(&self) -> Result<Vec<DnsRecord>, FleetError>;
}

/// Archived snapshots.
pub trait SnapshotStore {
    /// Snapshots owned by `user` in `bucket`.
    fn list_archives(&self, user: &str, bucket: &str) -> Result<Vec<Archive>, FleetError>;
}

/// Everything the shell needs from the fleet.
pub trait Fleet:
    ClusterInventory + ServerLifecycle + ProxyControl + SnapshotStore + LogLevelSink
{
    /// This fleet as a plain [`LogLevelSink`].
    fn as_log_sink(&self) -> &dyn LogLevelSink;
}

impl<T> Fleet for T
where
    T: ClusterInventory + ServerLifecycle + ProxyControl + SnapshotStore + LogLevelSink,
{
    fn as_log_sink(&self) -> &dyn LogLevelSink {
        self
    }
}

/// Adapts a [`Fleet`] to the engine's [`ClusterSource`].
#[derive(Clone, Copy)]
pub struct InventoryNames<'a>(pub &'a dyn Fleet);

impl ClusterSource for InventoryNames<'_> {
    fn cluster_names(&self) -> Result<Vec<String>, LookupError> {
        self.0
            .list_clusters()
            .map(|clusters| clusters.into_iter().map(|c| c.name).collect())
            .map_err(LookupError::new)
    }
}

/// Build the fleet described by `config`: HTTP when an endpoint is set,
/// otherwise an in-memory fleet seeded with `seed_clusters`.
pub fn connect(config: &FleetConfig) -> Result<Arc<dyn Fleet>, CliError> {
    match &config.endpoint {
        Some(endpoint) => {
            let fleet = HttpFleet::new(endpoint, Duration::from_secs(config.call_timeout_secs))?;
            tracing::info!(%endpoint, "using fleet API");
            Ok(Arc::new(fleet))
        }
        None => {
            let mut fleet = MemoryFleet::new(&config.dns_zone);
            for cluster in &config.seed_clusters {
                fleet = fleet.with_cluster(cluster, 1);
            }
            tracing::info!(clusters = config.seed_clusters.len(), "using in-memory fleet");
            Ok(Arc::new(fleet))
        }
    }
}
