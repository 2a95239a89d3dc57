//! In-memory fleet.
//!
//! Backs `--offline` runs and every test. Clusters, tasks, DNS records and
//! archives live behind a single mutex; task addresses are handed out from
//! the first container instance of the cluster.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use chrono::Utc;
use craft_shell::{LogLevel, LogLevelSink};
use parking_lot::{Mutex, MutexGuard};
use tracing::debug;

use super::{
    Archive, ClusterDetail, ClusterInventory, ClusterSummary, ContainerInstance, DnsRecord,
    EnvVar, LaunchProxy, LaunchServer, ProxyControl, ProxyTask, RestartServer, STATUS_RUNNING,
    STATUS_STOPPED, ServerLifecycle, ServerTask, SnapshotStore, StartServer,
};
use crate::error::FleetError;

/// First port handed out to tasks.
const FIRST_PORT: u16 = 25565;
/// TTL of records created by `attach_proxy`.
const PROXY_RECORD_TTL: u32 = 60;

/// Fleet state held in process memory.
#[derive(Debug)]
pub struct MemoryFleet {
    zone: String,
    state: Mutex<FleetState>,
    level: Mutex<LogLevel>,
    unavailable: AtomicBool,
    calls: AtomicUsize,
}

#[derive(Debug, Default)]
struct FleetState {
    clusters: BTreeMap<String, ClusterState>,
    dns: BTreeMap<String, DnsRecord>,
    archives: Vec<Archive>,
    next_task: u64,
}

#[derive(Debug, Default)]
struct ClusterState {
    instances: Vec<ContainerInstance>,
    servers: BTreeMap<String, ServerRecord>,
    proxies: BTreeMap<String, ProxyTask>,
    next_port: u16,
}

#[derive(Debug, Clone)]
struct ServerRecord {
    task: ServerTask,
    env: Vec<EnvVar>,
}

impl MemoryFleet {
    /// An empty fleet whose proxy records live under `zone`.
    pub fn new(zone: impl Into<String>) -> Self {
        Self {
            zone: zone.into(),
            state: Mutex::new(FleetState::default()),
            level: Mutex::new(LogLevel::Error),
            unavailable: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
        }
    }

    /// Add a cluster with `instances` container instances.
    #[must_use]
    pub fn with_cluster(mut self, name: &str, instances: u32) -> Self {
        let state = self.state.get_mut();
        let index = state.clusters.len() + 1;
        let cluster = state.clusters.entry(name.to_string()).or_default();
        cluster.next_port = FIRST_PORT;
        cluster.instances = (1..=instances)
            .map(|n| ContainerInstance {
                id: format!("i-{name}-{n:04}"),
                status: "ACTIVE".to_string(),
                public_ip: Some(format!("10.0.{index}.{n}")),
                running_tasks: 0,
            })
            .collect();
        self
    }

    /// Add an archived snapshot.
    #[must_use]
    pub fn with_archive(mut self, user: &str, name: &str, bucket: &str, size_bytes: u64) -> Self {
        self.state.get_mut().archives.push(Archive {
            user: user.to_string(),
            name: name.to_string(),
            key: format!("{user}/{name}.tar.gz"),
            bucket: bucket.to_string(),
            size_bytes,
            last_modified: Utc::now(),
        });
        self
    }

    /// Make every subsequent call fail with a transport error.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of collaborator calls made so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Level last applied through [`LogLevelSink`].
    pub fn log_level(&self) -> LogLevel {
        *self.level.lock()
    }

    fn enter(&self) -> Result<MutexGuard<'_, FleetState>, FleetError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(FleetError::Transport("fleet unavailable".to_string()));
        }
        Ok(self.state.lock())
    }
}

impl FleetState {
    fn cluster(&self, name: &str) -> Result<&ClusterState, FleetError> {
        self.clusters
            .get(name)
            .ok_or_else(|| FleetError::ClusterNotFound(name.to_string()))
    }

    fn cluster_mut(&mut self, name: &str) -> Result<&mut ClusterState, FleetError> {
        self.clusters
            .get_mut(name)
            .ok_or_else(|| FleetError::ClusterNotFound(name.to_string()))
    }

    fn next_task_id(&mut self) -> String {
        self.next_task += 1;
        format!("task-{:06}", self.next_task)
    }
}

impl ClusterState {
    fn summary(&self, name: &str) -> ClusterSummary {
        let running = self.servers.len() + self.proxies.len();
        ClusterSummary {
            name: name.to_string(),
            status: "ACTIVE".to_string(),
            registered_instances: u32::try_from(self.instances.len()).unwrap_or(u32::MAX),
            pending_tasks: 0,
            running_tasks: u32::try_from(running).unwrap_or(u32::MAX),
        }
    }

    /// Reserve an address on the first instance.
    fn place(&mut self, cluster: &str) -> Result<String, FleetError> {
        let instance = self.instances.first_mut().ok_or_else(|| {
            FleetError::InvalidRequest(format!("cluster '{cluster}' has no container instances"))
        })?;
        let ip = instance.public_ip.clone().unwrap_or_else(|| "0.0.0.0".to_string());
        instance.running_tasks += 1;
        let port = self.next_port;
        self.next_port = self.next_port.saturating_add(1);
        Ok(format!("{ip}:{port}"))
    }

    fn release(&mut self) {
        if let Some(instance) = self.instances.first_mut() {
            instance.running_tasks = instance.running_tasks.saturating_sub(1);
        }
    }

    fn server(&self, cluster: &str, server: &str) -> Result<&ServerRecord, FleetError> {
        self.servers.get(server).ok_or_else(|| FleetError::ServerNotFound {
            cluster: cluster.to_string(),
            server: server.to_string(),
        })
    }

    fn proxy_mut(&mut self, cluster: &str, proxy: &str) -> Result<&mut ProxyTask, FleetError> {
        self.proxies.get_mut(proxy).ok_or_else(|| FleetError::ProxyNotFound {
            cluster: cluster.to_string(),
            proxy: proxy.to_string(),
        })
    }
}

fn env(pairs: &[(&str, &str)]) -> Vec<EnvVar> {
    pairs
        .iter()
        .map(|(name, value)| EnvVar {
            name: (*name).to_string(),
            value: (*value).to_string(),
        })
        .collect()
}

impl ClusterInventory for MemoryFleet {
    fn list_clusters(&self) -> Result<Vec<ClusterSummary>, FleetError> {
        let state = self.enter()?;
        Ok(state
            .clusters
            .iter()
            .map(|(name, cluster)| cluster.summary(name))
            .collect())
    }

    fn describe_cluster(&self, cluster: &str) -> Result<ClusterDetail, FleetError> {
        let state = self.enter()?;
        let found = state.cluster(cluster)?;
        Ok(ClusterDetail {
            summary: found.summary(cluster),
            instances: found.instances.clone(),
        })
    }
}

impl MemoryFleet {
    fn start(
        &self,
        user: &str,
        server_name: &str,
        cluster: &str,
        task: &str,
        snapshot: Option<String>,
    ) -> Result<ServerTask, FleetError> {
        let mut state = self.enter()?;
        let task_id = state.next_task_id();
        let target = state.cluster_mut(cluster)?;
        if target.servers.contains_key(server_name) {
            return Err(FleetError::AlreadyExists {
                kind: "server",
                name: server_name.to_string(),
                cluster: cluster.to_string(),
            });
        }
        let address = target.place(cluster)?;

        let mut vars = env(&[("SERVER_USER", user), ("SERVER_NAME", server_name), ("EULA", "TRUE")]);
        if let Some(snapshot) = &snapshot {
            vars.extend(env(&[("SNAPSHOT", snapshot.as_str())]));
        }
        let started = ServerTask {
            name: server_name.to_string(),
            user: user.to_string(),
            cluster: cluster.to_string(),
            task_definition: task.to_string(),
            task_id,
            status: STATUS_RUNNING.to_string(),
            address: Some(address),
            snapshot,
            started_at: Some(Utc::now()),
            proxies: Vec::new(),
        };
        target.servers.insert(
            server_name.to_string(),
            ServerRecord {
                task: started.clone(),
                env: vars,
            },
        );
        debug!(cluster, server = server_name, task_id = %started.task_id, "started server");
        Ok(started)
    }
}

impl ServerLifecycle for MemoryFleet {
    fn launch_server(&self, request: &LaunchServer) -> Result<ServerTask, FleetError> {
        self.start(
            &request.user,
            &request.server_name,
            &request.cluster,
            &request.task,
            None,
        )
    }

    fn start_server(&self, request: &StartServer) -> Result<ServerTask, FleetError> {
        if request.snapshot.trim().is_empty() {
            return Err(FleetError::InvalidRequest("snapshot must not be empty".to_string()));
        }
        let snapshot = if request.use_full_uri {
            request.snapshot.clone()
        } else {
            format!("{}/{}", request.user, request.snapshot)
        };
        self.start(
            &request.user,
            &request.server_name,
            &request.cluster,
            &request.task,
            Some(snapshot),
        )
    }

    fn restart_server(&self, request: &RestartServer) -> Result<ServerTask, FleetError> {
        let mut state = self.enter()?;
        let task_id = state.next_task_id();
        let cluster = request.cluster.as_str();
        let target = state.cluster_mut(cluster)?;
        let old = target.server(cluster, &request.server_name)?.clone();
        target.proxy_mut(cluster, &request.proxy)?;

        target.release();
        let address = target.place(cluster)?;

        let snapshot = request.snapshot.clone().or(old.task.snapshot.clone());
        let mut proxies = old.task.proxies.clone();
        if !proxies.contains(&request.proxy) {
            proxies.push(request.proxy.clone());
        }
        let mut vars: Vec<EnvVar> = old.env.into_iter().filter(|v| v.name != "SNAPSHOT").collect();
        if let Some(snapshot) = &snapshot {
            vars.extend(env(&[("SNAPSHOT", snapshot.as_str())]));
        }

        let restarted = ServerTask {
            task_definition: request.task.clone(),
            task_id,
            status: STATUS_RUNNING.to_string(),
            address: Some(address),
            snapshot,
            started_at: Some(Utc::now()),
            proxies,
            ..old.task
        };
        target.servers.insert(
            request.server_name.clone(),
            ServerRecord {
                task: restarted.clone(),
                env: vars,
            },
        );
        let proxy = target.proxy_mut(cluster, &request.proxy)?;
        if !proxy.servers.contains(&request.server_name) {
            proxy.servers.push(request.server_name.clone());
        }
        debug!(cluster, server = %request.server_name, task_id = %restarted.task_id, "restarted server");
        Ok(restarted)
    }

    fn terminate_server(&self, cluster: &str, server: &str) -> Result<ServerTask, FleetError> {
        let mut state = self.enter()?;
        let target = state.cluster_mut(cluster)?;
        let record = target
            .servers
            .remove(server)
            .ok_or_else(|| FleetError::ServerNotFound {
                cluster: cluster.to_string(),
                server: server.to_string(),
            })?;
        target.release();
        for proxy in target.proxies.values_mut() {
            proxy.servers.retain(|s| s != server);
        }
        debug!(cluster, server, "terminated server");
        Ok(ServerTask {
            status: STATUS_STOPPED.to_string(),
            ..record.task
        })
    }

    fn list_servers(&self, cluster: &str) -> Result<Vec<ServerTask>, FleetError> {
        let state = self.enter()?;
        Ok(state
            .cluster(cluster)?
            .servers
            .values()
            .map(|r| r.task.clone())
            .collect())
    }

    fn describe_server(&self, cluster: &str, server: &str) -> Result<ServerTask, FleetError> {
        let state = self.enter()?;
        Ok(state.cluster(cluster)?.server(cluster, server)?.task.clone())
    }

    fn server_env(&self, cluster: &str, server: &str) -> Result<Vec<EnvVar>, FleetError> {
        let state = self.enter()?;
        Ok(state.cluster(cluster)?.server(cluster, server)?.env.clone())
    }
}

impl ProxyControl for MemoryFleet {
    fn list_proxies(&self, cluster: &str) -> Result<Vec<ProxyTask>, FleetError> {
        let state = self.enter()?;
        Ok(state.cluster(cluster)?.proxies.values().cloned().collect())
    }

    fn launch_proxy(&self, request: &LaunchProxy) -> Result<ProxyTask, FleetError> {
        let mut state = self.enter()?;
        let task_id = state.next_task_id();
        let cluster = request.cluster.as_str();
        let target = state.cluster_mut(cluster)?;
        if target.proxies.contains_key(&request.proxy_name) {
            return Err(FleetError::AlreadyExists {
                kind: "proxy",
                name: request.proxy_name.clone(),
                cluster: cluster.to_string(),
            });
        }
        let address = target.place(cluster)?;
        let proxy = ProxyTask {
            name: request.proxy_name.clone(),
            cluster: cluster.to_string(),
            task_definition: request.task.clone(),
            task_id,
            status: STATUS_RUNNING.to_string(),
            address: Some(address),
            dns_name: None,
            servers: Vec::new(),
        };
        target.proxies.insert(request.proxy_name.clone(), proxy.clone());
        debug!(cluster, proxy = %proxy.name, "launched proxy");
        Ok(proxy)
    }

    fn attach_proxy(&self, cluster: &str, proxy: &str) -> Result<DnsRecord, FleetError> {
        let mut state = self.enter()?;
        let task = state.cluster_mut(cluster)?.proxy_mut(cluster, proxy)?;
        let host = task
            .address
            .as_deref()
            .and_then(|a| a.split(':').next())
            .ok_or_else(|| {
                FleetError::InvalidRequest(format!("proxy '{proxy}' has no address yet"))
            })?
            .to_string();
        let record = DnsRecord {
            name: format!("{proxy}.{}", self.zone),
            kind: "A".to_string(),
            value: host,
            ttl: PROXY_RECORD_TTL,
        };
        task.dns_name = Some(record.name.clone());
        state.dns.insert(record.name.clone(), record.clone());
        debug!(cluster, proxy, name = %record.name, "attached proxy");
        Ok(record)
    }

    fn proxy_dns(&self, cluster: &str, proxy: &str) -> Result<Option<DnsRecord>, FleetError> {
        let mut state = self.enter()?;
        let dns_name = state
            .cluster_mut(cluster)?
            .proxy_mut(cluster, proxy)?
            .dns_name
            .clone();
        Ok(dns_name.and_then(|name| state.dns.get(&name).cloned()))
    }

    fn add_server_to_proxy(
        &self,
        cluster: &str,
        server: &str,
        proxy: &str,
    ) -> Result<(), FleetError> {
        let mut state = self.enter()?;
        let target = state.cluster_mut(cluster)?;
        target.server(cluster, server)?;
        let routed = target.proxy_mut(cluster, proxy)?;
        if !routed.servers.iter().any(|s| s == server) {
            routed.servers.push(server.to_string());
        }
        if let Some(record) = target.servers.get_mut(server) {
            if !record.task.proxies.iter().any(|p| p == proxy) {
                record.task.proxies.push(proxy.to_string());
            }
        }
        Ok(())
    }

    fn remove_server_from_proxy(
        &self,
        cluster: &str,
        server: &str,
        proxy: &str,
    ) -> Result<(), FleetError> {
        let mut state = self.enter()?;
        let target = state.cluster_mut(cluster)?;
        target.server(cluster, server)?;
        let routed = target.proxy_mut(cluster, proxy)?;
        let before = routed.servers.len();
        routed.servers.retain(|s| s != server);
        if routed.servers.len() == before {
            return Err(FleetError::InvalidRequest(format!(
                "server '{server}' is not behind proxy '{proxy}'"
            )));
        }
        if let Some(record) = target.servers.get_mut(server) {
            record.task.proxies.retain(|p| p != proxy);
        }
        Ok(())
    }

    fn dns_records(&self) -> Result<Vec<DnsRecord>, FleetError> {
        let state = self.enter()?;
        Ok(state.dns.values().cloned().collect())
    }
}

impl SnapshotStore for MemoryFleet {
    fn list_archives(&self, user: &str, bucket: &str) -> Result<Vec<Archive>, FleetError> {
        let state = self.enter()?;
        let mut found: Vec<Archive> = state
            .archives
            .iter()
            .filter(|a| a.user == user && a.bucket == bucket)
            .cloned()
            .collect();
        found.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(found)
    }
}

impl LogLevelSink for MemoryFleet {
    fn set_log_level(&self, level: LogLevel) {
        *self.level.lock() = level;
        debug!(%level, "memory fleet log level");
    }
}
