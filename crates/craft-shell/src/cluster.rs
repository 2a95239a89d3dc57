//! Cluster-switch hook.
//!
//! Any argument tagged [`Hook::SwitchCluster`] that the operator types is
//! checked against the cluster inventory. A confirmed name becomes the
//! session's current cluster; an unknown name or a failed lookup leaves the
//! session alone and produces a diagnostic. Either way the command itself
//! still runs with the value as typed.

use std::collections::BTreeSet;
use std::fmt;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::error::LookupError;
use crate::parser::ParsedCommand;
use crate::registry::Hook;
use crate::session::Session;

/// Source of the authoritative cluster list.
pub trait ClusterSource {
    /// Names of every cluster the inventory knows about.
    fn cluster_names(&self) -> Result<Vec<String>, LookupError>;
}

/// Existence check used by the hook.
pub trait ClusterDirectory {
    /// Whether `name` is a known cluster.
    fn exists(&mut self, name: &str) -> Result<bool, LookupError>;
}

/// Cached set of cluster names with a time-to-live.
///
/// A hit on a fresh cache answers without calling the source. A miss, or
/// any query against an expired cache, refreshes once from the source.
#[derive(Debug, Clone)]
pub struct ClusterCache {
    names: BTreeSet<String>,
    fetched_at: Option<Instant>,
    ttl: Duration,
}

impl ClusterCache {
    /// An empty cache; entries stay fresh for `ttl`.
    pub const fn new(ttl: Duration) -> Self {
        Self {
            names: BTreeSet::new(),
            fetched_at: None,
            ttl,
        }
    }

    /// Drop the cached names so the next query refreshes.
    pub fn invalidate(&mut self) {
        self.fetched_at = None;
    }

    /// Cluster names as of the last refresh.
    pub fn cached(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    /// Pair the cache with a source to get a [`ClusterDirectory`].
    pub fn with_source<'a, S: ClusterSource + ?Sized>(
        &'a mut self,
        source: &'a S,
    ) -> CachedDirectory<'a, S> {
        CachedDirectory { cache: self, source }
    }

    fn is_fresh(&self) -> bool {
        self.fetched_at
            .is_some_and(|at| at.elapsed() < self.ttl)
    }

    fn refresh<S: ClusterSource + ?Sized>(&mut self, source: &S) -> Result<(), LookupError> {
        let names = source.cluster_names()?;
        debug!(count = names.len(), "refreshed cluster cache");
        self.names = names.into_iter().collect();
        self.fetched_at = Some(Instant::now());
        Ok(())
    }
}

/// A [`ClusterCache`] borrowed together with its source.
pub struct CachedDirectory<'a, S: ?Sized> {
    cache: &'a mut ClusterCache,
    source: &'a S,
}

impl<S: ClusterSource + ?Sized> ClusterDirectory for CachedDirectory<'_, S> {
    fn exists(&mut self, name: &str) -> Result<bool, LookupError> {
        if self.cache.is_fresh() && self.cache.names.contains(name) {
            return Ok(true);
        }
        self.cache.refresh(self.source)?;
        Ok(self.cache.names.contains(name))
    }
}

/// Result of one cluster-switch attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwitchOutcome {
    /// The current cluster changed.
    Switched {
        /// Previous cluster.
        from: String,
        /// New cluster.
        to: String,
    },
    /// The cluster exists and was already current.
    AlreadyCurrent(String),
    /// The inventory does not know the cluster.
    NotFound(String),
    /// The inventory could not be queried.
    LookupFailed {
        /// The cluster that was typed.
        cluster: String,
        /// Why the lookup failed.
        error: LookupError,
    },
}

impl SwitchOutcome {
    /// Whether the attempt left the session unchanged because of a problem.
    pub const fn is_failure(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::LookupFailed { .. })
    }
}

impl fmt::Display for SwitchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Switched { from, to } => {
                write!(f, "current cluster is now '{to}' (was '{from}')")
            }
            Self::AlreadyCurrent(c) => write!(f, "current cluster is '{c}'"),
            Self::NotFound(c) => {
                write!(f, "cluster '{c}' not found, current cluster unchanged")
            }
            Self::LookupFailed { cluster, error } => write!(
                f,
                "could not check cluster '{cluster}' ({error}), current cluster unchanged"
            ),
        }
    }
}

/// Try to make `candidate` the current cluster.
pub fn switch_cluster<D: ClusterDirectory + ?Sized>(
    session: &mut Session,
    directory: &mut D,
    candidate: &str,
) -> SwitchOutcome {
    match directory.exists(candidate) {
        Ok(true) if session.current_cluster() == candidate => {
            SwitchOutcome::AlreadyCurrent(candidate.to_string())
        }
        Ok(true) => {
            let from = session.current_cluster().to_string();
            session.set_current_cluster(candidate);
            debug!(%from, to = candidate, "switched cluster");
            SwitchOutcome::Switched {
                from,
                to: candidate.to_string(),
            }
        }
        Ok(false) => {
            debug!(cluster = candidate, "cluster not found");
            SwitchOutcome::NotFound(candidate.to_string())
        }
        Err(error) => {
            debug!(cluster = candidate, %error, "cluster lookup failed");
            SwitchOutcome::LookupFailed {
                cluster: candidate.to_string(),
                error,
            }
        }
    }
}

/// Run every hook of `parsed`, in argument declaration order.
pub fn apply_hooks<D: ClusterDirectory + ?Sized>(
    parsed: &ParsedCommand,
    session: &mut Session,
    directory: &mut D,
) -> Vec<SwitchOutcome> {
    let mut outcomes = Vec::new();
    for invocation in parsed.hook_invocations() {
        match invocation.hook {
            Hook::SwitchCluster => {
                if let Some(name) = invocation.value.as_str() {
                    outcomes.push(switch_cluster(&mut *session, &mut *directory, name));
                }
            }
        }
    }
    outcomes
}
