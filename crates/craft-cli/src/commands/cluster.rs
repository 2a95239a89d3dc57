//! Cluster command implementation.

use std::io::Write;

use crate::error::CliError;
use crate::fleet::Fleet;
use crate::output::{ClusterList, TableDisplay};

/// `cluster` subcommands other than `use`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClusterAction {
    /// Every cluster with its counters.
    List,
    /// Instances and counters of one cluster.
    Status {
        /// Cluster to describe.
        cluster: String,
    },
}

/// Cluster command executor.
pub struct ClusterCommand<'a> {
    fleet: &'a dyn Fleet,
    current: &'a str,
}

impl<'a> ClusterCommand<'a> {
    /// Create a cluster command; `current` is marked in listings.
    pub fn new(fleet: &'a dyn Fleet, current: &'a str) -> Self {
        Self { fleet, current }
    }

    /// Execute a cluster subcommand.
    ///
    /// # Errors
    ///
    /// Returns an error if the fleet call or writing fails.
    pub fn execute<W: Write>(&self, writer: &mut W, action: &ClusterAction) -> Result<(), CliError> {
        match action {
            ClusterAction::List => {
                let clusters = self.fleet.list_clusters()?;
                ClusterList {
                    clusters: &clusters,
                    current: self.current,
                }
                .write_table(writer)
            }
            ClusterAction::Status { cluster } => {
                self.fleet.describe_cluster(cluster)?.write_table(writer)
            }
        }
    }
}
