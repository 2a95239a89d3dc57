//! Container environment command implementation.

use std::io::Write;

use crate::error::CliError;
use crate::fleet::Fleet;
use crate::output::{EnvList, TableDisplay};

/// `env` subcommands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvAction {
    /// Environment of one server.
    List {
        /// Server to inspect.
        server: String,
        /// Cluster it runs in.
        cluster: String,
    },
}

/// Environment command executor.
pub struct EnvCommand<'a> {
    fleet: &'a dyn Fleet,
}

impl<'a> EnvCommand<'a> {
    /// Create an env command.
    pub fn new(fleet: &'a dyn Fleet) -> Self {
        Self { fleet }
    }

    /// Execute an env subcommand.
    ///
    /// # Errors
    ///
    /// Returns an error if the fleet call or writing fails.
    pub fn execute<W: Write>(&self, writer: &mut W, action: &EnvAction) -> Result<(), CliError> {
        match action {
            EnvAction::List { server, cluster } => {
                let vars = self.fleet.server_env(cluster, server)?;
                EnvList {
                    server,
                    vars: &vars,
                }
                .write_table(writer)
            }
        }
    }
}
