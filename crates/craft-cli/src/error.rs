//! CLI error types.

use std::time::Duration;

use craft_shell::{ParseError, RegistryError};
use thiserror::Error;

/// Failures reported by fleet collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FleetError {
    /// The cluster does not exist.
    #[error("cluster '{0}' not found")]
    ClusterNotFound(String),

    /// No such server in the cluster.
    #[error("server '{server}' not found in cluster '{cluster}'")]
    ServerNotFound {
        /// Cluster searched.
        cluster: String,
        /// Server name.
        server: String,
    },

    /// No such proxy in the cluster.
    #[error("proxy '{proxy}' not found in cluster '{cluster}'")]
    ProxyNotFound {
        /// Cluster searched.
        cluster: String,
        /// Proxy name.
        proxy: String,
    },

    /// A task with this name is already running.
    #[error("{kind} '{name}' already exists in cluster '{cluster}'")]
    AlreadyExists {
        /// `"server"` or `"proxy"`.
        kind: &'static str,
        /// Task name.
        name: String,
        /// Cluster.
        cluster: String,
    },

    /// The request was rejected before it was sent.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The fleet API answered with an error status.
    #[error("fleet API returned {status}: {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body.
        message: String,
    },

    /// The fleet API could not be reached.
    #[error("transport error: {0}")]
    Transport(String),

    /// The call did not finish in time.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// The response could not be decoded.
    #[error("could not decode response: {0}")]
    Decode(String),
}

/// Errors surfaced by the shell.
#[derive(Debug, Error)]
pub enum CliError {
    /// The input line did not match the command table.
    #[error("command error: {0}; type 'help' for a list of commands")]
    Parse(#[from] ParseError),

    /// The command table is malformed.
    #[error("command table error: {0}")]
    Registry(#[from] RegistryError),

    /// A collaborator call failed.
    #[error(transparent)]
    Fleet(#[from] FleetError),

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Logging could not be set up.
    #[error("logging error: {0}")]
    Logging(String),

    /// A parsed command has no handler.
    #[error("no handler for command '{0}'")]
    Unhandled(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fleet_error_display_server_not_found() {
        let err = FleetError::ServerNotFound {
            cluster: "minecraft".into(),
            server: "world".into(),
        };
        assert_eq!(
            err.to_string(),
            "server 'world' not found in cluster 'minecraft'"
        );
    }

    #[test]
    fn fleet_errors_pass_through_verbatim() {
        let err = CliError::from(FleetError::ClusterNotFound("bogus".into()));
        assert_eq!(err.to_string(), "cluster 'bogus' not found");
    }

    #[test]
    fn parse_errors_point_at_help() {
        let err = CliError::from(ParseError::UnrecognizedToken {
            command: String::new(),
            token: "lunch".into(),
        });
        assert_eq!(
            err.to_string(),
            "command error: unexpected 'lunch'; type 'help' for a list of commands"
        );
    }

    #[test]
    fn cli_error_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let cli_err = CliError::from(io_err);
        assert!(matches!(cli_err, CliError::Io(_)));
    }
}
