//! Shell configuration.
//!
//! Configuration for the craft shell, including:
//! - The cluster a session starts on
//! - Default task definitions and archive bucket
//! - History and colour settings
//! - Fleet API connection settings

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::CliError;

/// File name of the default history file, under the home directory.
pub const HISTORY_FILE_NAME: &str = ".craft_history";

/// Fleet connection settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct FleetConfig {
    /// Fleet API base URL; the in-memory fleet is used when unset.
    pub endpoint: Option<String>,
    /// Per-call timeout in seconds.
    pub call_timeout_secs: u64,
    /// How long a cluster-name lookup stays fresh, in seconds.
    pub cluster_cache_ttl_secs: u64,
    /// Clusters the in-memory fleet starts with.
    pub seed_clusters: Vec<String>,
    /// Zone proxy DNS records are created in by the in-memory fleet.
    pub dns_zone: String,
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            call_timeout_secs: 30,
            cluster_cache_ttl_secs: 60,
            seed_clusters: vec!["minecraft".to_string()],
            dns_zone: "craft.local".to_string(),
        }
    }
}

/// Main shell configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ShellConfig {
    /// Cluster a new session starts on.
    pub default_cluster: String,
    /// Task definition for game servers.
    pub server_task: String,
    /// Task definition for proxies.
    pub proxy_task: String,
    /// Bucket `archive list` looks in by default.
    pub archive_bucket: String,
    /// History file; `~/.craft_history` when unset.
    pub history_file: Option<PathBuf>,
    /// Colour output.
    pub color: bool,
    /// Fleet connection.
    pub fleet: FleetConfig,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            default_cluster: "minecraft".to_string(),
            server_task: "minecraft-ecs".to_string(),
            proxy_task: "bungee-ecs".to_string(),
            archive_bucket: "craft-config-test".to_string(),
            history_file: None,
            color: true,
            fleet: FleetConfig::default(),
        }
    }
}

impl ShellConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, CliError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            CliError::Config(format!(
                "failed to read config file '{}': {}",
                path.as_ref().display(),
                e
            ))
        })?;

        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid.
    pub fn from_toml(content: &str) -> Result<Self, CliError> {
        let config: Self =
            toml::from_str(content).map_err(|e| CliError::Config(format!("invalid TOML: {e}")))?;

        config.validate()?;
        Ok(config)
    }

    /// `~/.config/craft/config.toml`, if a config directory is known.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("craft").join("config.toml"))
    }

    /// Load from `explicit`, or from the default path.
    ///
    /// An explicit path must exist. A missing default file yields the
    /// built-in defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if a file that should be read cannot be read or
    /// parsed.
    pub fn load(explicit: Option<&Path>) -> Result<Self, CliError> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        match Self::default_path() {
            Some(path) if path.is_file() => Self::from_file(path),
            _ => Ok(Self::default()),
        }
    }

    /// Where history is kept, if anywhere.
    pub fn history_path(&self) -> Option<PathBuf> {
        self.history_file
            .clone()
            .or_else(|| dirs::home_dir().map(|home| home.join(HISTORY_FILE_NAME)))
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<(), CliError> {
        for (field, value) in [
            ("default_cluster", &self.default_cluster),
            ("server_task", &self.server_task),
            ("proxy_task", &self.proxy_task),
            ("archive_bucket", &self.archive_bucket),
        ] {
            validate_token(field, value)?;
        }

        if let Some(endpoint) = &self.fleet.endpoint {
            if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
                return Err(CliError::Config(
                    "fleet.endpoint must start with http:// or https://".to_string(),
                ));
            }
        }

        if self.fleet.call_timeout_secs == 0 {
            return Err(CliError::Config(
                "fleet.call_timeout_secs must be greater than 0".to_string(),
            ));
        }

        for cluster in &self.fleet.seed_clusters {
            validate_token("fleet.seed_clusters", cluster)?;
        }

        if self.fleet.dns_zone.trim().is_empty() {
            return Err(CliError::Config("fleet.dns_zone cannot be empty".to_string()));
        }

        Ok(())
    }
}

/// Values that are typed at the prompt must be a single token.
fn validate_token(field: &str, value: &str) -> Result<(), CliError> {
    if value.is_empty() {
        return Err(CliError::Config(format!("{field} cannot be empty")));
    }
    if value.chars().any(char::is_whitespace) {
        return Err(CliError::Config(format!(
            "{field} cannot contain whitespace: '{value}'"
        )));
    }
    Ok(())
}
