//! Configuration type definitions.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Database server reached through the client binary.
    #[serde(default)]
    pub server: ServerConfig,

    /// Process pool and data format settings.
    #[serde(default)]
    pub transfer: TransferConfig,

    /// Known dataset repositories, searched in order.
    #[serde(default = "default_repos")]
    pub repos: Vec<RepoConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            transfer: TransferConfig::default(),
            repos: default_repos(),
        }
    }
}

/// Database server configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server host (default: "localhost").
    #[serde(default = "default_host")]
    pub host: String,

    /// Native protocol port. Client default when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    /// Username. Client default when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,

    /// Password. Client default when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// Client executable resolved through PATH (default: "clickhouse-client").
    #[serde(default = "default_client_binary")]
    pub client_binary: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: None,
            user: None,
            password: None,
            client_binary: default_client_binary(),
        }
    }
}

impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("client_binary", &self.client_binary)
            .finish()
    }
}

/// Transfer behavior configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferConfig {
    /// Maximum number of client processes running at once (default: 5).
    #[serde(default = "default_parallel")]
    pub parallel: usize,

    /// Delay between polls of running processes in milliseconds (default: 1000).
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Format used for dumped files and load inserts (default: "CSVWithNames").
    #[serde(default = "default_csv_format")]
    pub csv_format: String,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            parallel: default_parallel(),
            poll_interval_ms: default_poll_interval_ms(),
            csv_format: default_csv_format(),
        }
    }
}

/// A dataset repository: a directory whose children are datasets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoConfig {
    pub name: String,

    #[serde(default)]
    pub description: String,

    pub path: PathBuf,
}

// Default value functions for serde
fn default_host() -> String {
    "localhost".to_string()
}

fn default_client_binary() -> String {
    "clickhouse-client".to_string()
}

fn default_parallel() -> usize {
    5
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_csv_format() -> String {
    "CSVWithNames".to_string()
}

fn default_repos() -> Vec<RepoConfig> {
    vec![RepoConfig {
        name: "built-ins".to_string(),
        description: "Built-in dataset repository".to_string(),
        path: PathBuf::from("built-ins"),
    }]
}
