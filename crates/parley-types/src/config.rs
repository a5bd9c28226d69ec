//! Service configuration types for Parley.
//!
//! `ServiceConfig` is the top-level `config.toml`. Every field has a default
//! so an empty or missing file yields a runnable in-memory service.

use serde::{Deserialize, Serialize};

use std::fmt;
use std::str::FromStr;

/// Top-level configuration for the Parley service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub server: ServerConfig,
    pub backend: BackendConfig,
    pub graph: GraphConfig,
    pub durable: DurableConfig,
    pub volatile: VolatileConfig,
    pub sync: SyncConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

/// Which family of store adapters the service wires up.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// All three stores in process memory. Nothing survives a restart.
    #[default]
    Memory,
    /// SQLite graph, MongoDB durable store, Redis volatile store.
    External,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Memory => write!(f, "memory"),
            BackendKind::External => write!(f, "external"),
        }
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" => Ok(BackendKind::Memory),
            "external" => Ok(BackendKind::External),
            other => Err(format!("invalid backend kind: '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub kind: BackendKind,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// sqlx SQLite URL. Empty means `{data_dir}/graph.db`.
    pub database_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DurableConfig {
    pub uri: String,
    pub database: String,
    pub collection: String,
    /// Wall-clock budget for each durable-store call.
    pub op_timeout_ms: u64,
}

impl Default for DurableConfig {
    fn default() -> Self {
        Self {
            uri: "mongodb://localhost:27017".to_string(),
            database: "parley".to_string(),
            collection: "chats".to_string(),
            op_timeout_ms: 5_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VolatileConfig {
    pub url: String,
    pub key_prefix: String,
}

impl Default for VolatileConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
            key_prefix: "chat:".to_string(),
        }
    }
}

/// Key that decides whether two messages are the same message during sync.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DedupStrategy {
    /// `(timestamp, body)`. Distinct messages with equal body and timestamp collide.
    #[default]
    TimestampBody,
    /// Message id when both sides carry one, `(timestamp, body)` otherwise.
    MessageId,
}

/// What happens to volatile messages once they are merged into the durable store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolatileRetention {
    /// Leave them; later syncs re-merge them idempotently.
    #[default]
    Keep,
    /// Drop the merged prefix after a successful durable write.
    TrimSynced,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Period of the background sync over live chats. 0 disables it.
    pub interval_secs: u64,
    pub dedup: DedupStrategy,
    pub volatile_retention: VolatileRetention,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            interval_secs: 30,
            dedup: DedupStrategy::default(),
            volatile_retention: VolatileRetention::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub format: LogFormat,
    pub otel: bool,
}
