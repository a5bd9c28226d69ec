//! Service configuration loader for Parley.
//!
//! Reads a TOML file into [`ServiceConfig`], falling back to defaults when the
//! file is missing or unusable, then applies `PARLEY_*` environment
//! overrides on top.

use std::path::{Path, PathBuf};

use parley_types::config::ServiceConfig;

/// Explicit config file path, checked when no `--config` flag is given.
pub const CONFIG_ENV: &str = "PARLEY_CONFIG";

/// Data directory override. Defaults to `~/.parley`.
pub const DATA_DIR_ENV: &str = "PARLEY_DATA_DIR";

/// Resolve the data directory.
///
/// Priority:
/// 1. `PARLEY_DATA_DIR` environment variable
/// 2. `~/.parley`
/// 3. `.parley` in the working directory
pub fn resolve_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        return PathBuf::from(dir);
    }

    if let Some(home) = dirs::home_dir() {
        return home.join(".parley");
    }

    PathBuf::from(".parley")
}

/// Pick the config file: the explicit path, then `PARLEY_CONFIG`, then
/// `{data_dir}/config.toml`.
pub fn resolve_config_path(explicit: Option<&Path>, data_dir: &Path) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    if let Ok(path) = std::env::var(CONFIG_ENV) {
        return PathBuf::from(path);
    }
    data_dir.join("config.toml")
}

/// Why a config file could not be used.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("ignoring {var}={value}: {message}")]
    Env {
        var: &'static str,
        value: String,
        message: String,
    },
}

/// Load `config_path` and apply environment overrides.
///
/// A file that exists but cannot be used yields the defaults (still with
/// environment overrides). Every problem found along the way is returned
/// rather than logged, so the caller can report them once logging is up.
pub async fn load_config(config_path: &Path) -> (ServiceConfig, Vec<ConfigError>) {
    let mut problems = Vec::new();
    let mut config = match load_config_file(config_path).await {
        Ok(config) => config,
        Err(e) => {
            problems.push(e);
            ServiceConfig::default()
        }
    };
    problems.extend(apply_env_overrides(&mut config, |key| std::env::var(key).ok()));
    (config, problems)
}

/// Parse a config file without looking at the environment.
///
/// A missing file is not an error: it yields [`ServiceConfig::default()`].
pub async fn load_config_file(config_path: &Path) -> Result<ServiceConfig, ConfigError> {
    let content = match tokio::fs::read_to_string(config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Ok(ServiceConfig::default());
        }
        Err(source) => {
            return Err(ConfigError::Read {
                path: config_path.to_path_buf(),
                source,
            });
        }
    };

    toml::from_str::<ServiceConfig>(&content).map_err(|source| ConfigError::Parse {
        path: config_path.to_path_buf(),
        source,
    })
}

/// Overlay `PARLEY_*` variables onto `config`.
///
/// `lookup` is the environment; tests pass a map instead. Values that do not
/// parse are skipped and reported.
pub fn apply_env_overrides(
    config: &mut ServiceConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> Vec<ConfigError> {
    let mut problems = Vec::new();
    if let Some(url) = lookup("PARLEY_GRAPH_URL") {
        config.graph.database_url = url;
    }
    if let Some(uri) = lookup("PARLEY_MONGO_URI") {
        config.durable.uri = uri;
    }
    if let Some(database) = lookup("PARLEY_MONGO_DATABASE") {
        config.durable.database = database;
    }
    if let Some(collection) = lookup("PARLEY_MONGO_COLLECTION") {
        config.durable.collection = collection;
    }
    if let Some(url) = lookup("PARLEY_REDIS_URL") {
        config.volatile.url = url;
    }
    if let Some(host) = lookup("PARLEY_HOST") {
        config.server.host = host;
    }
    if let Some(port) = lookup("PARLEY_PORT") {
        match port.parse() {
            Ok(port) => config.server.port = port,
            Err(err) => problems.push(ConfigError::Env {
                var: "PARLEY_PORT",
                value: port,
                message: format!("{err}"),
            }),
        }
    }
    problems
}
