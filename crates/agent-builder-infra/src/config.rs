//! Configuration loader for Agent Builder.
//!
//! Reads `config.toml` from the data directory (`~/.agent-builder/` in
//! production) and deserializes it into [`AppConfig`]. A missing file yields
//! the defaults; a malformed one is reported to the caller.

use std::path::{Path, PathBuf};

use agent_builder_types::config::AppConfig;
use agent_builder_types::error::ConfigError;

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "AGENT_BUILDER_DATA_DIR";

/// Config file name inside the data directory.
pub const CONFIG_FILE: &str = "config.toml";

/// Resolve the data directory.
///
/// Uses `AGENT_BUILDER_DATA_DIR` when set, otherwise `~/.agent-builder`.
pub fn resolve_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        return PathBuf::from(dir);
    }

    if let Some(home) = dirs::home_dir() {
        return home.join(".agent-builder");
    }

    // Last resort: current directory
    PathBuf::from(".agent-builder")
}

/// Read and parse `{data_dir}/config.toml`.
///
/// A missing file is not an error and yields the defaults.
pub async fn try_load_app_config(data_dir: &Path) -> Result<AppConfig, ConfigError> {
    let config_path = data_dir.join(CONFIG_FILE);

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config.toml found at {}, using defaults", config_path.display());
            return Ok(AppConfig::default());
        }
        Err(err) => {
            return Err(ConfigError::Read {
                path: config_path.display().to_string(),
                message: err.to_string(),
            });
        }
    };

    toml::from_str::<AppConfig>(&content).map_err(|err| ConfigError::Parse {
        path: config_path.display().to_string(),
        message: err.to_string(),
    })
}
