use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_CONFIG_NAME: &str = "scribe.config.json";

/// Scribe client configuration file format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionConfig {
    /// Base websocket URL of the document service
    #[serde(default = "default_server_url")]
    pub server_url: String,

    /// Interval between flushes of pending operations
    #[serde(default = "default_flush_interval_ms")]
    pub flush_interval_ms: u64,
}

fn default_server_url() -> String {
    "ws://127.0.0.1:8000".to_string()
}

fn default_flush_interval_ms() -> u64 {
    1000
}

impl SessionConfig {
    /// Load config from a directory
    pub fn load(cwd: &str) -> anyhow::Result<Self> {
        let config_path = PathBuf::from(cwd).join(DEFAULT_CONFIG_NAME);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: SessionConfig = serde_json::from_str(&content)?;
            config.validate()?;
            Ok(config)
        } else {
            Ok(SessionConfig::default())
        }
    }

    /// Write config into a directory, returning the file path
    pub fn save(&self, cwd: &str) -> anyhow::Result<PathBuf> {
        let config_path = PathBuf::from(cwd).join(DEFAULT_CONFIG_NAME);
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&config_path, json)?;
        Ok(config_path)
    }

    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms.max(1))
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.flush_interval_ms == 0 {
            anyhow::bail!("flushIntervalMs must be greater than zero");
        }
        if !(self.server_url.starts_with("ws://") || self.server_url.starts_with("wss://")) {
            anyhow::bail!("serverUrl must be a ws:// or wss:// URL, got {}", self.server_url);
        }
        Ok(())
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            flush_interval_ms: default_flush_interval_ms(),
        }
    }
}
