//! Poller configuration.
//!
//! Stored as TOML at `$SUNPOLL_CONFIG`, or `~/.config/sunpoll/poller.toml`
//! when the variable is unset.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sunpoll_protocol::UdpTarget;
use sunpoll_protocol::constants::{
    DEFAULT_COMM_ADDR, DEFAULT_PORT, DEFAULT_REQUEST_TIMEOUT, DEFAULT_RETRIES,
    DEFAULT_SCAN_INTERVAL,
};

/// Poller configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Display name of the inverter.
    #[serde(default = "default_name")]
    pub name: String,

    /// Inverter IP address or hostname.
    #[serde(default)]
    pub host: String,

    /// UDP port for runtime data queries.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Communication address for runtime data queries.
    #[serde(default = "default_comm_addr")]
    pub comm_addr: u8,

    /// Seconds between polling cycles.
    #[serde(default = "default_scan_interval")]
    pub scan_interval: u64,

    /// Seconds to wait for each query attempt.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Extra query attempts per cycle.
    #[serde(default = "default_retries")]
    pub retries: u8,

    /// Send a wake-up packet every ten minutes.
    #[serde(default)]
    pub keep_alive: bool,

    /// Runtime data query as a hex string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime_query: Option<String>,

    /// Cumulative daily sensors reset to zero at local midnight.
    #[serde(default)]
    pub daily_sensors: Vec<String>,
}

fn default_name() -> String {
    "Solar inverter".into()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_comm_addr() -> u8 {
    DEFAULT_COMM_ADDR
}

fn default_scan_interval() -> u64 {
    DEFAULT_SCAN_INTERVAL.as_secs()
}

fn default_timeout() -> u64 {
    DEFAULT_REQUEST_TIMEOUT.as_secs()
}

fn default_retries() -> u8 {
    DEFAULT_RETRIES
}

impl Default for Config {
    fn default() -> Self {
        Self {
            name: default_name(),
            host: String::new(),
            port: default_port(),
            comm_addr: default_comm_addr(),
            scan_interval: default_scan_interval(),
            timeout: default_timeout(),
            retries: default_retries(),
            keep_alive: false,
            runtime_query: None,
            daily_sensors: Vec::new(),
        }
    }
}

impl Config {
    /// Loads configuration from disk, or creates a default if not found.
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&config_path())
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            let config = Config::default();
            config.save_to(path)?;
            tracing::info!(path = %path.display(), "default configuration written");
            Ok(config)
        }
    }

    /// Saves the configuration to `path`.
    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        // Restrict permissions on Unix.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
        }

        tracing::debug!(path = %path.display(), "configuration saved");
        Ok(())
    }

    pub fn scan_interval(&self) -> Duration {
        Duration::from_secs(self.scan_interval.max(1))
    }

    /// Target of runtime data queries.
    pub fn runtime_target(&self) -> anyhow::Result<UdpTarget> {
        anyhow::ensure!(!self.host.is_empty(), "`host` is not configured");
        Ok(UdpTarget {
            host: self.host.clone(),
            port: self.port,
            comm_addr: self.comm_addr,
            timeout: Duration::from_secs(self.timeout.max(1)),
            retries: self.retries,
        })
    }

    /// Decoded runtime data query.
    pub fn runtime_query(&self) -> anyhow::Result<Vec<u8>> {
        let raw = self
            .runtime_query
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("`runtime_query` is not configured"))?;
        let cleaned: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
        let bytes = hex::decode(&cleaned)
            .map_err(|e| anyhow::anyhow!("`runtime_query` is not valid hex: {e}"))?;
        anyhow::ensure!(!bytes.is_empty(), "`runtime_query` is empty");
        Ok(bytes)
    }
}

/// Returns the configuration file path.
fn config_path() -> PathBuf {
    if let Ok(path) = std::env::var("SUNPOLL_CONFIG") {
        return PathBuf::from(path);
    }

    #[cfg(target_os = "windows")]
    {
        let appdata =
            std::env::var("APPDATA").unwrap_or_else(|_| "C:\\Users\\Default\\AppData".into());
        PathBuf::from(appdata).join("sunpoll").join("poller.toml")
    }

    #[cfg(not(target_os = "windows"))]
    {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
        PathBuf::from(home)
            .join(".config")
            .join("sunpoll")
            .join("poller.toml")
    }
}
