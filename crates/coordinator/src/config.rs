use std::time::Duration;

use sunpoll_protocol::constants::{DEFAULT_SCAN_INTERVAL, WAKEUP_PERIOD};

/// Settings for one coordinator instance.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Display name used in log lines.
    pub name: String,
    /// Interval between scheduled polling cycles.
    pub update_interval: Duration,
    /// Attach the wake-up module when set.
    pub keep_alive: Option<KeepAliveConfig>,
}

impl CoordinatorConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            update_interval: DEFAULT_SCAN_INTERVAL,
            keep_alive: None,
        }
    }

    pub fn with_update_interval(mut self, interval: Duration) -> Self {
        self.update_interval = interval;
        self
    }

    /// Enables the wake-up module for the device at `host`.
    pub fn with_keep_alive(mut self, host: impl Into<String>) -> Self {
        self.keep_alive = Some(KeepAliveConfig::new(host));
        self
    }
}

/// Settings for the wake-up module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeepAliveConfig {
    pub host: String,
    pub period: Duration,
}

impl KeepAliveConfig {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            period: WAKEUP_PERIOD,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = CoordinatorConfig::new("GW10K-ET");
        assert_eq!(config.update_interval, Duration::from_secs(30));
        assert!(config.keep_alive.is_none());
    }

    #[test]
    fn keep_alive_uses_ten_minute_period() {
        let config = CoordinatorConfig::new("GW10K-ET").with_keep_alive("192.168.1.20");
        let ka = config.keep_alive.unwrap();
        assert_eq!(ka.host, "192.168.1.20");
        assert_eq!(ka.period, Duration::from_secs(600));
    }
}
