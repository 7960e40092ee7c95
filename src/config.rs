// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Configuration for the connection pool and the device manager.
//!
//! Both structures deserialize with `serde`, missing fields falling back to
//! their defaults, so host applications can embed them in their own
//! configuration files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Limits applied to each per-device session pool.
///
/// # Examples
///
/// ```
/// use multiminer_lib::PoolConfig;
/// use std::time::Duration;
///
/// let config = PoolConfig::default()
///     .with_max_idle(2)
///     .with_max_open(4)
///     .with_idle_ttl(Duration::from_secs(60));
///
/// assert_eq!(config.max_idle, 2);
/// assert_eq!(config.max_open, 4);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Maximum number of idle sessions kept per device.
    pub max_idle: usize,
    /// Maximum number of sessions checked out at once per device.
    pub max_open: usize,
    /// Age after which an idle session is closed by the cleanup pass.
    #[serde(with = "duration_secs")]
    pub idle_ttl: Duration,
}

impl PoolConfig {
    /// Default maximum number of idle sessions per device.
    pub const DEFAULT_MAX_IDLE: usize = 5;
    /// Default maximum number of open sessions per device.
    pub const DEFAULT_MAX_OPEN: usize = 10;
    /// Default idle session time-to-live.
    pub const DEFAULT_IDLE_TTL: Duration = Duration::from_secs(5 * 60);

    /// Creates a configuration with explicit limits.
    #[must_use]
    pub const fn new(max_idle: usize, max_open: usize, idle_ttl: Duration) -> Self {
        Self {
            max_idle,
            max_open,
            idle_ttl,
        }
    }

    /// Sets the maximum number of idle sessions.
    #[must_use]
    pub fn with_max_idle(mut self, max_idle: usize) -> Self {
        self.max_idle = max_idle;
        self
    }

    /// Sets the maximum number of open sessions.
    #[must_use]
    pub fn with_max_open(mut self, max_open: usize) -> Self {
        self.max_open = max_open;
        self
    }

    /// Sets the idle session time-to-live.
    #[must_use]
    pub fn with_idle_ttl(mut self, idle_ttl: Duration) -> Self {
        self.idle_ttl = idle_ttl;
        self
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self::new(
            Self::DEFAULT_MAX_IDLE,
            Self::DEFAULT_MAX_OPEN,
            Self::DEFAULT_IDLE_TTL,
        )
    }
}

/// Configuration for a [`Manager`](crate::Manager).
///
/// # Examples
///
/// ```
/// use multiminer_lib::{ManagerConfig, PoolConfig};
/// use std::time::Duration;
///
/// let config: ManagerConfig = serde_json::from_str(r#"{
///     "probe_timeout": 2.5,
///     "pool": { "max_open": 3 }
/// }"#).unwrap();
///
/// assert_eq!(config.probe_timeout, Duration::from_millis(2500));
/// assert_eq!(config.pool.max_open, 3);
/// assert_eq!(config.pool.max_idle, PoolConfig::DEFAULT_MAX_IDLE);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// Session pool limits.
    pub pool: PoolConfig,
    /// Time budget handed to drivers for a single detection probe.
    #[serde(with = "duration_secs")]
    pub probe_timeout: Duration,
    /// Period of the idle eviction task.
    #[serde(with = "duration_secs")]
    pub cleanup_interval: Duration,
    /// Whether hosts should start the eviction task at startup.
    pub auto_cleanup: bool,
}

impl ManagerConfig {
    /// Default detection probe budget.
    pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_millis(1200);
    /// Default eviction period.
    pub const DEFAULT_CLEANUP_INTERVAL: Duration = Duration::from_secs(5 * 60);

    /// Sets the pool limits.
    #[must_use]
    pub fn with_pool(mut self, pool: PoolConfig) -> Self {
        self.pool = pool;
        self
    }

    /// Sets the detection probe budget.
    #[must_use]
    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    /// Sets the eviction period.
    #[must_use]
    pub fn with_cleanup_interval(mut self, interval: Duration) -> Self {
        self.cleanup_interval = interval;
        self
    }

    /// Enables or disables the eviction task at startup.
    #[must_use]
    pub fn with_auto_cleanup(mut self, enabled: bool) -> Self {
        self.auto_cleanup = enabled;
        self
    }
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            pool: PoolConfig::default(),
            probe_timeout: Self::DEFAULT_PROBE_TIMEOUT,
            cleanup_interval: Self::DEFAULT_CLEANUP_INTERVAL,
            auto_cleanup: true,
        }
    }
}

/// Durations are written as fractional seconds.
mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_defaults() {
        let config = PoolConfig::default();
        assert_eq!(config.max_idle, 5);
        assert_eq!(config.max_open, 10);
        assert_eq!(config.idle_ttl, Duration::from_secs(300));
    }

    #[test]
    fn manager_defaults() {
        let config = ManagerConfig::default();
        assert_eq!(config.probe_timeout, Duration::from_millis(1200));
        assert_eq!(config.cleanup_interval, Duration::from_secs(300));
        assert!(config.auto_cleanup);
        assert_eq!(config.pool, PoolConfig::default());
    }

    #[test]
    fn empty_document_uses_defaults() {
        let config: ManagerConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, ManagerConfig::default());
    }

    #[test]
    fn negative_duration_is_rejected() {
        let result = serde_json::from_str::<PoolConfig>(r#"{ "idle_ttl": -1 }"#);
        assert!(result.is_err());
    }

    #[test]
    fn serialize_uses_seconds() {
        let config = PoolConfig::new(1, 2, Duration::from_millis(1500));
        let json = serde_json::to_value(config).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "max_idle": 1, "max_open": 2, "idle_ttl": 1.5 })
        );
    }

    #[test]
    fn builder_methods() {
        let config = ManagerConfig::default()
            .with_pool(PoolConfig::default().with_max_open(1))
            .with_probe_timeout(Duration::from_secs(3))
            .with_cleanup_interval(Duration::from_secs(30))
            .with_auto_cleanup(false);

        assert_eq!(config.pool.max_open, 1);
        assert_eq!(config.probe_timeout, Duration::from_secs(3));
        assert_eq!(config.cleanup_interval, Duration::from_secs(30));
        assert!(!config.auto_cleanup);
    }
}
