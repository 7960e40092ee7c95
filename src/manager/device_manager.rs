// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device manager for coordinating a fleet of miners.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;

use crate::capabilities::Capabilities;
use crate::config::ManagerConfig;
use crate::driver::{Driver, Session};
use crate::error::{Error, Result};
use crate::pool::{ConnectionPool, PoolStats};
use crate::registry::Registry;
use crate::types::{Endpoint, MinerId};

use super::cleanup::CleanupTask;
use super::device::{Device, DeviceInfo};

/// Manager for coordinating many miners.
///
/// The `Manager` keeps the device table, resolves drivers through the
/// [`Registry`] on registration and lends out pooled sessions around
/// caller-supplied operations.
///
/// Cloning a manager is cheap; clones share the same devices, pool and
/// cleanup task.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use multiminer_lib::{Endpoint, Manager, MinerId, Registry};
///
/// # async fn example(registry: Arc<Registry>) -> multiminer_lib::Result<()> {
/// let manager = Manager::new(registry);
///
/// let id = MinerId::new("rack-1-slot-4");
/// manager
///     .add_or_detect(id.clone(), Endpoint::new("10.0.0.14:4028"), None)
///     .await?;
///
/// let summary = manager
///     .with_session(&id, async |session| session.summary().await)
///     .await?;
/// println!("accepted shares: {}", summary.accepted);
///
/// manager.close().await;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Manager {
    registry: Arc<Registry>,
    /// Registered devices, keyed by miner id.
    devices: Arc<RwLock<HashMap<MinerId, Device>>>,
    pool: Arc<ConnectionPool>,
    config: ManagerConfig,
    cleanup: Arc<Mutex<Option<CleanupTask>>>,
}

impl Manager {
    /// Creates a manager with default configuration.
    #[must_use]
    pub fn new(registry: Arc<Registry>) -> Self {
        Self::with_config(registry, ManagerConfig::default())
    }

    /// Creates a manager whose pool uses the limits in `config`.
    #[must_use]
    pub fn with_config(registry: Arc<Registry>, config: ManagerConfig) -> Self {
        Self {
            registry,
            devices: Arc::new(RwLock::new(HashMap::new())),
            pool: Arc::new(ConnectionPool::with_config(config.pool)),
            config,
            cleanup: Arc::new(Mutex::new(None)),
        }
    }

    /// Returns the driver registry.
    #[must_use]
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Returns the configuration the manager was created with.
    #[must_use]
    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    /// Returns the session pool.
    #[must_use]
    pub fn pool(&self) -> &Arc<ConnectionPool> {
        &self.pool
    }

    // =========================================================================
    // Device Management
    // =========================================================================

    /// Registers a miner, detecting its driver if none is given.
    ///
    /// An existing record with the same id is replaced. If the replacement
    /// points at a different endpoint or driver, the sessions pooled for the
    /// old record are closed.
    ///
    /// # Errors
    ///
    /// Returns the detection error, or [`Error::DriverNotFound`] if no
    /// registered driver claims the endpoint. The device table is unchanged
    /// on failure.
    pub async fn add_or_detect(
        &self,
        id: MinerId,
        endpoint: Endpoint,
        driver: Option<Arc<dyn Driver>>,
    ) -> Result<DeviceInfo> {
        let driver = match driver {
            Some(driver) => driver,
            None => self.registry.detect(&endpoint).await?,
        };

        let mut device = Device::new(id, endpoint, driver);
        let info = device.info();

        let previous = {
            let mut devices = self.devices.write();
            if let Some(previous) = devices.get(&device.id)
                && previous.same_target(&device)
            {
                device.generation = previous.generation;
            }
            devices.insert(device.id.clone(), device.clone())
        };
        tracing::debug!(
            device_id = %info.id,
            address = %info.address,
            driver = %info.driver,
            replaced = previous.is_some(),
            "Device registered"
        );

        if previous.is_some_and(|previous| previous.generation != device.generation) {
            tracing::debug!(
                device_id = %info.id,
                "Device target changed, draining pooled sessions"
            );
            self.pool.retire_older(&device).await;
        }

        Ok(info)
    }

    /// Registers a miner using a driver looked up by name, or detection when
    /// no name is given.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownDriver`] if the name is not registered, and
    /// otherwise the same errors as [`add_or_detect`](Self::add_or_detect).
    pub async fn add_device(
        &self,
        id: MinerId,
        endpoint: Endpoint,
        driver_name: Option<&str>,
    ) -> Result<DeviceInfo> {
        let driver = match driver_name {
            Some(name) => Some(
                self.registry
                    .get(name)
                    .ok_or_else(|| Error::UnknownDriver(name.to_string()))?,
            ),
            None => None,
        };
        self.add_or_detect(id, endpoint, driver).await
    }

    /// Returns a snapshot of every registered device.
    #[must_use]
    pub fn list(&self) -> Vec<Device> {
        self.devices.read().values().cloned().collect()
    }

    /// Returns serializable views of every registered device.
    #[must_use]
    pub fn device_infos(&self) -> Vec<DeviceInfo> {
        self.devices.read().values().map(Device::info).collect()
    }

    /// Returns the record of a device.
    #[must_use]
    pub fn device(&self, id: &MinerId) -> Option<Device> {
        self.devices.read().get(id).cloned()
    }

    /// Returns the number of registered devices.
    #[must_use]
    pub fn device_count(&self) -> usize {
        self.devices.read().len()
    }

    /// Returns the capabilities of a device's driver.
    #[must_use]
    pub fn capabilities(&self, id: &MinerId) -> Option<Capabilities> {
        self.devices.read().get(id).map(Device::capabilities)
    }

    // =========================================================================
    // Sessions
    // =========================================================================

    /// Runs `f` against a pooled session of the device.
    ///
    /// The session is given back to the pool once `f` completes, whether it
    /// succeeded or not. A failure to give it back is logged, not returned.
    /// If the returned future is dropped early, the session is closed instead.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the device is not registered (`f` is
    /// not called), the checkout error if no session can be obtained, or
    /// whatever `f` returns.
    pub async fn with_session<T, F>(&self, id: &MinerId, f: F) -> Result<T>
    where
        F: AsyncFnOnce(&dyn Session) -> Result<T>,
    {
        let device = self
            .device(id)
            .ok_or_else(|| Error::NotFound(id.clone()))?;

        let session = self.pool.get_session(&device).await?;
        let result = f(session.session()).await;

        if let Err(e) = self.pool.return_session(session).await {
            tracing::warn!(device_id = %id, error = %e, "Failed to return session to pool");
        }

        result
    }

    /// Returns the pool counters of every device that has pooled sessions.
    #[must_use]
    pub fn pool_stats(&self) -> HashMap<MinerId, PoolStats> {
        self.pool.stats()
    }

    // =========================================================================
    // Cleanup
    // =========================================================================

    /// Starts the periodic eviction of expired idle sessions.
    ///
    /// The task runs until `cancel` fires, [`stop_cleanup`](Self::stop_cleanup)
    /// is called or the manager is closed. Starting a new task cancels the
    /// previous one.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime.
    pub fn start_cleanup(&self, interval: Duration, cancel: CancellationToken) -> CleanupTask {
        let task = CleanupTask::spawn(Arc::clone(&self.pool), interval, cancel);

        if let Some(previous) = self.cleanup.lock().replace(task.clone()) {
            previous.cancel();
        }
        task
    }

    /// Starts the eviction task with the configured interval if the
    /// configuration enables it.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime.
    pub fn start_auto_cleanup(&self) -> Option<CleanupTask> {
        self.config.auto_cleanup.then(|| {
            self.start_cleanup(self.config.cleanup_interval, CancellationToken::new())
        })
    }

    /// Stops the eviction task, if any, and waits for it to exit.
    pub async fn stop_cleanup(&self) {
        let task = self.cleanup.lock().take();
        if let Some(task) = task {
            task.stop().await;
        }
    }

    /// Returns true if an eviction task is running.
    #[must_use]
    pub fn is_cleanup_running(&self) -> bool {
        self.cleanup
            .lock()
            .as_ref()
            .is_some_and(CleanupTask::is_running)
    }

    /// Stops the eviction task and closes every pooled session.
    ///
    /// Registered devices are kept; later operations open new sessions.
    pub async fn close(&self) {
        self.stop_cleanup().await;
        self.pool.close().await;
        tracing::debug!("Manager closed");
    }
}

impl std::fmt::Debug for Manager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Manager")
            .field("devices", &self.device_count())
            .field("registry", &self.registry)
            .field("pool", &self.pool)
            .field("cleanup_running", &self.is_cleanup_running())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use super::*;
    use crate::config::PoolConfig;
    use crate::error::DeviceError;
    use crate::testing::MockDriver;

    fn manager_with(drivers: &[Arc<MockDriver>]) -> Manager {
        let registry = Arc::new(Registry::new());
        for driver in drivers {
            registry.register(Arc::clone(driver) as Arc<dyn Driver>);
        }
        Manager::with_config(
            registry,
            ManagerConfig::default().with_pool(PoolConfig::new(2, 2, Duration::from_secs(60))),
        )
    }

    fn id(value: &str) -> MinerId {
        MinerId::new(value)
    }

    fn endpoint(value: &str) -> Endpoint {
        Endpoint::new(value)
    }

    #[tokio::test]
    async fn add_or_detect_uses_registry() {
        let skipped = MockDriver::rejecting("braiins");
        let cgminer = MockDriver::new("cgminer");
        let manager = manager_with(&[Arc::clone(&skipped), Arc::clone(&cgminer)]);

        let info = manager
            .add_or_detect(id("rig"), endpoint("10.0.0.1:4028"), None)
            .await
            .unwrap();

        assert_eq!(info.driver, "cgminer");
        assert_eq!(skipped.detected(), 1);
        assert_eq!(cgminer.detected(), 1);
        assert_eq!(manager.device_count(), 1);
    }

    #[tokio::test]
    async fn explicit_driver_skips_detection() {
        let cgminer = MockDriver::new("cgminer");
        let manager = manager_with(&[Arc::clone(&cgminer)]);

        manager
            .add_or_detect(
                id("rig"),
                endpoint("10.0.0.1:4028"),
                Some(Arc::clone(&cgminer) as Arc<dyn Driver>),
            )
            .await
            .unwrap();

        assert_eq!(cgminer.detected(), 0);
    }

    #[tokio::test]
    async fn failed_detection_leaves_table_unchanged() {
        let manager = manager_with(&[MockDriver::rejecting("cgminer")]);

        let err = manager
            .add_or_detect(id("rig"), endpoint("10.0.0.1:4028"), None)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::DriverNotFound));
        assert_eq!(manager.device_count(), 0);
    }

    #[tokio::test]
    async fn re_registering_overwrites() {
        let cgminer = MockDriver::new("cgminer");
        let luxos = MockDriver::new("luxos");
        let manager = manager_with(&[Arc::clone(&cgminer), Arc::clone(&luxos)]);

        manager
            .add_device(id("rig"), endpoint("10.0.0.1:4028"), Some("cgminer"))
            .await
            .unwrap();
        manager
            .add_device(id("rig"), endpoint("10.0.0.2:8080"), Some("luxos"))
            .await
            .unwrap();

        let infos = manager.device_infos();
        assert_eq!(infos.len(), 1);
        assert_eq!(infos[0].address, "10.0.0.2:8080");
        assert_eq!(infos[0].driver, "luxos");
    }

    #[tokio::test]
    async fn retargeting_drains_pooled_sessions() {
        let cgminer = MockDriver::new("cgminer");
        let manager = manager_with(&[Arc::clone(&cgminer)]);
        let rig = id("rig");

        manager
            .add_device(rig.clone(), endpoint("10.0.0.1:4028"), None)
            .await
            .unwrap();
        manager
            .with_session(&rig, async |session| session.summary().await)
            .await
            .unwrap();
        assert_eq!(manager.pool_stats()[&rig].idle_connections, 1);

        // Same target: pooled sessions survive.
        manager
            .add_device(rig.clone(), endpoint("10.0.0.1:4028"), None)
            .await
            .unwrap();
        assert_eq!(manager.pool_stats()[&rig].idle_connections, 1);

        manager
            .add_device(rig.clone(), endpoint("10.0.0.5:4028"), None)
            .await
            .unwrap();
        assert!(manager.pool_stats().is_empty());
        assert_eq!(cgminer.closed(), 1);
    }

    #[tokio::test]
    async fn outdated_record_cannot_reach_old_endpoint() {
        let cgminer = MockDriver::new("cgminer");
        let manager = manager_with(&[Arc::clone(&cgminer)]);
        let rig = id("rig");

        manager
            .add_device(rig.clone(), endpoint("10.0.0.1:4028"), None)
            .await
            .unwrap();
        let outdated = manager.device(&rig).unwrap();
        manager
            .add_device(rig.clone(), endpoint("10.0.0.5:4028"), None)
            .await
            .unwrap();

        let err = manager.pool().get_session(&outdated).await.unwrap_err();
        assert!(matches!(err, Error::Device(DeviceError::PoolClosed)));
        assert!(manager.pool_stats().is_empty());
        assert_eq!(cgminer.opened(), 0);

        manager
            .with_session(&rig, async |session| session.summary().await)
            .await
            .unwrap();
        assert_eq!(manager.pool_stats()[&rig].idle_connections, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_session_is_released() {
        let driver = MockDriver::new("cgminer");
        let registry = Arc::new(Registry::new());
        registry.register(Arc::clone(&driver) as Arc<dyn Driver>);
        let manager = Manager::with_config(
            registry,
            ManagerConfig::default().with_pool(PoolConfig::new(1, 1, Duration::from_secs(60))),
        );
        let rig = id("rig");
        manager
            .add_device(rig.clone(), endpoint("10.0.0.1:4028"), None)
            .await
            .unwrap();

        let cancelled = tokio::time::timeout(
            Duration::from_millis(10),
            manager.with_session(&rig, async |_session| {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            }),
        )
        .await;
        assert!(cancelled.is_err());

        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(manager.pool_stats()[&rig].active_connections, 0);
        assert_eq!(driver.closed(), 1);

        manager
            .with_session(&rig, async |session| session.summary().await)
            .await
            .unwrap();
        assert_eq!(driver.opened(), 2);
    }

    #[tokio::test]
    async fn unknown_driver_name_is_rejected() {
        let manager = manager_with(&[MockDriver::new("cgminer")]);

        let err = manager
            .add_device(id("rig"), endpoint("10.0.0.1:4028"), Some("whatsminer"))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::UnknownDriver(ref name) if name == "whatsminer"));
        assert_eq!(manager.device_count(), 0);
    }

    #[tokio::test]
    async fn with_session_on_unknown_device() {
        let driver = MockDriver::new("cgminer");
        let manager = manager_with(&[Arc::clone(&driver)]);
        let called = AtomicBool::new(false);

        let err = manager
            .with_session(&id("ghost"), async |_session| {
                called.store(true, Ordering::SeqCst);
                Ok(())
            })
            .await
            .unwrap_err();

        assert!(matches!(err, Error::NotFound(ref missing) if missing.as_str() == "ghost"));
        assert!(!called.load(Ordering::SeqCst));
        assert!(manager.pool_stats().is_empty());
        assert_eq!(driver.opened(), 0);
    }

    #[tokio::test]
    async fn with_session_returns_session_on_error() {
        let driver = MockDriver::new("cgminer");
        let manager = manager_with(&[Arc::clone(&driver)]);
        let rig = id("rig");
        manager
            .add_device(rig.clone(), endpoint("10.0.0.1:4028"), None)
            .await
            .unwrap();

        let err = manager
            .with_session(&rig, async |session| session.restart().await)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Device(DeviceError::CommandRejected(ref msg)) if msg == "busy"
        ));

        let stats = manager.pool_stats()[&rig];
        assert_eq!(stats.active_connections, 0);
        assert_eq!(stats.idle_connections, 1);

        let model = manager
            .with_session(&rig, async |session| session.model().await)
            .await
            .unwrap();
        assert_eq!(model.vendor, "Mock");
        assert_eq!(driver.opened(), 1);
    }

    #[tokio::test]
    async fn capabilities_come_from_driver() {
        let manager = manager_with(&[MockDriver::new("cgminer")]);
        let rig = id("rig");
        manager
            .add_device(rig.clone(), endpoint("10.0.0.1:4028"), None)
            .await
            .unwrap();

        let caps = manager.capabilities(&rig).unwrap();
        assert_eq!(caps, Capabilities::cgminer());
        assert!(manager.capabilities(&id("ghost")).is_none());
    }

    #[tokio::test]
    async fn close_keeps_devices_and_is_idempotent() {
        let driver = MockDriver::new("cgminer");
        let manager = manager_with(&[Arc::clone(&driver)]);
        let rig = id("rig");
        manager
            .add_device(rig.clone(), endpoint("10.0.0.1:4028"), None)
            .await
            .unwrap();
        manager
            .with_session(&rig, async |session| session.stats().await)
            .await
            .unwrap();

        manager.close().await;
        manager.close().await;

        assert!(manager.pool_stats().is_empty());
        assert_eq!(driver.closed(), 1);
        assert_eq!(manager.device_count(), 1);
    }

    #[tokio::test]
    async fn starting_cleanup_replaces_previous_task() {
        let manager = manager_with(&[]);

        let first = manager.start_cleanup(Duration::from_secs(60), CancellationToken::new());
        let second = manager.start_cleanup(Duration::from_secs(60), CancellationToken::new());

        first.stop().await;
        assert!(!first.is_running());
        assert!(second.is_running());
        assert!(manager.is_cleanup_running());

        manager.close().await;
        assert!(!second.is_running());
        assert!(!manager.is_cleanup_running());
    }

    #[tokio::test]
    async fn auto_cleanup_follows_config() {
        let registry = Arc::new(Registry::new());
        let disabled = Manager::with_config(
            Arc::clone(&registry),
            ManagerConfig::default().with_auto_cleanup(false),
        );
        assert!(disabled.start_auto_cleanup().is_none());
        assert!(!disabled.is_cleanup_running());

        let enabled = Manager::new(registry);
        let task = enabled.start_auto_cleanup().unwrap();
        assert!(task.is_running());
        enabled.close().await;
    }
}
