// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Per-device session pooling.
//!
//! The [`ConnectionPool`] keeps, for every device, a bounded set of live
//! sessions so repeated operations on the same miner reuse connections
//! instead of reopening them.
//!
//! # Lifecycle
//!
//! A session is *created* by the device's driver, *active* while checked out,
//! *idle* once returned, and eventually *closed* when the idle list is full,
//! when it outlives the idle time-to-live, or when the pool shuts down.
//!
//! # Limits
//!
//! - `max_open` bounds the sessions checked out at once. Checkout never
//!   waits: once the bound is reached it fails with
//!   [`DeviceError::PoolExhausted`](crate::error::DeviceError::PoolExhausted).
//! - `max_idle` bounds the sessions kept for reuse; extra returned sessions
//!   are closed immediately.
//! - `idle_ttl` bounds the age of idle sessions; [`ConnectionPool::clean_up`]
//!   closes older ones.
//!
//! Limits are captured when a device's pool is first created. Changing them
//! with [`ConnectionPool::set_limits`] only affects devices seen afterwards.
//!
//! # Device records
//!
//! Each device pool serves one generation of a device record. Checking out
//! with a newer record (the miner was re-registered at another endpoint or
//! with another driver) closes the older pool and starts a fresh one; an
//! outdated record is refused with
//! [`DeviceError::PoolClosed`](crate::error::DeviceError::PoolClosed).

mod device_pool;
mod session;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::config::PoolConfig;
use crate::error::{DeviceError, Result};
use crate::manager::Device;
use crate::types::MinerId;

use device_pool::{DevicePool, close_quietly};

pub use session::{PooledSession, SessionId};

/// Counters for one device's session pool.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolStats {
    /// Sessions currently checked out.
    pub active_connections: usize,
    /// Sessions waiting for reuse.
    pub idle_connections: usize,
    /// Configured maximum of checked-out sessions.
    pub max_open: usize,
    /// Configured maximum of idle sessions.
    pub max_idle: usize,
}

/// Pool of sessions for every device, keyed by miner id.
///
/// Each device gets its own pool behind its own lock, so a slow or exhausted
/// device never blocks checkouts for another one.
///
/// # Examples
///
/// ```no_run
/// use multiminer_lib::ConnectionPool;
/// # use multiminer_lib::Device;
///
/// # async fn example(device: Device) -> multiminer_lib::Result<()> {
/// let pool = ConnectionPool::new();
///
/// let session = pool.get_session(&device).await?;
/// let _summary = session.summary().await;
/// pool.return_session(session).await?;
///
/// // The next checkout reuses the same session.
/// let again = pool.get_session(&device).await?;
/// # pool.return_session(again).await?;
/// # Ok(())
/// # }
/// ```
pub struct ConnectionPool {
    pools: RwLock<Pools>,
    limits: RwLock<PoolConfig>,
}

#[derive(Default)]
struct Pools {
    by_device: HashMap<MinerId, Arc<DevicePool>>,
    /// Newest record generation seen per device.
    generations: HashMap<MinerId, u64>,
}

impl ConnectionPool {
    /// Creates a pool with default limits.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(PoolConfig::default())
    }

    /// Creates a pool with the given limits.
    #[must_use]
    pub fn with_config(config: PoolConfig) -> Self {
        Self {
            pools: RwLock::new(Pools::default()),
            limits: RwLock::new(config),
        }
    }

    /// Sets the limits used for device pools created from now on.
    ///
    /// Existing device pools keep the limits they were created with.
    pub fn set_limits(&self, max_idle: usize, max_open: usize, idle_ttl: Duration) {
        self.set_config(PoolConfig::new(max_idle, max_open, idle_ttl));
    }

    /// Sets the limits used for device pools created from now on.
    pub fn set_config(&self, config: PoolConfig) {
        *self.limits.write() = config;
    }

    /// Returns the limits applied to newly created device pools.
    #[must_use]
    pub fn config(&self) -> PoolConfig {
        *self.limits.read()
    }

    /// Checks out a session for the device.
    ///
    /// Reuses the most recently returned idle session if there is one,
    /// otherwise opens a new session through the device's driver.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError::PoolExhausted`] if `max_open` sessions are
    /// already checked out, [`DeviceError::PoolClosed`] if a newer record of
    /// the device has been seen, or the driver's error if opening fails.
    pub async fn get_session(&self, device: &Device) -> Result<PooledSession> {
        let (pool, retired) = self.device_pool(device)?;

        if let Some(retired) = retired {
            tracing::debug!(device_id = %device.id, "Device record changed, closing older pool");
            retired.close_all().await;
        }

        pool.checkout(device).await
    }

    /// Gives a checked-out session back to the device pool it came from.
    ///
    /// The session is kept idle if the device has room for it and closed
    /// otherwise. If its pool is gone the session is simply closed.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError::InvalidSession`] if the session was shut down by
    /// [`close`](Self::close) or by a change of the device record.
    pub async fn return_session(&self, session: PooledSession) -> Result<()> {
        // Invalidated by a shutdown; the session is already closed.
        if !session.is_valid() {
            return Err(DeviceError::InvalidSession(session.id().value()).into());
        }

        let Some(origin) = session.origin() else {
            tracing::debug!(
                device_id = %session.device_id(),
                session_id = %session.id(),
                "Device pool is gone, closing returned session"
            );
            close_quietly(session.into_session()).await;
            return Ok(());
        };

        let ours = self
            .pools
            .read()
            .by_device
            .get(session.device_id())
            .is_some_and(|pool| Arc::ptr_eq(pool, &origin));
        if !ours {
            tracing::debug!(
                device_id = %session.device_id(),
                session_id = %session.id(),
                "Session belongs to another pool, returning it there"
            );
        }

        origin.checkin(session).await
    }

    /// Closes idle sessions that outlived the idle time-to-live, across all
    /// devices.
    ///
    /// Returns the number of evicted sessions.
    pub async fn clean_up(&self) -> usize {
        let pools: Vec<Arc<DevicePool>> = self.pools.read().by_device.values().cloned().collect();

        let mut evicted = 0;
        for pool in pools {
            evicted += pool.clean_expired().await;
        }

        if evicted > 0 {
            tracing::debug!(evicted, "Evicted expired idle sessions");
        }
        evicted
    }

    /// Closes every session of one device and forgets its pool.
    ///
    /// Returns false if the device had no pool.
    pub async fn remove_device(&self, id: &MinerId) -> bool {
        let pool = self.pools.write().by_device.remove(id);

        match pool {
            Some(pool) => {
                pool.close_all().await;
                true
            }
            None => false,
        }
    }

    /// Closes every idle and active session and forgets all device pools.
    ///
    /// Close failures are logged, not reported.
    pub async fn close(&self) {
        let pools = std::mem::take(&mut self.pools.write().by_device);

        for (id, pool) in pools {
            tracing::debug!(device_id = %id, "Closing device pool");
            pool.close_all().await;
        }
    }

    /// Returns a snapshot of the counters of every device pool.
    #[must_use]
    pub fn stats(&self) -> HashMap<MinerId, PoolStats> {
        self.pools
            .read()
            .by_device
            .iter()
            .map(|(id, pool)| (id.clone(), pool.stats()))
            .collect()
    }

    /// Closes the device's pool if it serves an older record than `device`,
    /// and refuses older records from now on.
    ///
    /// Returns true if a pool was closed.
    pub(crate) async fn retire_older(&self, device: &Device) -> bool {
        let retired = {
            let mut pools = self.pools.write();
            let pools = &mut *pools;
            let newest = pools.generations.entry(device.id.clone()).or_default();
            *newest = (*newest).max(device.generation);

            match pools.by_device.get(&device.id) {
                Some(pool) if pool.generation() < device.generation => {
                    pools.by_device.remove(&device.id)
                }
                _ => None,
            }
        };

        match retired {
            Some(pool) => {
                pool.close_all().await;
                true
            }
            None => false,
        }
    }

    /// Returns the pool serving this record of the device, creating it with
    /// the current limits, along with an older pool it replaced.
    fn device_pool(&self, device: &Device) -> Result<(Arc<DevicePool>, Option<Arc<DevicePool>>)> {
        if let Some(pool) = self.pools.read().by_device.get(&device.id)
            && pool.generation() == device.generation
        {
            return Ok((Arc::clone(pool), None));
        }

        let limits = self.config();
        let mut pools = self.pools.write();
        let pools = &mut *pools;

        let newest = pools
            .generations
            .entry(device.id.clone())
            .or_insert(device.generation);
        if device.generation < *newest {
            tracing::debug!(device_id = %device.id, "Refusing checkout for outdated device record");
            return Err(DeviceError::PoolClosed.into());
        }
        *newest = device.generation;

        match pools.by_device.get(&device.id) {
            Some(pool) if pool.generation() == device.generation => Ok((Arc::clone(pool), None)),
            _ => {
                let pool = Arc::new(DevicePool::new(limits, device.generation));
                let retired = pools.by_device.insert(device.id.clone(), Arc::clone(&pool));
                Ok((pool, retired))
            }
        }
    }
}

impl Default for ConnectionPool {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ConnectionPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionPool")
            .field("devices", &self.pools.read().by_device.len())
            .field("limits", &self.config())
            .finish()
    }
}
