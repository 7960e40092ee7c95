// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Driver and session contracts.
//!
//! A [`Driver`] represents one firmware family (cgminer, `BraiinsOS`, `LuxOS`,
//! ...). It knows how to recognise an endpoint and how to open a [`Session`]
//! to it. Sessions are the live handles the manager pools and lends out.
//!
//! Both traits are object safe so the registry can hold heterogeneous
//! drivers behind `Arc<dyn Driver>`.
//!
//! # Implementing a driver
//!
//! ```
//! use async_trait::async_trait;
//! use multiminer_lib::driver::{Driver, Session};
//! use multiminer_lib::{Capabilities, DeviceStats, Endpoint, Model, Result, Summary};
//!
//! struct NullDriver;
//! struct NullSession;
//!
//! #[async_trait]
//! impl Driver for NullDriver {
//!     fn name(&self) -> &str {
//!         "null"
//!     }
//!
//!     async fn detect(&self, _endpoint: &Endpoint) -> Result<bool> {
//!         Ok(false)
//!     }
//!
//!     fn capabilities(&self) -> Capabilities {
//!         Capabilities::read_only()
//!     }
//!
//!     async fn open(&self, _endpoint: &Endpoint) -> Result<Box<dyn Session>> {
//!         Ok(Box::new(NullSession))
//!     }
//! }
//!
//! #[async_trait]
//! impl Session for NullSession {
//!     async fn close(&self) -> Result<()> {
//!         Ok(())
//!     }
//!
//!     async fn model(&self) -> Result<Model> {
//!         Ok(Model::default())
//!     }
//!
//!     async fn stats(&self) -> Result<DeviceStats> {
//!         Ok(DeviceStats::default())
//!     }
//!
//!     async fn summary(&self) -> Result<Summary> {
//!         Ok(Summary::default())
//!     }
//! }
//! ```

use async_trait::async_trait;

use crate::Capabilities;
use crate::error::{DeviceError, Result};
use crate::types::{DeviceStats, Endpoint, FanConfig, MiningPool, Model, PowerMode, Summary};

/// A firmware family implementation.
///
/// Drivers are registered once and shared for the lifetime of the process.
#[async_trait]
pub trait Driver: Send + Sync {
    /// Stable identifier, used for lookups and stored on each device record.
    fn name(&self) -> &str;

    /// Checks whether the endpoint belongs to this driver.
    ///
    /// Must be a bounded-time probe without side effects on the device.
    /// Returning `Ok(false)` lets the registry try the next driver; returning
    /// an error aborts detection altogether.
    ///
    /// # Errors
    ///
    /// Returns an error if the probe cannot decide (network failure, timeout).
    async fn detect(&self, endpoint: &Endpoint) -> Result<bool>;

    /// Returns the static feature set of this driver.
    fn capabilities(&self) -> Capabilities;

    /// Opens a new session to the endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be established.
    async fn open(&self, endpoint: &Endpoint) -> Result<Box<dyn Session>>;
}

/// A live handle to one miner.
///
/// Only `close` and the core read operations are required; everything else
/// defaults to [`DeviceError::Unsupported`] so drivers implement exactly what
/// their firmware offers.
#[async_trait]
pub trait Session: Send + Sync {
    /// Releases the underlying connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection could not be shut down cleanly.
    async fn close(&self) -> Result<()>;

    /// Reads the miner model.
    ///
    /// # Errors
    ///
    /// Returns an error if the device cannot be queried.
    async fn model(&self) -> Result<Model>;

    /// Reads the metrics snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if the device cannot be queried.
    async fn stats(&self) -> Result<DeviceStats>;

    /// Reads the mining summary.
    ///
    /// # Errors
    ///
    /// Returns an error if the device cannot be queried.
    async fn summary(&self) -> Result<Summary>;

    /// Lists the configured pools.
    ///
    /// # Errors
    ///
    /// Returns an error if unsupported or the device cannot be queried.
    async fn pools(&self) -> Result<Vec<MiningPool>> {
        Err(DeviceError::unsupported("pool listing").into())
    }

    /// Adds a pool.
    ///
    /// # Errors
    ///
    /// Returns an error if unsupported or rejected by the device.
    async fn add_pool(&self, _url: &str, _user: &str, _password: &str) -> Result<()> {
        Err(DeviceError::unsupported("pool management").into())
    }

    /// Enables a pool.
    ///
    /// # Errors
    ///
    /// Returns an error if unsupported or rejected by the device.
    async fn enable_pool(&self, _pool_id: i64) -> Result<()> {
        Err(DeviceError::unsupported("pool management").into())
    }

    /// Disables a pool.
    ///
    /// # Errors
    ///
    /// Returns an error if unsupported or rejected by the device.
    async fn disable_pool(&self, _pool_id: i64) -> Result<()> {
        Err(DeviceError::unsupported("pool management").into())
    }

    /// Removes a pool.
    ///
    /// # Errors
    ///
    /// Returns an error if unsupported or rejected by the device.
    async fn remove_pool(&self, _pool_id: i64) -> Result<()> {
        Err(DeviceError::unsupported("pool management").into())
    }

    /// Makes a pool the active one.
    ///
    /// # Errors
    ///
    /// Returns an error if unsupported or rejected by the device.
    async fn switch_pool(&self, _pool_id: i64) -> Result<()> {
        Err(DeviceError::unsupported("pool management").into())
    }

    /// Restarts the mining process.
    ///
    /// # Errors
    ///
    /// Returns an error if unsupported or rejected by the device.
    async fn restart(&self) -> Result<()> {
        Err(DeviceError::unsupported("restart").into())
    }

    /// Stops the mining process.
    ///
    /// # Errors
    ///
    /// Returns an error if unsupported or rejected by the device.
    async fn quit(&self) -> Result<()> {
        Err(DeviceError::unsupported("quit").into())
    }

    /// Executes a firmware-specific raw command and returns the raw reply.
    ///
    /// The parameter format is driver-defined.
    ///
    /// # Errors
    ///
    /// Returns an error if unsupported or rejected by the device.
    async fn exec(&self, _command: &str, _parameter: &str) -> Result<Vec<u8>> {
        Err(DeviceError::unsupported("raw commands").into())
    }

    /// Reads the current power mode.
    ///
    /// # Errors
    ///
    /// Returns an error if unsupported or the device cannot be queried.
    async fn power_mode(&self) -> Result<PowerMode> {
        Err(DeviceError::unsupported("power control").into())
    }

    /// Applies a power mode.
    ///
    /// # Errors
    ///
    /// Returns an error if unsupported or rejected by the device.
    async fn set_power_mode(&self, _mode: &PowerMode) -> Result<()> {
        Err(DeviceError::unsupported("power control").into())
    }

    /// Reads the current fan configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if unsupported or the device cannot be queried.
    async fn fan(&self) -> Result<FanConfig> {
        Err(DeviceError::unsupported("fan control").into())
    }

    /// Applies a fan configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if unsupported or rejected by the device.
    async fn set_fan(&self, _fan: FanConfig) -> Result<()> {
        Err(DeviceError::unsupported("fan control").into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    struct ReadOnlySession;

    #[async_trait]
    impl Session for ReadOnlySession {
        async fn close(&self) -> Result<()> {
            Ok(())
        }

        async fn model(&self) -> Result<Model> {
            Ok(Model {
                vendor: "Bitmain".to_string(),
                product: "S9".to_string(),
                firmware: "bmminer".to_string(),
            })
        }

        async fn stats(&self) -> Result<DeviceStats> {
            Ok(DeviceStats::default())
        }

        async fn summary(&self) -> Result<Summary> {
            Ok(Summary::default())
        }
    }

    #[tokio::test]
    async fn optional_operations_default_to_unsupported() {
        let session = ReadOnlySession;

        let err = session.restart().await.unwrap_err();
        assert!(matches!(
            err,
            Error::Device(DeviceError::Unsupported { ref operation }) if operation == "restart"
        ));

        assert!(session.switch_pool(1).await.is_err());
        assert!(session.exec("version", "").await.is_err());
        assert!(session.set_fan(FanConfig::auto()).await.is_err());
    }

    #[tokio::test]
    async fn sessions_are_object_safe() {
        let session: Box<dyn Session> = Box::new(ReadOnlySession);
        let model = session.model().await.unwrap();
        assert_eq!(model.product, "S9");
    }
}
