// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Driver registry and endpoint auto-detection.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::Capabilities;
use crate::driver::Driver;
use crate::error::{Error, Result};
use crate::types::Endpoint;

/// Ordered catalog of drivers.
///
/// Registration order is detection priority: the first registered driver is
/// probed first and the first one claiming an endpoint wins.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use multiminer_lib::{Endpoint, Registry};
/// # use multiminer_lib::driver::Driver;
///
/// # async fn example(
/// #     cgminer: Arc<dyn Driver>,
/// #     luxos: Arc<dyn Driver>,
/// # ) -> multiminer_lib::Result<()> {
/// let registry = Registry::new();
/// registry.register(cgminer);
/// registry.register(luxos);
///
/// let driver = registry.detect(&Endpoint::new("192.168.1.100:4028")).await?;
/// println!("detected {}", driver.name());
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct Registry {
    drivers: RwLock<Vec<Arc<dyn Driver>>>,
}

impl Registry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a driver to the detection order.
    ///
    /// Names are not checked for uniqueness; [`get`](Self::get) returns the
    /// first driver registered under a name.
    pub fn register(&self, driver: Arc<dyn Driver>) {
        tracing::debug!(driver = driver.name(), "Registered driver");
        self.drivers.write().push(driver);
    }

    /// Finds the first driver that claims the endpoint.
    ///
    /// Drivers are probed one at a time, in registration order.
    ///
    /// # Errors
    ///
    /// Returns the first probe error as-is, without trying the remaining
    /// drivers, or [`Error::DriverNotFound`] if no driver matched.
    pub async fn detect(&self, endpoint: &Endpoint) -> Result<Arc<dyn Driver>> {
        // Probes can be slow; never hold the lock across them.
        let drivers = self.drivers.read().clone();

        for driver in drivers {
            tracing::debug!(driver = driver.name(), %endpoint, "Probing endpoint");
            match driver.detect(endpoint).await {
                Ok(true) => {
                    tracing::debug!(driver = driver.name(), %endpoint, "Driver detected");
                    return Ok(driver);
                }
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!(
                        driver = driver.name(),
                        %endpoint,
                        error = %e,
                        "Driver probe failed, aborting detection"
                    );
                    return Err(e);
                }
            }
        }

        Err(Error::DriverNotFound)
    }

    /// Returns the first driver registered under `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn Driver>> {
        self.drivers
            .read()
            .iter()
            .find(|d| d.name() == name)
            .cloned()
    }

    /// Returns the capabilities of the named driver.
    #[must_use]
    pub fn capabilities(&self, name: &str) -> Option<Capabilities> {
        self.get(name).map(|d| d.capabilities())
    }

    /// Returns the registered driver names, in detection order.
    #[must_use]
    pub fn driver_names(&self) -> Vec<String> {
        self.drivers
            .read()
            .iter()
            .map(|d| d.name().to_string())
            .collect()
    }

    /// Returns the number of registered drivers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.drivers.read().len()
    }

    /// Returns true if no driver is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.drivers.read().is_empty()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("drivers", &self.driver_names())
            .finish()
    }
}
