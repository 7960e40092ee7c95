// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device records tracked by the manager.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::capabilities::Capabilities;
use crate::driver::Driver;
use crate::types::{Endpoint, MinerId};

/// Global counter for device record generations.
static GENERATION_COUNTER: AtomicU64 = AtomicU64::new(1);

/// A registered miner bound to the driver that handles it.
#[derive(Clone)]
pub struct Device {
    /// Stable identifier of the miner.
    pub id: MinerId,
    /// Where the miner is reachable.
    pub endpoint: Endpoint,
    /// Driver used to open sessions to the miner.
    pub driver: Arc<dyn Driver>,
    /// Name of the driver, captured at registration.
    pub driver_name: String,
    /// Changes whenever the id is bound to a different target. Pooled
    /// sessions only serve records of their own generation.
    pub(crate) generation: u64,
}

impl Device {
    /// Creates a device record.
    #[must_use]
    pub fn new(id: MinerId, endpoint: Endpoint, driver: Arc<dyn Driver>) -> Self {
        let driver_name = driver.name().to_string();
        Self {
            id,
            endpoint,
            driver,
            driver_name,
            generation: GENERATION_COUNTER.fetch_add(1, Ordering::Relaxed),
        }
    }

    /// Returns the driver's capability descriptor.
    #[must_use]
    pub fn capabilities(&self) -> Capabilities {
        self.driver.capabilities()
    }

    /// Returns a serializable snapshot of this record.
    #[must_use]
    pub fn info(&self) -> DeviceInfo {
        DeviceInfo {
            id: self.id.clone(),
            address: self.endpoint.address().to_string(),
            driver: self.driver_name.clone(),
        }
    }

    /// Returns true if `other` reaches the same miner through the same driver.
    pub(crate) fn same_target(&self, other: &Self) -> bool {
        self.endpoint == other.endpoint && self.driver_name == other.driver_name
    }
}

impl fmt::Debug for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Device")
            .field("id", &self.id)
            .field("endpoint", &self.endpoint)
            .field("driver_name", &self.driver_name)
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}

/// Serializable view of a [`Device`], as exposed to presentation layers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// Miner identifier.
    pub id: MinerId,
    /// Raw endpoint address.
    pub address: String,
    /// Driver name.
    pub driver: String,
}
