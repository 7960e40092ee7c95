// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Read-side payloads returned by miner sessions.
//!
//! Drivers map their vendor-specific JSON into these structures so callers
//! can treat every miner the same way.

use serde::{Deserialize, Serialize};

/// Vendor, product and firmware of a miner.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Model {
    /// Hardware vendor (e.g. Bitmain, MicroBT, Goldshell).
    pub vendor: String,
    /// Product name (e.g. S19, M30S, KD-BOX).
    pub product: String,
    /// Firmware flavor and version.
    pub firmware: String,
}

/// Generic metrics snapshot of a miner.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceStats {
    /// Model reported alongside the metrics.
    pub model: Model,
    /// Hashrate over the last 5 seconds, in GH/s.
    pub hashrate_5s: f64,
    /// Average hashrate, in GH/s.
    pub hashrate_avg: f64,
    /// Highest chip or board temperature, in degrees Celsius.
    pub temp_max: f64,
    /// Time since the mining process started.
    pub uptime_secs: i64,
}

/// High-level mining summary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    /// Accepted shares.
    pub accepted: i64,
    /// Rejected shares.
    pub rejected: i64,
    /// Hardware error percentage.
    pub hardware_error_pct: f64,
    /// Hashrate over the last 5 seconds, in GH/s.
    pub ghs_5s: f64,
    /// Average hashrate, in GH/s.
    pub ghs_avg: f64,
}

/// A mining pool configured on the device.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MiningPool {
    /// Device-side pool index.
    pub id: i64,
    /// Stratum URL.
    pub url: String,
    /// Worker name.
    pub user: String,
    /// Failover priority (lower is preferred).
    pub priority: i64,
    /// Whether the pool is currently in use.
    pub active: bool,
}
