// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Value types shared by drivers, sessions and the device manager.
//!
//! # Types
//!
//! - [`MinerId`] - Stable key of a tracked miner
//! - [`Endpoint`] - Network address used to reach a miner
//! - [`Model`], [`DeviceStats`], [`Summary`], [`MiningPool`] - Read-side payloads
//! - [`PowerMode`], [`FanConfig`] - Power and fan control settings

mod control;
mod identity;
mod telemetry;

pub use control::{FanConfig, FanModeKind, PowerMode, PowerModeKind};
pub use identity::{Endpoint, MinerId};
pub use telemetry::{DeviceStats, MiningPool, Model, Summary};
