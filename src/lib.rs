// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `MultiMineR` Lib - A Rust library to manage fleets of mining rigs.
//!
//! This library tracks heterogeneous network-attached miners behind a single
//! async API. Vendor support is plugged in through drivers; the library
//! detects which driver owns a miner and pools sessions to it.
//!
//! # Supported Features
//!
//! - **Driver registry**: ordered catalog of drivers with first-match detection
//! - **Device manager**: device directory and session orchestration
//! - **Connection pooling**: bounded per-device session reuse with idle eviction
//! - **Capabilities**: static feature flags describing what a driver supports
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use multiminer_lib::{Endpoint, Manager, MinerId, Registry};
//! # use multiminer_lib::driver::Driver;
//!
//! # async fn example(
//! #     cgminer: Arc<dyn Driver>,
//! #     luxos: Arc<dyn Driver>,
//! # ) -> multiminer_lib::Result<()> {
//! // Registration order is detection priority.
//! let registry = Arc::new(Registry::new());
//! registry.register(luxos);
//! registry.register(cgminer);
//!
//! let manager = Manager::new(registry);
//! let id = MinerId::new("s19-01");
//! manager.add_or_detect(id.clone(), Endpoint::new("192.168.1.50:4028"), None).await?;
//!
//! // Run an operation against a pooled session.
//! let summary = manager
//!     .with_session(&id, async |session| session.summary().await)
//!     .await?;
//! println!("{} GH/s average", summary.ghs_avg);
//!
//! manager.close().await;
//! # Ok(())
//! # }
//! ```
//!
//! # Logging
//!
//! The library emits [`tracing`](https://docs.rs/tracing) events and never
//! installs a subscriber. Applications choose their own.

mod capabilities;
pub mod config;
pub mod driver;
pub mod error;
pub mod manager;
pub mod pool;
#[cfg(feature = "http")]
pub mod probe;
pub mod registry;
pub mod types;

#[cfg(test)]
mod testing;

pub use capabilities::{Capabilities, CapabilitiesBuilder};
pub use config::{ManagerConfig, PoolConfig};
pub use error::{DeviceError, Error, ParseError, ProtocolError, Result};
pub use manager::{CleanupTask, Device, DeviceInfo, Manager};
pub use pool::{ConnectionPool, PoolStats, PooledSession, SessionId};
#[cfg(feature = "http")]
pub use probe::HttpProbe;
pub use registry::Registry;
pub use types::{
    DeviceStats, Endpoint, FanConfig, FanModeKind, MinerId, MiningPool, Model, PowerMode,
    PowerModeKind, Summary,
};
