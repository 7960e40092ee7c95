// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device manager for coordinating a fleet of miners.
//!
//! # Overview
//!
//! The [`Manager`] is the entry point for applications driving many miners.
//! It provides:
//!
//! - **Device directory**: register miners by id, with driver auto-detection
//! - **Session orchestration**: run operations against pooled sessions
//! - **Idle eviction**: an optional background task closing stale sessions
//!
//! # Examples
//!
//! ## Registering and querying a miner
//!
//! ```no_run
//! use std::sync::Arc;
//! use multiminer_lib::{Endpoint, Manager, MinerId, Registry};
//!
//! # async fn example(registry: Arc<Registry>) -> multiminer_lib::Result<()> {
//! let manager = Manager::new(registry);
//! let id = MinerId::new("s19-rack-2");
//!
//! // Let the registry pick the driver.
//! manager.add_device(id.clone(), Endpoint::new("10.0.2.7:4028"), None).await?;
//!
//! let stats = manager
//!     .with_session(&id, async |session| session.stats().await)
//!     .await?;
//! println!("{} GH/s", stats.hashrate_avg);
//! # Ok(())
//! # }
//! ```
//!
//! ## Background eviction
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use multiminer_lib::{Manager, Registry};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example(registry: Arc<Registry>) {
//! let manager = Manager::new(registry);
//! let shutdown = CancellationToken::new();
//!
//! manager.start_cleanup(Duration::from_secs(60), shutdown.child_token());
//!
//! // ... later
//! shutdown.cancel();
//! manager.close().await;
//! # }
//! ```

mod cleanup;
mod device;
mod device_manager;

pub use cleanup::CleanupTask;
pub use device::{Device, DeviceInfo};
pub use device_manager::Manager;
