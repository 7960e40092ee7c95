// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Periodic idle-session eviction.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::pool::ConnectionPool;

/// Shortest accepted eviction period.
const MIN_INTERVAL: Duration = Duration::from_millis(10);

/// Handle to a running eviction task.
///
/// Cloning the handle does not start another task; every clone controls the
/// same one.
#[derive(Debug, Clone)]
pub struct CleanupTask {
    cancel: CancellationToken,
    finished: CancellationToken,
}

impl CleanupTask {
    /// Spawns a task that calls [`ConnectionPool::clean_up`] every `interval`
    /// until `cancel` fires.
    ///
    /// The first pass runs one full interval after spawning.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime.
    pub(crate) fn spawn(
        pool: Arc<ConnectionPool>,
        interval: Duration,
        cancel: CancellationToken,
    ) -> Self {
        let finished = CancellationToken::new();
        let task = Self {
            cancel: cancel.clone(),
            finished: finished.clone(),
        };

        let period = interval.max(MIN_INTERVAL);
        tokio::spawn(async move {
            let _done = finished.drop_guard();
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;

            tracing::debug!(interval_ms = period.as_millis(), "Cleanup task started");
            loop {
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        pool.clean_up().await;
                    }
                }
            }
            tracing::debug!("Cleanup task stopped");
        });

        task
    }

    /// Asks the task to stop without waiting for it.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Stops the task and waits until it has exited.
    pub async fn stop(&self) {
        self.cancel.cancel();
        self.finished.cancelled().await;
    }

    /// Returns true until the task has exited.
    #[must_use]
    pub fn is_running(&self) -> bool {
        !self.finished.is_cancelled()
    }
}
