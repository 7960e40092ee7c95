// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! In-memory driver used by unit tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::capabilities::Capabilities;
use crate::driver::{Driver, Session};
use crate::error::{DeviceError, ProtocolError, Result};
use crate::manager::Device;
use crate::types::{DeviceStats, Endpoint, MinerId, Model, Summary};

/// Counters shared between a driver and the sessions it opened.
#[derive(Default)]
struct Counters {
    detected: AtomicUsize,
    opened: AtomicUsize,
    closed: AtomicUsize,
}

pub(crate) struct MockDriver {
    name: &'static str,
    matches: bool,
    open_delay: Duration,
    fail_open: AtomicBool,
    counters: Arc<Counters>,
}

impl MockDriver {
    /// A driver that claims every endpoint.
    pub(crate) fn new(name: &'static str) -> Arc<Self> {
        Self::build(name, true, Duration::ZERO)
    }

    /// A driver that claims no endpoint.
    pub(crate) fn rejecting(name: &'static str) -> Arc<Self> {
        Self::build(name, false, Duration::ZERO)
    }

    /// A driver whose sessions take `open_delay` to open.
    pub(crate) fn slow(name: &'static str, open_delay: Duration) -> Arc<Self> {
        Self::build(name, true, open_delay)
    }

    fn build(name: &'static str, matches: bool, open_delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            name,
            matches,
            open_delay,
            fail_open: AtomicBool::new(false),
            counters: Arc::new(Counters::default()),
        })
    }

    pub(crate) fn fail_next_open(&self) {
        self.fail_open.store(true, Ordering::SeqCst);
    }

    pub(crate) fn detected(&self) -> usize {
        self.counters.detected.load(Ordering::SeqCst)
    }

    pub(crate) fn opened(&self) -> usize {
        self.counters.opened.load(Ordering::SeqCst)
    }

    pub(crate) fn closed(&self) -> usize {
        self.counters.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Driver for MockDriver {
    fn name(&self) -> &str {
        self.name
    }

    async fn detect(&self, _endpoint: &Endpoint) -> Result<bool> {
        self.counters.detected.fetch_add(1, Ordering::SeqCst);
        Ok(self.matches)
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::cgminer()
    }

    async fn open(&self, endpoint: &Endpoint) -> Result<Box<dyn Session>> {
        if !self.open_delay.is_zero() {
            tokio::time::sleep(self.open_delay).await;
        }
        if self.fail_open.swap(false, Ordering::SeqCst) {
            return Err(ProtocolError::ConnectionFailed(endpoint.to_string()).into());
        }
        self.counters.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockSession {
            counters: Arc::clone(&self.counters),
        }))
    }
}

struct MockSession {
    counters: Arc<Counters>,
}

#[async_trait]
impl Session for MockSession {
    async fn close(&self) -> Result<()> {
        self.counters.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn model(&self) -> Result<Model> {
        Ok(Model {
            vendor: "Mock".to_string(),
            product: "M1".to_string(),
            firmware: "1.0".to_string(),
        })
    }

    async fn stats(&self) -> Result<DeviceStats> {
        Ok(DeviceStats::default())
    }

    async fn summary(&self) -> Result<Summary> {
        Ok(Summary::default())
    }

    async fn restart(&self) -> Result<()> {
        Err(DeviceError::CommandRejected("busy".to_string()).into())
    }
}

/// Builds a device record bound to the given driver.
pub(crate) fn device(id: &str, driver: &Arc<MockDriver>) -> Device {
    let driver: Arc<dyn Driver> = Arc::clone(driver) as Arc<dyn Driver>;
    Device::new(MinerId::new(id), Endpoint::new(format!("{id}.local:4028")), driver)
}
