// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Shared test drivers.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use multiminer_lib::driver::{Driver, Session};
use multiminer_lib::{
    Capabilities, CapabilitiesBuilder, DeviceStats, Endpoint, Model, PowerMode, PowerModeKind,
    ProtocolError, Result, Summary,
};

/// Outcome of a detection probe.
#[derive(Debug, Clone, Copy)]
pub enum Detect {
    Match,
    NoMatch,
    Fail,
}

#[derive(Default)]
struct Counters {
    detect: AtomicUsize,
    open: AtomicUsize,
    close: AtomicUsize,
}

/// Driver recording every call it receives.
pub struct CountingDriver {
    name: &'static str,
    detect: Detect,
    counters: Arc<Counters>,
}

impl CountingDriver {
    pub fn new(name: &'static str, detect: Detect) -> Arc<Self> {
        Arc::new(Self {
            name,
            detect,
            counters: Arc::new(Counters::default()),
        })
    }

    pub fn as_driver(self: &Arc<Self>) -> Arc<dyn Driver> {
        Arc::clone(self) as Arc<dyn Driver>
    }

    pub fn detect_calls(&self) -> usize {
        self.counters.detect.load(Ordering::SeqCst)
    }

    pub fn opened(&self) -> usize {
        self.counters.open.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.counters.close.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Driver for CountingDriver {
    fn name(&self) -> &str {
        self.name
    }

    async fn detect(&self, endpoint: &Endpoint) -> Result<bool> {
        self.counters.detect.fetch_add(1, Ordering::SeqCst);
        match self.detect {
            Detect::Match => Ok(true),
            Detect::NoMatch => Ok(false),
            Detect::Fail => Err(ProtocolError::ConnectionFailed(endpoint.to_string()).into()),
        }
    }

    fn capabilities(&self) -> Capabilities {
        CapabilitiesBuilder::new()
            .with_restart()
            .with_power_modes([PowerModeKind::Low, PowerModeKind::High])
            .build()
    }

    async fn open(&self, _endpoint: &Endpoint) -> Result<Box<dyn Session>> {
        let serial = self.counters.open.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(CountingSession {
            serial,
            driver: self.name,
            counters: Arc::clone(&self.counters),
        }))
    }
}

/// Session tagged with the order in which it was opened.
struct CountingSession {
    serial: usize,
    driver: &'static str,
    counters: Arc<Counters>,
}

#[async_trait]
impl Session for CountingSession {
    async fn close(&self) -> Result<()> {
        self.counters.close.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn model(&self) -> Result<Model> {
        Ok(Model {
            vendor: "Test".to_string(),
            product: self.driver.to_string(),
            firmware: format!("session-{}", self.serial),
        })
    }

    async fn stats(&self) -> Result<DeviceStats> {
        Ok(DeviceStats {
            model: self.model().await?,
            hashrate_5s: 95_000.0,
            hashrate_avg: 94_500.0,
            temp_max: 71.5,
            uptime_secs: 3600,
        })
    }

    async fn summary(&self) -> Result<Summary> {
        Ok(Summary {
            accepted: 1200,
            rejected: 3,
            ..Summary::default()
        })
    }

    async fn power_mode(&self) -> Result<PowerMode> {
        Ok(PowerMode::new(PowerModeKind::High))
    }
}
