// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Driver capability descriptors.
//!
//! Every driver exposes a static [`Capabilities`] value describing which
//! session operations its firmware family supports. The descriptor never
//! changes after the driver is registered, so callers can inspect it before
//! checking out a session.

use serde::{Deserialize, Serialize};

use crate::types::PowerModeKind;

/// Capabilities of a driver.
///
/// # Examples
///
/// ```
/// use multiminer_lib::{Capabilities, CapabilitiesBuilder};
///
/// // Default capabilities (read-only telemetry)
/// let basic = Capabilities::default();
/// assert!(basic.read_stats);
/// assert!(!basic.manage_pools);
///
/// let caps = CapabilitiesBuilder::new()
///     .with_pool_management()
///     .with_commands(["summary", "pools"])
///     .build();
/// assert!(caps.supports_command("pools"));
/// assert!(!caps.supports_command("restart"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[allow(clippy::struct_excessive_bools)]
#[serde(default)]
pub struct Capabilities {
    /// Supports reading the metrics snapshot.
    pub read_stats: bool,

    /// Supports reading the mining summary.
    pub read_summary: bool,

    /// Supports listing configured pools.
    pub list_pools: bool,

    /// Supports adding, enabling, disabling, removing and switching pools.
    pub manage_pools: bool,

    /// Supports restarting the mining process.
    pub restart: bool,

    /// Supports stopping the mining process.
    pub quit: bool,

    /// Raw commands accepted by `exec`. Empty means none are advertised.
    pub commands: Vec<String>,

    /// Supports reading and setting the fan mode.
    pub fan_control: bool,

    /// Supports reading and setting the power mode.
    pub power_control: bool,

    /// Power profiles accepted by `set_power_mode`.
    pub supported_power_modes: Vec<PowerModeKind>,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::read_only()
    }
}

impl Capabilities {
    /// Creates capabilities for a telemetry-only firmware.
    #[must_use]
    pub const fn read_only() -> Self {
        Self {
            read_stats: true,
            read_summary: true,
            list_pools: false,
            manage_pools: false,
            restart: false,
            quit: false,
            commands: Vec::new(),
            fan_control: false,
            power_control: false,
            supported_power_modes: Vec::new(),
        }
    }

    /// Creates capabilities for a cgminer-compatible API.
    ///
    /// - Stats, summary and pools
    /// - Full pool management
    /// - Restart and quit
    /// - The standard cgminer command set
    #[must_use]
    pub fn cgminer() -> Self {
        CapabilitiesBuilder::new()
            .with_pool_management()
            .with_restart()
            .with_quit()
            .with_commands([
                "version",
                "summary",
                "devs",
                "pools",
                "stats",
                "addpool",
                "enablepool",
                "disablepool",
                "removepool",
                "switchpool",
                "restart",
                "quit",
            ])
            .build()
    }

    /// Returns whether `exec` advertises the given raw command.
    #[must_use]
    pub fn supports_command(&self, command: &str) -> bool {
        self.commands.iter().any(|c| c.eq_ignore_ascii_case(command))
    }

    /// Returns whether the given power profile can be applied.
    #[must_use]
    pub fn supports_power_mode(&self, kind: PowerModeKind) -> bool {
        self.power_control && self.supported_power_modes.contains(&kind)
    }

    /// Returns whether any mutating operation is supported.
    #[must_use]
    pub const fn is_controllable(&self) -> bool {
        self.manage_pools || self.restart || self.quit || self.fan_control || self.power_control
    }
}

/// Builder for creating custom capabilities.
///
/// Starts from [`Capabilities::read_only`].
#[derive(Debug, Default)]
pub struct CapabilitiesBuilder {
    inner: Capabilities,
}

impl CapabilitiesBuilder {
    /// Creates a new builder with default capabilities.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Disables every read operation.
    #[must_use]
    pub fn without_reads(mut self) -> Self {
        self.inner.read_stats = false;
        self.inner.read_summary = false;
        self.inner.list_pools = false;
        self
    }

    /// Enables pool listing and management.
    #[must_use]
    pub fn with_pool_management(mut self) -> Self {
        self.inner.list_pools = true;
        self.inner.manage_pools = true;
        self
    }

    /// Enables restart support.
    #[must_use]
    pub fn with_restart(mut self) -> Self {
        self.inner.restart = true;
        self
    }

    /// Enables quit support.
    #[must_use]
    pub fn with_quit(mut self) -> Self {
        self.inner.quit = true;
        self
    }

    /// Enables fan control.
    #[must_use]
    pub fn with_fan_control(mut self) -> Self {
        self.inner.fan_control = true;
        self
    }

    /// Enables power control for the given profiles.
    #[must_use]
    pub fn with_power_modes(mut self, modes: impl IntoIterator<Item = PowerModeKind>) -> Self {
        self.inner.power_control = true;
        self.inner.supported_power_modes = modes.into_iter().collect();
        self
    }

    /// Sets the raw commands accepted by `exec`.
    #[must_use]
    pub fn with_commands<I, S>(mut self, commands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inner.commands = commands.into_iter().map(Into::into).collect();
        self
    }

    /// Builds the capabilities.
    #[must_use]
    pub fn build(self) -> Capabilities {
        self.inner
    }
}
