// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Power and fan control settings.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ParseError;

/// Power profile of a miner.
///
/// # Examples
///
/// ```
/// use multiminer_lib::PowerModeKind;
///
/// let kind: PowerModeKind = "balanced".parse().unwrap();
/// assert_eq!(kind, PowerModeKind::Balanced);
/// assert_eq!(kind.as_str(), "balanced");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PowerModeKind {
    /// Reduced power draw and hashrate.
    Low,
    /// Vendor default profile.
    Balanced,
    /// Maximum hashrate.
    High,
    /// Explicit watts/voltage/frequency targets.
    Custom,
}

impl PowerModeKind {
    /// Returns the lowercase name used on the wire and in configuration.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Balanced => "balanced",
            Self::High => "high",
            Self::Custom => "custom",
        }
    }
}

impl fmt::Display for PowerModeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PowerModeKind {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "balanced" | "normal" => Ok(Self::Balanced),
            "high" => Ok(Self::High),
            "custom" => Ok(Self::Custom),
            _ => Err(ParseError::UnexpectedFormat(format!("power mode: {s}"))),
        }
    }
}

/// Requested or reported power mode.
///
/// The optional targets are only meaningful for [`PowerModeKind::Custom`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PowerMode {
    /// Profile kind.
    pub kind: PowerModeKind,
    /// Target power draw in watts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub watts: Option<u32>,
    /// Target voltage in millivolts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voltage_mv: Option<u32>,
    /// Target frequency per chain in MHz.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub freq_mhz: Option<u32>,
}

impl PowerMode {
    /// Creates a power mode with no explicit targets.
    #[must_use]
    pub const fn new(kind: PowerModeKind) -> Self {
        Self {
            kind,
            watts: None,
            voltage_mv: None,
            freq_mhz: None,
        }
    }

    /// Creates a custom power mode targeting the given wattage.
    #[must_use]
    pub const fn custom_watts(watts: u32) -> Self {
        Self {
            kind: PowerModeKind::Custom,
            watts: Some(watts),
            voltage_mv: None,
            freq_mhz: None,
        }
    }
}

/// Fan control strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FanModeKind {
    /// Firmware-controlled fan curve.
    Auto,
    /// Fixed fan speed.
    Manual,
}

/// Fan configuration.
///
/// # Examples
///
/// ```
/// use multiminer_lib::{FanConfig, FanModeKind};
///
/// let fan = FanConfig::manual(140);
/// assert_eq!(fan.mode, FanModeKind::Manual);
/// assert_eq!(fan.speed_pct, Some(100));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FanConfig {
    /// Control strategy.
    pub mode: FanModeKind,
    /// Fixed speed in percent (0-100), only set in manual mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed_pct: Option<u8>,
}

impl FanConfig {
    /// Firmware-controlled fans.
    #[must_use]
    pub const fn auto() -> Self {
        Self {
            mode: FanModeKind::Auto,
            speed_pct: None,
        }
    }

    /// Fixed fan speed, clamped to 100%.
    #[must_use]
    pub fn manual(speed_pct: u8) -> Self {
        Self {
            mode: FanModeKind::Manual,
            speed_pct: Some(speed_pct.min(100)),
        }
    }
}
