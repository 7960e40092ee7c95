// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Miner identifier and endpoint types.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable identifier for a tracked miner.
///
/// Unlike generated identifiers, miner ids are chosen by the caller (an
/// inventory tag, a hostname, a rack position) and re-registering the same id
/// replaces the previous registration.
///
/// # Examples
///
/// ```
/// use multiminer_lib::MinerId;
///
/// let id = MinerId::new("rack-3-slot-12");
/// assert_eq!(id.as_str(), "rack-3-slot-12");
/// assert_eq!(id, MinerId::from("rack-3-slot-12"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MinerId(String);

impl MinerId {
    /// Creates a miner identifier from any string-like value.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MinerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MinerId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for MinerId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// How to reach a miner on the network.
///
/// The address is kept verbatim; its form (`host:port`, `http://host`, ...)
/// is interpreted by the driver that ends up owning the device.
///
/// # Examples
///
/// ```
/// use multiminer_lib::Endpoint;
///
/// let ep = Endpoint::new("192.168.1.100:4028");
/// assert_eq!(ep.address(), "192.168.1.100:4028");
/// assert_eq!(ep.url("/api/v1/summary"), "http://192.168.1.100:4028/api/v1/summary");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint {
    address: String,
}

impl Endpoint {
    /// Creates an endpoint for the given address.
    #[must_use]
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
        }
    }

    /// Returns the raw address.
    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Returns the base URL of the endpoint.
    ///
    /// Addresses without a scheme are assumed to speak plain HTTP.
    #[must_use]
    pub fn base_url(&self) -> String {
        if self.address.starts_with("http://") || self.address.starts_with("https://") {
            self.address.clone()
        } else {
            format!("http://{}", self.address)
        }
    }

    /// Builds a URL for `path` on this endpoint, joined with exactly one slash.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        join_path(&self.base_url(), path)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.address)
    }
}

impl From<&str> for Endpoint {
    fn from(address: &str) -> Self {
        Self::new(address)
    }
}

fn join_path(base: &str, path: &str) -> String {
    match (base.ends_with('/'), path.starts_with('/')) {
        (true, true) => format!("{base}{}", &path[1..]),
        (false, false) => format!("{base}/{path}"),
        _ => format!("{base}{path}"),
    }
}
