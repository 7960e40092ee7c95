// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the `MultiMineR` library.
//!
//! This module provides the error hierarchy shared by the registry, the
//! connection pool, the device manager and the drivers plugged into them:
//! lookup failures, device-side failures, network failures and payload
//! parsing failures.

use thiserror::Error;

use crate::types::MinerId;

/// The main error type for this library.
///
/// This enum encompasses all possible errors that can occur when managing
/// miners through the registry, the manager or a driver session.
#[derive(Debug, Error)]
pub enum Error {
    /// No device is registered under the requested id.
    #[error("device not found: {0}")]
    NotFound(MinerId),

    /// No registered driver claimed the endpoint during detection.
    #[error("no suitable driver found")]
    DriverNotFound,

    /// A driver was requested by name but is not registered.
    #[error("unknown driver: {0}")]
    UnknownDriver(String),

    /// Error occurred during a device operation or pool checkout.
    #[error("device error: {0}")]
    Device(#[from] DeviceError),

    /// Error occurred while talking to the device over the network.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Error occurred while parsing a device response.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// The operation is not implemented by this driver.
    #[error("not implemented")]
    NotImplemented,
}

impl Error {
    /// Returns a stable, machine-readable code for this error.
    ///
    /// Presentation layers map these codes to their own status codes; the
    /// library itself never produces transport-specific statuses.
    ///
    /// # Examples
    ///
    /// ```
    /// use multiminer_lib::Error;
    ///
    /// assert_eq!(Error::DriverNotFound.code(), "DRIVER_NOT_FOUND");
    /// ```
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NOT_FOUND",
            Self::DriverNotFound | Self::UnknownDriver(_) => "DRIVER_NOT_FOUND",
            Self::Device(_) => "DEVICE_ERROR",
            Self::Protocol(ProtocolError::Timeout(_)) => "TIMEOUT",
            Self::Protocol(_) => "CONNECTION_FAILED",
            Self::Parse(_) => "INTERNAL_ERROR",
            Self::NotImplemented => "NOT_IMPLEMENTED",
        }
    }

    /// Returns true if this error signals that the device pool is exhausted.
    #[must_use]
    pub fn is_pool_exhausted(&self) -> bool {
        matches!(self, Self::Device(DeviceError::PoolExhausted { .. }))
    }
}

/// Errors related to device operations.
#[derive(Debug, Error)]
pub enum DeviceError {
    /// Every allowed session for the device is already checked out.
    #[error("connection pool exhausted: {max_open} active connections")]
    PoolExhausted {
        /// The configured maximum number of open sessions.
        max_open: usize,
    },

    /// A session handle was returned to a pool that does not track it.
    #[error("session {0} is not checked out from this pool")]
    InvalidSession(u64),

    /// The device pool was shut down while a session was being opened.
    #[error("connection pool closed")]
    PoolClosed,

    /// The driver does not support the requested operation.
    #[error("{operation} is not supported by this driver")]
    Unsupported {
        /// The operation that is not supported.
        operation: String,
    },

    /// Command was rejected by the device.
    #[error("command rejected: {0}")]
    CommandRejected(String),

    /// The device reported an operational failure.
    #[error("{message} ({details})")]
    Operation {
        /// Short description of the failure.
        message: String,
        /// Driver-specific details.
        details: String,
    },
}

impl DeviceError {
    /// Creates an [`DeviceError::Unsupported`] error for the named operation.
    #[must_use]
    pub fn unsupported(operation: impl Into<String>) -> Self {
        Self::Unsupported {
            operation: operation.into(),
        }
    }
}

/// Errors related to network communication with a device.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// HTTP request failed.
    #[cfg(feature = "http")]
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Connection to the device failed.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Request timed out.
    #[error("request timed out after {0} ms")]
    Timeout(u64),

    /// Invalid URL or address.
    #[error("invalid address: {0}")]
    InvalidAddress(String),
}

/// Errors related to parsing miner responses.
#[derive(Debug, Error)]
pub enum ParseError {
    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// Expected field is missing from the response.
    #[error("missing field in response: {0}")]
    MissingField(String),

    /// Unexpected response format.
    #[error("unexpected response format: {0}")]
    UnexpectedFormat(String),
}

/// A specialized Result type for this library.
pub type Result<T> = std::result::Result<T, Error>;
