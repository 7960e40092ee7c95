// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Bounded-time HTTP helpers for drivers.
//!
//! Most miner firmwares expose a web API, and a driver usually recognises its
//! family by the paths that answer. [`HttpProbe`] wraps a `reqwest` client
//! with a short timeout for that purpose, plus a small JSON fetch helper for
//! session implementations.

use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;

use crate::config::ManagerConfig;
use crate::error::{ParseError, ProtocolError, Result};
use crate::types::Endpoint;

/// HTTP client with a per-request timeout, for detection probes.
///
/// # Examples
///
/// ```no_run
/// use multiminer_lib::{Endpoint, HttpProbe};
///
/// # async fn example() -> multiminer_lib::Result<()> {
/// let probe = HttpProbe::new(HttpProbe::DEFAULT_TIMEOUT)?;
/// let endpoint = Endpoint::new("10.0.0.20");
///
/// let paths = ["/api/status", "/cgi-bin/minerStatus.cgi"];
/// if let Some(path) = probe.first_ok(&endpoint, &paths).await {
///     println!("answered on {path}");
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HttpProbe {
    client: Client,
    timeout: Duration,
}

impl HttpProbe {
    /// Default per-request timeout.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(1200);

    /// Creates a probe whose requests give up after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be created.
    pub fn new(timeout: Duration) -> std::result::Result<Self, ProtocolError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ProtocolError::Http)?;

        Ok(Self { client, timeout })
    }

    /// Creates a probe using the configured detection budget.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be created.
    pub fn from_config(config: &ManagerConfig) -> std::result::Result<Self, ProtocolError> {
        Self::new(config.probe_timeout)
    }

    /// Returns the per-request timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Tries `paths` in order and returns the first one answering `200 OK`.
    ///
    /// Transport failures and other statuses move on to the next candidate.
    pub async fn first_ok(&self, endpoint: &Endpoint, paths: &[&str]) -> Option<String> {
        for path in paths {
            let url = endpoint.url(path);

            match self.client.get(&url).send().await {
                Ok(response) if response.status() == reqwest::StatusCode::OK => {
                    tracing::debug!(url = %url, "Probe matched");
                    return Some((*path).to_string());
                }
                Ok(response) => {
                    tracing::trace!(url = %url, status = response.status().as_u16(), "Probe miss");
                }
                Err(e) => {
                    tracing::trace!(url = %url, error = %e, "Probe failed");
                }
            }
        }
        None
    }

    /// Fetches `path` and decodes the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Timeout`] if the device does not answer in
    /// time, [`ProtocolError::ConnectionFailed`] if it cannot be reached or
    /// answers with a non-success status, and [`ParseError::Json`] if the
    /// body is not the expected JSON.
    pub async fn fetch_json<T: DeserializeOwned>(
        &self,
        endpoint: &Endpoint,
        path: &str,
    ) -> Result<T> {
        let url = endpoint.url(path);
        tracing::debug!(url = %url, "Fetching JSON");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| self.map_transport(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProtocolError::ConnectionFailed(format!(
                "HTTP {} - {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown")
            ))
            .into());
        }

        let body = response.text().await.map_err(|e| self.map_transport(e))?;
        serde_json::from_str(&body).map_err(|e| ParseError::Json(e).into())
    }

    fn map_transport(&self, error: reqwest::Error) -> ProtocolError {
        if error.is_timeout() {
            ProtocolError::Timeout(u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX))
        } else if error.is_connect() {
            ProtocolError::ConnectionFailed(error.to_string())
        } else {
            ProtocolError::Http(error)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_timeout() {
        let probe = HttpProbe::new(HttpProbe::DEFAULT_TIMEOUT).unwrap();
        assert_eq!(probe.timeout(), Duration::from_millis(1200));
    }

    #[test]
    fn from_config_uses_probe_timeout() {
        let config = ManagerConfig::default().with_probe_timeout(Duration::from_millis(800));
        let probe = HttpProbe::from_config(&config).unwrap();
        assert_eq!(probe.timeout(), Duration::from_millis(800));
    }

    #[tokio::test]
    async fn unreachable_endpoint_matches_nothing() {
        let probe = HttpProbe::new(Duration::from_millis(200)).unwrap();
        // Port 9 on localhost is the discard service, normally closed.
        let endpoint = Endpoint::new("127.0.0.1:9");
        assert_eq!(probe.first_ok(&endpoint, &["/", "/api"]).await, None);
    }
}
