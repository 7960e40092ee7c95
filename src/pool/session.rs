// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Checkout handles for pooled sessions.

use std::fmt;
use std::ops::Deref;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use super::device_pool::DevicePool;
use crate::driver::Session;
use crate::types::MinerId;

/// Global counter for generating unique session ids.
static SESSION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Process-wide unique identifier of an opened session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

impl SessionId {
    pub(crate) fn next() -> Self {
        Self(SESSION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the numeric value.
    #[must_use]
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A session checked out from a [`ConnectionPool`](super::ConnectionPool).
///
/// The handle is the only way to hold a pooled session. It is not `Clone`,
/// and [`ConnectionPool::return_session`](super::ConnectionPool::return_session)
/// consumes it, so a session cannot be returned twice. The handle dereferences
/// to the underlying [`Session`].
///
/// Shutting the pool down while a session is checked out closes the session
/// and invalidates the handle; returning it afterwards is reported as
/// [`DeviceError::InvalidSession`](crate::error::DeviceError::InvalidSession).
///
/// Dropping the handle without returning it (for instance when the future
/// using it is cancelled) frees its slot and closes the session in the
/// background.
pub struct PooledSession {
    id: SessionId,
    device_id: MinerId,
    session: Arc<dyn Session>,
    valid: Arc<AtomicBool>,
    origin: Weak<DevicePool>,
    /// Set once the pool has taken the session back.
    settled: bool,
}

impl PooledSession {
    pub(crate) fn new(
        id: SessionId,
        device_id: MinerId,
        session: Arc<dyn Session>,
        valid: Arc<AtomicBool>,
        origin: Weak<DevicePool>,
    ) -> Self {
        Self {
            id,
            device_id,
            session,
            valid,
            origin,
            settled: false,
        }
    }

    /// Returns the session identifier.
    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Returns the device this session belongs to.
    #[must_use]
    pub fn device_id(&self) -> &MinerId {
        &self.device_id
    }

    /// Returns the underlying session.
    #[must_use]
    pub fn session(&self) -> &dyn Session {
        self.session.as_ref()
    }

    /// Returns false once the pool has shut the session down.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.valid.load(Ordering::Acquire)
    }

    /// Returns the device pool that lent this session out, if still alive.
    pub(crate) fn origin(&self) -> Option<Arc<DevicePool>> {
        self.origin.upgrade()
    }

    pub(crate) fn into_session(mut self) -> Arc<dyn Session> {
        self.settled = true;
        Arc::clone(&self.session)
    }
}

impl Drop for PooledSession {
    fn drop(&mut self) {
        // Invalid handles were already closed by the pool shutdown.
        if self.settled || !self.is_valid() {
            return;
        }
        if let Some(pool) = self.origin.upgrade() {
            pool.abandon(self.id, Arc::clone(&self.session));
        }
    }
}

impl Deref for PooledSession {
    type Target = dyn Session;

    fn deref(&self) -> &Self::Target {
        self.session.as_ref()
    }
}

impl fmt::Debug for PooledSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledSession")
            .field("id", &self.id)
            .field("device_id", &self.device_id)
            .field("valid", &self.is_valid())
            .finish_non_exhaustive()
    }
}
