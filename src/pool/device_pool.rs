// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Session bookkeeping for a single device.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tokio::time::Instant;

use super::PoolStats;
use super::session::{PooledSession, SessionId};
use crate::config::PoolConfig;
use crate::driver::Session;
use crate::error::{DeviceError, Result};
use crate::manager::Device;

/// An idle session waiting for reuse.
struct IdleSession {
    id: SessionId,
    session: Arc<dyn Session>,
}

/// A session currently lent out.
struct ActiveSession {
    session: Arc<dyn Session>,
    valid: Arc<AtomicBool>,
}

#[derive(Default)]
struct State {
    /// Most recently returned session last.
    idle: Vec<IdleSession>,
    active: HashMap<SessionId, ActiveSession>,
    created_at: HashMap<SessionId, Instant>,
    /// Sessions being opened; they count against `max_open`.
    opening: usize,
    closed: bool,
}

/// Bounded set of sessions for one device.
///
/// Limits and the device generation are captured when the pool is created.
/// All bookkeeping happens under a synchronous lock that is never held across
/// driver calls.
pub(crate) struct DevicePool {
    limits: PoolConfig,
    generation: u64,
    state: Mutex<State>,
}

impl DevicePool {
    pub(crate) fn new(limits: PoolConfig, generation: u64) -> Self {
        Self {
            limits,
            generation,
            state: Mutex::new(State::default()),
        }
    }

    /// Generation of the device record this pool serves.
    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    /// Lends a session out, reusing the most recently returned idle one or
    /// opening a new one while under `max_open`.
    pub(crate) async fn checkout(self: &Arc<Self>, device: &Device) -> Result<PooledSession> {
        {
            let mut state = self.state.lock();

            if let Some(IdleSession { id, session }) = state.idle.pop() {
                let valid = Arc::new(AtomicBool::new(true));
                state.active.insert(
                    id,
                    ActiveSession {
                        session: Arc::clone(&session),
                        valid: Arc::clone(&valid),
                    },
                );
                tracing::debug!(
                    device_id = %device.id,
                    session_id = %id,
                    "Reusing idle session"
                );
                return Ok(self.handle(id, device, session, valid));
            }

            if state.active.len() + state.opening >= self.limits.max_open {
                tracing::debug!(
                    device_id = %device.id,
                    max_open = self.limits.max_open,
                    "Connection pool exhausted"
                );
                return Err(DeviceError::PoolExhausted {
                    max_open: self.limits.max_open,
                }
                .into());
            }

            state.opening += 1;
        }

        let slot = OpeningSlot {
            pool: self.as_ref(),
            armed: true,
        };
        let session: Arc<dyn Session> = Arc::from(device.driver.open(&device.endpoint).await?);

        let mut state = self.state.lock();
        slot.release(&mut state);

        if state.closed {
            drop(state);
            tracing::debug!(
                device_id = %device.id,
                "Pool closed while opening, discarding session"
            );
            close_quietly(session).await;
            return Err(DeviceError::PoolClosed.into());
        }

        let id = SessionId::next();
        let valid = Arc::new(AtomicBool::new(true));
        state.created_at.insert(id, Instant::now());
        state.active.insert(
            id,
            ActiveSession {
                session: Arc::clone(&session),
                valid: Arc::clone(&valid),
            },
        );
        drop(state);

        tracing::debug!(device_id = %device.id, session_id = %id, "Opened new session");
        Ok(self.handle(id, device, session, valid))
    }

    fn handle(
        self: &Arc<Self>,
        id: SessionId,
        device: &Device,
        session: Arc<dyn Session>,
        valid: Arc<AtomicBool>,
    ) -> PooledSession {
        PooledSession::new(id, device.id.clone(), session, valid, Arc::downgrade(self))
    }

    /// Takes a session back, keeping it idle if there is room and closing it
    /// otherwise.
    pub(crate) async fn checkin(&self, pooled: PooledSession) -> Result<()> {
        let id = pooled.id();
        if !pooled.is_valid() {
            // Already closed by a pool shutdown.
            return Err(DeviceError::InvalidSession(id.value()).into());
        }

        let (to_close, known) = {
            let mut state = self.state.lock();
            let state = &mut *state;

            if state.active.remove(&id).is_none() {
                (Some(pooled.into_session()), false)
            } else if state.idle.len() < self.limits.max_idle {
                state.idle.push(IdleSession {
                    id,
                    session: pooled.into_session(),
                });
                (None, true)
            } else {
                state.created_at.remove(&id);
                (Some(pooled.into_session()), true)
            }
        };

        if let Some(session) = to_close {
            tracing::debug!(session_id = %id, "Closing session instead of keeping it idle");
            close_quietly(session).await;
        }

        if known {
            Ok(())
        } else {
            Err(DeviceError::InvalidSession(id.value()).into())
        }
    }

    /// Forgets a session whose handle was dropped without being returned and
    /// closes it on the runtime in the background.
    pub(crate) fn abandon(&self, id: SessionId, session: Arc<dyn Session>) {
        let tracked = {
            let mut state = self.state.lock();
            let state = &mut *state;
            let tracked = state.active.remove(&id).is_some();
            if tracked {
                state.created_at.remove(&id);
            }
            tracked
        };
        if !tracked {
            return;
        }

        tracing::debug!(session_id = %id, "Session dropped while checked out, closing it");
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(close_quietly(session));
            }
            Err(_) => {
                tracing::debug!(session_id = %id, "No runtime available, session not closed");
            }
        }
    }

    /// Closes idle sessions older than the configured time-to-live.
    ///
    /// Returns the number of evicted sessions.
    pub(crate) async fn clean_expired(&self) -> usize {
        let expired = {
            let mut state = self.state.lock();
            let state = &mut *state;
            let now = Instant::now();
            let ttl = self.limits.idle_ttl;

            let mut expired = Vec::new();
            for entry in std::mem::take(&mut state.idle) {
                match state.created_at.get(&entry.id).copied() {
                    Some(created) if now.duration_since(created) < ttl => state.idle.push(entry),
                    // Sessions without a creation time are treated as expired.
                    _ => {
                        state.created_at.remove(&entry.id);
                        expired.push(entry.session);
                    }
                }
            }
            expired
        };

        let count = expired.len();
        for session in expired {
            close_quietly(session).await;
        }
        count
    }

    /// Closes every idle and active session and marks the pool closed.
    pub(crate) async fn close_all(&self) {
        let sessions: Vec<Arc<dyn Session>> = {
            let mut state = self.state.lock();
            let state = &mut *state;
            state.closed = true;
            state.created_at.clear();

            let idle = state.idle.drain(..).map(|entry| entry.session);
            let active = state.active.drain().map(|(_, entry)| {
                entry.valid.store(false, Ordering::Release);
                entry.session
            });
            idle.chain(active).collect()
        };

        for session in sessions {
            close_quietly(session).await;
        }
    }

    pub(crate) fn stats(&self) -> PoolStats {
        let state = self.state.lock();
        PoolStats {
            active_connections: state.active.len(),
            idle_connections: state.idle.len(),
            max_open: self.limits.max_open,
            max_idle: self.limits.max_idle,
        }
    }
}

/// Reservation of one `max_open` slot while a session is being opened.
///
/// Dropping it unreleased (failed or cancelled open) gives the slot back.
struct OpeningSlot<'a> {
    pool: &'a DevicePool,
    armed: bool,
}

impl OpeningSlot<'_> {
    fn release(mut self, state: &mut State) {
        state.opening -= 1;
        self.armed = false;
    }
}

impl Drop for OpeningSlot<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.pool.state.lock().opening -= 1;
        }
    }
}

/// Closes a session, logging instead of propagating failures.
pub(crate) async fn close_quietly(session: Arc<dyn Session>) {
    if let Err(e) = session.close().await {
        tracing::debug!(error = %e, "Failed to close session");
    }
}
