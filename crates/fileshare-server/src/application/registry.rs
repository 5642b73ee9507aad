//! SessionRegistry: the process-wide record of current and past sessions.
//!
//! The registry keeps two mappings keyed by [`SessionId`]:
//!
//! - **active** – sessions that are connected right now.  Its size drives
//!   admission decisions, and each entry holds the session task's
//!   [`AbortHandle`] once the accept loop has attached it.
//! - **history** – every session ever admitted, connected or not.  Entries are
//!   never removed; `status` reports all of them.
//!
//! # Locking
//!
//! Both mappings and the identity counter live behind one
//! [`tokio::sync::Mutex`].  Every operation takes the lock once, does its work,
//! and releases it.  The single exception is [`SessionRegistry::status_report`],
//! which hands the guard to the caller so a whole report is emitted from one
//! consistent snapshot.
//!
//! # Why an async mutex? (for beginners)
//!
//! A `std::sync::Mutex` guard must not be held across an `.await`.  The status
//! report writes to the network while holding the lock, so the guard has to
//! survive `.await` points; `tokio::sync::Mutex` allows exactly that.

use std::collections::{BTreeMap, HashMap};
use std::net::SocketAddr;
use std::sync::Arc;

use fileshare_core::{SessionId, SessionRecord, StatusRow};
use tokio::sync::{Mutex, MutexGuard};
use tokio::task::AbortHandle;
use tracing::debug;

use crate::application::admission::AdmissionError;
use crate::application::clock::Clock;

/// Default number of sessions allowed to be connected at once.
pub const DEFAULT_MAX_SESSIONS: usize = 3;

/// Live state of a connected session.
#[derive(Debug, Default)]
struct ActiveSession {
    task: Option<AbortHandle>,
}

#[derive(Debug, Default)]
struct RegistryState {
    last_number: u32,
    active: HashMap<SessionId, ActiveSession>,
    history: BTreeMap<SessionId, SessionRecord>,
}

/// Shared registry of sessions; wrap in an `Arc` and hand a clone to every
/// session task.
pub struct SessionRegistry {
    state: Mutex<RegistryState>,
    max_sessions: usize,
    clock: Arc<dyn Clock>,
}

impl SessionRegistry {
    /// Creates an empty registry admitting at most `max_sessions` at once.
    pub fn new(max_sessions: usize, clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Mutex::new(RegistryState::default()),
            max_sessions,
            clock,
        }
    }

    /// Returns the configured concurrent-session limit.
    pub fn max_sessions(&self) -> usize {
        self.max_sessions
    }

    /// Checks capacity and, if there is room, registers a new session.
    ///
    /// The capacity check, the identity allocation, and both inserts happen
    /// under one acquisition of the lock, so concurrent callers can never
    /// overshoot the limit or share an identity.
    ///
    /// # Errors
    ///
    /// Returns [`AdmissionError::AtCapacity`] when `max_sessions` sessions are
    /// already connected; nothing is recorded and no identity is consumed.
    pub async fn admit(&self, addr: SocketAddr) -> Result<SessionId, AdmissionError> {
        let mut state = self.state.lock().await;

        if state.active.len() >= self.max_sessions {
            return Err(AdmissionError::AtCapacity {
                limit: self.max_sessions,
            });
        }
        let number = state
            .last_number
            .checked_add(1)
            .ok_or(AdmissionError::IdentitiesExhausted)?;

        state.last_number = number;
        let id = SessionId::new(number);
        state.active.insert(id, ActiveSession::default());
        state
            .history
            .insert(id, SessionRecord::connected(addr.to_string(), self.clock.now()));
        debug!("{id} registered from {addr}");
        Ok(id)
    }

    /// Attaches the session task's abort handle to an active session.
    ///
    /// Returns `false` if the session has already departed, in which case the
    /// handle is dropped.
    pub async fn attach_task(&self, id: SessionId, task: AbortHandle) -> bool {
        let mut state = self.state.lock().await;
        match state.active.get_mut(&id) {
            Some(active) => {
                active.task = Some(task);
                true
            }
            None => false,
        }
    }

    /// Marks a session as disconnected.
    ///
    /// Removes it from the active mapping and stamps the disconnect time on
    /// its historical record, which is kept.  Returns `false` if the session
    /// was not active.
    pub async fn depart(&self, id: SessionId) -> bool {
        let mut state = self.state.lock().await;
        let was_active = state.active.remove(&id).is_some();
        if was_active {
            let now = self.clock.now();
            if let Some(record) = state.history.get_mut(&id) {
                record.mark_disconnected(now);
            }
            debug!("{id} deregistered");
        }
        was_active
    }

    /// Number of sessions connected right now.
    pub async fn active_count(&self) -> usize {
        self.state.lock().await.active.len()
    }

    /// Returns a copy of one session's historical record.
    pub async fn record(&self, id: SessionId) -> Option<SessionRecord> {
        self.state.lock().await.history.get(&id).cloned()
    }

    /// Locks the registry and returns a view for emitting a status report.
    ///
    /// No session can be admitted or depart until the returned value is
    /// dropped; keep it only for as long as the report takes to write.
    pub async fn status_report(&self) -> StatusReport<'_> {
        StatusReport {
            guard: self.state.lock().await,
        }
    }

    /// Aborts every live session task and stamps its disconnect time.
    ///
    /// Used on operator shutdown.  Returns the number of sessions closed.
    pub async fn shutdown(&self) -> usize {
        let mut state = self.state.lock().await;
        let now = self.clock.now();
        let closing: Vec<(SessionId, ActiveSession)> = state.active.drain().collect();
        for (id, active) in &closing {
            if let Some(task) = &active.task {
                task.abort();
            }
            if let Some(record) = state.history.get_mut(id) {
                record.mark_disconnected(now);
            }
        }
        closing.len()
    }
}

/// Point-in-time view of the registry, held under its lock.
pub struct StatusReport<'a> {
    guard: MutexGuard<'a, RegistryState>,
}

impl StatusReport<'_> {
    /// Every known session, current and historical, in identity order.
    pub fn rows(&self) -> impl Iterator<Item = StatusRow<'_>> {
        self.guard
            .history
            .iter()
            .map(|(id, record)| StatusRow { id: *id, record })
    }

    /// Number of sessions in the report.
    pub fn len(&self) -> usize {
        self.guard.history.len()
    }

    /// Returns `true` if no session was ever admitted.
    pub fn is_empty(&self) -> bool {
        self.guard.history.is_empty()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
