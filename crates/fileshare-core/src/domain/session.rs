//! Session identity and the historical record kept for every connection.
//!
//! # Session lifecycle
//!
//! ```text
//! admitted ──► connected ──► disconnected
//!  (id allocated,            (disconnect time stamped,
//!   connect time stamped)     record kept for `status`)
//! ```
//!
//! Identities are numbered from 1 and never reused for the life of the
//! process, so a record can always be told apart from every other one.

use std::fmt;

use chrono::{DateTime, Local};

/// `strftime` pattern used for every timestamp on the wire.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Server-assigned session identity, rendered as `Client01`, `Client02`, ….
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SessionId(u32);

impl SessionId {
    /// Wraps a raw session number.
    pub fn new(number: u32) -> Self {
        Self(number)
    }

    /// Returns the raw session number.
    pub fn number(self) -> u32 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Client{:02}", self.0)
    }
}

/// What the registry remembers about one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    /// Remote peer as `host:port`.
    pub addr: String,
    /// When the session was admitted.
    pub connected_at: DateTime<Local>,
    /// When the session ended; `None` while connected.
    pub disconnected_at: Option<DateTime<Local>>,
}

impl SessionRecord {
    /// Creates a record for a session admitted at `connected_at`.
    pub fn connected(addr: impl Into<String>, connected_at: DateTime<Local>) -> Self {
        Self {
            addr: addr.into(),
            connected_at,
            disconnected_at: None,
        }
    }

    /// Returns `true` until a disconnect time has been stamped.
    pub fn is_connected(&self) -> bool {
        self.disconnected_at.is_none()
    }

    /// Stamps the disconnect time, keeping the first stamp if called twice.
    ///
    /// A clock that steps backwards never produces a disconnect earlier than
    /// the connect time.
    pub fn mark_disconnected(&mut self, at: DateTime<Local>) {
        if self.disconnected_at.is_none() {
            self.disconnected_at = Some(at.max(self.connected_at));
        }
    }
}

/// One line of the `status` report.
#[derive(Debug, Clone, Copy)]
pub struct StatusRow<'a> {
    pub id: SessionId,
    pub record: &'a SessionRecord,
}

impl fmt::Display for StatusRow<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} | {} | connected={} | disconnected=",
            self.id,
            self.record.addr,
            self.record.connected_at.format(TIMESTAMP_FORMAT)
        )?;
        match self.record.disconnected_at {
            Some(at) => write!(f, "{}", at.format(TIMESTAMP_FORMAT)),
            None => f.write_str("None"),
        }
    }
}
