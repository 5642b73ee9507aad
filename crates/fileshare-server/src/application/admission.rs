//! Admission control: decides whether a freshly accepted connection may start
//! a session.
//!
//! The decision itself is made inside [`SessionRegistry::admit`] so that the
//! capacity check and the registration share one critical section.  This
//! module adds the wire side of a refusal: the `BUSY` line written to the
//! rejected peer before its connection is dropped.

use std::net::SocketAddr;
use std::sync::Arc;

use fileshare_core::protocol::messages::BUSY_REASON;
use fileshare_core::{send_line, FramingError, ServerLine, SessionId};
use thiserror::Error;
use tokio::io::AsyncWrite;
use tracing::{debug, info};

use crate::application::registry::SessionRegistry;

/// Reasons a connection is refused a session.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AdmissionError {
    /// The configured number of sessions is already connected.
    #[error("server at capacity ({limit} sessions)")]
    AtCapacity { limit: usize },

    /// Every possible session identity has been handed out.
    #[error("session identities exhausted")]
    IdentitiesExhausted,
}

/// Outcome of presenting a new connection to the controller.
#[derive(Debug, PartialEq, Eq)]
pub enum Admission {
    /// A session was registered under this identity.
    Admitted(SessionId),
    /// The peer was sent `BUSY` and must be disconnected.
    Refused(AdmissionError),
}

/// Gatekeeper sitting between the accept loop and the session engine.
pub struct AdmissionController {
    registry: Arc<SessionRegistry>,
}

impl AdmissionController {
    pub fn new(registry: Arc<SessionRegistry>) -> Self {
        Self { registry }
    }

    /// Admits `peer` or tells it the server is busy.
    ///
    /// On refusal the `BUSY` line is written to `stream` and the caller is
    /// expected to drop the connection.  Nothing is registered for a refused
    /// peer, and no identity is consumed.
    ///
    /// # Errors
    ///
    /// Only a failure to write the `BUSY` line is an error; the refusal itself
    /// is reported as [`Admission::Refused`].
    pub async fn admit<W>(&self, peer: SocketAddr, stream: &mut W) -> Result<Admission, FramingError>
    where
        W: AsyncWrite + Unpin,
    {
        match self.registry.admit(peer).await {
            Ok(id) => {
                info!("{id} admitted from {peer}");
                Ok(Admission::Admitted(id))
            }
            Err(reason) => {
                info!("refusing {peer}: {reason}");
                let busy = ServerLine::Busy(BUSY_REASON.to_string());
                send_line(stream, &busy.to_string()).await?;
                debug!("sent BUSY to {peer}");
                Ok(Admission::Refused(reason))
            }
        }
    }
}
