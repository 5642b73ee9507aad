//! Session protocol engine: drives one admitted connection from handshake to
//! close.
//!
//! # State machine
//!
//! ```text
//!   Handshake ──echo matches──▶ Ready ──exit / peer closed / error──▶ Closed
//!       │                                                          ▲
//!       └──────────── wrong echo / peer closed ────────────────────┘
//! ```
//!
//! In `Ready` the engine reads one command line per iteration and answers it
//! completely before reading the next.  Whatever way the session ends, the
//! registry is told the session departed, so its slot is freed and its
//! disconnect time recorded.

use std::sync::Arc;
use std::time::Duration;

use fileshare_core::protocol::messages::HANDSHAKE_ERROR;
use fileshare_core::{send_line, send_payload, Command, FramingError, LineReader, ServerLine, SessionId};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::application::registry::SessionRegistry;
use crate::application::repository::{is_plain_name, FileRepository};

/// Errors that end a session abnormally.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Framing(#[from] FramingError),

    /// The peer sent nothing for the configured read timeout.
    #[error("no input received for {0:?}")]
    ReadTimeout(Duration),
}

/// How a session that ended without error finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The client sent `exit` and was answered with `BYE`.
    ClientExit,
    /// The client closed its side while the engine was waiting for a command.
    PeerClosed,
    /// The client failed to echo its identity.
    HandshakeRejected,
}

/// Where the engine is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Handshake,
    Ready,
    Closed,
}

/// Shared services every session needs.  Cheap to clone.
#[derive(Clone)]
pub struct SessionContext {
    pub registry: Arc<SessionRegistry>,
    pub repository: Arc<dyn FileRepository>,
    /// Upper bound on waiting for any single line; `None` waits forever.
    pub read_timeout: Option<Duration>,
}

/// One admitted session bound to its transport.
pub struct SessionEngine<R, W> {
    id: SessionId,
    reader: LineReader<R>,
    writer: W,
    context: SessionContext,
    state: SessionState,
}

impl<R, W> SessionEngine<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    /// Binds an already-registered session to its read and write halves.
    pub fn new(id: SessionId, reader: R, writer: W, context: SessionContext) -> Self {
        Self {
            id,
            reader: LineReader::new(reader),
            writer,
            context,
            state: SessionState::Handshake,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Runs the session to completion and deregisters it.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] if the transport failed or timed out.  The
    /// session is deregistered in that case too.
    pub async fn run(mut self) -> Result<SessionEnd, SessionError> {
        let outcome = self.drive().await;
        self.state = SessionState::Closed;
        self.context.registry.depart(self.id).await;
        outcome
    }

    async fn drive(&mut self) -> Result<SessionEnd, SessionError> {
        if !self.handshake().await? {
            return Ok(SessionEnd::HandshakeRejected);
        }
        self.state = SessionState::Ready;

        loop {
            let Some(line) = self.next_line().await? else {
                debug!("{} closed by peer", self.id);
                return Ok(SessionEnd::PeerClosed);
            };
            let command = Command::parse(&line);
            debug!("{} -> {command:?}", self.id);

            match command {
                Command::Exit => {
                    self.send(&ServerLine::Bye).await?;
                    return Ok(SessionEnd::ClientExit);
                }
                Command::Status => self.send_status().await?,
                Command::List => self.send_listing().await?,
                Command::Fetch(name) => self.send_file(&name).await?,
            }
        }
    }

    // ── Handshake ────────────────────────────────────────────────────────────

    /// Returns `true` once the client has echoed its identity.
    async fn handshake(&mut self) -> Result<bool, SessionError> {
        let expected = self.id.to_string();
        self.send(&ServerLine::YourName(expected.clone())).await?;

        match self.next_line().await? {
            Some(reply) if reply.trim() == expected => {
                self.send(&ServerLine::Hello(expected)).await?;
                info!("{} handshake complete", self.id);
                Ok(true)
            }
            reply => {
                info!("{} handshake failed: got {reply:?}", self.id);
                // The peer may already be gone.
                let err = ServerLine::Err(HANDSHAKE_ERROR.to_string());
                if let Err(e) = send_line(&mut self.writer, &err.to_string()).await {
                    debug!("{} could not deliver ERR: {e}", self.id);
                }
                Ok(false)
            }
        }
    }

    // ── Commands ─────────────────────────────────────────────────────────────

    /// Emits the bracketed report while holding the registry lock, so no
    /// session can join or leave part-way through.
    async fn send_status(&mut self) -> Result<(), SessionError> {
        let registry = Arc::clone(&self.context.registry);
        let report = registry.status_report().await;

        self.send(&ServerLine::StatusBegin).await?;
        for row in report.rows() {
            send_line(&mut self.writer, &row.to_string()).await?;
        }
        self.send(&ServerLine::StatusEnd).await?;
        Ok(())
    }

    async fn send_listing(&mut self) -> Result<(), SessionError> {
        let names = match self.context.repository.list_names().await {
            Ok(names) => names,
            Err(e) => {
                warn!("{}: {e}; reporting empty listing", self.id);
                Vec::new()
            }
        };
        self.send(&ServerLine::Files(names)).await
    }

    async fn send_file(&mut self, name: &str) -> Result<(), SessionError> {
        let file = if is_plain_name(name) {
            match self.context.repository.open(name).await {
                Ok(file) => file,
                Err(e) => {
                    warn!("{}: {e}; answering with ACK", self.id);
                    None
                }
            }
        } else {
            None
        };

        let Some(mut file) = file else {
            return self.send(&ServerLine::Ack(name.to_string())).await;
        };

        self.send(&ServerLine::FileSize(file.size)).await?;
        send_payload(&mut file.reader, &mut self.writer, file.size).await?;
        self.send(&ServerLine::FileDone).await?;
        info!("{} downloaded {name:?} ({} bytes)", self.id, file.size);
        Ok(())
    }

    // ── I/O helpers ──────────────────────────────────────────────────────────

    async fn send(&mut self, line: &ServerLine) -> Result<(), SessionError> {
        send_line(&mut self.writer, &line.to_string()).await?;
        Ok(())
    }

    async fn next_line(&mut self) -> Result<Option<String>, SessionError> {
        let limit = self.context.read_timeout;
        let read = self.reader.recv_line();
        let line = match limit {
            Some(limit) => timeout(limit, read)
                .await
                .map_err(|_| SessionError::ReadTimeout(limit))??,
            None => read.await?,
        };
        Ok(line)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
