//! TCP listener: accept loop and per-session task management.
//!
//! This module is responsible for:
//!
//! 1. Binding a TCP listener on the configured address.
//! 2. Presenting every accepted connection to the admission controller.
//! 3. Spawning one Tokio task per admitted connection to run its session.
//! 4. Attaching each task's abort handle to its registry entry, so shutdown
//!    can close live sessions.
//! 5. Stopping when the shared `running` flag is cleared.
//!
//! # Scalability
//!
//! The accept loop only decides admission and spawns; it never waits on a
//! session's I/O.  One slow client therefore delays nobody else.

use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::Context;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::application::admission::{Admission, AdmissionController};
use crate::application::registry::SessionRegistry;
use crate::application::session::{SessionContext, SessionEngine};

/// How long one `accept()` may block before the shutdown flag is rechecked.
const ACCEPT_POLL: Duration = Duration::from_millis(200);

/// A bound listener plus everything sessions share.
pub struct Server {
    listener: TcpListener,
    admission: AdmissionController,
    context: SessionContext,
}

impl Server {
    /// Binds the listening socket.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is in use or cannot be bound.
    pub async fn bind(addr: SocketAddr, context: SessionContext) -> anyhow::Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to bind listener on {addr}"))?;
        let admission = AdmissionController::new(Arc::clone(&context.registry));
        Ok(Self {
            listener,
            admission,
            context,
        })
    }

    /// Address actually bound; useful when binding port 0.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.context.registry
    }

    /// Runs the accept loop until `running` is set to `false`, then closes
    /// every live session.
    ///
    /// # Errors
    ///
    /// Currently never fails once bound; transient accept errors are logged
    /// and the loop continues.
    pub async fn run(self, running: Arc<AtomicBool>) -> anyhow::Result<()> {
        match self.local_addr() {
            Ok(addr) => info!("listening on {addr}"),
            Err(e) => warn!("listening (address unavailable: {e})"),
        }

        loop {
            if !running.load(Ordering::Relaxed) {
                info!("shutdown flag set; stopping accept loop");
                break;
            }

            // Short timeout so the flag is observed even when nobody connects.
            match timeout(ACCEPT_POLL, self.listener.accept()).await {
                Ok(Ok((stream, peer))) => self.accept(stream, peer).await,
                Ok(Err(e)) => error!("accept error: {e}"),
                Err(_) => {}
            }
        }

        let closed = self.context.registry.shutdown().await;
        info!("closed {closed} live session(s)");
        Ok(())
    }

    async fn accept(&self, mut stream: TcpStream, peer: SocketAddr) {
        debug!("connection from {peer}");

        let id = match self.admission.admit(peer, &mut stream).await {
            Ok(Admission::Admitted(id)) => id,
            Ok(Admission::Refused(_)) => return,
            Err(e) => {
                warn!("could not send BUSY to {peer}: {e}");
                return;
            }
        };

        let (read_half, write_half) = stream.into_split();
        let engine = SessionEngine::new(id, read_half, write_half, self.context.clone());
        let task = tokio::spawn(handle_session(engine, peer));

        if !self.context.registry.attach_task(id, task.abort_handle()).await {
            debug!("{id} ended before its task handle was attached");
        }
    }
}

// ── Per-session handler ───────────────────────────────────────────────────────

/// Entry point of each session task; runs the engine and logs the outcome.
async fn handle_session(
    engine: SessionEngine<tokio::net::tcp::OwnedReadHalf, tokio::net::tcp::OwnedWriteHalf>,
    peer: SocketAddr,
) {
    let id = engine.id();
    match engine.run().await {
        Ok(end) => info!("{id} ({peer}) closed: {end:?}"),
        Err(e) => warn!("{id} ({peer}) closed with error: {e}"),
    }
}
