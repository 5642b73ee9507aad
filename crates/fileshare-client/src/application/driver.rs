//! Client protocol driver: the client half of the session protocol.
//!
//! The driver owns both halves of the connection and turns one line of user
//! input into one complete exchange with the server.  It never prints; the
//! binary renders the returned [`Reply`] values.
//!
//! # Exchange shapes (for beginners)
//!
//! | Input        | Server answers with                                  |
//! |--------------|------------------------------------------------------|
//! | `status`     | `STATUS-BEGIN`, one row per session, `STATUS-END`    |
//! | `list`       | one `FILES ...` line                                 |
//! | `exit`       | `BYE`, then the connection closes                    |
//! | anything else| `FILESIZE n` + n raw bytes + `FILE-DONE`, or `<name> ACK` |

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use fileshare_core::{
    send_line, Command, FramingError, LineReader, ProtocolError, ServerLine,
};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, warn};

use crate::application::download::{download_name, DownloadStore};

/// Errors that end the client session.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("could not connect to server at {target}: {source}")]
    Connect {
        target: String,
        #[source]
        source: std::io::Error,
    },

    #[error("connection error: {0}")]
    Framing(#[from] FramingError),

    #[error("server closed the connection")]
    ServerClosed,

    #[error("unexpected greeting: {0}")]
    UnexpectedGreeting(String),
}

/// Result of the opening exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Handshake {
    /// The server is full; the full `BUSY ...` line is kept for display.
    Busy(String),
    /// Identity echoed; `greeting` is the server's `HELLO` line, if it sent one.
    Accepted {
        identity: String,
        greeting: Option<String>,
    },
}

/// Outcome of one user command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Rows between `STATUS-BEGIN` and `STATUS-END`.
    Status(Vec<String>),
    /// The server answered `status` with something other than `STATUS-BEGIN`.
    Unexpected(String),
    /// The `FILES ...` line.
    Listing(String),
    /// A download was verified and saved.
    Saved { path: PathBuf, bytes: u64 },
    /// Any other single-line answer, typically `<name> ACK`.
    Text(String),
    /// Answer to `exit`; the session is over.
    Bye(String),
    /// A recoverable problem; the session continues.
    Problem(String),
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Status(rows) => f.write_str(&rows.join("\n")),
            Reply::Unexpected(line) => write!(f, "Unexpected: {line}"),
            Reply::Saved { path, bytes } => {
                write!(f, "Saved file to {} ({bytes} bytes)", path.display())
            }
            Reply::Listing(line) | Reply::Text(line) | Reply::Bye(line) | Reply::Problem(line) => {
                f.write_str(line)
            }
        }
    }
}

/// Drives one connection to the server.
pub struct ClientDriver<R, W> {
    reader: LineReader<R>,
    writer: W,
    downloads: Arc<dyn DownloadStore>,
}

impl<R, W> ClientDriver<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    /// Lines from the server are read without a length cap, so a `FILES`
    /// listing of any size arrives intact.
    pub fn new(reader: R, writer: W, downloads: Arc<dyn DownloadStore>) -> Self {
        Self {
            reader: LineReader::with_max_line(reader, None),
            writer,
            downloads,
        }
    }

    /// Answers the server's identity challenge.
    ///
    /// # Errors
    ///
    /// [`ClientError::ServerClosed`] if the server hangs up first, and
    /// [`ClientError::UnexpectedGreeting`] if its first line is neither
    /// `BUSY` nor `YOURNAME`.
    pub async fn handshake(&mut self) -> Result<Handshake, ClientError> {
        let first = self.expect_line().await?;
        let identity = match ServerLine::parse(&first) {
            Ok(ServerLine::Busy(_)) => return Ok(Handshake::Busy(first)),
            Ok(ServerLine::YourName(identity)) => identity,
            _ => return Err(ClientError::UnexpectedGreeting(first)),
        };

        send_line(&mut self.writer, &identity).await?;
        let greeting = self.reader.recv_line().await?;
        debug!("handshake complete as {identity}");
        Ok(Handshake::Accepted { identity, greeting })
    }

    /// Sends one line of user input and collects the complete answer.
    ///
    /// Input is trimmed; blank input is not sent and yields `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Connection loss or a truncated payload.  Malformed answers and local
    /// disk failures while saving a download are [`Reply::Problem`] instead.
    pub async fn request(&mut self, input: &str) -> Result<Option<Reply>, ClientError> {
        let line = input.trim();
        if line.is_empty() {
            return Ok(None);
        }
        send_line(&mut self.writer, line).await?;

        let reply = match Command::parse(line) {
            Command::Exit => Reply::Bye(self.expect_line().await?),
            Command::Status => self.read_status().await?,
            Command::List => Reply::Listing(self.expect_line().await?),
            Command::Fetch(name) => self.read_fetch(&name).await?,
        };
        Ok(Some(reply))
    }

    async fn read_status(&mut self) -> Result<Reply, ClientError> {
        let first = self.expect_line().await?;
        if first != ServerLine::StatusBegin.to_string() {
            return Ok(Reply::Unexpected(first));
        }
        let end = ServerLine::StatusEnd.to_string();
        let mut rows = Vec::new();
        loop {
            let row = self.expect_line().await?;
            if row == end {
                return Ok(Reply::Status(rows));
            }
            rows.push(row);
        }
    }

    async fn read_fetch(&mut self, request: &str) -> Result<Reply, ClientError> {
        let first = self.expect_line().await?;
        match ServerLine::parse(&first) {
            Ok(ServerLine::FileSize(size)) => self.receive_file(request, size).await,
            Err(ProtocolError::MalformedFileSize(line)) => {
                Ok(Reply::Problem(format!("Bad FILESIZE header: {line}")))
            }
            _ => Ok(Reply::Text(first)),
        }
    }

    /// Streams an announced payload into a part file and commits it once
    /// `FILE-DONE` has been seen.
    async fn receive_file(&mut self, request: &str, size: u64) -> Result<Reply, ClientError> {
        let Some(name) = download_name(request) else {
            self.skip_transfer(size).await?;
            return Ok(Reply::Problem(format!(
                "Cannot save {request:?}: no usable file name"
            )));
        };

        let mut part = match self.downloads.begin(name).await {
            Ok(part) => part,
            Err(e) => {
                warn!("cannot create download file: {e}");
                self.skip_transfer(size).await?;
                return Ok(Reply::Problem(format!("Could not save {name}: {e}")));
            }
        };

        match self.reader.recv_exact_into(size, &mut part).await {
            Ok(()) => {}
            Err(FramingError::SinkFailed {
                expected,
                consumed,
                source,
            }) => {
                warn!("cannot write download file for {name}: {source}");
                part.discard().await;
                self.skip_transfer(expected - consumed).await?;
                return Ok(Reply::Problem(format!("Could not save {name}: {source}")));
            }
            Err(e) => {
                part.discard().await;
                return Err(e.into());
            }
        }

        let trailer = match self.reader.recv_line().await {
            Ok(Some(trailer)) => trailer,
            Ok(None) => {
                part.discard().await;
                return Err(ClientError::ServerClosed);
            }
            Err(e) => {
                part.discard().await;
                return Err(e.into());
            }
        };
        if trailer != ServerLine::FileDone.to_string() {
            part.discard().await;
            return Ok(Reply::Problem(format!(
                "Missing FILE-DONE marker (got: {trailer})"
            )));
        }

        match part.commit().await {
            Ok(path) => Ok(Reply::Saved { path, bytes: size }),
            Err(e) => {
                warn!("cannot commit download file for {name}: {e}");
                Ok(Reply::Problem(format!("Could not save {name}: {e}")))
            }
        }
    }

    /// Consumes the rest of a payload and its trailer without storing them.
    async fn skip_transfer(&mut self, remaining: u64) -> Result<(), ClientError> {
        self.reader
            .recv_exact_into(remaining, &mut tokio::io::sink())
            .await?;
        self.expect_line().await?;
        Ok(())
    }

    async fn expect_line(&mut self) -> Result<String, ClientError> {
        self.reader.recv_line().await?.ok_or(ClientError::ServerClosed)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
