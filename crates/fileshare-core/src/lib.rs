//! # fileshare-core
//!
//! Shared library for FileShare containing the framing layer, the wire
//! vocabulary, and the session domain types.
//!
//! This crate is used by both the server and the client applications.
//! It is generic over `tokio` byte streams and never opens a socket itself.
//!
//! # Architecture overview (for beginners)
//!
//! FileShare is a small file server: a client connects over TCP, is assigned
//! an identity (`Client01`, …), and then sends one text command per line:
//! `status`, `list`, `exit`, or the name of a file to download.
//!
//! - **`protocol`** – How bytes travel over the network.  Control messages
//!   are newline-terminated UTF-8 lines; file contents travel as raw bytes
//!   whose length is announced by a preceding `FILESIZE <n>` line.
//!
//! - **`domain`** – Session identities and the historical records the server
//!   reports through `status`.

pub mod domain;
pub mod protocol;

// Re-export the most-used types at the crate root so callers can write
// `fileshare_core::SessionId` instead of `fileshare_core::domain::session::SessionId`.
pub use domain::session::{SessionId, SessionRecord, StatusRow, TIMESTAMP_FORMAT};
pub use protocol::framing::{send_line, send_payload, FramingError, LineReader};
pub use protocol::messages::{Command, ProtocolError, ServerLine};
