//! Application layer of the FileShare server.
//!
//! # What is the "application" layer? (for beginners)
//!
//! In Clean Architecture the *application* layer sits between the domain
//! (session identities and records in `fileshare_core`) and the
//! infrastructure (sockets and the filesystem).  Code here:
//!
//! - **Orchestrates** the protocol: admission, handshake, command dispatch.
//! - **Depends on abstractions** (`FileRepository`, `Clock`) rather than on
//!   concrete storage or the system clock, so tests can substitute both.
//! - **Never opens a socket or a file itself.**  It works on any `tokio`
//!   byte stream handed in by the listener.
//!
//! # Sub-modules
//!
//! - **`registry`**   – Current and historical sessions behind one lock.
//! - **`admission`**  – Capacity gate in front of every new connection.
//! - **`session`**    – Per-connection state machine (handshake, commands).
//! - **`repository`** – The file store capability sessions read from.
//! - **`clock`**      – Wall-clock capability for connect/disconnect stamps.

pub mod admission;
pub mod clock;
pub mod registry;
pub mod repository;
pub mod session;
