//! fileshare-client library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the binary entry point in `main.rs` share the same module tree.
//!
//! # What does fileshare-client do? (for beginners)
//!
//! The client connects to a FileShare server, answers its identity
//! challenge, and then forwards one command per line typed by the user:
//!
//! 1. `status` prints every session the server has seen.
//! 2. `list` prints the files the server offers.
//! 3. Any other word is a file name; the file is downloaded into the local
//!    download directory.
//! 4. `exit` (or end of input, or Ctrl-C) ends the session.

/// Application layer: the protocol driver and the download capability.
pub mod application;

/// Infrastructure layer: TCP connection and download directory.
pub mod infrastructure;
