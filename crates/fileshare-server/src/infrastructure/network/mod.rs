//! Network infrastructure for the server.
//!
//! - **`listener`** – Binds the TCP socket, runs the accept loop, and spawns
//!   one session task per admitted connection.

pub mod listener;
