//! Application layer of the client.
//!
//! - **`driver`**   – The client half of the protocol: handshake, one
//!   exchange per user command, download verification.
//! - **`download`** – The storage capability downloads are written through,
//!   plus the rule deriving a safe local file name.

pub mod download;
pub mod driver;
