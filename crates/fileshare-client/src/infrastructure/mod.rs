//! Infrastructure layer for the client: the TCP connection and the local
//! download directory.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `fileshare_core`, but MUST NOT be imported by the `application` layer
//! outside of tests.

pub mod downloads;
pub mod network;
