//! Infrastructure layer for the FileShare server.
//!
//! Contains OS-facing adapters: the TCP listener, the filesystem repository,
//! and configuration file storage.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `fileshare_core`, but MUST NOT be imported by the `application` layer
//! outside of tests.

pub mod network;
pub mod repository;
pub mod storage;
