//! Storage infrastructure: configuration file loading.
//!
//! The `config` sub-module reads the TOML configuration file and supplies
//! defaults for every setting the file leaves out (or when there is no file
//! at all).

pub mod config;
