//! TOML-based configuration for the server.
//!
//! The file is optional.  When it is absent every setting takes its default,
//! and command-line flags (see `main.rs`) override whatever the file says.
//!
//! # What is TOML? (for beginners)
//!
//! TOML (Tom's Obvious Minimal Language) is a configuration file format designed
//! to be easy to read and write.  It looks similar to INI files but with more
//! data types.  Example:
//!
//! ```toml
//! [server]
//! log_level = "info"
//!
//! [network]
//! bind_address = "0.0.0.0"
//! port = 12345
//!
//! [sessions]
//! max_sessions = 3
//! read_timeout_secs = 300
//!
//! [repository]
//! path = "repo"
//! ```
//!
//! # Serde default values
//!
//! Fields annotated with `#[serde(default = "some_fn")]` use the return value
//! of `some_fn()` when the field is absent from the TOML file, and whole
//! sections annotated with `#[serde(default)]` may be left out entirely.

use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::application::registry::DEFAULT_MAX_SESSIONS;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// `network.bind_address` is not an IP address.
    #[error("invalid bind address {0:?}")]
    InvalidBindAddress(String),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level server configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
    #[serde(default)]
    pub server: GeneralConfig,
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub sessions: SessionsConfig,
    #[serde(default)]
    pub repository: RepositoryConfig,
}

/// General process settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GeneralConfig {
    /// `tracing` log level: `"error"`, `"warn"`, `"info"`, `"debug"`, `"trace"`.
    /// `RUST_LOG` takes precedence when set.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Listening socket settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NetworkConfig {
    /// IP address to bind to.  `"0.0.0.0"` binds all interfaces.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// TCP port clients connect to.
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Session admission and lifetime settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionsConfig {
    /// Maximum number of sessions connected at the same time.
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
    /// Seconds to wait for a client line before dropping the session.
    /// Absent (or `0`) means wait indefinitely.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_timeout_secs: Option<u64>,
}

/// Location of the files served to clients.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RepositoryConfig {
    #[serde(default = "default_repository_path")]
    pub path: PathBuf,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_log_level() -> String {
    "info".to_string()
}
fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    12345
}
fn default_max_sessions() -> usize {
    DEFAULT_MAX_SESSIONS
}
fn default_repository_path() -> PathBuf {
    PathBuf::from("repo")
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
        }
    }
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            max_sessions: default_max_sessions(),
            read_timeout_secs: None,
        }
    }
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            path: default_repository_path(),
        }
    }
}

// ── Derived values ────────────────────────────────────────────────────────────

impl ServerConfig {
    /// Socket address the listener binds to.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidBindAddress`] if `network.bind_address`
    /// does not parse as an IPv4 or IPv6 address.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip: IpAddr = self
            .network
            .bind_address
            .parse()
            .map_err(|_| ConfigError::InvalidBindAddress(self.network.bind_address.clone()))?;
        Ok(SocketAddr::new(ip, self.network.port))
    }

    /// Per-line read timeout, if one is configured.
    pub fn read_timeout(&self) -> Option<Duration> {
        self.sessions
            .read_timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}

// ── Loading ───────────────────────────────────────────────────────────────────

/// Loads `ServerConfig` from `path`, returning `ServerConfig::default()` if
/// the file does not exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config(path: &Path) -> Result<ServerConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => {
            let cfg: ServerConfig = toml::from_str(&content)?;
            Ok(cfg)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ServerConfig::default()),
        Err(e) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
