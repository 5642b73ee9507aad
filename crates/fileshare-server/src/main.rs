//! FileShare server entry point.
//!
//! Serves the files of one directory to line-protocol clients over TCP.
//!
//! # Usage
//!
//! ```text
//! fileshare-server [OPTIONS]
//!
//! Options:
//!   --config <PATH>         TOML configuration file
//!   --bind <IP>             Address to listen on [default: 0.0.0.0]
//!   --port <PORT>           TCP port [default: 12345]
//!   --max-sessions <N>      Concurrent session limit [default: 3]
//!   --repo <DIR>            Directory of files to serve [default: repo]
//!   --read-timeout <SECS>   Drop sessions idle this long [default: none]
//! ```
//!
//! # Precedence
//!
//! Command-line flags (or their environment variables) override the config
//! file, which overrides the built-in defaults.
//!
//! | Variable                  | Flag             |
//! |---------------------------|------------------|
//! | `FILESHARE_BIND`          | `--bind`         |
//! | `FILESHARE_PORT`          | `--port`         |
//! | `FILESHARE_MAX_SESSIONS`  | `--max-sessions` |
//! | `FILESHARE_REPO`          | `--repo`         |
//! | `FILESHARE_READ_TIMEOUT`  | `--read-timeout` |

use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use fileshare_server::application::clock::SystemClock;
use fileshare_server::application::registry::SessionRegistry;
use fileshare_server::application::session::SessionContext;
use fileshare_server::infrastructure::network::listener::Server;
use fileshare_server::infrastructure::repository::FsRepository;
use fileshare_server::infrastructure::storage::config::{load_config, ServerConfig};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// FileShare server.
///
/// Every flag is optional; unset flags fall back to the config file and then
/// to the built-in defaults.
#[derive(Debug, Parser)]
#[command(name = "fileshare-server", about = "Line-protocol file server", version)]
struct Cli {
    /// TOML configuration file.  A missing file means "all defaults".
    #[arg(long, env = "FILESHARE_CONFIG")]
    config: Option<PathBuf>,

    /// IP address to bind to.
    #[arg(long, env = "FILESHARE_BIND")]
    bind: Option<String>,

    /// TCP port to listen on.
    #[arg(long, env = "FILESHARE_PORT")]
    port: Option<u16>,

    /// Maximum number of simultaneously connected sessions.
    #[arg(long, env = "FILESHARE_MAX_SESSIONS")]
    max_sessions: Option<usize>,

    /// Directory whose regular files are served.
    #[arg(long, env = "FILESHARE_REPO")]
    repo: Option<PathBuf>,

    /// Seconds a session may stay silent before it is dropped.
    #[arg(long, env = "FILESHARE_READ_TIMEOUT")]
    read_timeout: Option<u64>,
}

impl Cli {
    /// Overwrites every setting in `config` that was given on the command line.
    fn apply_to(&self, config: &mut ServerConfig) {
        if let Some(bind) = &self.bind {
            config.network.bind_address = bind.clone();
        }
        if let Some(port) = self.port {
            config.network.port = port;
        }
        if let Some(max) = self.max_sessions {
            config.sessions.max_sessions = max;
        }
        if let Some(repo) = &self.repo {
            config.repository.path = repo.clone();
        }
        if let Some(secs) = self.read_timeout {
            config.sessions.read_timeout_secs = Some(secs);
        }
    }

    /// Loads the config file (if any) and layers the CLI flags on top.
    fn resolve_config(&self) -> anyhow::Result<ServerConfig> {
        let mut config = match &self.config {
            Some(path) => load_config(path)
                .with_context(|| format!("failed to load config from {}", path.display()))?,
            None => ServerConfig::default(),
        };
        self.apply_to(&mut config);
        Ok(config)
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.resolve_config()?;

    // `RUST_LOG` wins over the configured level.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.server.log_level)),
        )
        .init();

    let bind_addr = config.bind_addr()?;
    let repository = FsRepository::new(&config.repository.path);
    repository.ensure_exists().await.with_context(|| {
        format!(
            "failed to create repository directory {}",
            repository.root().display()
        )
    })?;

    info!(
        "FileShare server starting: repo={}, max_sessions={}, read_timeout={:?}",
        repository.root().display(),
        config.sessions.max_sessions,
        config.read_timeout()
    );

    let context = SessionContext {
        registry: Arc::new(SessionRegistry::new(
            config.sessions.max_sessions,
            Arc::new(SystemClock),
        )),
        repository: Arc::new(repository),
        read_timeout: config.read_timeout(),
    };
    let server = Server::bind(bind_addr, context).await?;

    // ── Graceful shutdown flag ─────────────────────────────────────────────────
    let running = Arc::new(AtomicBool::new(true));
    let running_clone = Arc::clone(&running);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("received Ctrl+C; shutting down");
                running_clone.store(false, Ordering::Relaxed);
            }
            Err(e) => error!("failed to listen for Ctrl+C signal: {e}"),
        }
    });

    server.run(running).await?;

    info!("FileShare server stopped");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
