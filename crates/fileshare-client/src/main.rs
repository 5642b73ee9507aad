//! FileShare client entry point.
//!
//! Connects to a FileShare server, completes the identity handshake, and then
//! reads commands from standard input until `exit`.
//!
//! # Usage
//!
//! ```text
//! fileshare-client [OPTIONS]
//!
//! Options:
//!   --host <HOST>          Server address [default: 127.0.0.1]
//!   --port <PORT>          Server port [default: 12345]
//!   --download-dir <DIR>   Where downloads are saved [default: downloads]
//! ```
//!
//! End of input and Ctrl-C both behave like typing `exit`.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use fileshare_client::application::driver::{ClientDriver, ClientError, Handshake, Reply};
use fileshare_client::infrastructure::downloads::DownloadDirectory;
use fileshare_client::infrastructure::network::connect;
use fileshare_core::protocol::messages::COMMAND_SUMMARY;

// ── CLI argument definitions ──────────────────────────────────────────────────

/// FileShare client.
#[derive(Debug, Parser)]
#[command(name = "fileshare-client", about = "Interactive client for a FileShare server", version)]
struct Cli {
    /// Server hostname or IP address.
    #[arg(long, default_value = "127.0.0.1", env = "FILESHARE_HOST")]
    host: String,

    /// Server TCP port.
    #[arg(long, default_value_t = 12345, env = "FILESHARE_PORT")]
    port: u16,

    /// Directory downloads are saved into; created if missing.
    #[arg(long, default_value = "downloads", env = "FILESHARE_DOWNLOADS")]
    download_dir: PathBuf,
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so they never interleave with protocol output.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    let downloads = DownloadDirectory::new(&cli.download_dir);
    downloads
        .ensure_exists()
        .await
        .with_context(|| format!("failed to create {}", cli.download_dir.display()))?;

    let (read_half, write_half) = match connect(&cli.host, cli.port).await {
        Ok(halves) => halves,
        Err(e) => {
            println!("Could not connect to server: {e}");
            return Ok(());
        }
    };
    let mut driver = ClientDriver::new(read_half, write_half, Arc::new(downloads));

    match driver.handshake().await {
        Ok(Handshake::Busy(line)) => {
            println!("{line}");
            return Ok(());
        }
        Ok(Handshake::Accepted { greeting, .. }) => {
            if let Some(greeting) = greeting {
                println!("{greeting}");
            }
            println!("Commands: {COMMAND_SUMMARY}");
        }
        Err(ClientError::ServerClosed) => {
            println!("Server closed the connection.");
            return Ok(());
        }
        Err(e) => {
            println!("{e}");
            return Ok(());
        }
    }

    run_prompt(&mut driver).await
}

/// Reads commands until `exit`, end of input, Ctrl-C, or a fatal error.
async fn run_prompt<R, W>(driver: &mut ClientDriver<R, W>) -> anyhow::Result<()>
where
    R: tokio::io::AsyncRead + Unpin,
    W: tokio::io::AsyncWrite + Unpin,
{
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("> ");
        std::io::stdout().flush().context("failed to write prompt")?;

        let input = tokio::select! {
            line = stdin.next_line() => match line.context("failed to read standard input")? {
                Some(line) => line,
                None => {
                    println!();
                    "exit".to_string()
                }
            },
            _ = tokio::signal::ctrl_c() => {
                println!();
                "exit".to_string()
            }
        };

        match driver.request(&input).await {
            Ok(None) => continue,
            Ok(Some(reply)) => {
                let text = reply.to_string();
                if !text.is_empty() {
                    println!("{text}");
                }
                if matches!(reply, Reply::Bye(_)) {
                    debug!("session closed by exit");
                    return Ok(());
                }
            }
            Err(ClientError::ServerClosed) => {
                println!("Server closed.");
                return Ok(());
            }
            Err(e) => return Err(e).context("session aborted"),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
