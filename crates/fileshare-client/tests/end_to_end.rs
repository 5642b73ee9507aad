//! End-to-end tests: the client driver against a real server over loopback.
//!
//! These tests exercise both halves of the protocol through their public
//! APIs only, with the server serving a real directory and the client
//! writing into a real download directory.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use fileshare_client::application::driver::{ClientDriver, Handshake, Reply};
use fileshare_client::infrastructure::downloads::DownloadDirectory;
use fileshare_client::infrastructure::network::connect;
use fileshare_server::application::clock::SystemClock;
use fileshare_server::application::registry::SessionRegistry;
use fileshare_server::application::repository::FileRepository;
use fileshare_server::application::session::SessionContext;
use fileshare_server::infrastructure::network::listener::Server;
use fileshare_server::infrastructure::repository::{FsRepository, MemoryRepository};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Server and client scratch directories, removed on drop.
struct Workspace {
    repo: PathBuf,
    downloads: PathBuf,
}

impl Workspace {
    fn new() -> Self {
        let base = std::env::temp_dir().join(format!("fileshare-e2e-{}", Uuid::new_v4()));
        let ws = Self {
            repo: base.join("repo"),
            downloads: base.join("downloads"),
        };
        std::fs::create_dir_all(&ws.repo).unwrap();
        std::fs::create_dir_all(&ws.downloads).unwrap();
        ws
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if let Some(base) = self.repo.parent() {
            let _ = std::fs::remove_dir_all(base);
        }
    }
}

async fn start_server(
    repo: &PathBuf,
    max_sessions: usize,
) -> (SocketAddr, Arc<AtomicBool>, JoinHandle<anyhow::Result<()>>) {
    serve(Arc::new(FsRepository::new(repo)), max_sessions).await
}

async fn serve(
    repository: Arc<dyn FileRepository>,
    max_sessions: usize,
) -> (SocketAddr, Arc<AtomicBool>, JoinHandle<anyhow::Result<()>>) {
    let context = SessionContext {
        registry: Arc::new(SessionRegistry::new(max_sessions, Arc::new(SystemClock))),
        repository,
        read_timeout: None,
    };
    let server = Server::bind(SocketAddr::from(([127, 0, 0, 1], 0)), context)
        .await
        .unwrap();
    let addr = server.local_addr().unwrap();
    let running = Arc::new(AtomicBool::new(true));
    let task = tokio::spawn(server.run(Arc::clone(&running)));
    (addr, running, task)
}

async fn client(addr: SocketAddr, downloads: &PathBuf) -> ClientDriver<OwnedReadHalf, OwnedWriteHalf> {
    let (r, w) = connect("127.0.0.1", addr.port()).await.unwrap();
    ClientDriver::new(r, w, Arc::new(DownloadDirectory::new(downloads)))
}

#[tokio::test]
async fn test_full_session_lists_downloads_and_exits() {
    // Arrange
    let ws = Workspace::new();
    std::fs::write(ws.repo.join("a.txt"), b"hello").unwrap();
    let body: Vec<u8> = (0..50_000u32).map(|i| (i % 253) as u8).collect();
    std::fs::write(ws.repo.join("data.bin"), &body).unwrap();
    let (addr, running, server) = start_server(&ws.repo, 3).await;
    let mut driver = client(addr, &ws.downloads).await;

    // Act
    let handshake = driver.handshake().await.unwrap();
    let listing = driver.request("list").await.unwrap();
    let text = driver.request("a.txt").await.unwrap();
    let binary = driver.request("data.bin").await.unwrap();
    let missing = driver.request("missing.txt").await.unwrap();
    let status = driver.request("status").await.unwrap();
    let bye = driver.request("exit").await.unwrap();

    // Assert
    assert!(matches!(handshake, Handshake::Accepted { ref identity, .. } if identity == "Client01"));
    assert_eq!(listing, Some(Reply::Listing("FILES a.txt,data.bin".to_string())));
    assert_eq!(
        text,
        Some(Reply::Saved {
            path: ws.downloads.join("a.txt"),
            bytes: 5
        })
    );
    assert_eq!(std::fs::read(ws.downloads.join("a.txt")).unwrap(), b"hello");
    assert!(matches!(binary, Some(Reply::Saved { bytes: 50_000, .. })));
    assert_eq!(std::fs::read(ws.downloads.join("data.bin")).unwrap(), body);
    assert_eq!(missing, Some(Reply::Text("missing.txt ACK".to_string())));
    match status {
        Some(Reply::Status(rows)) => {
            assert_eq!(rows.len(), 1);
            assert!(rows[0].starts_with("Client01 | 127.0.0.1:"));
        }
        other => panic!("expected status rows, got {other:?}"),
    }
    assert_eq!(bye, Some(Reply::Bye("BYE".to_string())));

    running.store(false, Ordering::Relaxed);
    server.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_client_over_capacity_sees_busy() {
    let ws = Workspace::new();
    let (addr, running, server) = start_server(&ws.repo, 1).await;
    let mut first = client(addr, &ws.downloads).await;
    first.handshake().await.unwrap();

    let mut second = client(addr, &ws.downloads).await;
    let outcome = second.handshake().await.unwrap();

    assert_eq!(
        outcome,
        Handshake::Busy("BUSY server at capacity; try later".to_string())
    );
    running.store(false, Ordering::Relaxed);
    server.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_empty_repository_and_traversal_attempt() {
    let ws = Workspace::new();
    std::fs::write(ws.downloads.join("keep.txt"), b"mine").unwrap();
    let (addr, running, server) = start_server(&ws.repo, 3).await;
    let mut driver = client(addr, &ws.downloads).await;
    driver.handshake().await.unwrap();

    let listing = driver.request("list").await.unwrap();
    let escape = driver.request("../downloads/keep.txt").await.unwrap();

    assert_eq!(listing, Some(Reply::Listing("FILES (empty)".to_string())));
    assert_eq!(
        escape,
        Some(Reply::Text("../downloads/keep.txt ACK".to_string()))
    );
    assert_eq!(std::fs::read(ws.downloads.join("keep.txt")).unwrap(), b"mine");

    running.store(false, Ordering::Relaxed);
    server.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_large_listing_and_long_ack_keep_session_alive() {
    // Arrange: 4,000 names make a FILES line of roughly 80 KiB.
    let ws = Workspace::new();
    let repository = MemoryRepository::from_files(
        (0..4000).map(|i| (format!("document-{i:05}.txt"), b"x".to_vec())),
    );
    let (addr, running, server) = serve(Arc::new(repository), 3).await;
    let mut driver = client(addr, &ws.downloads).await;
    driver.handshake().await.unwrap();
    let long_request = "q".repeat(65_000);

    // Act
    let listing = driver.request("list").await.unwrap();
    let ack = driver.request(&long_request).await.unwrap();
    let bye = driver.request("exit").await.unwrap();

    // Assert
    match listing {
        Some(Reply::Listing(line)) => {
            assert!(line.len() > 64 * 1024, "{}", line.len());
            assert!(line.starts_with("FILES document-00000.txt,document-00001.txt,"));
            assert!(line.ends_with(",document-03999.txt"));
        }
        other => panic!("expected a listing, got {other:?}"),
    }
    assert_eq!(ack, Some(Reply::Text(format!("{long_request} ACK"))));
    assert_eq!(bye, Some(Reply::Bye("BYE".to_string())));

    running.store(false, Ordering::Relaxed);
    server.await.unwrap().unwrap();
}
