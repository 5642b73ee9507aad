//! Network infrastructure for the client: opening the TCP connection.

use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tracing::info;

use crate::application::driver::ClientError;

/// Connects to `host:port` and returns the two halves of the stream.
///
/// `host` may be an IP address or a DNS name.
///
/// # Errors
///
/// Returns [`ClientError::Connect`] if resolution or the connection fails.
pub async fn connect(host: &str, port: u16) -> Result<(OwnedReadHalf, OwnedWriteHalf), ClientError> {
    let stream = TcpStream::connect((host, port))
        .await
        .map_err(|source| ClientError::Connect {
            target: format!("{host}:{port}"),
            source,
        })?;
    info!("connected to {host}:{port}");
    Ok(stream.into_split())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_connect_to_listening_socket() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let (connected, accepted) = tokio::join!(connect("127.0.0.1", port), listener.accept());

        assert!(connected.is_ok());
        assert!(accepted.is_ok());
    }

    #[tokio::test]
    async fn test_connect_refused_names_target() {
        // Bind then drop to find a port nobody listens on.
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap().port()
        };

        let result = connect("127.0.0.1", port).await;

        match result {
            Err(ClientError::Connect { target, .. }) => assert_eq!(target, format!("127.0.0.1:{port}")),
            other => panic!("expected Connect error, got {:?}", other.map(|_| ())),
        }
    }
}
