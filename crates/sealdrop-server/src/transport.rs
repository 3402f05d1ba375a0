//! TCP listener for incoming sessions.
//!
//! Thin wrapper over `tokio::net::TcpListener` that parses the configured
//! bind address and maps failures onto [`ServerError`].

use std::net::SocketAddr;

use tokio::net::{TcpListener, TcpStream};

use crate::error::ServerError;

/// TCP transport accepting one connection per session.
pub struct TcpTransport {
    listener: TcpListener,
}

impl TcpTransport {
    /// Bind a listener to `address` (for example `0.0.0.0:12345`).
    ///
    /// Port 0 picks an ephemeral port; see [`Self::local_addr`].
    ///
    /// # Errors
    ///
    /// - `ServerError::Config` if `address` is not a socket address
    /// - `ServerError::Transport` if the bind fails
    pub async fn bind(address: &str) -> Result<Self, ServerError> {
        let addr: SocketAddr = address
            .parse()
            .map_err(|e| ServerError::Config(format!("invalid bind address '{address}': {e}")))?;

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::Transport(format!("failed to bind {addr}: {e}")))?;

        tracing::debug!("TCP transport bound to {}", addr);

        Ok(Self { listener })
    }

    /// Wait for the next connection.
    ///
    /// # Errors
    ///
    /// - `ServerError::Transport` if accepting fails. The listener stays
    ///   usable.
    pub async fn accept(&self) -> Result<(TcpStream, SocketAddr), ServerError> {
        let (stream, peer) = self
            .listener
            .accept()
            .await
            .map_err(|e| ServerError::Transport(format!("accept failed: {e}")))?;

        // Frames are written whole; don't hold them back waiting for more
        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!(%peer, "failed to set TCP_NODELAY: {}", e);
        }

        Ok((stream, peer))
    }

    /// Local address the listener is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }
}
