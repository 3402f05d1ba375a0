//! Sealdrop client.
//!
//! Connects to a sealdrop server, completes the RSA handshake, receives the
//! served file encrypted under a fresh AES key and writes it to disk.
//!
//! # Components
//!
//! - [`ClientSession`]: per-connection state machine, transport-agnostic
//! - [`fetch`]: connect over TCP and run one session
//!
//! The client makes exactly one attempt. Any failure aborts the run and no
//! partial destination file is left behind.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod session;

use std::{
    net::SocketAddr,
    path::PathBuf,
    time::Duration,
};

pub use error::ClientError;
use rand::rngs::OsRng;
use sealdrop_proto::ChannelConfig;
pub use session::{ClientSession, ClientState, ReceivedFile};
use tokio::net::TcpStream;

/// Default server port.
pub const DEFAULT_PORT: u16 = 12345;

/// Default destination file name.
pub const DEFAULT_DESTINATION: &str = "receivedData.txt";

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server host name or IP address
    pub server_host: String,
    /// Server port
    pub port: u16,
    /// Where the received file is written
    pub destination: PathBuf,
    /// Framing limits and timeouts
    pub channel: ChannelConfig,
    /// Limit on establishing the TCP connection (`None` uses the OS default)
    pub connect_timeout: Option<Duration>,
}

impl ClientConfig {
    /// Defaults for connecting to `server_host`.
    pub fn new(server_host: impl Into<String>) -> Self {
        Self {
            server_host: server_host.into(),
            port: DEFAULT_PORT,
            destination: PathBuf::from(DEFAULT_DESTINATION),
            channel: ChannelConfig::default(),
            connect_timeout: None,
        }
    }

    /// `host:port` for display, with IPv6 literals bracketed.
    pub fn server_address(&self) -> String {
        if self.server_host.contains(':') && !self.server_host.starts_with('[') {
            format!("[{}]:{}", self.server_host, self.port)
        } else {
            format!("{}:{}", self.server_host, self.port)
        }
    }
}

/// Summary of a completed fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientReport {
    /// Server address actually connected to
    pub server: SocketAddr,
    /// Where the file was written
    pub destination: PathBuf,
    /// Bytes written
    pub plaintext_bytes: usize,
    /// Bytes of `iv || ciphertext` received
    pub wire_bytes: usize,
    /// SHA-256 fingerprint of the server's public key
    pub server_fingerprint: String,
}

/// Connect to the configured server and receive its file.
///
/// # Errors
///
/// - `ClientError::Connect` or `ClientError::ConnectTimeout` if the server
///   cannot be reached
/// - any session error; see [`ClientSession::run`]
pub async fn fetch(config: &ClientConfig) -> Result<ClientReport, ClientError> {
    let stream = connect(config).await?;
    let server = stream.peer_addr().map_err(|e| ClientError::Connect {
        addr: config.server_address(),
        reason: e.to_string(),
    })?;
    tracing::info!(%server, "Connected to server");

    let mut session = ClientSession::new(stream, &config.channel);
    let received = session.run(&mut OsRng, &config.destination).await?;

    Ok(ClientReport {
        server,
        destination: config.destination.clone(),
        plaintext_bytes: received.plaintext_bytes,
        wire_bytes: received.wire_bytes,
        server_fingerprint: session.server_fingerprint().unwrap_or_default().to_string(),
    })
}

async fn connect(config: &ClientConfig) -> Result<TcpStream, ClientError> {
    let addr = config.server_address();
    let host = config.server_host.trim_start_matches('[').trim_end_matches(']');
    let connecting = TcpStream::connect((host, config.port));

    let result = match config.connect_timeout {
        Some(timeout) => tokio::time::timeout(timeout, connecting)
            .await
            .map_err(|_| ClientError::ConnectTimeout { addr: addr.clone(), timeout })?,
        None => connecting.await,
    };

    let stream = result.map_err(|e| ClientError::Connect { addr, reason: e.to_string() })?;
    if let Err(e) = stream.set_nodelay(true) {
        tracing::debug!("failed to set TCP_NODELAY: {}", e);
    }
    Ok(stream)
}
