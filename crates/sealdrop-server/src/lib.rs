//! Sealdrop server.
//!
//! Serves one file to every client that connects. Each connection runs one
//! session: publish the RSA public key, receive the client's wrapped
//! AES key, send the file encrypted under it.
//!
//! # Architecture
//!
//! - [`KeyStore`]: loads or creates the persistent RSA key pair
//! - [`TcpTransport`]: listening socket
//! - [`ServerSession`]: per-connection state machine, transport-agnostic
//! - [`Server`]: accept loop tying the three together
//!
//! Sessions are awaited one at a time on the accepting task. A failed
//! session is logged and abandoned; the listener keeps running.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod error;
pub mod key_store;
mod session;
mod transport;

use std::{
    net::SocketAddr,
    path::{Path, PathBuf},
};

pub use error::ServerError;
pub use key_store::{HalfPairPolicy, KeyStorageError, KeyStore, StoredKeyPair};
use rand::{CryptoRng, RngCore, rngs::OsRng};
use sealdrop_crypto::{AsymmetricKeyPair, DEFAULT_RSA_BITS};
use sealdrop_proto::ChannelConfig;
pub use session::{FileTransfer, ServerSession, SessionState};
pub use transport::TcpTransport;

/// Default TCP port.
pub const DEFAULT_PORT: u16 = 12345;

/// Default limit on frames read from a client (64 KiB).
///
/// The only client frame is the wrapped symmetric key, a few hundred bytes
/// even for large RSA moduli. Outgoing file frames are not bounded by it.
pub const DEFAULT_MAX_CLIENT_FRAME_SIZE: usize = 64 * 1024;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to (e.g., "0.0.0.0:12345")
    pub bind_address: String,
    /// File sent to every client
    pub file_path: PathBuf,
    /// Directory holding `privatekey.pem` and `publickey.pem`
    pub key_dir: PathBuf,
    /// RSA modulus size used when generating a new pair
    pub key_bits: usize,
    /// Handling of a half-present key pair
    pub half_pair_policy: HalfPairPolicy,
    /// Framing limits and timeouts; `max_frame_size` bounds client frames only
    pub channel: ChannelConfig,
    /// Stop after this many sessions (`None` serves forever)
    pub max_sessions: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: format!("0.0.0.0:{DEFAULT_PORT}"),
            file_path: PathBuf::new(),
            key_dir: PathBuf::from("."),
            key_bits: DEFAULT_RSA_BITS,
            half_pair_policy: HalfPairPolicy::default(),
            channel: ChannelConfig {
                max_frame_size: DEFAULT_MAX_CLIENT_FRAME_SIZE,
                ..ChannelConfig::default()
            },
            max_sessions: None,
        }
    }
}

/// Summary of one completed session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionReport {
    /// Client address
    pub peer: SocketAddr,
    /// Bytes of the source file
    pub plaintext_bytes: usize,
    /// Bytes of `iv || ciphertext` on the wire
    pub wire_bytes: usize,
}

/// Sealdrop file server.
pub struct Server {
    transport: TcpTransport,
    key_pair: AsymmetricKeyPair,
    config: ServerConfig,
}

impl Server {
    /// Load or create the key pair, then bind.
    ///
    /// Key generation and the key file I/O run on the blocking pool.
    ///
    /// # Errors
    ///
    /// - `ServerError::KeyStorage` if the key pair cannot be loaded or created
    /// - `ServerError::Task` if the key store task panicked
    /// - `ServerError::Config` or `ServerError::Transport` if binding fails
    pub async fn bind(config: ServerConfig) -> Result<Self, ServerError> {
        let store = KeyStore::new(&config.key_dir)
            .with_key_bits(config.key_bits)
            .with_policy(config.half_pair_policy);
        let stored = tokio::task::spawn_blocking(move || store.load_or_create(&mut OsRng))
            .await
            .map_err(|e| ServerError::Task(e.to_string()))??;

        Self::with_key_pair(config, stored.into_pair()).await
    }

    /// Bind using an already loaded key pair.
    ///
    /// # Errors
    ///
    /// - `ServerError::Config` or `ServerError::Transport` if binding fails
    pub async fn with_key_pair(
        config: ServerConfig,
        key_pair: AsymmetricKeyPair,
    ) -> Result<Self, ServerError> {
        let transport = TcpTransport::bind(&config.bind_address).await?;
        let fingerprint = key_pair.fingerprint()?;

        tracing::info!(
            addr = %transport.local_addr()?,
            file = %config.file_path.display(),
            bits = key_pair.bits(),
            fingerprint = %fingerprint,
            "Server listening"
        );

        Ok(Self { transport, key_pair, config })
    }

    /// Local address the server is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        self.transport.local_addr()
    }

    /// The server's key pair.
    pub fn key_pair(&self) -> &AsymmetricKeyPair {
        &self.key_pair
    }

    /// File served to clients.
    pub fn file_path(&self) -> &Path {
        &self.config.file_path
    }

    /// Accept one connection and run its session to completion.
    ///
    /// # Errors
    ///
    /// - `ServerError::Transport` if accepting fails
    /// - any session error; see [`ServerSession::run`]
    pub async fn serve_next<R: CryptoRng + RngCore>(
        &self,
        rng: &mut R,
    ) -> Result<SessionReport, ServerError> {
        let (stream, peer) = self.transport.accept().await?;
        tracing::info!(%peer, "Connection established");

        let mut session = ServerSession::new(stream, &self.key_pair, &self.config.channel);
        let transfer = session.run(rng, &self.config.file_path).await?;

        Ok(SessionReport {
            peer,
            plaintext_bytes: transfer.plaintext_bytes,
            wire_bytes: transfer.wire_bytes,
        })
    }

    /// Serve sessions until `max_sessions` have been attempted, or forever.
    ///
    /// Session failures and accept errors are logged and the loop continues.
    /// Returns the number of sessions that completed successfully.
    ///
    /// # Errors
    ///
    /// Only non-session errors are returned; none occur once bound, so in
    /// practice this returns `Ok` when the session limit is reached.
    pub async fn run(self) -> Result<usize, ServerError> {
        let mut rng = OsRng;
        let mut attempted = 0usize;
        let mut completed = 0usize;

        while self.config.max_sessions.is_none_or(|max| attempted < max) {
            match self.serve_next(&mut rng).await {
                Ok(report) => {
                    attempted += 1;
                    completed += 1;
                    tracing::info!(
                        peer = %report.peer,
                        plaintext_bytes = report.plaintext_bytes,
                        wire_bytes = report.wire_bytes,
                        "Session complete"
                    );
                },
                Err(ServerError::Transport(e)) => {
                    tracing::error!("Accept error: {}", e);
                },
                Err(e) if e.is_session_scoped() => {
                    attempted += 1;
                    tracing::warn!("Session aborted: {}", e);
                },
                Err(e) => return Err(e),
            }
        }

        tracing::info!(completed, attempted, "Session limit reached, shutting down");
        Ok(completed)
    }
}
