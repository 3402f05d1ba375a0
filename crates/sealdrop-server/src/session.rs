//! Server side of one transfer session.
//!
//! ```text
//! Listening ──publish_key──▶ KeySent ──receive_key──▶ KeyReceived ──send_file──▶ FileSent
//! ```
//!
//! Each transition is one method; calling a method from the wrong state
//! returns [`ServerError::InvalidState`] without touching the transport.

use std::path::Path;

use rand::{CryptoRng, RngCore};
use sealdrop_crypto::{
    AsymmetricKeyPair, SymmetricKey, publish_public_key, seal_file, unwrap_symmetric_key,
};
use sealdrop_proto::{ChannelConfig, FramedChannel};
use tokio::io::{AsyncRead, AsyncWrite};
use zeroize::Zeroizing;

use crate::error::ServerError;

/// Server session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Connection accepted, nothing sent yet
    Listening,
    /// Public key sent, waiting for the wrapped symmetric key
    KeySent,
    /// Symmetric key recovered
    KeyReceived,
    /// Encrypted file sent, session complete
    FileSent,
}

/// Sizes of a completed transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileTransfer {
    /// Bytes of the source file
    pub plaintext_bytes: usize,
    /// Bytes of `iv || ciphertext` on the wire
    pub wire_bytes: usize,
}

/// One transfer over one connection.
///
/// Borrows the server's key pair; the symmetric key lives only as long as
/// the session and is zeroized when dropped.
pub struct ServerSession<'a, T> {
    channel: FramedChannel<T>,
    key_pair: &'a AsymmetricKeyPair,
    session_key: Option<SymmetricKey>,
    state: SessionState,
}

impl<'a, T> ServerSession<'a, T>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    /// Start a session over `io`.
    pub fn new(io: T, key_pair: &'a AsymmetricKeyPair, config: &ChannelConfig) -> Self {
        Self {
            channel: FramedChannel::new(io, config),
            key_pair,
            session_key: None,
            state: SessionState::Listening,
        }
    }

    /// Current state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Send the public key as the first frame.
    ///
    /// # Errors
    ///
    /// - `ServerError::InvalidState` unless in `Listening`
    /// - `ServerError::Protocol` if the send fails
    pub async fn publish_key(&mut self) -> Result<(), ServerError> {
        self.require(SessionState::Listening, "publish_key")?;

        let pem = publish_public_key(self.key_pair)?;
        self.channel.send_frame(&pem).await?;

        tracing::debug!(bytes = pem.len(), "public key sent");
        self.state = SessionState::KeySent;
        Ok(())
    }

    /// Receive and unwrap the client's symmetric key.
    ///
    /// # Errors
    ///
    /// - `ServerError::InvalidState` unless in `KeySent`
    /// - `ServerError::Protocol` if the frame cannot be read
    /// - `ServerError::Crypto` if the key cannot be unwrapped
    pub async fn receive_key(&mut self) -> Result<(), ServerError> {
        self.require(SessionState::KeySent, "receive_key")?;

        let wrapped = self.channel.receive_frame().await?;
        tracing::debug!(bytes = wrapped.len(), "wrapped symmetric key received");

        self.session_key = Some(unwrap_symmetric_key(self.key_pair.private_key(), &wrapped)?);
        self.state = SessionState::KeyReceived;
        Ok(())
    }

    /// Read `path`, encrypt it under the session key and send it.
    ///
    /// The file is read in full for every session, so changes on disk are
    /// picked up by the next client.
    ///
    /// # Errors
    ///
    /// - `ServerError::InvalidState` unless in `KeyReceived`
    /// - `ServerError::FileIo` if the file cannot be read
    /// - `ServerError::Protocol` if the send fails
    pub async fn send_file<R: CryptoRng + RngCore>(
        &mut self,
        rng: &mut R,
        path: &Path,
    ) -> Result<FileTransfer, ServerError> {
        self.require(SessionState::KeyReceived, "send_file")?;
        let Some(key) = self.session_key.take() else {
            return Err(ServerError::InvalidState {
                state: self.state,
                operation: "send_file",
            });
        };

        let plaintext = Zeroizing::new(tokio::fs::read(path).await.map_err(|e| {
            ServerError::FileIo { path: path.to_path_buf(), reason: e.to_string() }
        })?);

        let wire = seal_file(rng, &key, &plaintext).to_bytes();
        drop(key);

        self.channel.send_frame(&wire).await?;
        // Best effort: the frame is already flushed
        if let Err(e) = self.channel.shutdown().await {
            tracing::debug!("shutdown after send failed: {}", e);
        }

        let transfer = FileTransfer { plaintext_bytes: plaintext.len(), wire_bytes: wire.len() };
        tracing::info!(
            plaintext_bytes = transfer.plaintext_bytes,
            wire_bytes = transfer.wire_bytes,
            "File sent successfully"
        );

        self.state = SessionState::FileSent;
        Ok(transfer)
    }

    /// Drive the whole session to completion.
    ///
    /// # Errors
    ///
    /// Any error from the individual steps. The session is abandoned at the
    /// first failure.
    pub async fn run<R: CryptoRng + RngCore>(
        &mut self,
        rng: &mut R,
        path: &Path,
    ) -> Result<FileTransfer, ServerError> {
        self.publish_key().await?;
        self.receive_key().await?;
        self.send_file(rng, path).await
    }

    fn require(&self, expected: SessionState, operation: &'static str) -> Result<(), ServerError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(ServerError::InvalidState { state: self.state, operation })
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;
    use sealdrop_crypto::{EncryptedBlob, decrypt_file, negotiate};
    use sealdrop_proto::ProtocolError;
    use tokio::io::duplex;

    use super::*;

    fn key_pair() -> AsymmetricKeyPair {
        let mut rng = ChaCha20Rng::seed_from_u64(42);
        AsymmetricKeyPair::generate(&mut rng, 2048).unwrap()
    }

    #[tokio::test]
    async fn full_session_over_duplex() {
        let pair = key_pair();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("source.txt");
        std::fs::write(&path, b"hello over the wire").unwrap();

        let (server_io, client_io) = duplex(64);
        let config = ChannelConfig::default();
        let mut session = ServerSession::new(server_io, &pair, &config);
        let mut client = FramedChannel::new(client_io, &config);

        let server = async {
            let mut rng = ChaCha20Rng::seed_from_u64(1);
            session.run(&mut rng, &path).await.unwrap()
        };
        let peer = async {
            let mut rng = ChaCha20Rng::seed_from_u64(2);
            let pem = client.receive_frame().await.unwrap();
            let (key, wrapped) = negotiate(&mut rng, &pem).unwrap();
            client.send_frame(&wrapped).await.unwrap();
            let blob = EncryptedBlob::from_bytes(&client.receive_frame().await.unwrap()).unwrap();
            decrypt_file(&key, &blob).unwrap().to_vec()
        };

        let (transfer, received) = tokio::join!(server, peer);
        assert_eq!(received, b"hello over the wire");
        assert_eq!(transfer, FileTransfer { plaintext_bytes: 19, wire_bytes: 16 + 32 });
        assert_eq!(session.state(), SessionState::FileSent);
    }

    #[tokio::test]
    async fn serves_file_larger_than_client_frame_limit() {
        let pair = key_pair();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("source.bin");
        let contents = vec![0x5A; 4096];
        std::fs::write(&path, &contents).unwrap();

        let (server_io, client_io) = duplex(1024);
        let server_config = ChannelConfig { max_frame_size: 1024, ..ChannelConfig::default() };
        let mut session = ServerSession::new(server_io, &pair, &server_config);
        let mut client = FramedChannel::new(client_io, &ChannelConfig::default());

        let server = async {
            let mut rng = ChaCha20Rng::seed_from_u64(5);
            session.run(&mut rng, &path).await.unwrap()
        };
        let peer = async {
            let mut rng = ChaCha20Rng::seed_from_u64(6);
            let pem = client.receive_frame().await.unwrap();
            let (key, wrapped) = negotiate(&mut rng, &pem).unwrap();
            client.send_frame(&wrapped).await.unwrap();
            let blob = EncryptedBlob::from_bytes(&client.receive_frame().await.unwrap()).unwrap();
            decrypt_file(&key, &blob).unwrap().to_vec()
        };

        let (transfer, received) = tokio::join!(server, peer);
        assert_eq!(received, contents);
        assert!(transfer.wire_bytes > server_config.max_frame_size);
    }

    #[tokio::test]
    async fn rejects_out_of_order_calls() {
        let pair = key_pair();
        let (server_io, _client_io) = duplex(64);
        let mut session = ServerSession::new(server_io, &pair, &ChannelConfig::default());
        let mut rng = ChaCha20Rng::seed_from_u64(3);

        let err = session.send_file(&mut rng, Path::new("unused")).await.unwrap_err();
        assert!(matches!(
            err,
            ServerError::InvalidState { state: SessionState::Listening, operation: "send_file" }
        ));

        let err = session.receive_key().await.unwrap_err();
        assert!(matches!(err, ServerError::InvalidState { operation: "receive_key", .. }));
        assert_eq!(session.state(), SessionState::Listening);
    }

    #[tokio::test]
    async fn garbage_key_frame_is_crypto_error() {
        let pair = key_pair();
        let (server_io, client_io) = duplex(1024);
        let config = ChannelConfig::default();
        let mut session = ServerSession::new(server_io, &pair, &config);
        let mut client = FramedChannel::new(client_io, &config);

        session.publish_key().await.unwrap();
        client.receive_frame().await.unwrap();
        client.send_frame(b"not a wrapped key").await.unwrap();

        let err = session.receive_key().await.unwrap_err();
        assert!(matches!(err, ServerError::Crypto(_)));
        assert_eq!(session.state(), SessionState::KeySent);
    }

    #[tokio::test]
    async fn client_disconnect_is_protocol_error() {
        let pair = key_pair();
        let (server_io, client_io) = duplex(64 * 1024);
        let mut session = ServerSession::new(server_io, &pair, &ChannelConfig::default());

        session.publish_key().await.unwrap();
        drop(client_io);

        let err = session.receive_key().await.unwrap_err();
        assert!(matches!(err, ServerError::Protocol(ProtocolError::ConnectionClosed { .. })));
    }

    #[tokio::test]
    async fn missing_file_is_file_io_error() {
        let pair = key_pair();
        let dir = tempfile::tempdir().unwrap();
        let (server_io, client_io) = duplex(64 * 1024);
        let config = ChannelConfig::default();
        let mut session = ServerSession::new(server_io, &pair, &config);
        let mut client = FramedChannel::new(client_io, &config);
        let mut rng = ChaCha20Rng::seed_from_u64(4);

        session.publish_key().await.unwrap();
        let pem = client.receive_frame().await.unwrap();
        let (_key, wrapped) = negotiate(&mut rng, &pem).unwrap();
        client.send_frame(&wrapped).await.unwrap();
        session.receive_key().await.unwrap();

        let err = session.send_file(&mut rng, &dir.path().join("missing.txt")).await.unwrap_err();
        assert!(matches!(err, ServerError::FileIo { .. }));
    }
}
