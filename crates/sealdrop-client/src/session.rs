//! Client side of one transfer session.
//!
//! ```text
//! Connecting ──receive_public_key──▶ KeyReceived ──send_symmetric_key──▶ KeySent
//!     ──receive_file──▶ FileReceived ──write_file──▶ Done
//! ```

use std::{
    ffi::OsString,
    io,
    path::{Path, PathBuf},
};

use bytes::Bytes;
use rand::{CryptoRng, RngCore};
use sealdrop_crypto::{
    CryptoError, EncryptedBlob, SymmetricKey, decrypt_file, negotiate, parse_public_key_pem,
    public_key_fingerprint,
};
use sealdrop_proto::{ChannelConfig, FramedChannel};
use tokio::io::{AsyncRead, AsyncWrite};
use zeroize::Zeroizing;

use crate::error::ClientError;

/// Client session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    /// Connected, waiting for the server's public key
    Connecting,
    /// Public key received and validated
    KeyReceived,
    /// Wrapped symmetric key sent
    KeySent,
    /// File received and decrypted, not yet on disk
    FileReceived,
    /// File written to its destination
    Done,
}

/// Sizes of a completed transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceivedFile {
    /// Bytes written to the destination
    pub plaintext_bytes: usize,
    /// Bytes of `iv || ciphertext` received
    pub wire_bytes: usize,
}

/// One transfer over one connection.
pub struct ClientSession<T> {
    channel: FramedChannel<T>,
    state: ClientState,
    server_key_pem: Option<Bytes>,
    server_fingerprint: Option<String>,
    session_key: Option<SymmetricKey>,
    plaintext: Option<Zeroizing<Vec<u8>>>,
    wire_bytes: usize,
}

impl<T> ClientSession<T>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    /// Start a session over a connected transport.
    pub fn new(io: T, config: &ChannelConfig) -> Self {
        Self {
            channel: FramedChannel::new(io, config),
            state: ClientState::Connecting,
            server_key_pem: None,
            server_fingerprint: None,
            session_key: None,
            plaintext: None,
            wire_bytes: 0,
        }
    }

    /// Current state.
    pub fn state(&self) -> ClientState {
        self.state
    }

    /// SHA-256 fingerprint of the server's public key, once received.
    pub fn server_fingerprint(&self) -> Option<&str> {
        self.server_fingerprint.as_deref()
    }

    /// Receive and validate the server's public key.
    ///
    /// # Errors
    ///
    /// - `ClientError::InvalidState` unless in `Connecting`
    /// - `ClientError::Protocol` if the frame cannot be read
    /// - `ClientError::Crypto` if the frame is not a PEM public key
    pub async fn receive_public_key(&mut self) -> Result<(), ClientError> {
        self.require(ClientState::Connecting, "receive_public_key")?;

        let pem = self.channel.receive_frame().await?;
        let text = std::str::from_utf8(&pem).map_err(|_| CryptoError::InvalidPublicKey {
            reason: "public key is not UTF-8 text".to_string(),
        })?;
        let fingerprint = public_key_fingerprint(&parse_public_key_pem(text)?)?;

        tracing::info!(fingerprint = %fingerprint, "Received server public key");

        self.server_key_pem = Some(pem);
        self.server_fingerprint = Some(fingerprint);
        self.state = ClientState::KeyReceived;
        Ok(())
    }

    /// Generate a symmetric key and send it wrapped under the server's key.
    ///
    /// # Errors
    ///
    /// - `ClientError::InvalidState` unless in `KeyReceived`
    /// - `ClientError::Crypto` if wrapping fails
    /// - `ClientError::Protocol` if the send fails
    pub async fn send_symmetric_key<R: CryptoRng + RngCore>(
        &mut self,
        rng: &mut R,
    ) -> Result<(), ClientError> {
        self.require(ClientState::KeyReceived, "send_symmetric_key")?;
        let Some(pem) = self.server_key_pem.take() else {
            return Err(self.invalid("send_symmetric_key"));
        };

        let (key, wrapped) = negotiate(rng, &pem)?;
        self.channel.send_frame(&wrapped).await?;
        tracing::debug!(bytes = wrapped.len(), "wrapped symmetric key sent");

        self.session_key = Some(key);
        self.state = ClientState::KeySent;
        Ok(())
    }

    /// Receive and decrypt the file.
    ///
    /// # Errors
    ///
    /// - `ClientError::InvalidState` unless in `KeySent`
    /// - `ClientError::Protocol` if the frame cannot be read
    /// - `ClientError::Crypto` if the blob is malformed or its padding is
    ///   invalid
    pub async fn receive_file(&mut self) -> Result<(), ClientError> {
        self.require(ClientState::KeySent, "receive_file")?;
        let Some(key) = self.session_key.take() else {
            return Err(self.invalid("receive_file"));
        };

        let wire = self.channel.receive_frame().await?;
        let blob = EncryptedBlob::from_bytes(&wire)?;
        let plaintext = decrypt_file(&key, &blob)?;
        tracing::debug!(
            wire_bytes = wire.len(),
            plaintext_bytes = plaintext.len(),
            "file received and decrypted"
        );

        self.wire_bytes = wire.len();
        self.plaintext = Some(plaintext);
        self.state = ClientState::FileReceived;
        Ok(())
    }

    /// Write the decrypted file to `destination`.
    ///
    /// The bytes go to `<destination>.part` first and are renamed into place,
    /// so a failure never leaves a partial destination. The part file is
    /// removed on failure.
    ///
    /// # Errors
    ///
    /// - `ClientError::InvalidState` unless in `FileReceived`
    /// - `ClientError::FileIo` if writing or renaming fails
    pub async fn write_file(&mut self, destination: &Path) -> Result<ReceivedFile, ClientError> {
        self.require(ClientState::FileReceived, "write_file")?;
        let Some(plaintext) = self.plaintext.take() else {
            return Err(self.invalid("write_file"));
        };

        let part = part_path(destination);
        let written = async {
            tokio::fs::write(&part, plaintext.as_slice()).await?;
            tokio::fs::rename(&part, destination).await
        }
        .await;

        if let Err(e) = written {
            if let Err(cleanup) = remove_part_file(&part).await {
                tracing::warn!(path = %part.display(), "failed to remove partial file: {}", cleanup);
            }
            return Err(ClientError::FileIo { path: destination.to_path_buf(), reason: e.to_string() });
        }

        let received = ReceivedFile { plaintext_bytes: plaintext.len(), wire_bytes: self.wire_bytes };
        tracing::info!(
            path = %destination.display(),
            bytes = received.plaintext_bytes,
            "File received successfully"
        );

        self.state = ClientState::Done;
        Ok(received)
    }

    /// Drive the whole session to completion.
    ///
    /// # Errors
    ///
    /// Any error from the individual steps; the run stops at the first one.
    pub async fn run<R: CryptoRng + RngCore>(
        &mut self,
        rng: &mut R,
        destination: &Path,
    ) -> Result<ReceivedFile, ClientError> {
        self.receive_public_key().await?;
        self.send_symmetric_key(rng).await?;
        self.receive_file().await?;
        self.write_file(destination).await
    }

    fn require(&self, expected: ClientState, operation: &'static str) -> Result<(), ClientError> {
        if self.state == expected { Ok(()) } else { Err(self.invalid(operation)) }
    }

    fn invalid(&self, operation: &'static str) -> ClientError {
        ClientError::InvalidState { state: self.state, operation }
    }
}

/// `<destination>.part`, next to the destination.
fn part_path(destination: &Path) -> PathBuf {
    let mut name = OsString::from(destination.as_os_str());
    name.push(".part");
    PathBuf::from(name)
}

/// Remove a leftover part file. A file that was never created is fine.
async fn remove_part_file(part: &Path) -> io::Result<()> {
    match tokio::fs::remove_file(part).await {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}
