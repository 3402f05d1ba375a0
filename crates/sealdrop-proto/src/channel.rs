//! Framed channel over an async byte stream.
//!
//! Wraps any `AsyncRead + AsyncWrite` transport (a `TcpStream` in production,
//! `tokio::io::duplex` in tests) and exchanges whole payloads. Outgoing frames
//! are encoded into one contiguous buffer and written out; incoming bytes are
//! read in `read_chunk_size` pieces and reassembled by [`FrameDecoder`].
//!
//! `max_frame_size` bounds what this side will buffer from the peer. It does
//! not limit what this side sends: a server with a tiny inbound limit still
//! serves large files.

use std::{future::Future, io, time::Duration};

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::{
    decoder::FrameDecoder,
    errors::{ProtocolError, Result},
    frame::{encode_frame, frame_len},
};

/// Default upper bound on a single payload (256 MiB).
pub const DEFAULT_MAX_FRAME_SIZE: usize = 256 * 1024 * 1024;

/// Default size of each transport read (16 KiB).
pub const DEFAULT_READ_CHUNK_SIZE: usize = 16 * 1024;

/// Tunables for a [`FramedChannel`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelConfig {
    /// Largest payload accepted from the peer, in bytes.
    pub max_frame_size: usize,

    /// Bytes requested from the transport per read.
    pub read_chunk_size: usize,

    /// Deadline applied to every individual transport read or write call,
    /// not to a whole frame. It resets whenever bytes move, so a large frame
    /// over a slow link only times out if it stalls. `None` blocks until the
    /// peer sends or closes.
    pub io_timeout: Option<Duration>,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            read_chunk_size: DEFAULT_READ_CHUNK_SIZE,
            io_timeout: None,
        }
    }
}

/// Sends and receives length-prefixed payloads over a byte stream.
pub struct FramedChannel<T> {
    io: T,
    decoder: FrameDecoder,
    read_buf: Vec<u8>,
    io_timeout: Option<Duration>,
}

impl<T> FramedChannel<T>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    /// Wrap `io` using `config`.
    pub fn new(io: T, config: &ChannelConfig) -> Self {
        Self {
            io,
            decoder: FrameDecoder::new(config.max_frame_size),
            read_buf: vec![0; config.read_chunk_size.max(1)],
            io_timeout: config.io_timeout,
        }
    }

    /// Send one frame carrying `payload`.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::HeaderOverflow` if the length does not fit the
    ///   header (nothing is written)
    /// - `ProtocolError::Transport` or `ProtocolError::Timeout` if the write
    ///   fails
    pub async fn send_frame(&mut self, payload: &[u8]) -> Result<()> {
        let mut wire = BytesMut::with_capacity(frame_len(payload.len()));
        encode_frame(payload, &mut wire)?;

        let mut written = 0;
        while written < wire.len() {
            let n = with_timeout(self.io_timeout, self.io.write(&wire[written..])).await?;
            if n == 0 {
                return Err(io::Error::from(io::ErrorKind::WriteZero).into());
            }
            written += n;
        }
        with_timeout(self.io_timeout, self.io.flush()).await?;

        tracing::trace!(payload_len = payload.len(), "frame sent");
        Ok(())
    }

    /// Receive the next complete payload.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::ConnectionClosed` if the peer closes before a full
    ///   frame arrives
    /// - `ProtocolError::FrameTooLarge` or `ProtocolError::InvalidHeader` if
    ///   the header is rejected
    /// - `ProtocolError::Transport` or `ProtocolError::Timeout` if a read
    ///   fails
    pub async fn receive_frame(&mut self) -> Result<Bytes> {
        loop {
            if let Some(payload) = self.decoder.decode()? {
                tracing::trace!(payload_len = payload.len(), "frame received");
                return Ok(payload);
            }

            let n = with_timeout(self.io_timeout, self.io.read(&mut self.read_buf)).await?;
            if n == 0 {
                return Err(ProtocolError::ConnectionClosed { buffered: self.decoder.buffered() });
            }

            self.decoder.feed(&self.read_buf[..n]);
        }
    }

    /// Close the write half of the transport.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::Transport` if the shutdown fails
    pub async fn shutdown(&mut self) -> Result<()> {
        with_timeout(self.io_timeout, self.io.shutdown()).await
    }

    /// Underlying transport.
    pub fn get_ref(&self) -> &T {
        &self.io
    }

    /// Consume the channel, returning the transport.
    ///
    /// Any bytes already read but not yet decoded are lost.
    pub fn into_inner(self) -> T {
        self.io
    }
}

async fn with_timeout<F, O>(timeout: Option<Duration>, fut: F) -> Result<O>
where
    F: Future<Output = io::Result<O>>,
{
    match timeout {
        Some(limit) => match tokio::time::timeout(limit, fut).await {
            Ok(result) => result.map_err(ProtocolError::from),
            Err(_) => Err(ProtocolError::Timeout(limit)),
        },
        None => fut.await.map_err(ProtocolError::from),
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::duplex;

    use super::*;

    fn small_config() -> ChannelConfig {
        ChannelConfig { max_frame_size: 64, read_chunk_size: 3, io_timeout: None }
    }

    #[tokio::test]
    async fn frames_cross_a_tiny_pipe() {
        let (a, b) = duplex(3);
        let mut sender = FramedChannel::new(a, &small_config());
        let mut receiver = FramedChannel::new(b, &small_config());

        let send = async {
            sender.send_frame(b"first payload").await.unwrap();
            sender.send_frame(b"").await.unwrap();
            sender.send_frame(b"third").await.unwrap();
        };
        let recv = async {
            let mut got = Vec::new();
            for _ in 0..3 {
                got.push(receiver.receive_frame().await.unwrap());
            }
            got
        };

        let ((), got) = tokio::join!(send, recv);
        assert_eq!(got, vec![
            Bytes::from_static(b"first payload"),
            Bytes::new(),
            Bytes::from_static(b"third")
        ]);
    }

    #[tokio::test]
    async fn receive_limit_does_not_cap_outgoing_frames() {
        let (a, b) = duplex(1024);
        let mut sender = FramedChannel::new(a, &small_config());
        let mut receiver =
            FramedChannel::new(b, &ChannelConfig { max_frame_size: 4096, ..small_config() });

        let payload = vec![0xAB; 2048];
        let (sent, received) = tokio::join!(sender.send_frame(&payload), receiver.receive_frame());
        sent.unwrap();
        assert_eq!(received.unwrap(), Bytes::from(payload));
    }

    #[tokio::test]
    async fn rejects_oversized_incoming_header() {
        let (mut a, b) = duplex(1024);
        let mut receiver = FramedChannel::new(b, &small_config());

        a.write_all(b"65        ").await.unwrap();
        let result = receiver.receive_frame().await;
        assert_eq!(result, Err(ProtocolError::FrameTooLarge { size: 65, max: 64 }));
    }

    #[tokio::test]
    async fn eof_mid_frame_reports_buffered_bytes() {
        let (mut a, b) = duplex(1024);
        let mut receiver = FramedChannel::new(b, &small_config());

        a.write_all(b"10        abc").await.unwrap();
        drop(a);

        let result = receiver.receive_frame().await;
        assert_eq!(result, Err(ProtocolError::ConnectionClosed { buffered: 13 }));
    }

    #[tokio::test]
    async fn eof_between_frames_is_connection_closed() {
        let (a, b) = duplex(1024);
        let mut receiver = FramedChannel::new(b, &small_config());
        drop(a);

        let result = receiver.receive_frame().await;
        assert_eq!(result, Err(ProtocolError::ConnectionClosed { buffered: 0 }));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_reader_does_not_time_out_a_large_frame() {
        let (a, mut b) = duplex(64);
        let config = ChannelConfig { io_timeout: Some(Duration::from_secs(5)), ..small_config() };
        let mut sender = FramedChannel::new(a, &config);
        let payload = vec![7u8; 1024];

        // 1034 bytes at 64 bytes every 3s takes far longer than the 5s deadline
        let drain = async {
            let mut buf = [0u8; 64];
            let mut total = 0;
            while total < frame_len(payload.len()) {
                tokio::time::sleep(Duration::from_secs(3)).await;
                total += b.read(&mut buf).await.unwrap();
            }
            total
        };

        let (sent, drained) = tokio::join!(sender.send_frame(&payload), drain);
        assert_eq!(sent, Ok(()));
        assert_eq!(drained, frame_len(1024));
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_write_times_out() {
        let (a, _b) = duplex(16);
        let config = ChannelConfig { io_timeout: Some(Duration::from_secs(5)), ..small_config() };
        let mut sender = FramedChannel::new(a, &config);

        let result = sender.send_frame(&[1u8; 64]).await;
        assert_eq!(result, Err(ProtocolError::Timeout(Duration::from_secs(5))));
    }

    #[tokio::test(start_paused = true)]
    async fn read_times_out_when_peer_is_silent() {
        let (_a, b) = duplex(1024);
        let config = ChannelConfig { io_timeout: Some(Duration::from_secs(5)), ..small_config() };
        let mut receiver = FramedChannel::new(b, &config);

        let result = receiver.receive_frame().await;
        assert_eq!(result, Err(ProtocolError::Timeout(Duration::from_secs(5))));
    }
}
