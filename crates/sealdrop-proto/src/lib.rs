//! Sealdrop wire framing
//!
//! Every message between server and client travels as one frame: a 10-byte
//! ASCII decimal length header, left-justified and space-padded, followed by
//! exactly that many payload bytes.
//!
//! ```text
//! ┌──────────────┬──────────────────────────────┐
//! │ "392       " │ 392 bytes of opaque payload  │
//! └──────────────┴──────────────────────────────┘
//!    10 bytes      header.payload_len() bytes
//! ```
//!
//! # Layers
//!
//! - [`LengthHeader`]: fixed-width header parsing and formatting
//! - [`encode_frame`]: header + payload serialization
//! - [`FrameDecoder`]: sans-IO reassembly from arbitrary byte chunks
//! - [`FramedChannel`]: async send/receive over any tokio byte stream
//!
//! # Security
//!
//! Framing provides structure only. Payload confidentiality is the job of the
//! crypto layer. The decoder enforces a maximum frame size from the header
//! alone so a hostile peer cannot force unbounded buffering.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod channel;
pub mod decoder;
pub mod errors;
pub mod frame;
pub mod header;

pub use channel::{ChannelConfig, DEFAULT_MAX_FRAME_SIZE, DEFAULT_READ_CHUNK_SIZE, FramedChannel};
pub use decoder::FrameDecoder;
pub use errors::{ProtocolError, Result};
pub use frame::{encode_frame, frame_len};
pub use header::LengthHeader;
