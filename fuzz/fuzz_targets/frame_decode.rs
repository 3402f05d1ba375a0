//! Fuzz target for incremental frame decoding
//!
//! Feeds arbitrary bytes to the decoder in arbitrary chunk sizes.
//!
//! # Invariants
//!
//! - Decoding NEVER panics
//! - Every returned payload is at most `max_frame_size` bytes
//! - Once an error is returned the stream is abandoned

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use sealdrop_proto::FrameDecoder;

#[derive(Debug, Arbitrary)]
struct Input {
    max_frame_size: u16,
    chunk_sizes: Vec<u8>,
    bytes: Vec<u8>,
}

fuzz_target!(|input: Input| {
    let max = usize::from(input.max_frame_size);
    let mut decoder = FrameDecoder::new(max);

    let mut rest = input.bytes.as_slice();
    let mut sizes = input.chunk_sizes.iter().cycle();
    while !rest.is_empty() {
        let size = sizes.next().map_or(rest.len(), |s| usize::from(*s).max(1)).min(rest.len());
        let (chunk, tail) = rest.split_at(size);
        rest = tail;
        decoder.feed(chunk);

        loop {
            match decoder.decode() {
                Ok(Some(payload)) => assert!(payload.len() <= max),
                Ok(None) => break,
                Err(_) => return,
            }
        }
    }
});
