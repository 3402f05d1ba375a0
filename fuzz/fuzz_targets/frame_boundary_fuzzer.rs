//! Fuzz target for length header boundary conditions
//!
//! Prevent memory exhaustion via hostile length headers (HIGH priority)
//!
//! # Strategy
//!
//! - Declared length: zero, at-max, just-over-max, 10 nines, random digits
//! - Padding: left-justified, right-justified, zero-padded, embedded spaces
//! - Garbage: signs, letters, non-ASCII in the header
//!
//! # Invariants
//!
//! - Declared length > max MUST return `ProtocolError::FrameTooLarge`
//!   before any payload byte is fed
//! - Well-formed headers at or under max decode exactly the payload
//! - NEVER panic

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use sealdrop_proto::{FrameDecoder, LengthHeader, ProtocolError, encode_frame};

#[derive(Debug, Arbitrary)]
enum Declared {
    Zero,
    AtMax,
    JustOverMax,
    AllNines,
    Random(u32),
}

#[derive(Debug, Arbitrary)]
enum Padding {
    Left,
    Right,
    Zeros,
}

#[derive(Debug, Arbitrary)]
enum Header {
    WellFormed { declared: Declared, padding: Padding },
    Raw([u8; 10]),
}

#[derive(Debug, Arbitrary)]
struct Input {
    max_frame_size: u16,
    header: Header,
    payload: Vec<u8>,
}

fuzz_target!(|input: Input| {
    let max = usize::from(input.max_frame_size);
    let mut decoder = FrameDecoder::new(max);

    match input.header {
        Header::WellFormed { declared, padding } => {
            let len: u64 = match declared {
                Declared::Zero => 0,
                Declared::AtMax => max as u64,
                Declared::JustOverMax => max as u64 + 1,
                Declared::AllNines => LengthHeader::MAX_ENCODABLE,
                Declared::Random(n) => u64::from(n),
            };
            let header = match padding {
                Padding::Left => format!("{len:<10}"),
                Padding::Right => format!("{len:>10}"),
                Padding::Zeros => format!("{len:010}"),
            };
            decoder.feed(header.as_bytes());

            if len > max as u64 {
                assert_eq!(
                    decoder.decode(),
                    Err(ProtocolError::FrameTooLarge { size: len, max })
                );
                return;
            }

            let len = len as usize;
            let mut payload = input.payload;
            payload.resize(len, 0xAB);
            decoder.feed(&payload);
            assert_eq!(decoder.decode().unwrap().as_deref(), Some(payload.as_slice()));

            let mut reencoded = Vec::new();
            encode_frame(&payload, &mut reencoded).unwrap();
            assert_eq!(reencoded.len(), LengthHeader::SIZE + len);
        }
        Header::Raw(raw) => {
            let _ = LengthHeader::from_bytes(&raw);
            decoder.feed(&raw);
            decoder.feed(&input.payload);
            let _ = decoder.decode();
        }
    }
});
