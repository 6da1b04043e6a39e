//! Fuzz target for debug-token decoding
//!
//! Tokens come back from the wire (response correlation, user-pasted
//! reproduction), so the decoder must survive arbitrary input.
//!
//! # Strategy
//!
//! - Random strings: arbitrary text through the base64 layer
//! - Valid base64 of random bytes: exercises snappy + field walk
//! - Valid snappy of random records: exercises the TLV cursor directly
//!
//! # Invariants
//!
//! - NEVER panic on malformed tokens
//! - Truncated fields end decoding quietly, fields so far retained
//! - Unknown tags are skipped, not fatal

#![no_main]

use arbitrary::Arbitrary;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
enum TokenInput {
    RawText(String),
    RawBytes(Vec<u8>),
    Record(Vec<u8>),
}

fuzz_target!(|input: TokenInput| {
    match input {
        TokenInput::RawText(text) => {
            let _ = gatecrash_payload::decode(&text);
        }
        TokenInput::RawBytes(bytes) => {
            let _ = gatecrash_payload::decode(&URL_SAFE_NO_PAD.encode(bytes));
        }
        TokenInput::Record(record) => {
            // well-formed wrapping, arbitrary record contents
            if let Ok(compressed) = snap::raw::Encoder::new().compress_vec(&record) {
                let _ = gatecrash_payload::decode(&URL_SAFE_NO_PAD.encode(compressed));
            }
        }
    }
});
