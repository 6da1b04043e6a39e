//! Fuzz target for HTTP response parsing
//!
//! The response parser reads bytes from arbitrary origins, including ones
//! that are actively hostile or just broken.
//!
//! # Strategy
//!
//! - Arbitrary bytes as the full wire response
//! - Both streaming and whole-body read modes
//! - Small body bounds to hit the limit paths often
//!
//! # Invariants
//!
//! - NEVER panic on malformed responses
//! - Body never exceeds the configured bound
//! - Chunked framing errors are typed, not crashes

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct Input {
    wire: Vec<u8>,
    max_body: u16,
    streaming: bool,
}

fuzz_target!(|input: Input| {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("runtime");
    let max_body = usize::from(input.max_body);
    runtime.block_on(async {
        let mut reader = input.wire.as_slice();
        if let Ok(response) =
            gatecrash_client::read_response(&mut reader, max_body, input.streaming).await
        {
            assert!(response.body.len() <= max_body);
        }
    });
});
