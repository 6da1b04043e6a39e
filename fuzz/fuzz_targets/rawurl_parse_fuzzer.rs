//! Fuzz target for raw URL splitting
//!
//! The splitter deliberately accepts malformed paths, so the only failures
//! allowed are the typed scheme/host errors.
//!
//! # Invariants
//!
//! - NEVER panic, any input
//! - On success, path + query re-concatenate to the original suffix
//! - The query, when present, starts with '?'

#![no_main]

use gatecrash_modules::RawUrl;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|input: &str| {
    if let Ok(url) = RawUrl::parse(input) {
        assert!(!url.host.is_empty());
        if !url.query.is_empty() {
            assert!(url.query.starts_with('?'));
        }
        // the original path+query suffix survives verbatim
        let rebuilt = format!("{}{}", url.path, url.query);
        assert!(input.ends_with(&rebuilt));
    }
});
