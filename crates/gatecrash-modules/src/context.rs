//! Shared generation context and deduplicating emitter.
//!
//! Every module is a pure function over a [`GenerationContext`]: the parsed
//! target plus the read-only inputs (wordlists, recon cache, user spoof
//! values). Descriptors pass through an [`Emitter`] that collapses
//! duplicates before the token is finalized.

use std::{collections::HashSet, sync::Arc};

use gatecrash_assets::{ReconCache, Wordlists};
use gatecrash_payload::{RequestDescriptor, token};

use crate::rawurl::RawUrl;

/// Inputs shared by all generators for one target.
#[derive(Debug, Clone)]
pub struct GenerationContext {
    /// Parsed target.
    pub target: RawUrl,
    /// The target exactly as the user supplied it, for reporting.
    pub original_url: String,
    /// Wordlists (embedded, possibly overlaid).
    pub wordlists: Arc<Wordlists>,
    /// Recon cache for the `http_host` module.
    pub recon: Arc<ReconCache>,
    /// User-supplied spoof header names, merged into `http_headers_ip`.
    pub spoof_headers: Vec<String>,
    /// User-supplied spoof IPs, merged into `http_headers_ip`.
    pub spoof_ips: Vec<String>,
}

impl GenerationContext {
    /// Build a context for `url`.
    pub fn new(
        target: RawUrl,
        original_url: impl Into<String>,
        wordlists: Arc<Wordlists>,
        recon: Arc<ReconCache>,
    ) -> Self {
        Self {
            target,
            original_url: original_url.into(),
            wordlists,
            recon,
            spoof_headers: Vec::new(),
            spoof_ips: Vec::new(),
        }
    }

    /// GET descriptor for this target with the given raw request-URI.
    #[must_use]
    pub fn descriptor(&self, module: &str, raw_uri: impl Into<String>) -> RequestDescriptor {
        RequestDescriptor::get(
            &self.original_url,
            self.target.scheme,
            &self.target.authority(),
            &raw_uri.into(),
            module,
        )
    }

    /// GET descriptor for the unmutated path+query (the per-module template).
    #[must_use]
    pub fn template(&self, module: &str) -> RequestDescriptor {
        self.descriptor(module, self.target.request_target())
    }

    /// Emit a mutated path: the query is re-appended, and when the path
    /// itself contains a raw `?` or `#` an alternate form with those two
    /// characters percent-encoded is emitted as well, so the appended query
    /// stays unambiguous.
    pub fn emit_path(&self, emitter: &mut Emitter, module: &str, path: &str) {
        let query = &self.target.query;
        emitter.push(self.descriptor(module, format!("{path}{query}")));
        if path.contains('?') || path.contains('#') {
            let escaped = path.replace('?', "%3F").replace('#', "%23");
            emitter.push(self.descriptor(module, format!("{escaped}{query}")));
        }
    }
}

/// How an [`Emitter`] recognizes duplicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DedupKey {
    /// By `raw_uri` only: path-oriented modules where everything else is
    /// constant.
    RawUri,
    /// By the full wire form: header- and body-oriented modules.
    Wire,
}

/// Order-preserving deduplicating collector.
///
/// Tokens are computed in [`Emitter::finish`], after the surviving set is
/// known: the token must reflect the final descriptor, and encoding carries
/// a nonce, so encoding discarded duplicates would be wasted work.
#[derive(Debug)]
pub struct Emitter {
    key: DedupKey,
    seen: HashSet<Vec<u8>>,
    out: Vec<RequestDescriptor>,
}

impl Emitter {
    /// Collector deduplicating on `key`.
    #[must_use]
    pub fn new(key: DedupKey) -> Self {
        Self { key, seen: HashSet::new(), out: Vec::new() }
    }

    /// Add `descriptor` unless an equivalent one was already emitted.
    pub fn push(&mut self, descriptor: RequestDescriptor) {
        let key = match self.key {
            DedupKey::RawUri => descriptor.raw_uri.clone().into_bytes(),
            DedupKey::Wire => descriptor.wire_key(),
        };
        if self.seen.insert(key) {
            self.out.push(descriptor);
        }
    }

    /// Finalize tokens and hand back the deduplicated list.
    #[must_use]
    pub fn finish(self) -> Vec<RequestDescriptor> {
        let mut out = self.out;
        for descriptor in &mut out {
            descriptor.token = token::encode(descriptor);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> GenerationContext {
        GenerationContext::new(
            RawUrl::parse("https://example.com/a?x=1").unwrap(),
            "https://example.com/a?x=1",
            Arc::new(Wordlists::embedded()),
            Arc::new(ReconCache::empty()),
        )
    }

    #[test]
    fn emitter_collapses_duplicate_uris() {
        let ctx = ctx();
        let mut em = Emitter::new(DedupKey::RawUri);
        ctx.emit_path(&mut em, "mid_paths", "/a/b");
        ctx.emit_path(&mut em, "mid_paths", "/a/b");
        let out = em.finish();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].raw_uri, "/a/b?x=1");
        assert!(!out[0].token.is_empty());
    }

    #[test]
    fn wire_dedup_keeps_header_variants() {
        let ctx = ctx();
        let mut em = Emitter::new(DedupKey::Wire);
        let plain = ctx.template("http_headers_ip");
        let mut spoofed = ctx.template("http_headers_ip");
        spoofed.push_header("X-Real-IP", "127.0.0.1");
        em.push(plain);
        em.push(spoofed);
        assert_eq!(em.finish().len(), 2);
    }

    #[test]
    fn raw_query_chars_get_escaped_alternate() {
        let ctx = ctx();
        let mut em = Emitter::new(DedupKey::RawUri);
        ctx.emit_path(&mut em, "end_paths", "/a?");
        let out = em.finish();
        let uris: Vec<&str> = out.iter().map(|d| d.raw_uri.as_str()).collect();
        assert!(uris.contains(&"/a??x=1"));
        assert!(uris.contains(&"/a%3F?x=1"));
    }

    #[test]
    fn template_preserves_query() {
        let ctx = ctx();
        assert_eq!(ctx.template("dumb_check").raw_uri, "/a?x=1");
    }
}
