//! Debug-token codec.
//!
//! A token is the compact serialization of a [`RequestDescriptor`], carried
//! in the `X-GB403-Token` request header during debug mode so any response
//! can be traced back to the exact mutation that produced it. Layout:
//!
//! ```text
//! record   := version(0x01) field*
//! field    := tag len payload
//! nonce    := 0xFF 0x04 r0 r1 r2 r3
//! scheme   := 0x01 (0x00 idx | len bytes)      idx into registry::SCHEMES
//! host     := 0x02 len bytes
//! raw_uri  := 0x03 len bytes
//! method   := 0x04 (0x00 idx | len bytes)      idx into registry::methods()
//! headers  := 0x05 count (nlen name vlen value)*
//! module   := 0x06 (0x00 idx | len bytes)      idx into registry::MODULES
//! body     := 0x07 (len<=254 bytes | 0xFF hi lo bytes)
//! ```
//!
//! A zero length byte after a registry-backed tag signals a one-byte index;
//! literal values always have length >= 1, so the forms cannot collide.
//! Strings are truncated to 255 bytes and the body to 65535; the token must
//! stay small enough for a single header value. The record is compressed
//! with raw snappy and wrapped in URL-safe base64 without padding.
//!
//! Decoding is tolerant: unknown tags are skipped over their length byte,
//! and the field loop stops at the first field that would run past the
//! buffer end. The nonce exists solely to defeat caches and collisions; it
//! is consumed and discarded.

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use bytes::Bytes;

use crate::{
    descriptor::{RequestDescriptor, Scheme},
    errors::TokenError,
    registry,
};

/// Current token record version.
pub const TOKEN_VERSION: u8 = 1;

/// Request header carrying the token in debug mode.
pub const TOKEN_HEADER: &str = "X-GB403-Token";

const TAG_NONCE: u8 = 0xFF;
const TAG_SCHEME: u8 = 0x01;
const TAG_HOST: u8 = 0x02;
const TAG_RAW_URI: u8 = 0x03;
const TAG_METHOD: u8 = 0x04;
const TAG_HEADERS: u8 = 0x05;
const TAG_MODULE: u8 = 0x06;
const TAG_BODY: u8 = 0x07;

const MAX_FIELD_LEN: usize = 255;
const MAX_BODY_LEN: usize = 65_535;
const BODY_EXTENDED_LEN: u8 = 0xFF;

/// Encode a descriptor into a token string.
///
/// The descriptor's own `token` and `original_url` fields are not part of
/// the record. Oversized fields are truncated to the maximum encodable
/// length rather than rejected; the token is a size-bounded debug aid, not
/// a lossless archive.
#[must_use]
pub fn encode(descriptor: &RequestDescriptor) -> String {
    let mut record = Vec::with_capacity(
        64 + descriptor.host.len() + descriptor.raw_uri.len() + descriptor.body.len(),
    );
    record.push(TOKEN_VERSION);

    record.push(TAG_NONCE);
    record.push(4);
    record.extend_from_slice(&rand::random::<[u8; 4]>());

    push_indexed_or_literal(
        &mut record,
        TAG_SCHEME,
        descriptor.scheme.as_str(),
        registry::scheme_index(descriptor.scheme.as_str()),
    );
    push_literal(&mut record, TAG_HOST, descriptor.host.as_bytes());
    push_literal(&mut record, TAG_RAW_URI, descriptor.raw_uri.as_bytes());
    push_indexed_or_literal(
        &mut record,
        TAG_METHOD,
        &descriptor.method,
        registry::method_index(&descriptor.method),
    );

    if !descriptor.headers.is_empty() {
        record.push(TAG_HEADERS);
        let count = descriptor.headers.len().min(MAX_FIELD_LEN);
        record.push(count as u8);
        for (name, value) in descriptor.headers.iter().take(count) {
            push_len_prefixed(&mut record, name.as_bytes());
            push_len_prefixed(&mut record, value.as_bytes());
        }
    }

    push_indexed_or_literal(
        &mut record,
        TAG_MODULE,
        &descriptor.module,
        registry::module_index(&descriptor.module),
    );

    if !descriptor.body.is_empty() {
        record.push(TAG_BODY);
        let len = descriptor.body.len().min(MAX_BODY_LEN);
        if len <= 254 {
            record.push(len as u8);
        } else {
            record.push(BODY_EXTENDED_LEN);
            record.extend_from_slice(&(len as u16).to_be_bytes());
        }
        record.extend_from_slice(&descriptor.body[..len]);
    }

    // Raw snappy block compression of an in-memory record cannot fail at
    // these sizes; the empty token covers the unreachable path.
    snap::raw::Encoder::new()
        .compress_vec(&record)
        .map_or_else(|_| String::new(), |compressed| URL_SAFE_NO_PAD.encode(compressed))
}

/// Decode a token back into a descriptor.
///
/// Lossy with respect to the nonce (never stored in the descriptor) and
/// `original_url`/`token` (not part of the record). Fields absent from the
/// record stay at their defaults.
pub fn decode(token: &str) -> Result<RequestDescriptor, TokenError> {
    let compressed = URL_SAFE_NO_PAD.decode(token)?;
    let record = snap::raw::Decoder::new().decompress_vec(&compressed)?;
    let version = *record.first().ok_or(TokenError::Empty)?;
    if version != TOKEN_VERSION {
        return Err(TokenError::Version { found: version });
    }

    let mut descriptor = RequestDescriptor::default();
    let mut cursor = Cursor { buf: &record, pos: 1 };
    // Truncated fields end the loop silently; everything parsed so far is
    // kept.
    let _ = decode_fields(&mut cursor, &mut descriptor);
    Ok(descriptor)
}

/// Walk the field list. `None` means a field ran past the buffer end.
fn decode_fields(cursor: &mut Cursor<'_>, descriptor: &mut RequestDescriptor) -> Option<()> {
    loop {
        let Some(tag) = cursor.u8() else {
            return Some(()); // clean end of record
        };
        match tag {
            TAG_SCHEME => {
                if let Some(value) = read_registry_value(cursor, registry::scheme_at)? {
                    if let Ok(scheme) = value.parse::<Scheme>() {
                        descriptor.scheme = scheme;
                    }
                }
            },
            TAG_HOST => descriptor.host = read_string(cursor)?,
            TAG_RAW_URI => descriptor.raw_uri = read_string(cursor)?,
            TAG_METHOD => {
                if let Some(value) = read_registry_value(cursor, registry::method_at)? {
                    descriptor.method = value;
                }
            },
            TAG_HEADERS => {
                let count = cursor.u8()?;
                for _ in 0..count {
                    let name = read_string(cursor)?;
                    let value = read_string(cursor)?;
                    descriptor.headers.push((name, value));
                }
            },
            TAG_MODULE => {
                if let Some(value) = read_registry_value(cursor, registry::module_at)? {
                    descriptor.module = value;
                }
            },
            TAG_BODY => {
                let len = cursor.u8()?;
                let len = if len == BODY_EXTENDED_LEN {
                    let hi = cursor.u8()?;
                    let lo = cursor.u8()?;
                    usize::from(u16::from_be_bytes([hi, lo]))
                } else {
                    usize::from(len)
                };
                descriptor.body = Bytes::copy_from_slice(cursor.take(len)?);
            },
            // Forward compatibility: unknown tags are skipped using the
            // following length byte.
            _ => {
                let len = cursor.u8()?;
                cursor.take(usize::from(len))?;
            },
        }
    }
}

/// Registry-backed value: `None` in the outer `Option` means truncation,
/// `None` in the inner one an unknown registry index (field is skipped).
fn read_registry_value(
    cursor: &mut Cursor<'_>,
    at: impl Fn(u8) -> Option<&'static str>,
) -> Option<Option<String>> {
    let len = cursor.u8()?;
    if len == 0 {
        let index = cursor.u8()?;
        Some(at(index).map(str::to_owned))
    } else {
        let bytes = cursor.take(usize::from(len))?;
        Some(Some(String::from_utf8_lossy(bytes).into_owned()))
    }
}

fn read_string(cursor: &mut Cursor<'_>) -> Option<String> {
    let len = cursor.u8()?;
    let bytes = cursor.take(usize::from(len))?;
    Some(String::from_utf8_lossy(bytes).into_owned())
}

fn push_indexed_or_literal(record: &mut Vec<u8>, tag: u8, value: &str, index: Option<u8>) {
    if value.is_empty() {
        return;
    }
    record.push(tag);
    if let Some(index) = index {
        record.push(0);
        record.push(index);
    } else {
        push_len_prefixed(record, value.as_bytes());
    }
}

fn push_literal(record: &mut Vec<u8>, tag: u8, bytes: &[u8]) {
    if bytes.is_empty() {
        return;
    }
    record.push(tag);
    push_len_prefixed(record, bytes);
}

fn push_len_prefixed(record: &mut Vec<u8>, bytes: &[u8]) {
    let take = bytes.len().min(MAX_FIELD_LEN);
    record.push(take as u8);
    record.extend_from_slice(&bytes[..take]);
}

struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn u8(&mut self) -> Option<u8> {
        let byte = *self.buf.get(self.pos)?;
        self.pos += 1;
        Some(byte)
    }

    fn take(&mut self, n: usize) -> Option<&'a [u8]> {
        let end = self.pos.checked_add(n)?;
        let slice = self.buf.get(self.pos..end)?;
        self.pos = end;
        Some(slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> RequestDescriptor {
        let mut d = RequestDescriptor::get(
            "https://example.com/admin",
            Scheme::Https,
            "example.com",
            "/admin?x=1",
            "dumb_check",
        );
        d.push_header("X-Forwarded-For", "127.0.0.1");
        d
    }

    #[test]
    fn round_trip_preserves_all_fields() {
        let d = sample();
        let decoded = decode(&encode(&d)).unwrap();
        assert_eq!(decoded.scheme, d.scheme);
        assert_eq!(decoded.host, d.host);
        assert_eq!(decoded.raw_uri, d.raw_uri);
        assert_eq!(decoded.method, d.method);
        assert_eq!(decoded.headers, d.headers);
        assert_eq!(decoded.module, d.module);
        assert_eq!(decoded.body, d.body);
    }

    #[test]
    fn two_encodings_differ_but_decode_equal() {
        let d = sample();
        let a = encode(&d);
        let b = encode(&d);
        assert_ne!(a, b, "nonce must differ");
        assert_eq!(decode(&a).unwrap(), decode(&b).unwrap());
    }

    #[test]
    fn body_uses_extended_length_form() {
        let mut d = sample();
        d.body = Bytes::from(vec![0x41; 300]);
        let decoded = decode(&encode(&d)).unwrap();
        assert_eq!(decoded.body.len(), 300);
        assert_eq!(decoded.body, d.body);
    }

    #[test]
    fn oversized_body_is_truncated() {
        let mut d = sample();
        d.body = Bytes::from(vec![0x42; MAX_BODY_LEN + 100]);
        let decoded = decode(&encode(&d)).unwrap();
        assert_eq!(decoded.body.len(), MAX_BODY_LEN);
    }

    #[test]
    fn oversized_host_is_truncated() {
        let mut d = sample();
        d.host = "h".repeat(400);
        let decoded = decode(&encode(&d)).unwrap();
        assert_eq!(decoded.host.len(), MAX_FIELD_LEN);
    }

    #[test]
    fn nonstandard_method_encodes_as_literal() {
        let mut d = sample();
        d.method = "GRIMACE".to_owned();
        let decoded = decode(&encode(&d)).unwrap();
        assert_eq!(decoded.method, "GRIMACE");
    }

    #[test]
    fn garbage_base64_is_rejected() {
        assert!(matches!(decode("!!!not base64!!!"), Err(TokenError::Base64(_))));
    }

    #[test]
    fn wrong_version_is_rejected() {
        let compressed = snap::raw::Encoder::new().compress_vec(&[9u8, 0x01, 0, 0]).unwrap();
        let token = URL_SAFE_NO_PAD.encode(compressed);
        assert!(matches!(decode(&token), Err(TokenError::Version { found: 9 })));
    }

    #[test]
    fn unknown_tags_are_skipped() {
        // version, unknown tag 0x42 with 2 payload bytes, then a host field
        let record = [TOKEN_VERSION, 0x42, 2, 0xAA, 0xBB, TAG_HOST, 1, b'h'];
        let compressed = snap::raw::Encoder::new().compress_vec(&record).unwrap();
        let decoded = decode(&URL_SAFE_NO_PAD.encode(compressed)).unwrap();
        assert_eq!(decoded.host, "h");
    }

    #[test]
    fn truncated_field_ends_decode_quietly() {
        // host field claims 10 bytes but only 2 follow
        let record = [TOKEN_VERSION, TAG_HOST, 10, b'h', b'i'];
        let compressed = snap::raw::Encoder::new().compress_vec(&record).unwrap();
        let decoded = decode(&URL_SAFE_NO_PAD.encode(compressed)).unwrap();
        assert_eq!(decoded.host, "");
    }
}
