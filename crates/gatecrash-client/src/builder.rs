//! Byte-exact HTTP/1.1 request serialization.
//!
//! Nothing here normalizes, canonicalizes, folds, or re-encodes anything.
//! The raw URI goes on the request line byte for byte, header order and
//! casing are preserved, duplicates survive. Several target defenses are
//! sensitive to exactly this; the builder's one job is to get out of the
//! way.
//!
//! Header order on the wire: payload headers in their given order, then
//! client-wide custom headers not overridden by a payload header, then
//! `Host:` (only if no explicit one was set), `User-Agent`, `Accept`, the
//! debug-token header when enabled, `Content-Length` when a body is present
//! and none was supplied, and `Connection` last, mimicking common client
//! behavior while letting payloads override the value.

use bytes::{BufMut, BytesMut};
use gatecrash_payload::{RequestDescriptor, TOKEN_HEADER};

use crate::options::ClientOptions;

/// Serialized request plus the transport's pooling decision.
#[derive(Debug)]
pub struct BuiltRequest {
    /// The exact bytes to write.
    pub bytes: BytesMut,
    /// Whether the connection must not be returned to the pool.
    pub should_close_conn: bool,
}

/// Serialize `descriptor` for the wire.
///
/// `force_close` is the retry-with-close override: any payload `Connection`
/// header is dropped and `Connection: close` is written instead.
#[must_use]
pub fn build_raw_request(
    descriptor: &RequestDescriptor,
    options: &ClientOptions,
    force_close: bool,
) -> BuiltRequest {
    let mut buf = BytesMut::with_capacity(
        descriptor.raw_uri.len() + descriptor.body.len() + 512,
    );

    buf.put_slice(descriptor.method.as_bytes());
    buf.put_u8(b' ');
    put_raw_str(&mut buf, &descriptor.raw_uri);
    buf.put_slice(b" HTTP/1.1\r\n");

    let mut connection_value: Option<&str> = None;
    let mut wrote_host = false;
    let mut wrote_user_agent = false;
    let mut wrote_accept = false;
    let mut wrote_content_length = false;

    for (name, value) in &descriptor.headers {
        if name.eq_ignore_ascii_case("Connection") {
            // written last, and dropped entirely under force_close
            if !force_close {
                connection_value = Some(value);
            }
            continue;
        }
        note_written(
            name,
            &mut wrote_host,
            &mut wrote_user_agent,
            &mut wrote_accept,
            &mut wrote_content_length,
        );
        put_header(&mut buf, name, value);
    }

    for (name, value) in &options.custom_headers {
        let overridden = descriptor
            .headers
            .iter()
            .any(|(payload_name, _)| payload_name.eq_ignore_ascii_case(name));
        if overridden || name.eq_ignore_ascii_case("Connection") {
            continue;
        }
        note_written(
            name,
            &mut wrote_host,
            &mut wrote_user_agent,
            &mut wrote_accept,
            &mut wrote_content_length,
        );
        put_header(&mut buf, name, value);
    }

    if !wrote_host {
        put_header(&mut buf, "Host", &descriptor.host);
    }
    if !wrote_user_agent {
        put_header(&mut buf, "User-Agent", &options.user_agent);
    }
    if !wrote_accept {
        put_header(&mut buf, "Accept", "*/*");
    }
    if options.debug_tokens && !descriptor.token.is_empty() {
        put_header(&mut buf, TOKEN_HEADER, &descriptor.token);
    }
    if !descriptor.body.is_empty() && !wrote_content_length {
        put_header(&mut buf, "Content-Length", &descriptor.body.len().to_string());
    }

    let connection = if force_close {
        "close"
    } else {
        connection_value.unwrap_or(if options.wants_close() { "close" } else { "keep-alive" })
    };
    put_header(&mut buf, "Connection", connection);

    buf.put_slice(b"\r\n");
    buf.put_slice(&descriptor.body);

    BuiltRequest {
        bytes: buf,
        should_close_conn: connection.eq_ignore_ascii_case("close"),
    }
}

/// Write a string as raw bytes: chars below U+0100 as the single byte the
/// generator meant (control bytes, Latin-1 injections), everything else as
/// UTF-8 (Unicode-normalization payloads).
fn put_raw_str(buf: &mut BytesMut, s: &str) {
    for c in s.chars() {
        let code = c as u32;
        if code < 0x100 {
            buf.put_u8(code as u8);
        } else {
            let mut tmp = [0u8; 4];
            buf.put_slice(c.encode_utf8(&mut tmp).as_bytes());
        }
    }
}

fn put_header(buf: &mut BytesMut, name: &str, value: &str) {
    buf.put_slice(name.as_bytes());
    buf.put_slice(b": ");
    buf.put_slice(value.as_bytes());
    buf.put_slice(b"\r\n");
}

fn note_written(
    name: &str,
    host: &mut bool,
    user_agent: &mut bool,
    accept: &mut bool,
    content_length: &mut bool,
) {
    if name.eq_ignore_ascii_case("Host") {
        *host = true;
    } else if name.eq_ignore_ascii_case("User-Agent") {
        *user_agent = true;
    } else if name.eq_ignore_ascii_case("Accept") {
        *accept = true;
    } else if name.eq_ignore_ascii_case("Content-Length") {
        *content_length = true;
    }
}
