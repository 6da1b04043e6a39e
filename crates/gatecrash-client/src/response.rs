//! Minimal HTTP/1.1 response parsing with bounded reads.
//!
//! Standard clients normalize responses the same way they normalize
//! requests, so the engine reads the wire itself: status line, raw header
//! lines, then a body honoring `Content-Length`, chunked encoding, or
//! read-to-close, always through a bound.
//!
//! Two read modes:
//!
//! - **Streaming** (default): the body is read up to `max_body` and simply
//!   truncated beyond that. A truncated or unfinished read marks the
//!   response `truncated`, which tells the transport the connection cannot
//!   be reused. Chunked framing that hits the bound mid-stream is a
//!   [`ClientError::ReadLimit`]; the retry classifier turns that into one
//!   retry with streaming off.
//! - **Whole-body**: everything is read (for servers that choke on early
//!   hang-ups), bounded by a hard cap; exceeding it is
//!   [`ClientError::BodyTooLarge`], which is never retried.

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::errors::ClientError;

/// Cap on the status line + header section.
const MAX_HEADER_BYTES: usize = 64 * 1024;

/// One parsed response.
#[derive(Debug, Clone)]
pub struct RawResponse {
    /// Status code from the status line.
    pub status: u16,
    /// Header list in wire order, names as received.
    pub headers: Vec<(String, String)>,
    /// Body prefix, bounded by the read mode's limit.
    pub body: Bytes,
    /// True when the body was not read to completion; the connection must
    /// not be reused.
    pub truncated: bool,
    /// Milliseconds spent in send+receive, filled in by the client.
    pub elapsed_ms: u64,
}

impl RawResponse {
    /// First header value with a case-insensitive name match.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Parsed `Content-Length`, if present and numeric.
    #[must_use]
    pub fn content_length(&self) -> Option<u64> {
        self.header("Content-Length").and_then(|v| v.trim().parse().ok())
    }

    /// True for 3xx statuses.
    #[must_use]
    pub fn is_redirect(&self) -> bool {
        (300..400).contains(&self.status)
    }
}

/// Read and parse one response.
///
/// `max_body` bounds how much body is kept; `streaming` selects the read
/// mode documented on the module.
pub async fn read_response<R>(
    reader: &mut R,
    max_body: usize,
    streaming: bool,
) -> Result<RawResponse, ClientError>
where
    R: AsyncRead + Unpin,
{
    let (head, mut leftover) = read_head(reader).await?;
    let (status, headers) = parse_head(&head)?;

    let transfer_chunked = headers
        .iter()
        .any(|(n, v)| {
            n.eq_ignore_ascii_case("Transfer-Encoding") && v.to_ascii_lowercase().contains("chunked")
        });
    let content_length: Option<usize> = headers
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case("Content-Length"))
        .and_then(|(_, v)| v.trim().parse().ok());

    // Bodiless statuses: 1xx, 204, 304.
    let bodiless = status < 200 || status == 204 || status == 304;

    let (body, truncated) = if bodiless {
        (Bytes::new(), false)
    } else if transfer_chunked {
        read_chunked(reader, &mut leftover, max_body, streaming).await?
    } else if let Some(length) = content_length {
        read_sized(reader, &mut leftover, length, max_body, streaming).await?
    } else {
        read_to_close(reader, &mut leftover, max_body, streaming).await?
    };

    Ok(RawResponse { status, headers, body, truncated, elapsed_ms: 0 })
}

/// Read until the blank line, returning the head and any body bytes that
/// came along in the same read.
async fn read_head<R>(reader: &mut R) -> Result<(BytesMut, BytesMut), ClientError>
where
    R: AsyncRead + Unpin,
{
    let mut buf = BytesMut::with_capacity(4096);
    loop {
        if let Some(end) = find_head_end(&buf) {
            let leftover = buf.split_off(end);
            return Ok((buf, leftover));
        }
        if buf.len() > MAX_HEADER_BYTES {
            return Err(ClientError::ReadLimit { limit: MAX_HEADER_BYTES });
        }
        let n = reader.read_buf(&mut buf).await.map_err(ClientError::from_io)?;
        if n == 0 {
            // Nothing at all usually means a stale keep-alive connection the
            // peer already closed; report it as a reset so the classifier
            // retries on a fresh dial. A partial head is genuinely broken.
            if buf.is_empty() {
                return Err(ClientError::ConnectionReset(
                    "connection closed before response".to_owned(),
                ));
            }
            return Err(ClientError::MalformedResponse(
                "connection closed before end of headers".to_owned(),
            ));
        }
    }
}

/// Offset just past `\r\n\r\n` (or lenient `\n\n`).
fn find_head_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n").map(|i| i + 4).or_else(|| {
        buf.windows(2).position(|w| w == b"\n\n").map(|i| i + 2)
    })
}

fn parse_head(head: &[u8]) -> Result<(u16, Vec<(String, String)>), ClientError> {
    let text = String::from_utf8_lossy(head);
    let mut lines = text.split("\r\n").flat_map(|chunk| chunk.split('\n'));

    let status_line = lines
        .next()
        .ok_or_else(|| ClientError::MalformedResponse("empty response".to_owned()))?;
    let status = parse_status_line(status_line)?;

    let mut headers = Vec::new();
    for line in lines {
        if line.is_empty() {
            continue;
        }
        // Header lines without a colon are kept name-only rather than
        // dropped; targets emit strange things and the processor may care.
        match line.split_once(':') {
            Some((name, value)) => {
                headers.push((name.to_owned(), value.trim_start().to_owned()));
            },
            None => headers.push((line.to_owned(), String::new())),
        }
    }
    Ok((status, headers))
}

fn parse_status_line(line: &str) -> Result<u16, ClientError> {
    let mut parts = line.splitn(3, ' ');
    let version = parts
        .next()
        .ok_or_else(|| ClientError::MalformedResponse("missing version".to_owned()))?;
    if !version.starts_with("HTTP/") {
        return Err(ClientError::MalformedResponse(format!("bad version: {version}")));
    }
    parts
        .next()
        .and_then(|code| code.parse().ok())
        .ok_or_else(|| ClientError::MalformedResponse(format!("bad status line: {line}")))
}

async fn read_sized<R>(
    reader: &mut R,
    leftover: &mut BytesMut,
    length: usize,
    max_body: usize,
    streaming: bool,
) -> Result<(Bytes, bool), ClientError>
where
    R: AsyncRead + Unpin,
{
    if !streaming && length > max_body {
        return Err(ClientError::BodyTooLarge { max: max_body });
    }
    let keep = length.min(max_body);
    let mut body = BytesMut::with_capacity(keep.min(64 * 1024));
    body.extend_from_slice(&leftover.split_to(leftover.len().min(keep)));
    while body.len() < keep {
        let n = reader.read_buf(&mut body).await.map_err(ClientError::from_io)?;
        if n == 0 {
            // short body: return what arrived, connection is done anyway
            return Ok((body.freeze(), true));
        }
    }
    body.truncate(keep);
    Ok((body.freeze(), keep < length))
}

async fn read_to_close<R>(
    reader: &mut R,
    leftover: &mut BytesMut,
    max_body: usize,
    streaming: bool,
) -> Result<(Bytes, bool), ClientError>
where
    R: AsyncRead + Unpin,
{
    let mut body = BytesMut::new();
    body.extend_from_slice(leftover);
    leftover.clear();
    loop {
        if body.len() >= max_body {
            if !streaming {
                return Err(ClientError::BodyTooLarge { max: max_body });
            }
            body.truncate(max_body);
            return Ok((body.freeze(), true));
        }
        let n = reader.read_buf(&mut body).await.map_err(ClientError::from_io)?;
        if n == 0 {
            return Ok((body.freeze(), false));
        }
    }
}

/// Chunked transfer decoding, bounded. In streaming mode, hitting the bound
/// mid-stream is a [`ClientError::ReadLimit`]: the framing is unfinished, so
/// neither the connection nor a partial "success" is safe to hand on.
async fn read_chunked<R>(
    reader: &mut R,
    leftover: &mut BytesMut,
    max_body: usize,
    streaming: bool,
) -> Result<(Bytes, bool), ClientError>
where
    R: AsyncRead + Unpin,
{
    let mut buf = BytesMut::new();
    buf.extend_from_slice(leftover);
    leftover.clear();
    let mut body = BytesMut::new();

    loop {
        // read a size line
        let line_end = loop {
            if let Some(i) = buf.windows(2).position(|w| w == b"\r\n") {
                break i;
            }
            let n = reader.read_buf(&mut buf).await.map_err(ClientError::from_io)?;
            if n == 0 {
                return Err(ClientError::MalformedResponse(
                    "connection closed mid-chunk".to_owned(),
                ));
            }
        };
        let size_text = String::from_utf8_lossy(&buf[..line_end]).into_owned();
        let size_field = size_text.split(';').next().unwrap_or("").trim();
        let size = usize::from_str_radix(size_field, 16).map_err(|_| {
            ClientError::MalformedResponse(format!("bad chunk size: {size_text}"))
        })?;
        let _ = buf.split_to(line_end + 2);

        if size == 0 {
            // Consume the buffered trailer section up to its blank line. If
            // the terminator has not arrived yet, the connection cannot be
            // reused: the next response would read leftover trailer bytes.
            let clean = loop {
                match buf.windows(2).position(|w| w == b"\r\n") {
                    Some(0) => {
                        let _ = buf.split_to(2);
                        break true;
                    },
                    Some(i) => {
                        let _ = buf.split_to(i + 2);
                    },
                    None => break false,
                }
            };
            return Ok((body.freeze(), !clean));
        }

        if body.len() + size > max_body {
            if streaming {
                return Err(ClientError::ReadLimit { limit: max_body });
            }
            return Err(ClientError::BodyTooLarge { max: max_body });
        }

        // chunk data + trailing CRLF
        while buf.len() < size + 2 {
            let n = reader.read_buf(&mut buf).await.map_err(ClientError::from_io)?;
            if n == 0 {
                return Err(ClientError::MalformedResponse(
                    "connection closed mid-chunk".to_owned(),
                ));
            }
        }
        body.extend_from_slice(&buf[..size]);
        let _ = buf.split_to(size + 2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn parse(input: &[u8], max_body: usize, streaming: bool) -> Result<RawResponse, ClientError> {
        let mut reader = input;
        read_response(&mut reader, max_body, streaming).await
    }

    #[tokio::test]
    async fn parses_status_headers_and_sized_body() {
        let raw = b"HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Length: 5\r\n\r\nhello";
        let resp = parse(raw, 4096, true).await.unwrap();
        assert_eq!(resp.status, 200);
        assert_eq!(resp.header("content-type"), Some("text/html"));
        assert_eq!(resp.body.as_ref(), b"hello");
        assert!(!resp.truncated);
    }

    #[tokio::test]
    async fn streaming_truncates_long_bodies() {
        let raw = b"HTTP/1.1 200 OK\r\nContent-Length: 10\r\n\r\n0123456789";
        let resp = parse(raw, 4, true).await.unwrap();
        assert_eq!(resp.body.as_ref(), b"0123");
        assert!(resp.truncated);
    }

    #[tokio::test]
    async fn whole_body_mode_rejects_oversize() {
        let raw = b"HTTP/1.1 200 OK\r\nContent-Length: 10\r\n\r\n0123456789";
        let err = parse(raw, 4, false).await.unwrap_err();
        assert!(matches!(err, ClientError::BodyTooLarge { max: 4 }));
    }

    #[tokio::test]
    async fn chunked_bodies_are_decoded() {
        let raw = b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n5\r\nhello\r\n6\r\n world\r\n0\r\n\r\n";
        let resp = parse(raw, 4096, true).await.unwrap();
        assert_eq!(resp.body.as_ref(), b"hello world");
    }

    #[tokio::test]
    async fn chunked_over_limit_is_read_limit_when_streaming() {
        let raw = b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\nff\r\n";
        let err = parse(raw, 8, true).await.unwrap_err();
        assert!(matches!(err, ClientError::ReadLimit { .. }));
    }

    #[tokio::test]
    async fn read_to_close_body() {
        let raw = b"HTTP/1.1 403 Forbidden\r\nServer: nginx\r\n\r\ndenied";
        let resp = parse(raw, 4096, true).await.unwrap();
        assert_eq!(resp.status, 403);
        assert_eq!(resp.header("Server"), Some("nginx"));
        assert_eq!(resp.body.as_ref(), b"denied");
    }

    #[tokio::test]
    async fn bodiless_statuses_read_no_body() {
        let raw = b"HTTP/1.1 304 Not Modified\r\nETag: \"x\"\r\n\r\n";
        let resp = parse(raw, 4096, true).await.unwrap();
        assert_eq!(resp.status, 304);
        assert!(resp.body.is_empty());
    }

    #[tokio::test]
    async fn garbage_is_malformed() {
        let raw = b"SMTP nonsense\r\n\r\n";
        assert!(matches!(
            parse(raw, 4096, true).await.unwrap_err(),
            ClientError::MalformedResponse(_)
        ));
    }

    #[tokio::test]
    async fn redirect_detection() {
        let raw = b"HTTP/1.1 302 Found\r\nLocation: /login\r\nContent-Length: 0\r\n\r\n";
        let resp = parse(raw, 4096, true).await.unwrap();
        assert!(resp.is_redirect());
        assert_eq!(resp.header("Location"), Some("/login"));
    }
}
