//! Response processing and match filtering.
//!
//! Reduces a raw response to the record the reporter consumes: status,
//! interesting headers, an HTML title if there is one, a bounded body
//! preview, and a copy-paste `curl` reproducer equivalent to the dispatched
//! request. Responses whose status is outside the match set are dropped
//! here and never reach the sink.

use gatecrash_payload::RequestDescriptor;
use serde::Serialize;

use crate::{options::ClientOptions, response::RawResponse};

/// One matching response, ready for the result sink.
#[derive(Debug, Clone, Serialize)]
pub struct ScanHit {
    /// Method as dispatched.
    pub method: String,
    /// Full URL as dispatched (`scheme://authority` + raw URI).
    pub url: String,
    /// The target before mutation.
    pub original_url: String,
    /// Generator that produced the payload.
    pub module: String,
    /// Debug token of the dispatched request.
    pub token: String,
    /// Response status code.
    pub status: u16,
    /// `Content-Type` header, if present.
    pub content_type: Option<String>,
    /// `Content-Length` header, if present and numeric.
    pub content_length: Option<u64>,
    /// `Server` header, if present.
    pub server: Option<String>,
    /// `Location` header for 3xx responses.
    pub redirect: Option<String>,
    /// Text of the first `<title>` element for HTML responses.
    pub title: Option<String>,
    /// Bounded body preview (lossy UTF-8).
    pub preview: String,
    /// How many body bytes the preview actually covers.
    pub preview_size: usize,
    /// Milliseconds spent in send+receive.
    pub response_time_ms: u64,
    /// Equivalent `curl` invocation.
    pub curl: String,
}

/// Process one response; `None` when its status is not in the match set.
///
/// An empty match set means every status matches.
#[must_use]
pub fn process_response(
    descriptor: &RequestDescriptor,
    response: &RawResponse,
    options: &ClientOptions,
) -> Option<ScanHit> {
    if !options.match_codes.is_empty() && !options.match_codes.contains(&response.status) {
        return None;
    }

    let content_type = response.header("Content-Type").map(str::to_owned);
    let preview_len = response.body.len().min(options.preview_size);
    let preview_bytes = &response.body[..preview_len];

    let title = content_type
        .as_deref()
        .filter(|ct| ct.to_ascii_lowercase().contains("text/html"))
        .and_then(|_| extract_title(preview_bytes));

    Some(ScanHit {
        method: descriptor.method.clone(),
        url: dispatched_url(descriptor),
        original_url: descriptor.original_url.clone(),
        module: descriptor.module.clone(),
        token: descriptor.token.clone(),
        status: response.status,
        content_type,
        content_length: response.content_length(),
        server: response.header("Server").map(str::to_owned),
        redirect: response
            .is_redirect()
            .then(|| response.header("Location").map(str::to_owned))
            .flatten(),
        title,
        preview: String::from_utf8_lossy(preview_bytes).into_owned(),
        preview_size: preview_len,
        response_time_ms: response.elapsed_ms,
        curl: reproducer(descriptor, options),
    })
}

fn dispatched_url(descriptor: &RequestDescriptor) -> String {
    format!("{}://{}{}", descriptor.scheme, descriptor.host, descriptor.raw_uri)
}

/// Text between the first `<title...>` and `</title>`, whitespace collapsed.
fn extract_title(body: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(body);
    let lower = text.to_ascii_lowercase();
    let open = lower.find("<title")?;
    let open_end = lower[open..].find('>').map(|i| open + i + 1)?;
    let close = lower[open_end..].find("</title").map(|i| open_end + i)?;
    let raw = &text[open_end..close];
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    (!collapsed.is_empty()).then_some(collapsed)
}

/// Equivalent `curl` command: method, every header as dispatched (payload
/// first, then non-overridden client headers), body, and the literal URL.
fn reproducer(descriptor: &RequestDescriptor, options: &ClientOptions) -> String {
    let mut cmd = format!("curl -skg -X {}", shell_quote(&descriptor.method));

    for (name, value) in &descriptor.headers {
        cmd.push_str(" -H ");
        cmd.push_str(&shell_quote(&format!("{name}: {value}")));
    }
    for (name, value) in &options.custom_headers {
        let overridden = descriptor
            .headers
            .iter()
            .any(|(payload_name, _)| payload_name.eq_ignore_ascii_case(name));
        if !overridden {
            cmd.push_str(" -H ");
            cmd.push_str(&shell_quote(&format!("{name}: {value}")));
        }
    }

    if !descriptor.body.is_empty() {
        cmd.push_str(" --data ");
        cmd.push_str(&shell_quote(&String::from_utf8_lossy(&descriptor.body)));
    }

    cmd.push(' ');
    cmd.push_str(&shell_quote(&dispatched_url(descriptor)));
    cmd
}

fn shell_quote(text: &str) -> String {
    format!("'{}'", text.replace('\'', "'\\''"))
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use gatecrash_payload::Scheme;

    use super::*;

    fn response(status: u16, headers: &[(&str, &str)], body: &[u8]) -> RawResponse {
        RawResponse {
            status,
            headers: headers.iter().map(|(n, v)| ((*n).to_owned(), (*v).to_owned())).collect(),
            body: Bytes::copy_from_slice(body),
            truncated: false,
            elapsed_ms: 42,
        }
    }

    fn descriptor() -> RequestDescriptor {
        let mut d = RequestDescriptor::get(
            "https://h/admin",
            Scheme::Https,
            "h",
            "/%61dmin",
            "char_encode",
        );
        d.push_header("X-Forwarded-For", "127.0.0.1");
        d.token = "tok".to_owned();
        d
    }

    #[test]
    fn match_set_filters() {
        let options = ClientOptions::default(); // {200}
        assert!(process_response(&descriptor(), &response(200, &[], b""), &options).is_some());
        assert!(process_response(&descriptor(), &response(403, &[], b""), &options).is_none());
    }

    #[test]
    fn empty_match_set_matches_everything() {
        let options = ClientOptions { match_codes: std::collections::HashSet::new(), ..ClientOptions::default() };
        assert!(process_response(&descriptor(), &response(502, &[], b""), &options).is_some());
    }

    #[test]
    fn extracts_html_title_and_headers() {
        let options = ClientOptions::default();
        let resp = response(
            200,
            &[("Content-Type", "text/html; charset=utf-8"), ("Server", "nginx"), ("Content-Length", "64")],
            b"<html><head><title>\n  Admin   Panel </title></head></html>",
        );
        let hit = process_response(&descriptor(), &resp, &options).unwrap();
        assert_eq!(hit.title.as_deref(), Some("Admin Panel"));
        assert_eq!(hit.server.as_deref(), Some("nginx"));
        assert_eq!(hit.content_length, Some(64));
        assert_eq!(hit.response_time_ms, 42);
        assert_eq!(hit.url, "https://h/%61dmin");
    }

    #[test]
    fn no_title_outside_html() {
        let options = ClientOptions::default();
        let resp = response(
            200,
            &[("Content-Type", "application/json")],
            b"{\"x\": \"<title>nope</title>\"}",
        );
        let hit = process_response(&descriptor(), &resp, &options).unwrap();
        assert_eq!(hit.title, None);
    }

    #[test]
    fn preview_is_bounded() {
        let options = ClientOptions { preview_size: 4, ..ClientOptions::default() };
        let hit = process_response(&descriptor(), &response(200, &[], b"0123456789"), &options)
            .unwrap();
        assert_eq!(hit.preview, "0123");
        assert_eq!(hit.preview_size, 4);
    }

    #[test]
    fn redirects_capture_location() {
        let options = ClientOptions { match_codes: [302].into(), ..ClientOptions::default() };
        let resp = response(302, &[("Location", "/login")], b"");
        let hit = process_response(&descriptor(), &resp, &options).unwrap();
        assert_eq!(hit.redirect.as_deref(), Some("/login"));
    }

    #[test]
    fn reproducer_quotes_and_includes_headers() {
        let mut options = ClientOptions::default();
        options.custom_headers.push(("X-Scan-Id".to_owned(), "it's one".to_owned()));
        let hit = process_response(&descriptor(), &response(200, &[], b""), &options).unwrap();
        assert!(hit.curl.starts_with("curl -skg -X 'GET'"));
        assert!(hit.curl.contains("-H 'X-Forwarded-For: 127.0.0.1'"));
        assert!(hit.curl.contains(r#"-H 'X-Scan-Id: it'\''s one'"#));
        assert!(hit.curl.ends_with("'https://h/%61dmin'"));
    }
}
