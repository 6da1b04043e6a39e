//! The request descriptor: the universal currency between generators, the
//! request builder, the worker pool, and the response processor.
//!
//! A descriptor is a fully-formed mutated request. Nothing in it is
//! normalized: `raw_uri` holds the exact bytes placed after the method on
//! the request line, headers keep their order, casing, and duplicates, and
//! `host` is the authority actually dialed, which deliberately may differ
//! from any `Host:` header a generator added.

use std::{fmt, str::FromStr};

use bytes::Bytes;
use thiserror::Error;

/// Wire scheme: what transport to dial, not what the request claims.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Scheme {
    /// Plain TCP.
    #[default]
    Http,
    /// TLS.
    Https,
}

impl Scheme {
    /// Canonical lowercase form.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Https => "https",
        }
    }

    /// Default port for the scheme (80 / 443).
    #[must_use]
    pub fn default_port(self) -> u16 {
        match self {
            Self::Http => 80,
            Self::Https => 443,
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error parsing a scheme string.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unsupported scheme: {0}")]
pub struct UnsupportedScheme(pub String);

impl FromStr for Scheme {
    type Err = UnsupportedScheme;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "http" => Ok(Self::Http),
            "https" => Ok(Self::Https),
            other => Err(UnsupportedScheme(other.to_owned())),
        }
    }
}

/// One mutated request, ready for serialization and dispatch.
///
/// # Invariants
///
/// - `host` is non-empty.
/// - If `body` is non-empty the builder supplies `Content-Length` unless a
///   header of that name is already present.
/// - `token` is computed after every other field is final, so decoding the
///   token yields the request as dispatched.
///
/// Descriptors are short-lived: owned by the worker-pool task that dispatches
/// them and discarded afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RequestDescriptor {
    /// The target URL before mutation, retained for reporting.
    pub original_url: String,
    /// Wire scheme (TLS on or off).
    pub scheme: Scheme,
    /// HTTP method token. Arbitrary: sending non-standard ones is the point.
    pub method: String,
    /// Authority actually dialed. May differ from any `Host:` header.
    pub host: String,
    /// Bytes placed verbatim after the method on the request line.
    pub raw_uri: String,
    /// Ordered header list; duplicates allowed, names not canonicalized.
    pub headers: Vec<(String, String)>,
    /// Raw body bytes. May itself contain a full HTTP request.
    pub body: Bytes,
    /// Name of the generator that produced this descriptor.
    pub module: String,
    /// Encoded debug token. Empty until finalized.
    pub token: String,
}

impl RequestDescriptor {
    /// GET template for a target: original scheme, host, and path+query,
    /// no headers, no body.
    #[must_use]
    pub fn get(original_url: &str, scheme: Scheme, host: &str, raw_uri: &str, module: &str) -> Self {
        Self {
            original_url: original_url.to_owned(),
            scheme,
            method: "GET".to_owned(),
            host: host.to_owned(),
            raw_uri: raw_uri.to_owned(),
            headers: Vec::new(),
            body: Bytes::new(),
            module: module.to_owned(),
            token: String::new(),
        }
    }

    /// Dedup key over the full wire form: method, scheme, host, raw URI,
    /// headers in order, body. The token and `original_url` are excluded:
    /// two descriptors that would hit the wire identically are duplicates
    /// even when their tokens differ.
    #[must_use]
    pub fn wire_key(&self) -> Vec<u8> {
        let mut key = Vec::with_capacity(
            self.method.len() + self.host.len() + self.raw_uri.len() + self.body.len() + 16,
        );
        key.extend_from_slice(self.method.as_bytes());
        key.push(0);
        key.extend_from_slice(self.scheme.as_str().as_bytes());
        key.push(0);
        key.extend_from_slice(self.host.as_bytes());
        key.push(0);
        key.extend_from_slice(self.raw_uri.as_bytes());
        for (name, value) in &self.headers {
            key.push(0);
            key.extend_from_slice(name.as_bytes());
            key.push(1);
            key.extend_from_slice(value.as_bytes());
        }
        key.push(0);
        key.extend_from_slice(&self.body);
        key
    }

    /// Append a header, preserving order and casing.
    pub fn push_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.push((name.into(), value.into()));
    }

    /// First header value with a case-insensitive name match.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}
