//! Raw URL splitting.
//!
//! Target URLs are split, never parsed in the RFC sense: the path and query
//! are taken verbatim, with no percent-decoding, no rejection of "illegal"
//! bytes, and no normalization. Many of the URIs this tool emits are
//! deliberately malformed, and the originals they mutate must survive the
//! trip through here untouched.

use gatecrash_payload::Scheme;

use crate::errors::ModuleError;

/// A target URL split into its raw components.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawUrl {
    /// Wire scheme.
    pub scheme: Scheme,
    /// Host, without port. IPv6 literals keep their brackets.
    pub host: String,
    /// Explicit port, if the authority carried one.
    pub port: Option<u16>,
    /// Path, verbatim. Empty when the URL ends at the authority.
    pub path: String,
    /// Query suffix including the leading `?`, or empty. Never mutated by
    /// generators; always re-appended after path mutations.
    pub query: String,
}

impl RawUrl {
    /// Split `input` into raw components.
    ///
    /// # Errors
    ///
    /// [`ModuleError::UnsupportedScheme`] for anything but `http`/`https`,
    /// [`ModuleError::MissingHost`] for an empty authority.
    pub fn parse(input: &str) -> Result<Self, ModuleError> {
        let (scheme_str, rest) = input
            .split_once("://")
            .ok_or_else(|| ModuleError::UnsupportedScheme { url: input.to_owned() })?;
        let scheme: Scheme = scheme_str
            .parse()
            .map_err(|_| ModuleError::UnsupportedScheme { url: input.to_owned() })?;

        let authority_end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
        let authority = &rest[..authority_end];
        if authority.is_empty() {
            return Err(ModuleError::MissingHost { url: input.to_owned() });
        }

        let (host, port) = split_port(authority);

        let remainder = &rest[authority_end..];
        let (path, query) = match remainder.find('?') {
            Some(q) => (&remainder[..q], &remainder[q..]),
            None => (remainder, ""),
        };

        Ok(Self {
            scheme,
            host: host.to_owned(),
            port,
            path: path.to_owned(),
            query: query.to_owned(),
        })
    }

    /// `host` or `host:port` as dialed. Default ports are kept implicit.
    #[must_use]
    pub fn authority(&self) -> String {
        match self.port {
            Some(port) if port != self.scheme.default_port() => {
                format!("{}:{port}", self.host)
            },
            _ => self.host.clone(),
        }
    }

    /// The path, forced to `/` when the URL had none.
    #[must_use]
    pub fn path_or_root(&self) -> &str {
        if self.path.is_empty() { "/" } else { &self.path }
    }

    /// Original path+query as placed on a request line.
    #[must_use]
    pub fn request_target(&self) -> String {
        format!("{}{}", self.path_or_root(), self.query)
    }
}

/// Split a trailing `:port` off an authority, leaving IPv6 brackets intact.
/// A non-numeric port suffix is left as part of the host: the fuzzer's
/// inputs are not validated, only split.
fn split_port(authority: &str) -> (&str, Option<u16>) {
    let search_from = if authority.starts_with('[') {
        authority.find(']').map_or(0, |i| i + 1)
    } else {
        0
    };
    match authority[search_from..].rfind(':') {
        Some(rel) => {
            let idx = search_from + rel;
            match authority[idx + 1..].parse::<u16>() {
                Ok(port) => (&authority[..idx], Some(port)),
                Err(_) => (authority, None),
            }
        },
        None => (authority, None),
    }
}
