//! Embedded wordlists with optional user-directory overlay.
//!
//! Every list ships inside the binary via `include_str!`. A user overlay
//! directory may carry same-named files; a present file replaces the
//! embedded list wholesale, a missing file falls back to the embedded copy.
//! Lists are parsed once and read-only afterwards.

use std::{fs, path::Path};

use crate::errors::AssetError;

/// Names of all embedded `.lst` assets.
///
/// The `header_*` lists carry header *names*; the `internal_*` lists carry
/// the values substituted into them plus the method and path-fragment lists.
pub const WORDLIST_NAMES: &[&str] = &[
    "internal_midpaths.lst",
    "internal_endpaths.lst",
    "internal_http_methods.lst",
    "internal_ip_hosts.lst",
    "internal_ports.lst",
    "internal_proto_schemes.lst",
    "header_ip_hosts.lst",
    "header_proto_schemes.lst",
    "header_ports.lst",
    "header_urls.lst",
];

const EMBEDDED: &[(&str, &str)] = &[
    ("internal_midpaths.lst", include_str!("../assets/internal_midpaths.lst")),
    ("internal_endpaths.lst", include_str!("../assets/internal_endpaths.lst")),
    ("internal_http_methods.lst", include_str!("../assets/internal_http_methods.lst")),
    ("internal_ip_hosts.lst", include_str!("../assets/internal_ip_hosts.lst")),
    ("internal_ports.lst", include_str!("../assets/internal_ports.lst")),
    ("internal_proto_schemes.lst", include_str!("../assets/internal_proto_schemes.lst")),
    ("header_ip_hosts.lst", include_str!("../assets/header_ip_hosts.lst")),
    ("header_proto_schemes.lst", include_str!("../assets/header_proto_schemes.lst")),
    ("header_ports.lst", include_str!("../assets/header_ports.lst")),
    ("header_urls.lst", include_str!("../assets/header_urls.lst")),
];

/// Parse a newline-delimited list: `\r\n` normalized, blank lines and
/// `#` comments skipped.
fn parse_list(raw: &str) -> Vec<String> {
    raw.lines()
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_owned)
        .collect()
}

/// The full set of wordlists used by the bypass generators.
///
/// Immutable after construction. Accessors return slices into the loaded
/// lists; cloning the struct is cheap enough for startup-time use only.
#[derive(Debug, Clone)]
pub struct Wordlists {
    mid_paths: Vec<String>,
    end_paths: Vec<String>,
    http_methods: Vec<String>,
    ip_hosts: Vec<String>,
    ports: Vec<String>,
    proto_schemes: Vec<String>,
    header_ip_hosts: Vec<String>,
    header_proto_schemes: Vec<String>,
    header_ports: Vec<String>,
    header_urls: Vec<String>,
}

impl Wordlists {
    /// Load the embedded lists only.
    #[must_use]
    pub fn embedded() -> Self {
        // The names below are all present in EMBEDDED; lookup cannot miss.
        Self {
            mid_paths: parse_list(embedded_raw("internal_midpaths.lst")),
            end_paths: parse_list(embedded_raw("internal_endpaths.lst")),
            http_methods: parse_list(embedded_raw("internal_http_methods.lst")),
            ip_hosts: parse_list(embedded_raw("internal_ip_hosts.lst")),
            ports: parse_list(embedded_raw("internal_ports.lst")),
            proto_schemes: parse_list(embedded_raw("internal_proto_schemes.lst")),
            header_ip_hosts: parse_list(embedded_raw("header_ip_hosts.lst")),
            header_proto_schemes: parse_list(embedded_raw("header_proto_schemes.lst")),
            header_ports: parse_list(embedded_raw("header_ports.lst")),
            header_urls: parse_list(embedded_raw("header_urls.lst")),
        }
    }

    /// Load the embedded lists, replacing any list that has a same-named
    /// file in `dir`.
    ///
    /// # Errors
    ///
    /// [`AssetError::Io`] if an overlay file exists but cannot be read.
    pub fn with_overlay(dir: &Path) -> Result<Self, AssetError> {
        let mut lists = Self::embedded();
        for name in WORDLIST_NAMES {
            let path = dir.join(name);
            if !path.is_file() {
                continue;
            }
            let raw = fs::read_to_string(&path)
                .map_err(|source| AssetError::Io { path: path.clone(), source })?;
            let parsed = parse_list(&raw);
            tracing::debug!(list = name, entries = parsed.len(), "wordlist overlaid");
            *lists.slot_mut(name) = parsed;
        }
        Ok(lists)
    }

    fn slot_mut(&mut self, name: &str) -> &mut Vec<String> {
        match name {
            "internal_midpaths.lst" => &mut self.mid_paths,
            "internal_endpaths.lst" => &mut self.end_paths,
            "internal_http_methods.lst" => &mut self.http_methods,
            "internal_ip_hosts.lst" => &mut self.ip_hosts,
            "internal_ports.lst" => &mut self.ports,
            "internal_proto_schemes.lst" => &mut self.proto_schemes,
            "header_ip_hosts.lst" => &mut self.header_ip_hosts,
            "header_proto_schemes.lst" => &mut self.header_proto_schemes,
            "header_ports.lst" => &mut self.header_ports,
            // WORDLIST_NAMES is exhaustive; the remaining name is header_urls.
            _ => &mut self.header_urls,
        }
    }

    /// Fragments inserted between path segments (`mid_paths` module).
    #[must_use]
    pub fn mid_paths(&self) -> &[String] {
        &self.mid_paths
    }

    /// Fragments appended after the path (`end_paths` module).
    #[must_use]
    pub fn end_paths(&self) -> &[String] {
        &self.end_paths
    }

    /// HTTP method tokens (`http_methods` module and the token codec
    /// registry).
    #[must_use]
    pub fn http_methods(&self) -> &[String] {
        &self.http_methods
    }

    /// IP/host values for spoofable headers (`http_headers_ip`).
    #[must_use]
    pub fn ip_hosts(&self) -> &[String] {
        &self.ip_hosts
    }

    /// Port values for spoofable headers (`http_headers_port`).
    #[must_use]
    pub fn ports(&self) -> &[String] {
        &self.ports
    }

    /// Protocol values for scheme headers (`http_headers_scheme`).
    #[must_use]
    pub fn proto_schemes(&self) -> &[String] {
        &self.proto_schemes
    }

    /// Header names carrying an IP or host.
    #[must_use]
    pub fn header_ip_hosts(&self) -> &[String] {
        &self.header_ip_hosts
    }

    /// Header names carrying a protocol/scheme.
    #[must_use]
    pub fn header_proto_schemes(&self) -> &[String] {
        &self.header_proto_schemes
    }

    /// Header names carrying a port.
    #[must_use]
    pub fn header_ports(&self) -> &[String] {
        &self.header_ports
    }

    /// Header names carrying a URL or path.
    #[must_use]
    pub fn header_urls(&self) -> &[String] {
        &self.header_urls
    }
}

/// Raw embedded text for `name`. Falls back to an empty list for unknown
/// names, which cannot happen for the fixed calls in [`Wordlists::embedded`].
fn embedded_raw(name: &str) -> &'static str {
    EMBEDDED.iter().find(|(n, _)| *n == name).map_or("", |(_, raw)| raw)
}

/// The embedded HTTP method list, for callers that need it without a full
/// [`Wordlists`] (the token codec's method registry).
#[must_use]
pub fn embedded_http_methods() -> Vec<String> {
    parse_list(embedded_raw("internal_http_methods.lst"))
}
