//! Token codec registries.
//!
//! Schemes, standard methods, and module names each get a compact one-byte
//! indexed encoding in the token. The tables are built lazily on first use
//! and process-wide read-only afterwards; lookups after initialization are
//! lock-free.

use std::sync::OnceLock;

/// The two wire schemes, in index order.
pub const SCHEMES: &[&str] = &["http", "https"];

/// Module names in index order.
///
/// `char_encode` owns three labels because each encoding depth reports under
/// its own name. Order is append-only: tokens encode indexes into this
/// table, so reordering would silently relabel old tokens.
pub const MODULES: &[&str] = &[
    "dumb_check",
    "mid_paths",
    "end_paths",
    "http_methods",
    "case_substitution",
    "char_encode",
    "char_encode_double",
    "char_encode_triple",
    "http_headers_scheme",
    "http_headers_ip",
    "http_headers_port",
    "http_headers_url",
    "http_host",
    "nginx_bypasses",
    "unicode_path_normalization",
    "path_prefix",
];

static METHODS: OnceLock<Vec<String>> = OnceLock::new();

/// Standard method tokens, read once from the embedded method list.
#[must_use]
pub fn methods() -> &'static [String] {
    METHODS.get_or_init(gatecrash_assets::wordlists::embedded_http_methods)
}

/// Index of `value` in the scheme table.
#[must_use]
pub fn scheme_index(value: &str) -> Option<u8> {
    index_in(SCHEMES.iter().copied(), value)
}

/// Index of `value` in the method table.
#[must_use]
pub fn method_index(value: &str) -> Option<u8> {
    index_in(methods().iter().map(String::as_str), value)
}

/// Index of `value` in the module table.
#[must_use]
pub fn module_index(value: &str) -> Option<u8> {
    index_in(MODULES.iter().copied(), value)
}

/// Scheme name for a decoded index.
#[must_use]
pub fn scheme_at(index: u8) -> Option<&'static str> {
    SCHEMES.get(index as usize).copied()
}

/// Method name for a decoded index.
#[must_use]
pub fn method_at(index: u8) -> Option<&'static str> {
    methods().get(index as usize).map(String::as_str)
}

/// Module name for a decoded index.
#[must_use]
pub fn module_at(index: u8) -> Option<&'static str> {
    MODULES.get(index as usize).copied()
}

/// Linear scan over a small static table. Indexes must fit the one-byte
/// encoded form; entries past 255 never get an indexed encoding.
fn index_in<'a>(iter: impl Iterator<Item = &'a str>, value: &str) -> Option<u8> {
    iter.take(256).position(|entry| entry == value).map(|i| i as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scheme_indexes_are_stable() {
        assert_eq!(scheme_index("http"), Some(0));
        assert_eq!(scheme_index("https"), Some(1));
        assert_eq!(scheme_at(1), Some("https"));
        assert_eq!(scheme_index("gopher"), None);
    }

    #[test]
    fn methods_table_round_trips() {
        let idx = method_index("PROPFIND").unwrap();
        assert_eq!(method_at(idx), Some("PROPFIND"));
        assert_eq!(method_index("NOT-A-METHOD-ANYONE-SHIPS"), None);
    }

    #[test]
    fn module_table_round_trips() {
        for (i, name) in MODULES.iter().enumerate() {
            assert_eq!(module_index(name), Some(i as u8));
            assert_eq!(module_at(i as u8), Some(*name));
        }
    }
}
