//! Read-only recon cache.
//!
//! The reconnaissance service is external; it writes a JSON file mapping
//! each hostname to the services it observed. The scanner loads that file
//! once at startup and only ever reads it. The `http_host` generator is the
//! sole consumer.

use std::{collections::HashMap, fs, path::Path};

use serde::Deserialize;

use crate::errors::AssetError;

/// Services observed for one hostname.
///
/// `ipv4_services` / `ipv6_services` map `scheme → ip literal → ports`.
/// IPv6 literals are stored without brackets; consumers add `[...]` when
/// building authorities.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ReconEntry {
    /// `scheme → {ipv4 → [port]}`.
    #[serde(default)]
    pub ipv4_services: HashMap<String, HashMap<String, Vec<u16>>>,
    /// `scheme → {ipv6 → [port]}`.
    #[serde(default)]
    pub ipv6_services: HashMap<String, HashMap<String, Vec<u16>>>,
    /// CNAME chain observed for the hostname.
    #[serde(default)]
    pub cnames: Vec<String>,
}

/// Hostname → recon entry lookup, populated once at startup.
#[derive(Debug, Clone, Default)]
pub struct ReconCache {
    entries: HashMap<String, ReconEntry>,
}

impl ReconCache {
    /// An empty cache. Modules that depend on recon data produce no output.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Cache over an in-memory entry map. The file-loading path goes through
    /// [`ReconCache::load`]; this exists for embedding and tests.
    #[must_use]
    pub fn from_entries(entries: HashMap<String, ReconEntry>) -> Self {
        Self { entries }
    }

    /// Load the cache from a recon-service JSON file.
    ///
    /// # Errors
    ///
    /// [`AssetError::Io`] if the file cannot be read,
    /// [`AssetError::Malformed`] if it is not the expected JSON shape.
    pub fn load(path: &Path) -> Result<Self, AssetError> {
        let raw = fs::read_to_string(path)
            .map_err(|source| AssetError::Io { path: path.to_path_buf(), source })?;
        let entries: HashMap<String, ReconEntry> = serde_json::from_str(&raw)
            .map_err(|source| AssetError::Malformed { name: "recon cache", source })?;
        tracing::debug!(hosts = entries.len(), "recon cache loaded");
        Ok(Self { entries })
    }

    /// Entry for `hostname`, or `None` when recon never saw it.
    #[must_use]
    pub fn lookup(&self, hostname: &str) -> Option<&ReconEntry> {
        self.entries.get(hostname)
    }

    /// Number of hostnames in the cache.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no recon data was loaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use super::*;

    #[test]
    fn lookup_on_empty_cache_misses() {
        assert!(ReconCache::empty().lookup("example.com").is_none());
    }

    #[test]
    fn load_round_trips_services() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recon.json");
        let mut f = std::fs::File::create(&path).unwrap();
        write!(
            f,
            r#"{{"example.com": {{
                "ipv4_services": {{"https": {{"1.2.3.4": [443, 8443]}}}},
                "cnames": ["edge.example.net"]
            }}}}"#
        )
        .unwrap();
        drop(f);

        let cache = ReconCache::load(&path).unwrap();
        let entry = cache.lookup("example.com").unwrap();
        assert_eq!(entry.ipv4_services["https"]["1.2.3.4"], vec![443, 8443]);
        assert_eq!(entry.cnames, vec!["edge.example.net".to_owned()]);
        assert!(entry.ipv6_services.is_empty());
    }

    #[test]
    fn malformed_cache_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recon.json");
        std::fs::write(&path, "[1, 2, 3]").unwrap();
        assert!(matches!(ReconCache::load(&path), Err(AssetError::Malformed { .. })));
    }
}
