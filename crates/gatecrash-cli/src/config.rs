//! Scan configuration assembled from the CLI surface.
//!
//! Parsing helpers live here so the binary's `main` stays thin and the
//! orchestrator can be driven from tests without a process spawn.

use std::{
    collections::HashSet,
    fs,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use gatecrash_assets::{AssetError, ReconCache, Wordlists};
use gatecrash_modules::{BypassModule, ModuleError};
use thiserror::Error;

/// Errors assembling a scan configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A match-code entry was not an integer in 100–599.
    #[error("invalid match code: {0} (expected 100-599 or \"all\")")]
    InvalidMatchCode(String),

    /// A custom header was not `Name: Value`.
    #[error("invalid header (expected \"Name: Value\"): {0}")]
    InvalidHeader(String),

    /// A module selector named no known module.
    #[error(transparent)]
    Module(#[from] ModuleError),

    /// Wordlist overlay or recon cache failed to load.
    #[error(transparent)]
    Asset(#[from] AssetError),

    /// A target or substitute-hosts file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// Offending path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// No target URL was supplied at all.
    #[error("no targets: pass --url or --urls-file")]
    NoTargets,
}

/// Everything the orchestrator needs for one scan.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Target URLs, already multiplied by substitute hosts.
    pub targets: Vec<String>,
    /// Modules to run, in order.
    pub modules: Vec<BypassModule>,
    /// Workers per (target, module) pool.
    pub threads: usize,
    /// Dial/read/write timeout.
    pub timeout: Duration,
    /// Per-request delay.
    pub delay: Duration,
    /// Retry attempts per request.
    pub max_retries: u32,
    /// Status codes reported as hits; empty means all.
    pub match_codes: HashSet<u16>,
    /// Upstream HTTP proxy authority.
    pub proxy: Option<String>,
    /// User spoof header names merged into `http_headers_ip`.
    pub spoof_headers: Vec<String>,
    /// User spoof IPs merged into `http_headers_ip`.
    pub spoof_ips: Vec<String>,
    /// Client-wide custom headers.
    pub custom_headers: Vec<(String, String)>,
    /// Wordlists (embedded, possibly overlaid).
    pub wordlists: Arc<Wordlists>,
    /// Recon cache for the host module.
    pub recon: Arc<ReconCache>,
    /// Directory for hit records, if any.
    pub outdir: Option<PathBuf>,
    /// Print reproducer commands with each hit.
    pub verbose: bool,
    /// Emit debug-token headers.
    pub debug: bool,
}

/// Parse a comma-separated match-code list. `all` (or empty) clears the
/// filter.
pub fn parse_match_codes(input: &str) -> Result<HashSet<u16>, ConfigError> {
    let trimmed = input.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("all") {
        return Ok(HashSet::new());
    }
    let mut codes = HashSet::new();
    for part in trimmed.split(',') {
        let part = part.trim();
        let code: u16 = part
            .parse()
            .map_err(|_| ConfigError::InvalidMatchCode(part.to_owned()))?;
        if !(100..=599).contains(&code) {
            return Err(ConfigError::InvalidMatchCode(part.to_owned()));
        }
        codes.insert(code);
    }
    Ok(codes)
}

/// Parse a comma-separated module selector. `all` selects every module.
pub fn parse_modules(input: &str) -> Result<Vec<BypassModule>, ConfigError> {
    let trimmed = input.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("all") {
        return Ok(BypassModule::ALL.to_vec());
    }
    trimmed
        .split(',')
        .map(|name| BypassModule::from_name(name.trim()).map_err(ConfigError::from))
        .collect()
}

/// Parse one `Name: Value` custom header.
pub fn parse_header(input: &str) -> Result<(String, String), ConfigError> {
    let (name, value) = input
        .split_once(':')
        .ok_or_else(|| ConfigError::InvalidHeader(input.to_owned()))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(ConfigError::InvalidHeader(input.to_owned()));
    }
    Ok((name.to_owned(), value.trim().to_owned()))
}

/// Read a newline-delimited file of targets or hosts.
pub fn read_lines(path: &Path) -> Result<Vec<String>, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
    Ok(raw
        .lines()
        .map(|line| line.trim_end_matches('\r').trim())
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_owned)
        .collect())
}

/// Multiply targets by substitute hosts: each host replaces the authority
/// of every target, keeping scheme, path, and query.
#[must_use]
pub fn substitute_hosts(targets: &[String], hosts: &[String]) -> Vec<String> {
    if hosts.is_empty() {
        return targets.to_vec();
    }
    let mut out = Vec::with_capacity(targets.len() * hosts.len());
    for target in targets {
        let Some((scheme, rest)) = target.split_once("://") else {
            out.push(target.clone());
            continue;
        };
        let authority_end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
        let tail = &rest[authority_end..];
        for host in hosts {
            out.push(format!("{scheme}://{host}{tail}"));
        }
    }
    out
}
