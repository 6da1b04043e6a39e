//! Error types for asset loading.
//!
//! Asset failures are fatal at startup when the asset is required by an
//! enabled module, and degraded (empty output, logged) at runtime. The
//! distinction is made by the caller; this crate only reports what went
//! wrong.

use std::{io, path::PathBuf};

use thiserror::Error;

/// Errors that can occur loading wordlists, the Unicode map, or the recon
/// cache.
#[derive(Error, Debug)]
pub enum AssetError {
    /// An overlay or cache file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// Path that failed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// A JSON asset did not match its expected structure.
    #[error("malformed asset {name}: {source}")]
    Malformed {
        /// Asset name (file name, not path).
        name: &'static str,
        /// Underlying deserialization error.
        #[source]
        source: serde_json::Error,
    },

    /// A wordlist name not in the known set was requested as an overlay.
    #[error("unknown wordlist: {0}")]
    UnknownWordlist(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_names_the_path() {
        let err = AssetError::Io {
            path: PathBuf::from("/tmp/missing.lst"),
            source: io::Error::new(io::ErrorKind::NotFound, "gone"),
        };
        assert!(err.to_string().contains("/tmp/missing.lst"));
    }
}
