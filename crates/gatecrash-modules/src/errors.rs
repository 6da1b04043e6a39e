//! Error types for payload generation.

use thiserror::Error;

/// Errors that can occur parsing a target URL or selecting a module.
///
/// Generation itself is infallible once the context is built: modules that
/// find nothing to mutate (no recon entry, no matching characters) emit an
/// empty list, not an error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModuleError {
    /// The target URL does not use `http` or `https`.
    #[error("unsupported scheme in target: {url}")]
    UnsupportedScheme {
        /// Offending URL.
        url: String,
    },

    /// The target URL has no authority component.
    #[error("missing host in target: {url}")]
    MissingHost {
        /// Offending URL.
        url: String,
    },

    /// A module selector named no known module.
    #[error("unknown module: {0}")]
    UnknownModule(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_name_the_input() {
        let err = ModuleError::UnsupportedScheme { url: "ftp://x/".to_owned() };
        assert!(err.to_string().contains("ftp://x/"));
        assert_eq!(
            ModuleError::UnknownModule("wat".to_owned()).to_string(),
            "unknown module: wat"
        );
    }
}
