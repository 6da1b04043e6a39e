//! Embedded assets for the gatecrash scanner.
//!
//! Three read-only data sources feed the bypass generators: the bundled
//! wordlists (path fragments, method tokens, spoofable header names and
//! values), the ASCII → Unicode-confusable map, and the recon cache
//! produced by the external reconnaissance service. All of them are
//! populated once at startup and immutable for the scan's duration.

mod errors;
pub mod recon;
pub mod unicode;
pub mod wordlists;

pub use errors::AssetError;
pub use recon::{ReconCache, ReconEntry};
pub use unicode::UnicodeVariant;
pub use wordlists::Wordlists;
