//! Raw HTTP/1.1 request engine.
//!
//! Serializes request descriptors byte-exactly (no normalization anywhere),
//! sends them over a pooled TCP/TLS transport with retry, auto-throttle,
//! and a per-target consecutive-failure breaker, and reduces matching
//! responses to reportable hits. Built directly on sockets: any stock HTTP
//! client would "fix" precisely the malformations the payloads exist to
//! deliver.

pub mod builder;
mod client;
mod errors;
mod options;
mod pool;
mod processor;
mod response;
pub mod retry;
mod throttle;
mod transport;

pub use client::HttpClient;
pub use errors::ClientError;
pub use options::{ClientOptions, PREVIEW_HEADROOM};
pub use pool::{MetricsSnapshot, PoolMetrics, PoolOutcome, RequestPool};
pub use processor::{ScanHit, process_response};
pub use response::{RawResponse, read_response};
pub use throttle::AutoThrottle;
