//! Request descriptor and debug-token codec.
//!
//! The descriptor is the canonical in-memory record for one mutated HTTP
//! request; the token is its compact, self-describing binary serialization
//! (snappy-compressed, URL-safe base64) embedded in dispatched requests so
//! responses can be traced back to the mutation that produced them.

mod descriptor;
mod errors;
pub mod registry;
pub mod token;

pub use descriptor::{RequestDescriptor, Scheme, UnsupportedScheme};
pub use errors::TokenError;
pub use token::{TOKEN_HEADER, decode, encode};
