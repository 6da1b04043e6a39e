//! Bypass payload generators.
//!
//! A family of generator strategies, each a pure function from one target
//! plus the shared read-only inputs to a deduplicated list of request
//! descriptors. Dispatch is a tagged enum with one variant per strategy:
//! adding a module is a compile-time change, and exhaustive matches keep
//! every dispatch site honest.

mod context;
mod errors;
mod generators;
mod pathutil;
mod rawurl;

pub use context::{DedupKey, Emitter, GenerationContext};
pub use errors::ModuleError;
use gatecrash_payload::RequestDescriptor;
pub use rawurl::RawUrl;

/// One bypass-generation strategy.
///
/// Each variant has a stable name used in tokens and reports
/// (`CharEncode` reports under three names, one per encoding depth).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BypassModule {
    /// Baseline request with the original URL.
    DumbCheck,
    /// Wordlist fragments inserted between path segments.
    MidPaths,
    /// Wordlist fragments appended after the path.
    EndPaths,
    /// Alternative HTTP method tokens.
    HttpMethods,
    /// Per-letter case flips in the path.
    CaseSubstitution,
    /// Single/double/triple percent-encoding of path letters.
    CharEncode,
    /// Scheme-carrying spoof headers.
    HeadersScheme,
    /// IP-carrying spoof headers.
    HeadersIp,
    /// Port-carrying spoof headers.
    HeadersPort,
    /// URL/path-carrying spoof headers.
    HeadersUrl,
    /// Host-header vs. dialed-authority mismatches from recon data.
    HttpHost,
    /// Control-byte injection and request-line smuggling.
    NginxBypasses,
    /// Unicode characters that normalize back to path characters.
    UnicodePathNormalization,
    /// Control/punctuation bytes prefixed to path segments.
    PathPrefix,
}

impl BypassModule {
    /// Every module, in scan order.
    pub const ALL: &'static [Self] = &[
        Self::DumbCheck,
        Self::MidPaths,
        Self::EndPaths,
        Self::HttpMethods,
        Self::CaseSubstitution,
        Self::CharEncode,
        Self::HeadersScheme,
        Self::HeadersIp,
        Self::HeadersPort,
        Self::HeadersUrl,
        Self::HttpHost,
        Self::NginxBypasses,
        Self::UnicodePathNormalization,
        Self::PathPrefix,
    ];

    /// Stable module name, as used in tokens and reports.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::DumbCheck => "dumb_check",
            Self::MidPaths => "mid_paths",
            Self::EndPaths => "end_paths",
            Self::HttpMethods => "http_methods",
            Self::CaseSubstitution => "case_substitution",
            Self::CharEncode => "char_encode",
            Self::HeadersScheme => "http_headers_scheme",
            Self::HeadersIp => "http_headers_ip",
            Self::HeadersPort => "http_headers_port",
            Self::HeadersUrl => "http_headers_url",
            Self::HttpHost => "http_host",
            Self::NginxBypasses => "nginx_bypasses",
            Self::UnicodePathNormalization => "unicode_path_normalization",
            Self::PathPrefix => "path_prefix",
        }
    }

    /// Resolve a selector name.
    ///
    /// # Errors
    ///
    /// [`ModuleError::UnknownModule`] when `name` matches nothing.
    pub fn from_name(name: &str) -> Result<Self, ModuleError> {
        Self::ALL
            .iter()
            .copied()
            .find(|module| module.name() == name)
            .ok_or_else(|| ModuleError::UnknownModule(name.to_owned()))
    }

    /// True for modules whose payloads spoof request headers. The request
    /// builder sends `Connection: close` for these.
    #[must_use]
    pub fn spoofs_headers(self) -> bool {
        matches!(
            self,
            Self::HeadersScheme | Self::HeadersIp | Self::HeadersPort | Self::HeadersUrl
        )
    }

    /// True for the module that plays games with the `Host:` header and the
    /// dialed authority.
    #[must_use]
    pub fn is_host_module(self) -> bool {
        matches!(self, Self::HttpHost)
    }

    /// Run the generator. Infallible: a module with nothing to mutate (no
    /// recon entry, no applicable characters) emits an empty list.
    #[must_use]
    pub fn generate(self, ctx: &GenerationContext) -> Vec<RequestDescriptor> {
        let descriptors = match self {
            Self::DumbCheck => generators::dumb_check::generate(ctx),
            Self::MidPaths => generators::mid_paths::generate(ctx),
            Self::EndPaths => generators::end_paths::generate(ctx),
            Self::HttpMethods => generators::http_methods::generate(ctx),
            Self::CaseSubstitution => generators::case_substitution::generate(ctx),
            Self::CharEncode => generators::char_encode::generate(ctx),
            Self::HeadersScheme => generators::headers_scheme::generate(ctx),
            Self::HeadersIp => generators::headers_ip::generate(ctx),
            Self::HeadersPort => generators::headers_port::generate(ctx),
            Self::HeadersUrl => generators::headers_url::generate(ctx),
            Self::HttpHost => generators::http_host::generate(ctx),
            Self::NginxBypasses => generators::nginx_bypasses::generate(ctx),
            Self::UnicodePathNormalization => generators::unicode_norm::generate(ctx),
            Self::PathPrefix => generators::path_prefix::generate(ctx),
        };
        tracing::debug!(module = self.name(), count = descriptors.len(), "payloads generated");
        descriptors
    }
}
