//! Client configuration.
//!
//! One options block per client instance, held under a readers-writers lock
//! in [`crate::HttpClient`]; the dispatch hot path takes the read side.

use std::{collections::HashSet, time::Duration};

/// Extra room on top of the preview size so status line and headers never
/// eat into the preview budget.
pub const PREVIEW_HEADROOM: usize = 8 * 1024;

/// Hard cap multiplier for whole-body (non-streaming) reads.
const WHOLE_BODY_MULTIPLIER: usize = 16;

/// Tunables for one client instance.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// TCP dial (and TLS handshake) deadline.
    pub dial_timeout: Duration,
    /// Request write deadline.
    pub write_timeout: Duration,
    /// Response read deadline.
    pub read_timeout: Duration,
    /// Pause before every request.
    pub request_delay: Duration,
    /// Pause between retry attempts.
    pub retry_delay: Duration,
    /// Retry attempts after the initial send.
    pub max_retries: u32,
    /// Consecutive retry-exhausted failures per target before the breaker
    /// opens.
    pub max_consecutive_fails: u32,
    /// Response body preview size handed to the processor.
    pub preview_size: usize,
    /// Upper bound on concurrent in-flight requests per pool.
    pub max_workers: usize,
    /// Idle connections kept per (scheme, host).
    pub max_conns_per_host: usize,
    /// Global keep-alive switch. Off forces `Connection: close` everywhere.
    pub keepalive: bool,
    /// Upstream HTTP proxy authority (`host:port`), if any.
    pub proxy: Option<String>,
    /// Client-wide custom headers, sent unless a payload overrides them.
    pub custom_headers: Vec<(String, String)>,
    /// Emit the debug-token header on every request.
    pub debug_tokens: bool,
    /// Module-level override: the current module spoofs `Host` or other
    /// headers, so connections must not be reused across payloads.
    pub force_close: bool,
    /// Status codes that count as hits. Empty means everything matches.
    pub match_codes: HashSet<u16>,
    /// Status codes that arm the auto-throttle.
    pub throttle_codes: HashSet<u16>,
    /// `User-Agent` sent when no payload or custom header supplies one.
    pub user_agent: String,
}

impl Default for ClientOptions {
    fn default() -> Self {
        let max_workers = 15;
        Self {
            dial_timeout: Duration::from_secs(15),
            write_timeout: Duration::from_secs(15),
            read_timeout: Duration::from_secs(15),
            request_delay: Duration::from_millis(150),
            retry_delay: Duration::from_millis(500),
            max_retries: 2,
            max_consecutive_fails: 15,
            preview_size: 1024,
            max_workers,
            max_conns_per_host: max_workers + max_workers / 2,
            keepalive: true,
            proxy: None,
            custom_headers: Vec::new(),
            debug_tokens: false,
            force_close: false,
            match_codes: HashSet::from([200]),
            throttle_codes: HashSet::from([429, 503]),
            user_agent: concat!("gatecrash/", env!("CARGO_PKG_VERSION")).to_owned(),
        }
    }
}

impl ClientOptions {
    /// Bounded streaming read: headers plus preview always fit.
    #[must_use]
    pub fn max_body_read(&self) -> usize {
        self.preview_size + PREVIEW_HEADROOM
    }

    /// Hard cap for whole-body reads in the no-streaming retry path.
    #[must_use]
    pub fn max_whole_body(&self) -> usize {
        self.max_body_read() * WHOLE_BODY_MULTIPLIER
    }

    /// Set worker count, keeping the connection pool invariant
    /// `max_conns_per_host >= max_workers + max_workers / 2`.
    pub fn set_max_workers(&mut self, workers: usize) {
        self.max_workers = workers.max(1);
        self.max_conns_per_host = self.max_conns_per_host.max(self.max_workers + self.max_workers / 2);
    }

    /// Whether connections should close after each exchange.
    #[must_use]
    pub fn wants_close(&self) -> bool {
        !self.keepalive || self.proxy.is_some() || self.force_close
    }
}
