//! The HTTP client: send-with-retry over the pooled transport, plus the
//! per-target consecutive-failure breaker.
//!
//! One client instance is shared by every worker of a (target, module)
//! pool. The options block sits behind a readers-writers lock; dispatches
//! take a snapshot up front so no lock is held across await points.

use std::{
    collections::HashMap,
    sync::{
        Arc, RwLock,
        atomic::{AtomicU32, Ordering},
    },
    time::Instant,
};

use gatecrash_payload::RequestDescriptor;
use tokio::io::AsyncWriteExt;

use crate::{
    builder::build_raw_request,
    errors::ClientError,
    options::ClientOptions,
    response::{RawResponse, read_response},
    retry::{RetryDecision, classify},
    throttle::AutoThrottle,
    transport::Transport,
};

/// Raw HTTP/1.1 client with pooling, retry, throttle, and breaker.
#[derive(Debug)]
pub struct HttpClient {
    options: RwLock<ClientOptions>,
    transport: Transport,
    throttle: AutoThrottle,
    failures: FailureTracker,
}

impl HttpClient {
    /// Client over `options`.
    #[must_use]
    pub fn new(options: ClientOptions) -> Self {
        let transport = Transport::new(options.max_conns_per_host);
        let throttle = AutoThrottle::new(options.throttle_codes.clone());
        Self {
            options: RwLock::new(options),
            transport,
            throttle,
            failures: FailureTracker::default(),
        }
    }

    /// Copy of the current options. Hot-path readers take the read lock
    /// briefly and never hold it across awaits.
    #[must_use]
    pub fn options_snapshot(&self) -> ClientOptions {
        match self.options.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Replace the options block (between modules, never mid-dispatch).
    pub fn set_options(&self, options: ClientOptions) {
        match self.options.write() {
            Ok(mut guard) => *guard = options,
            Err(poisoned) => *poisoned.into_inner() = options,
        }
    }

    /// Dispatch one descriptor: throttle pause, request delay, then up to
    /// `max_retries` attempts driven by the retry classifier.
    ///
    /// # Errors
    ///
    /// [`ClientError::TargetExhausted`] once the target's consecutive
    /// retry-exhausted count reaches the configured threshold; otherwise the
    /// final attempt's error.
    pub async fn send(&self, descriptor: &RequestDescriptor) -> Result<RawResponse, ClientError> {
        let options = self.options_snapshot();

        let failures_so_far = self.failures.count(&descriptor.host);
        if failures_so_far >= options.max_consecutive_fails {
            return Err(ClientError::TargetExhausted { failures: failures_so_far });
        }

        if let Some(delay) = self.throttle.current_delay() {
            tokio::time::sleep(delay).await;
        }
        if !options.request_delay.is_zero() {
            tokio::time::sleep(options.request_delay).await;
        }

        let mut force_close = false;
        let mut streaming = true;
        let mut attempt: u32 = 0;

        loop {
            match self.send_once(descriptor, &options, force_close, streaming).await {
                Ok(response) => {
                    self.failures.reset(&descriptor.host);
                    self.throttle.observe(response.status);
                    return Ok(response);
                },
                Err(error) => {
                    let decision = classify(&error);
                    attempt += 1;
                    let out_of_attempts = attempt > options.max_retries;
                    if decision == RetryDecision::No || out_of_attempts {
                        let failures = self.failures.record(&descriptor.host);
                        if failures >= options.max_consecutive_fails {
                            tracing::warn!(
                                host = %descriptor.host,
                                failures,
                                "consecutive-failure threshold reached"
                            );
                        }
                        return Err(error);
                    }
                    tracing::debug!(
                        host = %descriptor.host,
                        attempt,
                        ?decision,
                        error = %error,
                        "retrying request"
                    );
                    match decision {
                        RetryDecision::RetryWithClose => force_close = true,
                        RetryDecision::RetryWithoutStreaming => streaming = false,
                        RetryDecision::Retry | RetryDecision::No => {},
                    }
                    tokio::time::sleep(options.retry_delay).await;
                },
            }
        }
    }

    async fn send_once(
        &self,
        descriptor: &RequestDescriptor,
        options: &ClientOptions,
        force_close: bool,
        streaming: bool,
    ) -> Result<RawResponse, ClientError> {
        let built = build_raw_request(descriptor, options, force_close);

        let mut stream = self
            .transport
            .checkout(
                descriptor.scheme,
                &descriptor.host,
                options.dial_timeout,
                options.proxy.as_deref(),
            )
            .await?;

        let started = Instant::now();

        tokio::time::timeout(options.write_timeout, stream.write_all(&built.bytes))
            .await
            .map_err(|_| ClientError::WriteTimeout(options.write_timeout))?
            .map_err(ClientError::from_io)?;

        let max_body =
            if streaming { options.max_body_read() } else { options.max_whole_body() };
        let mut response =
            tokio::time::timeout(options.read_timeout, read_response(&mut stream, max_body, streaming))
                .await
                .map_err(|_| ClientError::ReadTimeout(options.read_timeout))??;
        response.elapsed_ms = started.elapsed().as_millis() as u64;

        let reusable = !built.should_close_conn && !response.truncated;
        if reusable {
            self.transport.checkin(descriptor.scheme, &descriptor.host, stream);
        }

        Ok(response)
    }
}

/// Consecutive-failure counters, one atomic per target host.
///
/// Reads take the map's read lock and then work lock-free on the counter;
/// the write lock is only taken to insert a host's counter once.
#[derive(Debug, Default)]
struct FailureTracker {
    counters: RwLock<HashMap<String, Arc<AtomicU32>>>,
}

impl FailureTracker {
    fn counter(&self, host: &str) -> Arc<AtomicU32> {
        if let Ok(map) = self.counters.read() {
            if let Some(counter) = map.get(host) {
                return Arc::clone(counter);
            }
        }
        let mut map = match self.counters.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        Arc::clone(map.entry(host.to_owned()).or_default())
    }

    fn count(&self, host: &str) -> u32 {
        self.counter(host).load(Ordering::Relaxed)
    }

    fn record(&self, host: &str) -> u32 {
        self.counter(host).fetch_add(1, Ordering::Relaxed) + 1
    }

    fn reset(&self, host: &str) {
        self.counter(host).store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use gatecrash_payload::Scheme;
    use tokio::io::{AsyncReadExt, AsyncWriteExt as _};

    use super::*;

    fn fast_options() -> ClientOptions {
        ClientOptions {
            dial_timeout: Duration::from_secs(2),
            write_timeout: Duration::from_secs(2),
            read_timeout: Duration::from_secs(2),
            request_delay: Duration::ZERO,
            retry_delay: Duration::from_millis(1),
            max_retries: 1,
            max_consecutive_fails: 3,
            ..ClientOptions::default()
        }
    }

    fn descriptor_for(addr: std::net::SocketAddr) -> RequestDescriptor {
        RequestDescriptor::get(
            "http://test/x",
            Scheme::Http,
            &format!("127.0.0.1:{}", addr.port()),
            "/x",
            "dumb_check",
        )
    }

    async fn one_shot_server(response: &'static [u8]) -> std::net::SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            loop {
                let Ok((mut sock, _)) = listener.accept().await else { break };
                tokio::spawn(async move {
                    let mut buf = [0u8; 4096];
                    let _ = sock.read(&mut buf).await;
                    let _ = sock.write_all(response).await;
                });
            }
        });
        addr
    }

    #[tokio::test]
    async fn send_round_trips_a_response() {
        let addr =
            one_shot_server(b"HTTP/1.1 403 Forbidden\r\nContent-Length: 2\r\n\r\nno").await;
        let client = HttpClient::new(fast_options());
        let response = client.send(&descriptor_for(addr)).await.unwrap();
        assert_eq!(response.status, 403);
        assert_eq!(response.body.as_ref(), b"no");
    }

    #[tokio::test]
    async fn breaker_opens_after_consecutive_failures() {
        // nothing listening: every dispatch fails without retrying usefully
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = HttpClient::new(fast_options());
        let descriptor = descriptor_for(addr);

        for _ in 0..3 {
            let err = client.send(&descriptor).await.unwrap_err();
            assert!(!err.is_exhausted(), "breaker must not open early: {err}");
        }
        let err = client.send(&descriptor).await.unwrap_err();
        assert!(err.is_exhausted(), "expected exhausted, got {err}");
    }

    #[tokio::test]
    async fn success_resets_the_breaker() {
        let addr = one_shot_server(b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\n\r\n").await;
        let client = HttpClient::new(fast_options());
        let descriptor = descriptor_for(addr);

        // two failures against a dead port on the same host string
        let dead = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let dead_addr = dead.local_addr().unwrap();
        drop(dead);
        let dead_descriptor = descriptor_for(dead_addr);
        let _ = client.send(&dead_descriptor).await;
        let _ = client.send(&dead_descriptor).await;

        // a success on the live host resets only that host's counter
        let response = client.send(&descriptor).await.unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(client.failures.count(&descriptor.host), 0);
        assert_eq!(client.failures.count(&dead_descriptor.host), 2);
    }
}
