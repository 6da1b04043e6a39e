//! Bounded-concurrency request worker pool.
//!
//! One pool per (target, module): descriptors go in, matching hits come out
//! of an mpsc channel that closes when every task has finished. Ordinary
//! per-request errors are logged and swallowed so the pool keeps moving;
//! the exhausted-target kind flips a watch channel that stops submission
//! and lets in-flight tasks drain. Emission order is whatever the network
//! makes it; consumers must not assume generation order.

use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Instant,
};

use gatecrash_payload::RequestDescriptor;
use tokio::{
    sync::{OwnedSemaphorePermit, Semaphore, mpsc, watch},
    task::JoinSet,
};

use crate::{client::HttpClient, processor::process_response, processor::ScanHit};

const HIT_CHANNEL_DEPTH: usize = 64;

/// Throughput counters shared with the progress UI. All atomics; snapshots
/// are taken without stopping the pool.
#[derive(Debug)]
pub struct PoolMetrics {
    started: Instant,
    submitted: AtomicU64,
    completed: AtomicU64,
    active: AtomicU64,
    waiting: AtomicU64,
    peak_rate_milli: AtomicU64,
}

/// Point-in-time view of a pool's throughput.
#[derive(Debug, Clone, Copy)]
pub struct MetricsSnapshot {
    /// Tasks currently inside `send`.
    pub active: u64,
    /// Tasks handed to the pool so far.
    pub submitted: u64,
    /// Tasks finished (success or swallowed error).
    pub completed: u64,
    /// Descriptors not yet submitted.
    pub waiting: u64,
    /// Submitted-per-second over the pool's lifetime.
    pub instant_rate: f64,
    /// Completed-per-second over the pool's lifetime.
    pub average_rate: f64,
    /// Highest completed-per-second observed.
    pub peak_rate: f64,
}

impl PoolMetrics {
    fn new() -> Self {
        Self {
            started: Instant::now(),
            submitted: AtomicU64::new(0),
            completed: AtomicU64::new(0),
            active: AtomicU64::new(0),
            waiting: AtomicU64::new(0),
            peak_rate_milli: AtomicU64::new(0),
        }
    }

    fn on_submit(&self) {
        self.submitted.fetch_add(1, Ordering::Relaxed);
        self.waiting.fetch_sub(1, Ordering::Relaxed);
    }

    fn on_start(&self) {
        self.active.fetch_add(1, Ordering::Relaxed);
    }

    fn on_finish(&self) {
        self.active.fetch_sub(1, Ordering::Relaxed);
        let completed = self.completed.fetch_add(1, Ordering::Relaxed) + 1;
        let elapsed = self.started.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            let rate_milli = (completed as f64 / elapsed * 1000.0) as u64;
            self.peak_rate_milli.fetch_max(rate_milli, Ordering::Relaxed);
        }
    }

    /// Current counters and rates.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        let elapsed = self.started.elapsed().as_secs_f64().max(f64::MIN_POSITIVE);
        let submitted = self.submitted.load(Ordering::Relaxed);
        let completed = self.completed.load(Ordering::Relaxed);
        MetricsSnapshot {
            active: self.active.load(Ordering::Relaxed),
            submitted,
            completed,
            waiting: self.waiting.load(Ordering::Relaxed),
            instant_rate: submitted as f64 / elapsed,
            average_rate: completed as f64 / elapsed,
            peak_rate: self.peak_rate_milli.load(Ordering::Relaxed) as f64 / 1000.0,
        }
    }
}

/// How a pool run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolOutcome {
    /// Requests actually dispatched.
    pub dispatched: u64,
    /// True when the consecutive-failure breaker cancelled the run.
    pub exhausted: bool,
}

/// Bounded-concurrency dispatcher over one shared [`HttpClient`].
#[derive(Debug)]
pub struct RequestPool {
    client: Arc<HttpClient>,
    metrics: Arc<PoolMetrics>,
    max_workers: usize,
}

impl RequestPool {
    /// Pool sized by the client's `max_workers`.
    #[must_use]
    pub fn new(client: Arc<HttpClient>) -> Self {
        let max_workers = client.options_snapshot().max_workers.max(1);
        Self { client, metrics: Arc::new(PoolMetrics::new()), max_workers }
    }

    /// Metrics handle for the progress UI.
    #[must_use]
    pub fn metrics(&self) -> Arc<PoolMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Dispatch every descriptor. Returns the hit stream and a handle
    /// resolving to the run's outcome; the stream closes when all tasks are
    /// done.
    #[must_use]
    pub fn run(
        &self,
        descriptors: Vec<RequestDescriptor>,
    ) -> (mpsc::Receiver<ScanHit>, tokio::task::JoinHandle<PoolOutcome>) {
        let (hit_tx, hit_rx) = mpsc::channel(HIT_CHANNEL_DEPTH);
        let client = Arc::clone(&self.client);
        let metrics = Arc::clone(&self.metrics);
        let max_workers = self.max_workers;

        let driver = tokio::spawn(async move {
            let semaphore = Arc::new(Semaphore::new(max_workers));
            let (cancel_tx, cancel_rx) = watch::channel(false);
            let cancel_tx = Arc::new(cancel_tx);
            let mut tasks = JoinSet::new();

            metrics.waiting.store(descriptors.len() as u64, Ordering::Relaxed);
            let mut cancelled = false;

            for descriptor in descriptors {
                if *cancel_rx.borrow() {
                    cancelled = true;
                    break;
                }
                let mut cancel_signal = cancel_rx.clone();
                let permit = tokio::select! {
                    permit = Arc::clone(&semaphore).acquire_owned() => {
                        match permit {
                            Ok(permit) => permit,
                            Err(_) => break,
                        }
                    },
                    _ = cancel_signal.changed() => {
                        cancelled = true;
                        break;
                    },
                };
                metrics.on_submit();
                tasks.spawn(dispatch_one(
                    permit,
                    descriptor,
                    Arc::clone(&client),
                    hit_tx.clone(),
                    Arc::clone(&metrics),
                    Arc::clone(&cancel_tx),
                    cancel_rx.clone(),
                ));
            }

            drop(hit_tx);
            while tasks.join_next().await.is_some() {}

            let exhausted = cancelled || *cancel_rx.borrow();
            PoolOutcome { dispatched: metrics.completed.load(Ordering::Relaxed), exhausted }
        });

        (hit_rx, driver)
    }
}

async fn dispatch_one(
    permit: OwnedSemaphorePermit,
    descriptor: RequestDescriptor,
    client: Arc<HttpClient>,
    hit_tx: mpsc::Sender<ScanHit>,
    metrics: Arc<PoolMetrics>,
    cancel_tx: Arc<watch::Sender<bool>>,
    cancel_rx: watch::Receiver<bool>,
) {
    let _permit = permit;
    if *cancel_rx.borrow() {
        metrics.on_start();
        metrics.on_finish();
        return;
    }

    metrics.on_start();
    let options = client.options_snapshot();
    let result = client.send(&descriptor).await;
    metrics.on_finish();

    match result {
        Ok(response) => {
            if let Some(hit) = process_response(&descriptor, &response, &options) {
                // receiver gone means the consumer stopped caring; fine
                let _ = hit_tx.send(hit).await;
            }
        },
        Err(error) if error.is_exhausted() => {
            let _ = cancel_tx.send(true);
        },
        Err(error) => {
            tracing::debug!(
                module = %descriptor.module,
                host = %descriptor.host,
                error = %error,
                "request failed"
            );
        },
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use gatecrash_payload::{RequestDescriptor, Scheme};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    use super::*;
    use crate::options::ClientOptions;

    async fn canned_server(response: &'static [u8]) -> std::net::SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            loop {
                let Ok((mut sock, _)) = listener.accept().await else { break };
                tokio::spawn(async move {
                    loop {
                        let mut buf = [0u8; 4096];
                        match sock.read(&mut buf).await {
                            Ok(0) | Err(_) => break,
                            Ok(_) => {
                                if sock.write_all(response).await.is_err() {
                                    break;
                                }
                            },
                        }
                    }
                });
            }
        });
        addr
    }

    fn options(max_fails: u32) -> ClientOptions {
        ClientOptions {
            dial_timeout: Duration::from_secs(2),
            write_timeout: Duration::from_secs(2),
            read_timeout: Duration::from_secs(2),
            request_delay: Duration::ZERO,
            retry_delay: Duration::from_millis(1),
            max_retries: 0,
            max_consecutive_fails: max_fails,
            max_workers: 4,
            ..ClientOptions::default()
        }
    }

    fn descriptors(addr: std::net::SocketAddr, n: usize) -> Vec<RequestDescriptor> {
        (0..n)
            .map(|i| {
                RequestDescriptor::get(
                    "http://test/x",
                    Scheme::Http,
                    &format!("127.0.0.1:{}", addr.port()),
                    &format!("/x{i}"),
                    "mid_paths",
                )
            })
            .collect()
    }

    #[tokio::test]
    async fn matching_hits_flow_out_and_channel_closes() {
        let addr = canned_server(b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\nok").await;
        let client = Arc::new(HttpClient::new(options(15)));
        let pool = RequestPool::new(Arc::clone(&client));

        let (mut hits, driver) = pool.run(descriptors(addr, 8));
        let mut count = 0;
        while hits.recv().await.is_some() {
            count += 1;
        }
        let outcome = driver.await.unwrap();
        assert_eq!(count, 8);
        assert_eq!(outcome.dispatched, 8);
        assert!(!outcome.exhausted);

        let snapshot = pool.metrics().snapshot();
        assert_eq!(snapshot.completed, 8);
        assert_eq!(snapshot.active, 0);
        assert_eq!(snapshot.waiting, 0);
    }

    #[tokio::test]
    async fn non_matching_statuses_are_dropped() {
        let addr = canned_server(b"HTTP/1.1 403 Forbidden\r\nContent-Length: 0\r\n\r\n").await;
        let client = Arc::new(HttpClient::new(options(15)));
        let pool = RequestPool::new(client);

        let (mut hits, driver) = pool.run(descriptors(addr, 4));
        assert!(hits.recv().await.is_none(), "403 must not match the default {{200}} set");
        let outcome = driver.await.unwrap();
        assert_eq!(outcome.dispatched, 4);
    }

    #[tokio::test]
    async fn breaker_cancels_the_pool() {
        // nothing listening: every dispatch fails immediately
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let mut opts = options(2);
        opts.max_workers = 1; // deterministic failure ordering
        let client = Arc::new(HttpClient::new(opts));
        let pool = RequestPool::new(client);

        let (mut hits, driver) = pool.run(descriptors(addr, 50));
        assert!(hits.recv().await.is_none());
        let outcome = driver.await.unwrap();
        assert!(outcome.exhausted, "breaker should cancel the run");
        assert!(outcome.dispatched < 50, "submission must stop early");
    }
}
