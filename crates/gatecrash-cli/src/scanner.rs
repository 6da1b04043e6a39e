//! Scan orchestration.
//!
//! The top-level loop: for each target, for each enabled module, generate
//! eagerly, dispatch through a fresh pool with per-module client options,
//! and drain matching hits into the sink. An exhausted target aborts only
//! the current (target, module) pair; an unparsable target is logged and
//! skipped. Nothing here aborts the whole scan.

use std::sync::Arc;

use gatecrash_client::{ClientOptions, HttpClient, RequestPool};
use gatecrash_modules::{BypassModule, GenerationContext, RawUrl};

use crate::{config::ScanConfig, sink::ResultSink};

/// Counters accumulated over a whole scan.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ScanSummary {
    /// Targets that parsed and were scanned.
    pub targets: usize,
    /// Descriptors produced by all generators.
    pub generated: u64,
    /// Requests actually dispatched.
    pub dispatched: u64,
    /// Hits reported to the sink.
    pub matched: u64,
    /// (target, module) pairs aborted by the failure breaker.
    pub exhausted_pairs: u64,
}

/// Run the scan described by `config`, reporting hits into `sink`.
pub async fn run(config: &ScanConfig, sink: &mut ResultSink) -> ScanSummary {
    let mut summary = ScanSummary::default();

    for target in &config.targets {
        let parsed = match RawUrl::parse(target) {
            Ok(parsed) => parsed,
            Err(error) => {
                tracing::warn!(target = %target, error = %error, "skipping unparsable target");
                continue;
            },
        };
        summary.targets += 1;

        let mut ctx = GenerationContext::new(
            parsed,
            target,
            Arc::clone(&config.wordlists),
            Arc::clone(&config.recon),
        );
        ctx.spoof_headers.clone_from(&config.spoof_headers);
        ctx.spoof_ips.clone_from(&config.spoof_ips);

        for module in &config.modules {
            let descriptors = module.generate(&ctx);
            let generated = descriptors.len() as u64;
            summary.generated += generated;
            if descriptors.is_empty() {
                tracing::debug!(target = %target, module = module.name(), "no payloads generated");
                continue;
            }

            let client = Arc::new(HttpClient::new(client_options(config, *module)));
            let pool = RequestPool::new(client);
            let (mut hits, driver) = pool.run(descriptors);

            let mut matched = 0u64;
            while let Some(hit) = hits.recv().await {
                sink.record(&hit);
                matched += 1;
            }
            summary.matched += matched;

            match driver.await {
                Ok(outcome) => {
                    summary.dispatched += outcome.dispatched;
                    if outcome.exhausted {
                        summary.exhausted_pairs += 1;
                        tracing::warn!(
                            target = %target,
                            module = module.name(),
                            "target exhausted, module aborted"
                        );
                    }
                    tracing::info!(
                        target = %target,
                        module = module.name(),
                        generated,
                        dispatched = outcome.dispatched,
                        matched,
                        "module finished"
                    );
                },
                Err(error) => {
                    tracing::error!(
                        target = %target,
                        module = module.name(),
                        error = %error,
                        "pool driver failed"
                    );
                },
            }
        }
    }

    sink.flush();
    summary
}

/// Per-module client options derived from the scan config. Host-header and
/// header-spoofing modules force connection-close: their payloads poison
/// keep-alive state.
fn client_options(config: &ScanConfig, module: BypassModule) -> ClientOptions {
    let mut options = ClientOptions {
        dial_timeout: config.timeout,
        write_timeout: config.timeout,
        read_timeout: config.timeout,
        request_delay: config.delay,
        max_retries: config.max_retries,
        proxy: config.proxy.clone(),
        custom_headers: config.custom_headers.clone(),
        debug_tokens: config.debug,
        force_close: module.spoofs_headers() || module.is_host_module(),
        match_codes: config.match_codes.clone(),
        ..ClientOptions::default()
    };
    options.set_max_workers(config.threads);
    options
}

#[cfg(test)]
mod tests {
    use std::{
        collections::HashSet,
        io::Write,
        sync::{Arc, Mutex},
        time::Duration,
    };

    use gatecrash_assets::{ReconCache, Wordlists};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    use super::*;

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if let Ok(mut inner) = self.0.lock() {
                inner.extend_from_slice(buf);
            }
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    async fn canned_server(response: &'static [u8]) -> std::net::SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            loop {
                let Ok((mut sock, _)) = listener.accept().await else { break };
                tokio::spawn(async move {
                    loop {
                        let mut buf = [0u8; 8192];
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

    fn test_config(target: String, modules: Vec<BypassModule>) -> ScanConfig {
        ScanConfig {
            targets: vec![target],
            modules,
            threads: 4,
            timeout: Duration::from_secs(2),
            delay: Duration::ZERO,
            max_retries: 0,
            match_codes: HashSet::from([200]),
            proxy: None,
            spoof_headers: Vec::new(),
            spoof_ips: Vec::new(),
            custom_headers: Vec::new(),
            wordlists: Arc::new(Wordlists::embedded()),
            recon: Arc::new(ReconCache::empty()),
            outdir: None,
            verbose: false,
            debug: false,
        }
    }

    #[tokio::test]
    async fn baseline_scan_end_to_end() {
        let addr = canned_server(b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\nok").await;
        let target = format!("http://127.0.0.1:{}/admin", addr.port());
        let config = test_config(target, vec![BypassModule::DumbCheck]);

        let buf = SharedBuf::default();
        let mut sink = ResultSink::new(Box::new(buf.clone()), None, false).unwrap();
        let summary = run(&config, &mut sink).await;

        assert_eq!(summary.targets, 1);
        assert_eq!(summary.generated, 1);
        assert_eq!(summary.dispatched, 1);
        assert_eq!(summary.matched, 1);
        assert_eq!(summary.exhausted_pairs, 0);

        let text = String::from_utf8(buf.0.lock().unwrap().clone()).unwrap();
        assert!(text.contains("module=dumb_check"));
    }

    #[tokio::test]
    async fn unparsable_targets_are_skipped_not_fatal() {
        let addr = canned_server(b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\n\r\n").await;
        let good = format!("http://127.0.0.1:{}/x", addr.port());
        let mut config = test_config(good, vec![BypassModule::DumbCheck]);
        config.targets.insert(0, "ftp://nope/".to_owned());

        let buf = SharedBuf::default();
        let mut sink = ResultSink::new(Box::new(buf), None, false).unwrap();
        let summary = run(&config, &mut sink).await;
        assert_eq!(summary.targets, 1, "only the parsable target counts");
        assert_eq!(summary.matched, 1);
    }

    #[tokio::test]
    async fn non_matching_scan_reports_nothing() {
        let addr = canned_server(b"HTTP/1.1 403 Forbidden\r\nContent-Length: 0\r\n\r\n").await;
        let target = format!("http://127.0.0.1:{}/a", addr.port());
        let config = test_config(target, vec![BypassModule::DumbCheck, BypassModule::HttpMethods]);

        let buf = SharedBuf::default();
        let mut sink = ResultSink::new(Box::new(buf.clone()), None, false).unwrap();
        let summary = run(&config, &mut sink).await;

        assert_eq!(summary.matched, 0);
        assert!(summary.dispatched > 1, "http_methods dispatches the whole method list");
        assert!(buf.0.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn recon_less_host_module_is_a_quiet_no_op() {
        let addr = canned_server(b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\n\r\n").await;
        let target = format!("http://127.0.0.1:{}/a", addr.port());
        let config = test_config(target, vec![BypassModule::HttpHost]);

        let buf = SharedBuf::default();
        let mut sink = ResultSink::new(Box::new(buf), None, false).unwrap();
        let summary = run(&config, &mut sink).await;
        assert_eq!(summary.generated, 0);
        assert_eq!(summary.dispatched, 0);
    }
}
