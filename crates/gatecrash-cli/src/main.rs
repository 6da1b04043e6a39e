//! gatecrash binary.
//!
//! # Usage
//!
//! ```bash
//! # Probe one restricted URL with every module
//! gatecrash --url https://target.example/admin
//!
//! # Specific modules, custom match set, recon-driven host probing
//! gatecrash --url https://target.example/admin \
//!     --module mid_paths,http_host --match-codes 200,302 \
//!     --recon-cache recon.json --outdir findings/
//! ```

use std::{path::PathBuf, sync::Arc, time::Duration};

use clap::Parser;
use gatecrash_assets::{ReconCache, Wordlists};
use gatecrash_cli::{ResultSink, ScanConfig, config};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// HTTP authorization-bypass fuzzer
#[derive(Parser, Debug)]
#[command(name = "gatecrash")]
#[command(about = "Probe 401/403 responses with proxy/origin disagreement payloads")]
#[command(version)]
struct Args {
    /// Target URL
    #[arg(short, long)]
    url: Option<String>,

    /// File with one target URL per line
    #[arg(long)]
    urls_file: Option<PathBuf>,

    /// File of hosts substituted into every target's authority
    #[arg(long)]
    substitute_hosts_file: Option<PathBuf>,

    /// Output directory for JSON-lines hit records
    #[arg(short, long)]
    outdir: Option<PathBuf>,

    /// Concurrent workers per (target, module) pool
    #[arg(short, long, default_value = "15")]
    threads: usize,

    /// Dial/read/write timeout in seconds
    #[arg(long, default_value = "15")]
    timeout: u64,

    /// Delay before each request, in milliseconds
    #[arg(long, default_value = "150")]
    delay: u64,

    /// Status codes reported as hits: comma-separated 100-599, or "all"
    #[arg(long, default_value = "200")]
    match_codes: String,

    /// Upstream HTTP proxy (host:port)
    #[arg(long)]
    proxy: Option<String>,

    /// Extra spoofable header name for http_headers_ip (repeatable)
    #[arg(long = "spoof-header")]
    spoof_headers: Vec<String>,

    /// Extra spoof IP for http_headers_ip (repeatable)
    #[arg(long = "spoof-ip")]
    spoof_ips: Vec<String>,

    /// Custom "Name: Value" header sent on every request (repeatable)
    #[arg(long = "header")]
    headers: Vec<String>,

    /// Recon cache JSON produced by the reconnaissance service
    #[arg(long)]
    recon_cache: Option<PathBuf>,

    /// Directory overlaying the embedded wordlists
    #[arg(long)]
    wordlist_dir: Option<PathBuf>,

    /// Modules to run: comma-separated names, or "all"
    #[arg(short, long, default_value = "all")]
    module: String,

    /// Retry attempts per request
    #[arg(long, default_value = "2")]
    max_retries: u32,

    /// Print reproducer commands with each hit, debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Debug mode: send X-GB403-Token headers, trace logging
    #[arg(long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let level = if args.debug {
        "trace"
    } else if args.verbose {
        "debug"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry().with(fmt::layer().with_writer(std::io::stderr)).with(filter).init();

    let mut targets = Vec::new();
    if let Some(url) = &args.url {
        targets.push(url.clone());
    }
    if let Some(path) = &args.urls_file {
        targets.extend(config::read_lines(path)?);
    }
    if targets.is_empty() {
        return Err(Box::new(gatecrash_cli::ConfigError::NoTargets) as Box<dyn std::error::Error>);
    }
    if let Some(path) = &args.substitute_hosts_file {
        let hosts = config::read_lines(path)?;
        targets = config::substitute_hosts(&targets, &hosts);
    }

    let wordlists = match &args.wordlist_dir {
        Some(dir) => Wordlists::with_overlay(dir)?,
        None => Wordlists::embedded(),
    };
    let recon = match &args.recon_cache {
        Some(path) => ReconCache::load(path)?,
        None => ReconCache::empty(),
    };

    let custom_headers = args
        .headers
        .iter()
        .map(|raw| config::parse_header(raw))
        .collect::<Result<Vec<_>, _>>()?;

    let scan = ScanConfig {
        targets,
        modules: config::parse_modules(&args.module)?,
        threads: args.threads.max(1),
        timeout: Duration::from_secs(args.timeout),
        delay: Duration::from_millis(args.delay),
        max_retries: args.max_retries,
        match_codes: config::parse_match_codes(&args.match_codes)?,
        proxy: args.proxy.clone(),
        spoof_headers: args.spoof_headers.clone(),
        spoof_ips: args.spoof_ips.clone(),
        custom_headers,
        wordlists: Arc::new(wordlists),
        recon: Arc::new(recon),
        outdir: args.outdir.clone(),
        verbose: args.verbose,
        debug: args.debug,
    };

    tracing::info!(
        targets = scan.targets.len(),
        modules = scan.modules.len(),
        threads = scan.threads,
        "scan starting"
    );

    let mut sink = ResultSink::new(
        Box::new(std::io::stdout()),
        scan.outdir.as_deref(),
        scan.verbose,
    )?;
    let summary = gatecrash_cli::run(&scan, &mut sink).await;

    tracing::info!(
        targets = summary.targets,
        generated = summary.generated,
        dispatched = summary.dispatched,
        matched = summary.matched,
        exhausted = summary.exhausted_pairs,
        "scan finished"
    );

    Ok(())
}
