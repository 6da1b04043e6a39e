//! Result sink: success lines to the console, JSON-lines records on disk.
//!
//! Writes go through an owned `io::Write` handle so tests can capture them;
//! the binary hands in a locked stdout. A missing output directory is
//! created at startup (fatal on failure); per-record file errors are logged
//! and the record dropped, per the error-handling policy.

use std::{
    fs::{File, OpenOptions},
    io::Write,
    path::Path,
};

use gatecrash_client::ScanHit;

use crate::config::ConfigError;

/// Name of the JSON-lines record file inside the output directory.
pub const HITS_FILE: &str = "hits.jsonl";

/// Where matching responses end up.
pub struct ResultSink {
    console: Box<dyn Write + Send>,
    records: Option<File>,
    verbose: bool,
}

impl std::fmt::Debug for ResultSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultSink")
            .field("records", &self.records.is_some())
            .field("verbose", &self.verbose)
            .finish_non_exhaustive()
    }
}

impl ResultSink {
    /// Sink writing to `console`, and to `<outdir>/hits.jsonl` when an
    /// output directory is given.
    pub fn new(
        console: Box<dyn Write + Send>,
        outdir: Option<&Path>,
        verbose: bool,
    ) -> Result<Self, ConfigError> {
        let records = match outdir {
            Some(dir) => {
                std::fs::create_dir_all(dir)
                    .map_err(|source| ConfigError::Io { path: dir.to_path_buf(), source })?;
                let path = dir.join(HITS_FILE);
                let file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(&path)
                    .map_err(|source| ConfigError::Io { path, source })?;
                Some(file)
            },
            None => None,
        };
        Ok(Self { console, records, verbose })
    }

    /// Report one hit.
    pub fn record(&mut self, hit: &ScanHit) {
        let title = hit.title.as_deref().unwrap_or("");
        let size = hit
            .content_length
            .map_or_else(|| hit.preview_size.to_string(), |len| len.to_string());
        let line = format!(
            "[{}] [{}b] {} {}  module={} title={:?}",
            hit.status, size, hit.method, hit.url, hit.module, title
        );
        if writeln!(self.console, "{line}").is_err() {
            tracing::error!("console write failed, hit lost");
        }
        if self.verbose {
            let _ = writeln!(self.console, "    {}", hit.curl);
        }

        if let Some(file) = &mut self.records {
            match serde_json::to_string(hit) {
                Ok(json) => {
                    if let Err(error) = writeln!(file, "{json}") {
                        tracing::error!(error = %error, "hit record write failed");
                    }
                },
                Err(error) => tracing::error!(error = %error, "hit serialization failed"),
            }
        }
    }

    /// Flush the console stream.
    pub fn flush(&mut self) {
        let _ = self.console.flush();
        if let Some(file) = &mut self.records {
            let _ = file.flush();
        }
    }
}
