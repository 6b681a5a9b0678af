//! Downloader: streams a resolved media URL into the destination directory.
//!
//! The blocking libcurl transfer runs on `spawn_blocking`; a ticker task
//! samples the shared byte counter and reports `ProgressStats` meanwhile.
//! Bytes land in `<name>.part`, renamed only after the size check passes.

mod transfer;

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::{DownloadConfig, TbdlConfig};
use crate::error::TbdlError;
use crate::filename::derive_filename;
use crate::progress::ProgressStats;
use crate::resolver::ResolvedMedia;
use crate::storage::PartFile;
use transfer::{fetch_into, CurlOptions};

/// How often the ticker samples the byte counter.
const PROGRESS_INTERVAL: Duration = Duration::from_millis(200);

/// Outcome of a completed download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadResult {
    pub file_path: PathBuf,
    pub bytes_written: u64,
    /// True when the stream completed and matched the expected size (if any).
    pub succeeded: bool,
}

/// Streams `ResolvedMedia` to disk.
#[derive(Debug, Clone)]
pub struct Downloader {
    config: DownloadConfig,
    user_agent: String,
}

impl Downloader {
    pub fn new(config: DownloadConfig, user_agent: impl Into<String>) -> Self {
        Self {
            config,
            user_agent: user_agent.into(),
        }
    }

    pub fn from_config(cfg: &TbdlConfig) -> Self {
        Self::new(cfg.download.clone(), cfg.browser.user_agent.clone())
    }

    /// Replace an existing file with the same name instead of failing.
    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.config.overwrite = overwrite;
        self
    }

    /// Downloads `media` into `dest_dir`. On any error the `.part` file is
    /// removed and no file carries the final name.
    pub async fn download(
        &self,
        media: &ResolvedMedia,
        dest_dir: &Path,
        progress: Option<mpsc::Sender<ProgressStats>>,
        abort: Arc<AtomicBool>,
    ) -> Result<DownloadResult, TbdlError> {
        prepare_destination(dest_dir)?;

        let final_path = dest_dir.join(derive_filename(&media.display_name));
        if final_path.exists() {
            if !self.config.overwrite {
                return Err(TbdlError::destination(
                    &final_path,
                    "file already exists (use --overwrite to replace it)",
                ));
            }
            tracing::info!(path = %final_path.display(), "overwriting existing file");
        }

        let mut part = PartFile::create(&final_path)
            .map_err(|e| TbdlError::destination(dest_dir, format!("{:#}", e)))?;
        if let Some(size) = media.expected_bytes {
            part.preallocate(size)
                .map_err(|e| TbdlError::destination(&final_path, format!("{:#}", e)))?;
        }

        tracing::info!(
            path = %final_path.display(),
            expected_bytes = ?media.expected_bytes,
            "starting download"
        );

        let started = Instant::now();
        let counter = Arc::new(AtomicU64::new(0));
        let ticker = progress.clone().map(|tx| {
            spawn_ticker(Arc::clone(&counter), media.expected_bytes, started, tx)
        });
        // If this future is dropped mid-transfer, the guard stops the ticker
        // and the blocking transfer, whose `PartFile` drop removes `.part`.
        let mut guard = TransferGuard::new(ticker, Arc::clone(&abort));

        let url = media.direct_url.clone();
        let headers = media.headers.clone();
        let opts = self.curl_options();
        let counter_bg = Arc::clone(&counter);
        let joined = tokio::task::spawn_blocking(move || {
            let outcome = fetch_into(&url, &headers, &mut part, &counter_bg, &abort, &opts);
            (part, outcome)
        })
        .await;
        guard.complete();

        let (part, outcome) = joined.map_err(|e| TbdlError::Transport {
            reason: format!("download task: {}", e),
            bytes_written: counter.load(Ordering::Relaxed),
        })?;

        if let Some(tx) = &progress {
            let _ = tx
                .send(ProgressStats {
                    bytes_done: part.written(),
                    total_bytes: media.expected_bytes,
                    elapsed_secs: started.elapsed().as_secs_f64(),
                })
                .await;
        }

        let bytes_written = outcome?;
        if let Some(expected) = media.expected_bytes {
            if bytes_written != expected {
                tracing::warn!(expected, actual = bytes_written, "size mismatch");
                return Err(TbdlError::SizeMismatch {
                    expected,
                    actual: bytes_written,
                });
            }
        }

        let file_path = part
            .finalize()
            .map_err(|e| TbdlError::destination(&final_path, format!("{:#}", e)))?;
        tracing::info!(
            path = %file_path.display(),
            bytes = bytes_written,
            elapsed_secs = started.elapsed().as_secs_f64(),
            "download complete"
        );
        Ok(DownloadResult {
            file_path,
            bytes_written,
            succeeded: true,
        })
    }

    fn curl_options(&self) -> CurlOptions {
        CurlOptions {
            connect_timeout: Duration::from_secs(self.config.connect_timeout_secs),
            low_speed_limit: self.config.low_speed_limit,
            low_speed_time: Duration::from_secs(self.config.low_speed_time_secs),
            buffer_size: self.config.buffer_size,
            user_agent: self.user_agent.clone(),
        }
    }
}

/// Owns the background work of one transfer while `download` awaits it.
/// Dropping it before `complete` raises the abort flag; either way the
/// progress ticker is stopped so its sender clone goes away.
struct TransferGuard {
    ticker: Option<JoinHandle<()>>,
    abort: Arc<AtomicBool>,
    completed: bool,
}

impl TransferGuard {
    fn new(ticker: Option<JoinHandle<()>>, abort: Arc<AtomicBool>) -> Self {
        Self {
            ticker,
            abort,
            completed: false,
        }
    }

    /// The blocking transfer has returned; only the ticker needs stopping.
    fn complete(&mut self) {
        self.completed = true;
        self.stop_ticker();
    }

    fn stop_ticker(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
    }
}

impl Drop for TransferGuard {
    fn drop(&mut self) {
        self.stop_ticker();
        if !self.completed {
            tracing::info!("download dropped mid-transfer, aborting");
            self.abort.store(true, Ordering::Relaxed);
        }
    }
}

/// Creates `dir` when absent and rejects anything that is not a writable directory.
fn prepare_destination(dir: &Path) -> Result<(), TbdlError> {
    std::fs::create_dir_all(dir).map_err(|e| TbdlError::destination(dir, e))?;
    let meta = std::fs::metadata(dir).map_err(|e| TbdlError::destination(dir, e))?;
    if !meta.is_dir() {
        return Err(TbdlError::destination(dir, "not a directory"));
    }
    if meta.permissions().readonly() {
        return Err(TbdlError::destination(dir, "directory is read-only"));
    }
    Ok(())
}

fn spawn_ticker(
    counter: Arc<AtomicU64>,
    total_bytes: Option<u64>,
    started: Instant,
    tx: mpsc::Sender<ProgressStats>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(PROGRESS_INTERVAL);
        loop {
            interval.tick().await;
            let stats = ProgressStats {
                bytes_done: counter.load(Ordering::Relaxed),
                total_bytes,
                elapsed_secs: started.elapsed().as_secs_f64(),
            };
            match tx.try_send(stats) {
                Ok(()) | Err(mpsc::error::TrySendError::Full(_)) => {}
                Err(mpsc::error::TrySendError::Closed(_)) => break,
            }
        }
    })
}
