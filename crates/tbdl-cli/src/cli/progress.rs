//! Terminal progress: a spinner while resolving, then a byte bar (or a byte
//! spinner when the size is unknown) fed by the downloader's `ProgressStats`.

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use tbdl_core::progress::ProgressStats;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

const BAR_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})";
const BYTES_TEMPLATE: &str = "{spinner:.green} [{elapsed_precise}] {bytes} ({bytes_per_sec})";
const WAIT_TEMPLATE: &str = "{spinner:.green} {msg}";

pub struct DownloadProgress {
    bar: ProgressBar,
    started: bool,
}

impl DownloadProgress {
    /// Starts with a spinner showing `message` until the first stats arrive.
    pub fn waiting(message: &str) -> Self {
        let bar = ProgressBar::new_spinner();
        bar.set_style(style(WAIT_TEMPLATE, ProgressStyle::default_spinner()));
        bar.set_message(message.to_string());
        bar.enable_steady_tick(Duration::from_millis(120));
        Self {
            bar,
            started: false,
        }
    }

    pub fn update(&mut self, stats: &ProgressStats) {
        if !self.started {
            self.started = true;
            match stats.total_bytes {
                Some(total) => {
                    self.bar.set_style(
                        style(BAR_TEMPLATE, ProgressStyle::default_bar()).progress_chars("█▓▒░  "),
                    );
                    self.bar.set_length(total);
                }
                None => {
                    self.bar
                        .set_style(style(BYTES_TEMPLATE, ProgressStyle::default_spinner()));
                }
            }
        }
        self.bar.set_position(stats.bytes_done);
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

fn style(template: &str, fallback: ProgressStyle) -> ProgressStyle {
    ProgressStyle::with_template(template).unwrap_or(fallback)
}

/// Renders stats from `rx` until the sender side is dropped.
pub fn spawn_renderer(message: &str, mut rx: mpsc::Receiver<ProgressStats>) -> JoinHandle<()> {
    let mut progress = DownloadProgress::waiting(message);
    tokio::spawn(async move {
        while let Some(stats) = rx.recv().await {
            progress.update(&stats);
        }
        progress.finish();
    })
}
