//! `tbdl run`: resolve a share link and download the video.

use anyhow::Result;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tbdl_core::checksum;
use tbdl_core::config::TbdlConfig;
use tbdl_core::downloader::Downloader;
use tbdl_core::pipeline::run_share;
use tbdl_core::progress::ProgressStats;
use tbdl_core::resolver::LinkResolver;
use tbdl_core::share_link::ShareLink;
use tbdl_core::size::format_size;
use tbdl_core::TbdlError;

use crate::cli::progress::spawn_renderer;
use crate::cli::ShareFailure;

/// How long Ctrl-C waits for the browser and `.part` cleanup before giving up.
const INTERRUPT_GRACE: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct RunArgs {
    pub url: String,
    pub output: Option<PathBuf>,
    pub overwrite: bool,
    pub headful: bool,
    pub sha256: bool,
}

pub async fn run_share_command(mut cfg: TbdlConfig, args: RunArgs) -> Result<()> {
    let link = ShareLink::parse_with_hosts(&args.url, &cfg.resolver.extra_hosts)
        .map_err(|e| ShareFailure::new(&args.url, e))?;
    if args.headful {
        cfg.browser.headless = false;
    }
    let dest_dir = args.output.clone().unwrap_or_else(|| cfg.output_dir.clone());
    let resolver = LinkResolver::from_config(&cfg);
    let downloader = Downloader::from_config(&cfg).with_overwrite(args.overwrite || cfg.download.overwrite);

    let abort = Arc::new(AtomicBool::new(false));
    let (progress_tx, progress_rx) = tokio::sync::mpsc::channel::<ProgressStats>(16);
    let renderer = spawn_renderer("resolving share link", progress_rx);

    let outcome = {
        let pipeline = run_share(
            &resolver,
            &downloader,
            &link,
            &dest_dir,
            Some(progress_tx),
            Arc::clone(&abort),
        );
        tokio::pin!(pipeline);
        tokio::select! {
            res = &mut pipeline => res,
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupt received, cleaning up");
                eprintln!("interrupted, cleaning up...");
                abort.store(true, Ordering::SeqCst);
                tokio::time::timeout(INTERRUPT_GRACE, &mut pipeline)
                    .await
                    .unwrap_or(Err(TbdlError::Interrupted))
            }
        }
    };
    let _ = renderer.await;

    let (media, result) = outcome.map_err(|e| ShareFailure::new(link.as_str(), e))?;
    println!(
        "Saved {} ({}) to {}",
        media.display_name,
        format_size(result.bytes_written),
        result.file_path.display()
    );
    if args.sha256 {
        let path = result.file_path.clone();
        let digest = tokio::task::spawn_blocking(move || checksum::sha256_path(&path)).await??;
        println!("{}  {}", digest, result.file_path.display());
    }
    Ok(())
}
