//! Resolve-then-download for one share link.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::downloader::{DownloadResult, Downloader};
use crate::error::TbdlError;
use crate::progress::ProgressStats;
use crate::resolver::{ResolvedMedia, Resolver};
use crate::share_link::ShareLink;

const ABORT_POLL: Duration = Duration::from_millis(100);

/// Resolves `link` and downloads the media into `dest_dir`.
///
/// Setting `abort` during resolution drops the resolving future, which
/// releases the browser; during the download it stops the transfer and
/// removes the `.part` file. Either way the result is `Interrupted`.
pub async fn run_share(
    resolver: &dyn Resolver,
    downloader: &Downloader,
    link: &ShareLink,
    dest_dir: &Path,
    progress: Option<mpsc::Sender<ProgressStats>>,
    abort: Arc<AtomicBool>,
) -> Result<(ResolvedMedia, DownloadResult), TbdlError> {
    let media = resolve_or_abort(resolver, link, &abort).await?;
    if abort.load(Ordering::Relaxed) {
        return Err(TbdlError::Interrupted);
    }
    let result = downloader.download(&media, dest_dir, progress, abort).await?;
    Ok((media, result))
}

/// Races `resolver.resolve` against the abort token.
pub async fn resolve_or_abort(
    resolver: &dyn Resolver,
    link: &ShareLink,
    abort: &AtomicBool,
) -> Result<ResolvedMedia, TbdlError> {
    tokio::select! {
        resolved = resolver.resolve(link) => resolved,
        _ = wait_for_abort(abort) => {
            tracing::info!(url = %link, "resolution cancelled");
            Err(TbdlError::Interrupted)
        }
    }
}

async fn wait_for_abort(abort: &AtomicBool) {
    while !abort.load(Ordering::Relaxed) {
        tokio::time::sleep(ABORT_POLL).await;
    }
}
