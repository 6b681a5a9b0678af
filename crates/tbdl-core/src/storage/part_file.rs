//! Sequential writer for an in-progress download.

use anyhow::{Context, Result};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
#[cfg(unix)]
use std::os::unix::io::AsRawFd;

use super::temp_path;

/// An open `.part` file. Bytes are appended in order; `finalize` renames it to
/// the final name. Dropping an unfinalized `PartFile` closes and removes it.
pub struct PartFile {
    file: Option<File>,
    temp_path: PathBuf,
    final_path: PathBuf,
    written: u64,
}

impl PartFile {
    /// Create (or truncate) `<final_path>.part`.
    pub fn create(final_path: &Path) -> Result<Self> {
        let temp_path = temp_path(final_path);
        let file = File::options()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_path)
            .with_context(|| format!("failed to create temp file: {}", temp_path.display()))?;
        Ok(PartFile {
            file: Some(file),
            temp_path,
            final_path: final_path.to_path_buf(),
            written: 0,
        })
    }

    /// Reserve `size` bytes up front. On Unix tries `posix_fallocate` so a full
    /// disk fails here instead of mid-transfer; falls back to `set_len`.
    pub fn preallocate(&mut self, size: u64) -> Result<()> {
        let file = self.file.as_mut().context("part file already closed")?;
        #[cfg(unix)]
        {
            let fd = file.as_raw_fd();
            let r = unsafe { libc::posix_fallocate(fd, 0, size as libc::off_t) };
            if r == 0 {
                return Ok(());
            }
            tracing::debug!(errno = r, "posix_fallocate failed, falling back to set_len");
        }
        file.set_len(size).context("failed to preallocate file")?;
        Ok(())
    }

    /// Append `data` at the current end of the written region.
    pub fn write(&mut self, data: &[u8]) -> Result<()> {
        let file = self.file.as_mut().context("part file already closed")?;
        file.write_all(data)
            .with_context(|| format!("write to {} failed", self.temp_path.display()))?;
        self.written += data.len() as u64;
        Ok(())
    }

    pub fn written(&self) -> u64 {
        self.written
    }

    pub fn temp_path(&self) -> &Path {
        &self.temp_path
    }

    /// Trim any preallocated tail, fsync, and atomically rename to the final path.
    pub fn finalize(mut self) -> Result<PathBuf> {
        let file = self
            .file
            .take()
            .context("part file already closed")?;
        file.set_len(self.written)
            .context("failed to trim temp file")?;
        file.sync_all().context("storage sync failed")?;
        drop(file);

        std::fs::rename(&self.temp_path, &self.final_path).with_context(|| {
            format!(
                "failed to rename {} to {}",
                self.temp_path.display(),
                self.final_path.display()
            )
        })?;
        // Renamed away: nothing left for Drop to remove.
        self.temp_path = PathBuf::new();
        Ok(self.final_path.clone())
    }
}

impl Drop for PartFile {
    fn drop(&mut self) {
        drop(self.file.take());
        if self.temp_path.as_os_str().is_empty() {
            return;
        }
        match std::fs::remove_file(&self.temp_path) {
            Ok(()) => tracing::debug!(path = %self.temp_path.display(), "removed partial download"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(
                path = %self.temp_path.display(),
                "could not remove partial download: {}",
                e
            ),
        }
    }
}
