//! Failure taxonomy for one resolve-and-download invocation.
//!
//! Every variant is terminal for the run. `FailureKind` is the stable,
//! user-facing name of a variant and decides the process exit code.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Errors produced by the link resolver, the downloader, and the pipeline.
#[derive(Debug, Error)]
pub enum TbdlError {
    #[error("invalid share URL {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("could not load share page: {0}")]
    PageLoad(String),

    #[error("verification page could not be passed: {0}")]
    VerificationFailed(String),

    #[error("could not extract media from share page: {0}")]
    Extraction(String),

    #[error("destination {}: {reason}", path.display())]
    Destination { path: PathBuf, reason: String },

    #[error("transfer failed after {bytes_written} bytes: {reason}")]
    Transport { reason: String, bytes_written: u64 },

    #[error("size mismatch: expected {expected} bytes, received {actual}")]
    SizeMismatch { expected: u64, actual: u64 },

    #[error("interrupted by user")]
    Interrupted,
}

/// Stable name of a failure, used in user-facing messages and exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    PageLoad,
    VerificationFailed,
    Extraction,
    Destination,
    Transport,
    SizeMismatch,
    Interrupted,
}

impl FailureKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FailureKind::InvalidUrl => "InvalidUrl",
            FailureKind::PageLoad => "PageLoad",
            FailureKind::VerificationFailed => "VerificationFailed",
            FailureKind::Extraction => "Extraction",
            FailureKind::Destination => "Destination",
            FailureKind::Transport => "Transport",
            FailureKind::SizeMismatch => "SizeMismatch",
            FailureKind::Interrupted => "Interrupted",
        }
    }

    /// Process exit code for this failure. 0 is reserved for success and 1 for
    /// errors outside the pipeline (config, logging).
    pub fn exit_code(self) -> i32 {
        match self {
            FailureKind::InvalidUrl => 2,
            FailureKind::PageLoad => 3,
            FailureKind::VerificationFailed => 4,
            FailureKind::Extraction => 5,
            FailureKind::Destination => 6,
            FailureKind::Transport => 7,
            FailureKind::SizeMismatch => 8,
            // 128 + SIGINT
            FailureKind::Interrupted => 130,
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TbdlError {
    pub fn kind(&self) -> FailureKind {
        match self {
            TbdlError::InvalidUrl { .. } => FailureKind::InvalidUrl,
            TbdlError::PageLoad(_) => FailureKind::PageLoad,
            TbdlError::VerificationFailed(_) => FailureKind::VerificationFailed,
            TbdlError::Extraction(_) => FailureKind::Extraction,
            TbdlError::Destination { .. } => FailureKind::Destination,
            TbdlError::Transport { .. } => FailureKind::Transport,
            TbdlError::SizeMismatch { .. } => FailureKind::SizeMismatch,
            TbdlError::Interrupted => FailureKind::Interrupted,
        }
    }

    pub fn exit_code(&self) -> i32 {
        self.kind().exit_code()
    }

    pub(crate) fn invalid_url(url: &str, reason: impl Into<String>) -> Self {
        TbdlError::InvalidUrl {
            url: url.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn destination(path: impl Into<PathBuf>, reason: impl fmt::Display) -> Self {
        TbdlError::Destination {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}
