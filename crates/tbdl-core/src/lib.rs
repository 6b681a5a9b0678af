pub mod config;
pub mod error;
pub mod logging;

// Resolution
pub mod browser;
pub mod extract;
pub mod resolver;
pub mod share_api;
pub mod share_link;

// Transfer
pub mod downloader;
pub mod filename;
pub mod progress;
pub mod size;
pub mod storage;

pub mod checksum;
pub mod pipeline;

pub use error::{FailureKind, TbdlError};
