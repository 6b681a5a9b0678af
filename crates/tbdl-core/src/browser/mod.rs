//! Browser capability used by the link resolver.
//!
//! The resolver only talks to these traits, so its page logic runs the same
//! against headless Chromium (`chromium`) and against scripted fakes in tests.
//! Implementations must release the underlying browser when a session is
//! dropped without `close`, since a cancelled resolve never reaches `close`.

mod chromium;

pub use chromium::{ChromiumLauncher, ChromiumSession};

use async_trait::async_trait;
use std::fmt;
use std::time::Duration;

/// Failure inside the browser driver. The resolver maps it onto the
/// `PageLoad`/`VerificationFailed`/`Extraction` taxonomy by the step it hit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowserError(pub String);

impl fmt::Display for BrowserError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for BrowserError {}

impl BrowserError {
    pub fn new(msg: impl fmt::Display) -> Self {
        BrowserError(msg.to_string())
    }
}

/// A cookie read from the browser context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowserCookie {
    pub name: String,
    pub value: String,
    pub domain: String,
}

/// One live browser page, exclusively owned by one resolve call.
#[async_trait]
pub trait BrowserSession: Send {
    /// Load `url` and wait for the navigation to settle.
    async fn navigate(&mut self, url: &str) -> Result<(), BrowserError>;

    /// Poll until `selector` matches an element or `timeout` passes.
    /// A zero timeout is a single presence check.
    async fn wait_for_selector(
        &mut self,
        selector: &str,
        timeout: Duration,
    ) -> Result<bool, BrowserError>;

    /// Text content of the first element matching `selector`.
    async fn extract_text(&mut self, selector: &str) -> Result<Option<String>, BrowserError>;

    /// Attribute value of the first element matching `selector`.
    async fn extract_attribute(
        &mut self,
        selector: &str,
        attribute: &str,
    ) -> Result<Option<String>, BrowserError>;

    async fn click(&mut self, selector: &str) -> Result<(), BrowserError>;

    /// Serialized HTML of the current document.
    async fn content(&mut self) -> Result<String, BrowserError>;

    async fn cookies(&mut self) -> Result<Vec<BrowserCookie>, BrowserError>;

    /// Shut the browser down and wait for it to exit.
    async fn close(self: Box<Self>) -> Result<(), BrowserError>;
}

/// Starts a fresh browser session per resolve call.
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>, BrowserError>;
}
