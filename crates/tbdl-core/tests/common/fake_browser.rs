//! Scripted browser for resolver tests.
//!
//! A `FakeLauncher` hands out sessions that serve one fixed page, optionally
//! behind an interstitial that clears when its continue control is clicked.
//! `BrowserStats` counts launches, explicit closes and releases (drops) so
//! tests can check that every session was let go.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tbdl_core::browser::{BrowserCookie, BrowserError, BrowserLauncher, BrowserSession};
use tbdl_core::config::SelectorConfig;

#[derive(Debug, Clone, Default)]
pub struct FakeElement {
    pub text: Option<String>,
    pub attributes: HashMap<String, String>,
}

/// The share page as the browser sees it once verification is passed.
#[derive(Debug, Clone, Default)]
pub struct FakePage {
    pub elements: HashMap<String, FakeElement>,
    pub html: String,
    pub cookies: Vec<BrowserCookie>,
}

impl FakePage {
    /// A page that shows `name` and `size` under the default selectors.
    pub fn with_file(name: &str, size: &str) -> Self {
        let selectors = SelectorConfig::default();
        Self::default()
            .text(&selectors.file_name, name)
            .text(&selectors.file_size, size)
    }

    pub fn text(mut self, selector: &str, text: &str) -> Self {
        self.elements.entry(selector.to_string()).or_default().text = Some(text.to_string());
        self
    }

    pub fn attribute(mut self, selector: &str, name: &str, value: &str) -> Self {
        self.elements
            .entry(selector.to_string())
            .or_default()
            .attributes
            .insert(name.to_string(), value.to_string());
        self
    }

    /// Direct link under the default anchor selector.
    pub fn direct_link(self, href: &str) -> Self {
        let selector = SelectorConfig::default().direct_link;
        self.attribute(&selector, "href", href)
    }

    pub fn html(mut self, html: &str) -> Self {
        self.html = html.to_string();
        self
    }

    pub fn cookie(mut self, name: &str, value: &str) -> Self {
        self.cookies.push(BrowserCookie {
            name: name.to_string(),
            value: value.to_string(),
            domain: ".terabox.com".to_string(),
        });
        self
    }
}

#[derive(Debug, Clone)]
pub struct Interstitial {
    /// Selector that marks the verification page.
    pub marker: String,
    /// Control that clears the page when clicked (if `passes_on_click`).
    pub continue_selector: String,
    pub passes_on_click: bool,
}

impl Interstitial {
    pub fn passing() -> Self {
        let selectors = SelectorConfig::default();
        Self {
            marker: selectors.verification[0].clone(),
            continue_selector: selectors.continue_button,
            passes_on_click: true,
        }
    }

    pub fn stuck() -> Self {
        Self {
            passes_on_click: false,
            ..Self::passing()
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Script {
    pub page: FakePage,
    pub interstitial: Option<Interstitial>,
    pub launch_error: Option<String>,
    pub navigate_error: Option<String>,
    pub navigate_delay: Duration,
}

#[derive(Debug, Default)]
pub struct BrowserStats {
    pub launches: AtomicUsize,
    pub closes: AtomicUsize,
    pub releases: AtomicUsize,
    pub clicks: AtomicUsize,
}

impl BrowserStats {
    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }

    pub fn clicks(&self) -> usize {
        self.clicks.load(Ordering::SeqCst)
    }
}

pub struct FakeLauncher {
    script: Script,
    pub stats: Arc<BrowserStats>,
}

impl FakeLauncher {
    pub fn new(script: Script) -> Arc<Self> {
        Arc::new(Self {
            script,
            stats: Arc::new(BrowserStats::default()),
        })
    }
}

#[async_trait]
impl BrowserLauncher for FakeLauncher {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>, BrowserError> {
        self.stats.launches.fetch_add(1, Ordering::SeqCst);
        if let Some(e) = &self.script.launch_error {
            return Err(BrowserError::new(e));
        }
        Ok(Box::new(FakeSession {
            verified: self.script.interstitial.is_none(),
            loaded: false,
            script: self.script.clone(),
            stats: Arc::clone(&self.stats),
        }))
    }
}

struct FakeSession {
    script: Script,
    loaded: bool,
    verified: bool,
    stats: Arc<BrowserStats>,
}

impl FakeSession {
    fn element(&self, selector: &str) -> Option<&FakeElement> {
        if !self.loaded || !self.verified {
            return None;
        }
        self.script.page.elements.get(selector)
    }

    fn present(&self, selector: &str) -> bool {
        if !self.loaded {
            return false;
        }
        if let (false, Some(gate)) = (self.verified, &self.script.interstitial) {
            return selector == gate.marker || selector == gate.continue_selector;
        }
        self.script.page.elements.contains_key(selector)
    }
}

#[async_trait]
impl BrowserSession for FakeSession {
    async fn navigate(&mut self, _url: &str) -> Result<(), BrowserError> {
        if !self.script.navigate_delay.is_zero() {
            tokio::time::sleep(self.script.navigate_delay).await;
        }
        if let Some(e) = &self.script.navigate_error {
            return Err(BrowserError::new(e));
        }
        self.loaded = true;
        Ok(())
    }

    async fn wait_for_selector(
        &mut self,
        selector: &str,
        timeout: Duration,
    ) -> Result<bool, BrowserError> {
        if self.present(selector) {
            return Ok(true);
        }
        tokio::time::sleep(timeout).await;
        Ok(self.present(selector))
    }

    async fn extract_text(&mut self, selector: &str) -> Result<Option<String>, BrowserError> {
        Ok(self.element(selector).and_then(|e| e.text.clone()))
    }

    async fn extract_attribute(
        &mut self,
        selector: &str,
        attribute: &str,
    ) -> Result<Option<String>, BrowserError> {
        Ok(self
            .element(selector)
            .and_then(|e| e.attributes.get(attribute).cloned()))
    }

    async fn click(&mut self, selector: &str) -> Result<(), BrowserError> {
        self.stats.clicks.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.script.interstitial {
            if selector == gate.continue_selector && gate.passes_on_click {
                self.verified = true;
            }
        }
        Ok(())
    }

    async fn content(&mut self) -> Result<String, BrowserError> {
        Ok(if self.loaded && self.verified {
            self.script.page.html.clone()
        } else {
            String::new()
        })
    }

    async fn cookies(&mut self) -> Result<Vec<BrowserCookie>, BrowserError> {
        Ok(self.script.page.cookies.clone())
    }

    async fn close(self: Box<Self>) -> Result<(), BrowserError> {
        self.stats.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl Drop for FakeSession {
    fn drop(&mut self) {
        self.stats.releases.fetch_add(1, Ordering::SeqCst);
    }
}
