//! Headless Chromium over the DevTools protocol (`chromiumoxide`).

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig as CdpConfig};
use chromiumoxide::Page;
use futures::StreamExt;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

use super::{BrowserCookie, BrowserError, BrowserLauncher, BrowserSession};
use crate::config::BrowserConfig;

const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Launches one Chromium process per session.
#[derive(Debug, Clone)]
pub struct ChromiumLauncher {
    config: BrowserConfig,
}

impl ChromiumLauncher {
    pub fn new(config: BrowserConfig) -> Self {
        Self { config }
    }

    fn cdp_config(&self) -> Result<CdpConfig, BrowserError> {
        let cfg = &self.config;
        let mut builder = CdpConfig::builder()
            .window_size(cfg.window_width, cfg.window_height)
            .launch_timeout(Duration::from_secs(cfg.launch_timeout_secs))
            .arg(format!("--user-agent={}", cfg.user_agent));
        if !cfg.headless {
            builder = builder.with_head();
        }
        if cfg.no_sandbox {
            builder = builder.no_sandbox();
        }
        if let Some(exe) = &cfg.executable {
            builder = builder.chrome_executable(exe);
        }
        builder
            .build()
            .map_err(|e| BrowserError::new(format!("browser config: {}", e)))
    }
}

#[async_trait]
impl BrowserLauncher for ChromiumLauncher {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>, BrowserError> {
        let config = self.cdp_config()?;
        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| BrowserError::new(format!("launch chromium: {}", e)))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::debug!("devtools handler stopped: {}", e);
                    break;
                }
            }
        });

        // From here on the session owns the process, so every early return kills it.
        let mut session = ChromiumSession {
            browser,
            page: None,
            handler: handler_task,
        };
        let page = session
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| BrowserError::new(format!("open page: {}", e)))?;
        session.page = Some(page);
        tracing::debug!(headless = self.config.headless, "chromium session started");
        Ok(Box::new(session))
    }
}

/// A Chromium process plus its single page. Dropping it without `close`
/// aborts the event handler and lets `Browser`'s own drop kill the process.
pub struct ChromiumSession {
    browser: Browser,
    page: Option<Page>,
    handler: JoinHandle<()>,
}

impl ChromiumSession {
    fn page(&self) -> Result<&Page, BrowserError> {
        self.page
            .as_ref()
            .ok_or_else(|| BrowserError::new("page is not open"))
    }
}

#[async_trait]
impl BrowserSession for ChromiumSession {
    async fn navigate(&mut self, url: &str) -> Result<(), BrowserError> {
        self.page()?
            .goto(url)
            .await
            .map_err(|e| BrowserError::new(format!("navigate to {}: {}", url, e)))?;
        Ok(())
    }

    async fn wait_for_selector(
        &mut self,
        selector: &str,
        timeout: Duration,
    ) -> Result<bool, BrowserError> {
        let page = self.page()?;
        let deadline = Instant::now() + timeout;
        loop {
            if page.find_element(selector).await.is_ok() {
                return Ok(true);
            }
            if Instant::now() >= deadline {
                return Ok(false);
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn extract_text(&mut self, selector: &str) -> Result<Option<String>, BrowserError> {
        let page = self.page()?;
        match page.find_element(selector).await {
            Ok(element) => element
                .inner_text()
                .await
                .map_err(|e| BrowserError::new(format!("read text of {}: {}", selector, e))),
            Err(_) => Ok(None),
        }
    }

    async fn extract_attribute(
        &mut self,
        selector: &str,
        attribute: &str,
    ) -> Result<Option<String>, BrowserError> {
        let page = self.page()?;
        match page.find_element(selector).await {
            Ok(element) => element.attribute(attribute).await.map_err(|e| {
                BrowserError::new(format!("read {} of {}: {}", attribute, selector, e))
            }),
            Err(_) => Ok(None),
        }
    }

    async fn click(&mut self, selector: &str) -> Result<(), BrowserError> {
        let page = self.page()?;
        let element = page
            .find_element(selector)
            .await
            .map_err(|e| BrowserError::new(format!("find {}: {}", selector, e)))?;
        element
            .click()
            .await
            .map_err(|e| BrowserError::new(format!("click {}: {}", selector, e)))?;
        Ok(())
    }

    async fn content(&mut self) -> Result<String, BrowserError> {
        self.page()?
            .content()
            .await
            .map_err(|e| BrowserError::new(format!("read page content: {}", e)))
    }

    async fn cookies(&mut self) -> Result<Vec<BrowserCookie>, BrowserError> {
        let cookies = self
            .page()?
            .get_cookies()
            .await
            .map_err(|e| BrowserError::new(format!("read cookies: {}", e)))?;
        Ok(cookies
            .into_iter()
            .map(|c| BrowserCookie {
                name: c.name,
                value: c.value,
                domain: c.domain,
            })
            .collect())
    }

    async fn close(mut self: Box<Self>) -> Result<(), BrowserError> {
        self.page = None;
        let closed = self
            .browser
            .close()
            .await
            .map_err(|e| BrowserError::new(format!("close chromium: {}", e)));
        if let Err(e) = self.browser.wait().await {
            tracing::debug!("waiting for chromium exit: {}", e);
        }
        self.handler.abort();
        closed.map(|_| ())
    }
}

impl Drop for ChromiumSession {
    fn drop(&mut self) {
        self.handler.abort();
    }
}
