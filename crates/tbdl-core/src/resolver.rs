//! Link resolver: drives a browser session through the share page and turns a
//! `ShareLink` into a direct media URL plus the headers needed to fetch it.
//!
//! The downloader only depends on `ResolvedMedia`; it never sees the browser.

use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use crate::browser::{
    BrowserCookie, BrowserError, BrowserLauncher, BrowserSession, ChromiumLauncher,
};
use crate::config::{ResolverConfig, TbdlConfig};
use crate::error::TbdlError;
use crate::extract;
use crate::share_api::{ApiFile, ApiRequest, ShareApi};
use crate::share_link::ShareLink;
use crate::size::parse_size_text;

const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Everything the downloader needs for one share.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedMedia {
    pub direct_url: String,
    pub display_name: String,
    /// Exact byte count, only when the page or API states one.
    pub expected_bytes: Option<u64>,
    /// Size as displayed on the page ("10.00 MB"); never used for verification.
    pub size_hint: Option<String>,
    /// Minimal headers required for the media GET.
    pub headers: HashMap<String, String>,
}

/// Turns a validated share link into a fetchable media description.
#[async_trait]
pub trait Resolver: Send + Sync {
    async fn resolve(&self, link: &ShareLink) -> Result<ResolvedMedia, TbdlError>;
}

/// Cookies and referer gathered during one resolution.
#[derive(Debug, Clone)]
pub struct ShareSession {
    referer: String,
    user_agent: String,
    cookies: Vec<BrowserCookie>,
}

impl ShareSession {
    pub fn new(link: &ShareLink, user_agent: &str) -> Self {
        Self {
            referer: link.as_str().to_string(),
            user_agent: user_agent.to_string(),
            cookies: Vec::new(),
        }
    }

    /// Adds cookies, replacing earlier ones with the same name.
    pub fn absorb(&mut self, cookies: Vec<BrowserCookie>) {
        for cookie in cookies {
            self.cookies.retain(|c| c.name != cookie.name);
            self.cookies.push(cookie);
        }
    }

    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.value.as_str())
    }

    /// `Cookie` header value, or None without cookies.
    pub fn cookie_header(&self) -> Option<String> {
        if self.cookies.is_empty() {
            return None;
        }
        let pairs: Vec<String> = self
            .cookies
            .iter()
            .map(|c| format!("{}={}", c.name, c.value))
            .collect();
        Some(pairs.join("; "))
    }

    pub fn into_headers(self) -> HashMap<String, String> {
        let mut headers = HashMap::new();
        if let Some(cookie) = self.cookie_header() {
            headers.insert("Cookie".to_string(), cookie);
        }
        headers.insert("Referer".to_string(), self.referer);
        headers.insert("User-Agent".to_string(), self.user_agent);
        headers
    }
}

/// Browser-backed resolver with an optional share API fallback.
pub struct LinkResolver {
    launcher: Arc<dyn BrowserLauncher>,
    config: ResolverConfig,
    share_api: Option<ShareApi>,
    user_agent: String,
}

impl LinkResolver {
    pub fn new(
        launcher: Arc<dyn BrowserLauncher>,
        config: ResolverConfig,
        user_agent: impl Into<String>,
    ) -> Self {
        Self {
            launcher,
            config,
            share_api: None,
            user_agent: user_agent.into(),
        }
    }

    pub fn with_share_api(mut self, api: ShareApi) -> Self {
        self.share_api = Some(api);
        self
    }

    /// Headless Chromium resolver as configured, share API included when enabled.
    pub fn from_config(cfg: &TbdlConfig) -> Self {
        let user_agent = cfg.browser.user_agent.clone();
        let launcher = Arc::new(ChromiumLauncher::new(cfg.browser.clone()));
        let resolver = Self::new(launcher, cfg.resolver.clone(), user_agent.clone());
        if cfg.share_api.enabled {
            resolver.with_share_api(ShareApi::from_config(&cfg.share_api, &user_agent))
        } else {
            resolver
        }
    }

    async fn drive(
        &self,
        page: &mut dyn BrowserSession,
        link: &ShareLink,
    ) -> Result<ResolvedMedia, TbdlError> {
        let timeout = self.config.page_load_timeout();
        match tokio::time::timeout(timeout, page.navigate(link.as_str())).await {
            Err(_) => {
                return Err(TbdlError::PageLoad(format!(
                    "page did not load within {}s",
                    timeout.as_secs()
                )))
            }
            Ok(Err(e)) => return Err(TbdlError::PageLoad(e.to_string())),
            Ok(Ok(())) => {}
        }

        self.pass_verification(page).await?;

        let selectors = &self.config.selectors;
        let page_name = page
            .extract_text(&selectors.file_name)
            .await
            .map_err(extraction)?
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        let size_text = page
            .extract_text(&selectors.file_size)
            .await
            .map_err(extraction)?
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        let html = page.content().await.map_err(extraction)?;

        let mut expected_bytes = extract::size_from_html(&html).or_else(|| {
            size_text
                .as_deref()
                .and_then(parse_size_text)
                .and_then(|s| s.exact())
        });
        let mut display_name = page_name.or_else(|| extract::filename_from_html(&html));
        let mut direct_url = self.direct_url_on_page(page, link, &html).await?;

        let mut share = ShareSession::new(link, &self.user_agent);
        share.absorb(page.cookies().await.map_err(extraction)?);

        if direct_url.is_none() {
            if let Some(api) = &self.share_api {
                let file = self.query_share_api(api, link, &html, &share).await?;
                direct_url = Some(file.dlink);
                if display_name.is_none() {
                    display_name = file.filename;
                }
                if expected_bytes.is_none() {
                    expected_bytes = file.size;
                }
            }
        }

        let direct_url = direct_url.ok_or_else(|| {
            TbdlError::Extraction("no direct media link on the share page".to_string())
        })?;
        let display_name = display_name.ok_or_else(|| {
            TbdlError::Extraction(format!("file name element {:?} is empty", selectors.file_name))
        })?;

        tracing::info!(
            name = %display_name,
            expected_bytes = ?expected_bytes,
            "share link resolved"
        );
        Ok(ResolvedMedia {
            direct_url,
            display_name,
            expected_bytes,
            size_hint: size_text,
            headers: share.into_headers(),
        })
    }

    /// Waits for either the file page or an interstitial, and gets past the latter.
    async fn pass_verification(&self, page: &mut dyn BrowserSession) -> Result<(), TbdlError> {
        let selectors = &self.config.selectors;
        let deadline = Instant::now() + self.config.page_load_timeout();
        loop {
            for marker in &selectors.verification {
                if page
                    .wait_for_selector(marker, Duration::ZERO)
                    .await
                    .map_err(page_load)?
                {
                    tracing::info!(marker = %marker, "verification page detected");
                    return self.complete_verification(page).await;
                }
            }
            if page
                .wait_for_selector(&selectors.file_name, Duration::ZERO)
                .await
                .map_err(page_load)?
            {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(TbdlError::Extraction(format!(
                    "file name element {:?} not found",
                    selectors.file_name
                )));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn complete_verification(&self, page: &mut dyn BrowserSession) -> Result<(), TbdlError> {
        let selectors = &self.config.selectors;
        let verification = |e: BrowserError| TbdlError::VerificationFailed(e.to_string());

        if !selectors.continue_button.is_empty()
            && page
                .wait_for_selector(&selectors.continue_button, Duration::ZERO)
                .await
                .map_err(verification)?
        {
            page.click(&selectors.continue_button)
                .await
                .map_err(verification)?;
        }

        let timeout = self.config.verification_timeout();
        let passed = page
            .wait_for_selector(&selectors.file_name, timeout)
            .await
            .map_err(verification)?;
        if passed {
            tracing::info!("verification passed");
            Ok(())
        } else {
            Err(TbdlError::VerificationFailed(format!(
                "still on the verification page after {}s",
                timeout.as_secs()
            )))
        }
    }

    async fn direct_url_on_page(
        &self,
        page: &mut dyn BrowserSession,
        link: &ShareLink,
        html: &str,
    ) -> Result<Option<String>, TbdlError> {
        let selectors = &self.config.selectors;
        let href = page
            .extract_attribute(&selectors.direct_link, "href")
            .await
            .map_err(extraction)?;
        if let Some(url) = href.and_then(|h| absolute_http(link, &h)) {
            tracing::debug!("direct link from page anchor");
            return Ok(Some(url));
        }
        let data_link = page
            .extract_attribute(&selectors.download_button, "data-link")
            .await
            .map_err(extraction)?;
        if let Some(url) = data_link.and_then(|h| absolute_http(link, &h)) {
            tracing::debug!("direct link from download button");
            return Ok(Some(url));
        }
        Ok(extract::dlink_from_html(html).or_else(|| extract::download_href_from_html(html)))
    }

    async fn query_share_api(
        &self,
        api: &ShareApi,
        link: &ShareLink,
        html: &str,
        share: &ShareSession,
    ) -> Result<ApiFile, TbdlError> {
        let req = ApiRequest {
            share_id: extract::share_id_from_html(html)
                .unwrap_or_else(|| link.share_id().to_string()),
            referer: link.as_str().to_string(),
            cookie_header: share.cookie_header(),
            csrf_token: extract::csrf_token_from_html(html),
            sign: share.cookie("sign").map(str::to_string),
            timestamp: share.cookie("timestamp").map(str::to_string),
        };
        tracing::info!(share_id = %req.share_id, "no direct link on page, trying share API");
        let api = api.clone();
        tokio::task::spawn_blocking(move || api.fetch(&req))
            .await
            .map_err(|e| TbdlError::Extraction(format!("share API task: {}", e)))?
            .map_err(|e| TbdlError::Extraction(format!("{:#}", e)))
    }
}

#[async_trait]
impl Resolver for LinkResolver {
    async fn resolve(&self, link: &ShareLink) -> Result<ResolvedMedia, TbdlError> {
        tracing::info!(url = %link, "resolving share link");
        let mut session = self
            .launcher
            .launch()
            .await
            .map_err(|e| TbdlError::PageLoad(e.to_string()))?;
        let outcome = self.drive(session.as_mut(), link).await;
        if let Err(e) = session.close().await {
            tracing::warn!("browser did not close cleanly: {}", e);
        }
        outcome
    }
}

fn page_load(e: BrowserError) -> TbdlError {
    TbdlError::PageLoad(e.to_string())
}

fn extraction(e: BrowserError) -> TbdlError {
    TbdlError::Extraction(e.to_string())
}

/// Resolves `href` against the share page and keeps it only when it is http(s).
fn absolute_http(link: &ShareLink, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }
    let url = link.url().join(href).ok()?;
    matches!(url.scheme(), "http" | "https").then(|| url.to_string())
}
