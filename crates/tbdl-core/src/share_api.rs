//! Share API fallback: asks Terabox's JSON endpoints for a file's `dlink`
//! when the share page itself exposes no direct link.
//!
//! Blocking (libcurl); call from `spawn_blocking` when used from async code.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::time::Duration;

use crate::config::ShareApiConfig;

/// Inputs gathered from the browser session for one lookup.
#[derive(Debug, Clone, Default)]
pub struct ApiRequest {
    /// Share id as the API expects it (numeric id from page state, else the short id).
    pub share_id: String,
    /// Share page URL, sent as `Referer`.
    pub referer: String,
    /// `Cookie` header value from the browser session.
    pub cookie_header: Option<String>,
    pub csrf_token: Option<String>,
    pub sign: Option<String>,
    pub timestamp: Option<String>,
}

/// What the API reported for the first file of the share.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiFile {
    pub dlink: String,
    pub filename: Option<String>,
    pub size: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ListResponse {
    #[serde(default = "missing_errno")]
    errno: i64,
    #[serde(default)]
    errmsg: Option<String>,
    #[serde(default)]
    list: Vec<ListEntry>,
}

#[derive(Debug, Deserialize)]
struct ListEntry {
    fs_id: u64,
    #[serde(default)]
    server_filename: Option<String>,
    #[serde(default)]
    size: Option<u64>,
    #[serde(default)]
    dlink: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DownloadResponse {
    #[serde(default = "missing_errno")]
    errno: i64,
    #[serde(default)]
    errmsg: Option<String>,
    #[serde(default)]
    list: Vec<DlinkEntry>,
}

#[derive(Debug, Deserialize)]
struct DlinkEntry {
    #[serde(default)]
    dlink: Option<String>,
}

fn missing_errno() -> i64 {
    -1
}

/// Client for the share API across one or more API origins.
#[derive(Debug, Clone)]
pub struct ShareApi {
    bases: Vec<String>,
    timeout: Duration,
    user_agent: String,
}

impl ShareApi {
    pub fn new(bases: Vec<String>, timeout: Duration, user_agent: impl Into<String>) -> Self {
        Self {
            bases,
            timeout,
            user_agent: user_agent.into(),
        }
    }

    pub fn from_config(cfg: &ShareApiConfig, user_agent: &str) -> Self {
        Self::new(
            cfg.bases.clone(),
            Duration::from_secs(cfg.timeout_secs),
            user_agent,
        )
    }

    /// Tries each base in order and returns the first file with a `dlink`.
    /// The error names the last base's failure.
    pub fn fetch(&self, req: &ApiRequest) -> Result<ApiFile> {
        let mut last_error = anyhow::anyhow!("no share API bases configured");
        for base in &self.bases {
            match self.fetch_from(base, req) {
                Ok(file) => {
                    tracing::info!(base = %base, "share API returned a download link");
                    return Ok(file);
                }
                Err(e) => {
                    tracing::warn!(base = %base, "share API lookup failed: {:#}", e);
                    last_error = e.context(format!("share API {}", base));
                }
            }
        }
        Err(last_error)
    }

    fn fetch_from(&self, base: &str, req: &ApiRequest) -> Result<ApiFile> {
        let base = base.trim_end_matches('/');
        let mut list_url = url::Url::parse(&format!("{}/share/list", base))
            .with_context(|| format!("invalid API base {:?}", base))?;
        list_url
            .query_pairs_mut()
            .append_pair("shareid", &req.share_id)
            .append_pair("root", "1");

        let headers = self.headers(base, req);
        let body = self.request(list_url.as_str(), &headers, None)?;
        let listing: ListResponse =
            serde_json::from_slice(&body).context("parse share/list response")?;
        if listing.errno != 0 {
            anyhow::bail!(
                "share/list errno {}: {}",
                listing.errno,
                listing.errmsg.as_deref().unwrap_or("unknown error")
            );
        }
        let entry = listing
            .list
            .into_iter()
            .next()
            .context("share/list returned no files")?;

        let dlink = match entry.dlink.filter(|d| !d.is_empty()) {
            Some(dlink) => dlink,
            None => self.request_dlink(base, entry.fs_id, &headers, req)?,
        };
        Ok(ApiFile {
            dlink,
            filename: entry.server_filename,
            size: entry.size,
        })
    }

    fn request_dlink(
        &self,
        base: &str,
        fs_id: u64,
        headers: &[(String, String)],
        req: &ApiRequest,
    ) -> Result<String> {
        let payload = serde_json::json!({
            "shareid": req.share_id,
            "sign": req.sign.as_deref().unwrap_or(""),
            "timestamp": req.timestamp.as_deref().unwrap_or(""),
            "file_ids": [fs_id],
            "type": "video",
            "channel": "dubox",
            "clienttype": 0,
            "web": 1,
        });
        let payload = serde_json::to_vec(&payload)?;
        let url = format!("{}/api/sharedownload", base);
        let body = self.request(&url, headers, Some(&payload))?;
        let resp: DownloadResponse =
            serde_json::from_slice(&body).context("parse sharedownload response")?;
        if resp.errno != 0 {
            anyhow::bail!(
                "sharedownload errno {}: {}",
                resp.errno,
                resp.errmsg.as_deref().unwrap_or("unknown error")
            );
        }
        resp.list
            .into_iter()
            .find_map(|e| e.dlink.filter(|d| !d.is_empty()))
            .context("sharedownload response carries no dlink")
    }

    fn headers(&self, base: &str, req: &ApiRequest) -> Vec<(String, String)> {
        let mut headers = vec![
            ("Accept".to_string(), "application/json".to_string()),
            ("Content-Type".to_string(), "application/json".to_string()),
            ("Referer".to_string(), req.referer.clone()),
            ("Origin".to_string(), base.to_string()),
        ];
        if let Some(token) = &req.csrf_token {
            headers.push(("X-CSRF-Token".to_string(), token.clone()));
        }
        if let Some(cookie) = &req.cookie_header {
            headers.push(("Cookie".to_string(), cookie.clone()));
        }
        headers
    }

    /// GET (or POST with `body`) returning the response body on 2xx.
    fn request(
        &self,
        url: &str,
        headers: &[(String, String)],
        body: Option<&[u8]>,
    ) -> Result<Vec<u8>> {
        let mut out = Vec::new();

        let mut easy = curl::easy::Easy::new();
        easy.url(url).context("invalid URL")?;
        easy.follow_location(true)?;
        easy.max_redirections(5)?;
        easy.connect_timeout(Duration::from_secs(15))?;
        easy.timeout(self.timeout)?;
        easy.useragent(&self.user_agent)?;
        if let Some(body) = body {
            easy.post(true)?;
            easy.post_fields_copy(body)?;
        }

        let mut list = curl::easy::List::new();
        for (k, v) in headers {
            list.append(&format!("{}: {}", k.trim(), v.trim()))?;
        }
        easy.http_headers(list)?;

        {
            let mut transfer = easy.transfer();
            transfer.write_function(|data| {
                out.extend_from_slice(data);
                Ok(data.len())
            })?;
            transfer
                .perform()
                .with_context(|| format!("request {} failed", url))?;
        }

        let code = easy.response_code().context("no response code")?;
        if !(200..300).contains(&code) {
            anyhow::bail!("{} returned HTTP {}", url, code);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_entry_with_dlink_parses() {
        let json = r#"{"errno":0,"list":[{"fs_id":123,"server_filename":"clip.mp4","size":10485760,"dlink":"https://d.example/x"}]}"#;
        let r: ListResponse = serde_json::from_str(json).unwrap();
        assert_eq!(r.errno, 0);
        assert_eq!(r.list[0].fs_id, 123);
        assert_eq!(r.list[0].size, Some(10_485_760));
        assert_eq!(r.list[0].dlink.as_deref(), Some("https://d.example/x"));
    }

    #[test]
    fn missing_errno_is_an_error_code() {
        let r: ListResponse = serde_json::from_str(r#"{"list":[]}"#).unwrap();
        assert_eq!(r.errno, -1);
    }

    #[test]
    fn headers_carry_session_state() {
        let api = ShareApi::new(vec![], Duration::from_secs(1), "ua");
        let req = ApiRequest {
            share_id: "1".to_string(),
            referer: "https://terabox.com/s/1abc".to_string(),
            cookie_header: Some("ndus=x".to_string()),
            csrf_token: Some("tok".to_string()),
            ..Default::default()
        };
        let headers = api.headers("https://terabox.com", &req);
        let get = |name: &str| {
            headers
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.as_str())
        };
        assert_eq!(get("Referer"), Some("https://terabox.com/s/1abc"));
        assert_eq!(get("Origin"), Some("https://terabox.com"));
        assert_eq!(get("Cookie"), Some("ndus=x"));
        assert_eq!(get("X-CSRF-Token"), Some("tok"));
    }

    #[test]
    fn no_bases_is_an_error() {
        let api = ShareApi::new(vec![], Duration::from_secs(1), "ua");
        assert!(api.fetch(&ApiRequest::default()).is_err());
    }
}
