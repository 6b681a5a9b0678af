//! Share link model: validation of Terabox share URLs.
//!
//! Validation is purely syntactic. A rejected link never reaches the browser.

use crate::error::TbdlError;
use std::fmt;
use url::Url;

/// Hosts that serve Terabox share pages.
pub const KNOWN_HOSTS: &[&str] = &[
    "terabox.com",
    "www.terabox.com",
    "terasharelink.com",
    "www.terasharelink.com",
    "teraboxapp.com",
    "www.teraboxapp.com",
    "terabox.app",
    "www.terabox.app",
    "1024terabox.com",
    "www.1024terabox.com",
];

/// A validated share page URL. Immutable once accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareLink {
    url: Url,
    share_id: String,
}

impl ShareLink {
    /// Parses `input` against [`KNOWN_HOSTS`].
    pub fn parse(input: &str) -> Result<Self, TbdlError> {
        Self::parse_with_hosts(input, &[])
    }

    /// Parses `input`, also accepting any host in `extra_hosts` (port is ignored).
    ///
    /// Accepted path shapes: `/s/<id>`, `/sharing/<id>`, `/sharing/link?surl=<id>`.
    pub fn parse_with_hosts(input: &str, extra_hosts: &[String]) -> Result<Self, TbdlError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(TbdlError::invalid_url(input, "empty URL"));
        }
        let url = Url::parse(trimmed)
            .map_err(|e| TbdlError::invalid_url(input, format!("not an absolute URL ({})", e)))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(TbdlError::invalid_url(
                input,
                format!("unsupported scheme {:?}", url.scheme()),
            ));
        }
        let host = url
            .host_str()
            .ok_or_else(|| TbdlError::invalid_url(input, "missing host"))?
            .to_ascii_lowercase();
        let recognized = KNOWN_HOSTS.contains(&host.as_str())
            || extra_hosts.iter().any(|h| h.eq_ignore_ascii_case(&host));
        if !recognized {
            return Err(TbdlError::invalid_url(
                input,
                format!("host {:?} is not a Terabox share host", host),
            ));
        }
        let share_id = share_id_from_url(&url)
            .ok_or_else(|| TbdlError::invalid_url(input, "path does not carry a share id"))?;
        Ok(ShareLink { url, share_id })
    }

    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn host(&self) -> &str {
        self.url.host_str().unwrap_or_default()
    }

    /// Short share id (the `surl` part of the link).
    pub fn share_id(&self) -> &str {
        &self.share_id
    }
}

impl fmt::Display for ShareLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn share_id_from_url(url: &Url) -> Option<String> {
    let segments: Vec<&str> = url
        .path_segments()?
        .filter(|s| !s.is_empty())
        .collect();
    let candidate = match segments.as_slice() {
        ["s", id] => (*id).to_string(),
        ["sharing", "link"] => url
            .query_pairs()
            .find(|(k, _)| k == "surl")
            .map(|(_, v)| v.into_owned())?,
        ["sharing", id] => (*id).to_string(),
        _ => return None,
    };
    if is_valid_id(&candidate) {
        Some(candidate)
    } else {
        None
    }
}

fn is_valid_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}
