use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Headless browser launch settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Run Chromium without a window. Set false to watch (or solve) the verification page.
    pub headless: bool,
    /// Chromium/Chrome binary; auto-detected when unset.
    pub executable: Option<PathBuf>,
    /// User agent for the browser and the media request.
    pub user_agent: String,
    /// Pass `--no-sandbox` (needed when running as root in containers).
    pub no_sandbox: bool,
    pub window_width: u32,
    pub window_height: u32,
    /// Seconds to wait for the browser process to come up.
    pub launch_timeout_secs: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            executable: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            no_sandbox: false,
            window_width: 1280,
            window_height: 800,
            launch_timeout_secs: 20,
        }
    }
}

/// CSS selectors used to read the share page. Terabox changes its markup
/// from time to time; these are the knobs to follow it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    pub file_name: String,
    pub file_size: String,
    /// Any of these present means the page is a verification interstitial.
    pub verification: Vec<String>,
    /// Control that moves past the interstitial, if it has one.
    pub continue_button: String,
    /// Anchor whose `href` is the direct media URL.
    pub direct_link: String,
    /// Button whose `data-link` is the direct media URL.
    pub download_button: String,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            file_name: r#"[class*="file-name"]"#.to_string(),
            file_size: r#"[class*="file-size"]"#.to_string(),
            verification: vec![
                r#"[class*="verify"]"#.to_string(),
                r#"[class*="captcha"]"#.to_string(),
                "#challenge-form".to_string(),
            ],
            continue_button: r#"[class*="verify"] button, button[class*="continue"]"#.to_string(),
            direct_link: r#"a[href*="download"]"#.to_string(),
            download_button: "button[data-link]".to_string(),
        }
    }
}

/// Link resolution settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Seconds allowed for the share page to load and show the file.
    pub page_load_timeout_secs: u64,
    /// Seconds allowed for the verification page to hand over to the file page.
    pub verification_timeout_secs: u64,
    /// Hosts accepted as share hosts in addition to the built-in list.
    pub extra_hosts: Vec<String>,
    pub selectors: SelectorConfig,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            page_load_timeout_secs: 30,
            verification_timeout_secs: 60,
            extra_hosts: Vec::new(),
            selectors: SelectorConfig::default(),
        }
    }
}

impl ResolverConfig {
    pub fn page_load_timeout(&self) -> Duration {
        Duration::from_secs(self.page_load_timeout_secs)
    }

    pub fn verification_timeout(&self) -> Duration {
        Duration::from_secs(self.verification_timeout_secs)
    }
}

/// Share API fallback, used when the page exposes no direct link.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShareApiConfig {
    pub enabled: bool,
    /// API origins tried in order.
    pub bases: Vec<String>,
    pub timeout_secs: u64,
}

impl Default for ShareApiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bases: vec![
                "https://www.terabox.app".to_string(),
                "https://www.teraboxapp.com".to_string(),
                "https://terabox.com".to_string(),
                "https://terasharelink.com".to_string(),
            ],
            timeout_secs: 30,
        }
    }
}

/// Media transfer settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    pub connect_timeout_secs: u64,
    /// Abort when the rate stays below `low_speed_limit` bytes/s for `low_speed_time_secs`.
    pub low_speed_limit: u32,
    pub low_speed_time_secs: u64,
    /// Replace an existing file with the same name instead of failing.
    pub overwrite: bool,
    /// Receive buffer size in bytes (None = libcurl default).
    pub buffer_size: Option<usize>,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 30,
            low_speed_limit: 1024,
            low_speed_time_secs: 60,
            overwrite: false,
            buffer_size: None,
        }
    }
}

/// Global configuration loaded from `~/.config/tbdl/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TbdlConfig {
    /// Directory downloads land in when `-o` is not given.
    pub output_dir: PathBuf,
    pub browser: BrowserConfig,
    pub resolver: ResolverConfig,
    pub share_api: ShareApiConfig,
    pub download: DownloadConfig,
}

impl Default for TbdlConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("videos"),
            browser: BrowserConfig::default(),
            resolver: ResolverConfig::default(),
            share_api: ShareApiConfig::default(),
            download: DownloadConfig::default(),
        }
    }
}

pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("tbdl")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from the default path, creating a default file if none exists.
pub fn load_or_init() -> Result<TbdlConfig> {
    let path = config_path()?;
    load_or_init_at(&path)
}

/// Like `load_or_init` for an explicit path.
pub fn load_or_init_at(path: &Path) -> Result<TbdlConfig> {
    if !path.exists() {
        let default_cfg = TbdlConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml).with_context(|| format!("write {}", path.display()))?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: TbdlConfig =
        toml::from_str(&data).with_context(|| format!("parse {}", path.display()))?;
    Ok(cfg)
}
