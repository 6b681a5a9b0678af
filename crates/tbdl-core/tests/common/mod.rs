#![allow(dead_code)]

pub mod fake_browser;
pub mod media_server;

use tbdl_core::config::ResolverConfig;

/// Resolver settings with timeouts short enough for tests.
pub fn fast_resolver_config() -> ResolverConfig {
    ResolverConfig {
        page_load_timeout_secs: 1,
        verification_timeout_secs: 1,
        ..ResolverConfig::default()
    }
}

pub const SHARE_URL: &str = "https://www.terabox.com/s/1AbCdEf";
