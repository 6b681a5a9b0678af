//! `tbdl resolve`: print what a share link points at without downloading.

use anyhow::Result;
use tbdl_core::config::TbdlConfig;
use tbdl_core::resolver::{LinkResolver, ResolvedMedia, Resolver};
use tbdl_core::share_link::ShareLink;
use tbdl_core::size::format_size;

use crate::cli::ShareFailure;

pub async fn run_resolve(mut cfg: TbdlConfig, url: &str, json: bool, headful: bool) -> Result<()> {
    let link = ShareLink::parse_with_hosts(url, &cfg.resolver.extra_hosts)
        .map_err(|e| ShareFailure::new(url, e))?;
    if headful {
        cfg.browser.headless = false;
    }
    let media = LinkResolver::from_config(&cfg)
        .resolve(&link)
        .await
        .map_err(|e| ShareFailure::new(link.as_str(), e))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&media)?);
    } else {
        println!("name: {}", media.display_name);
        println!("size: {}", describe_size(&media));
        println!("url:  {}", media.direct_url);
    }
    Ok(())
}

fn describe_size(media: &ResolvedMedia) -> String {
    match (media.expected_bytes, media.size_hint.as_deref()) {
        (Some(bytes), _) => format!("{} ({} bytes)", format_size(bytes), bytes),
        (None, Some(hint)) => format!("{} (approximate)", hint),
        (None, None) => "unknown".to_string(),
    }
}
