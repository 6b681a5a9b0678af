//! Single-stream HTTP GET into a `.part` file (libcurl, blocking).

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use crate::error::TbdlError;
use crate::storage::PartFile;

/// libcurl knobs for one transfer.
#[derive(Debug, Clone)]
pub(super) struct CurlOptions {
    pub connect_timeout: Duration,
    pub low_speed_limit: u32,
    pub low_speed_time: Duration,
    pub buffer_size: Option<usize>,
    pub user_agent: String,
}

/// GETs `url` and appends the body to `part`, bumping `counter` per chunk.
/// Returns the bytes written once the stream completes with a 2xx status.
/// Setting `abort` stops the transfer with `Interrupted`.
pub(super) fn fetch_into(
    url: &str,
    headers: &HashMap<String, String>,
    part: &mut PartFile,
    counter: &AtomicU64,
    abort: &AtomicBool,
    opts: &CurlOptions,
) -> Result<u64, TbdlError> {
    let transport = |reason: String, bytes: u64| TbdlError::Transport {
        reason,
        bytes_written: bytes,
    };
    let setup = |e: curl::Error| transport(format!("curl: {}", e), 0);

    let mut easy = curl::easy::Easy::new();
    easy.url(url).map_err(|e| transport(format!("invalid URL: {}", e), 0))?;
    easy.follow_location(true).map_err(setup)?;
    easy.max_redirections(10).map_err(setup)?;
    easy.fail_on_error(true).map_err(setup)?;
    easy.connect_timeout(opts.connect_timeout).map_err(setup)?;
    easy.low_speed_limit(opts.low_speed_limit).map_err(setup)?;
    easy.low_speed_time(opts.low_speed_time).map_err(setup)?;
    easy.useragent(&opts.user_agent).map_err(setup)?;
    if let Some(sz) = opts.buffer_size {
        easy.buffer_size(sz).map_err(setup)?;
    }
    easy.progress(true).map_err(setup)?;

    let mut list = curl::easy::List::new();
    for (k, v) in headers {
        list.append(&format!("{}: {}", k.trim(), v.trim()))
            .map_err(setup)?;
    }
    if !headers.is_empty() {
        easy.http_headers(list).map_err(setup)?;
    }

    let mut write_error: Option<anyhow::Error> = None;
    let performed = {
        let mut transfer = easy.transfer();
        transfer
            .write_function(|data| match part.write(data) {
                Ok(()) => {
                    counter.fetch_add(data.len() as u64, Ordering::Relaxed);
                    Ok(data.len())
                }
                Err(e) => {
                    tracing::warn!("download write failed: {:#}", e);
                    write_error = Some(e);
                    Ok(0) // abort transfer
                }
            })
            .map_err(setup)?;
        transfer
            .progress_function(|_, _, _, _| !abort.load(Ordering::Relaxed))
            .map_err(setup)?;
        transfer.perform()
    };

    let written = part.written();
    if abort.load(Ordering::Relaxed) {
        tracing::info!(bytes = written, "transfer aborted");
        return Err(TbdlError::Interrupted);
    }
    if let Some(e) = write_error {
        return Err(TbdlError::destination(part.temp_path(), format!("{:#}", e)));
    }

    let code = easy.response_code().unwrap_or(0);
    if let Err(e) = performed {
        let reason = if code >= 400 {
            format!("GET returned HTTP {}", code)
        } else {
            e.to_string()
        };
        return Err(transport(reason, written));
    }
    if !(200..300).contains(&code) {
        return Err(transport(format!("GET returned HTTP {}", code), written));
    }
    Ok(written)
}
