//! Pattern extraction from raw share-page HTML.
//!
//! Terabox embeds file state as JSON inside inline scripts. These helpers pull
//! the few fields the resolver needs without a full HTML/JS parse.

use regex::Regex;
use std::sync::OnceLock;

type Cached = OnceLock<Option<Regex>>;

static FILE_KEY: Cached = OnceLock::new();
static SIZE: Cached = OnceLock::new();
static DLINK: Cached = OnceLock::new();
static DOWNLOAD_HREF: Cached = OnceLock::new();
static SHARE_ID: Cached = OnceLock::new();
static FILENAME: Cached = OnceLock::new();

const CSRF_PATTERNS: [&str; 4] = [
    r#"csrfToken\s*:\s*['"]([^'"]+)['"]"#,
    r#"(?i)csrf[_-]?token['"]?\s*[:=]\s*['"]([^'"]+)['"]"#,
    r#"(?i)<meta\s+name=['"]csrf-token['"]\s+content=['"]([^'"]+)['"]"#,
    r#"_csrf_token\s*=\s*['"]([^'"]+)['"]"#,
];
static CSRF: [Cached; 4] = [
    OnceLock::new(),
    OnceLock::new(),
    OnceLock::new(),
    OnceLock::new(),
];

/// Compiles `pattern` once per cell. All patterns are literals, so `None`
/// only means a broken pattern, which the callers treat as "not found".
fn cached(cell: &'static Cached, pattern: &str) -> Option<&'static Regex> {
    cell.get_or_init(|| Regex::new(pattern).ok()).as_ref()
}

/// Exact file size in bytes from embedded state (`"size": 10485760`).
///
/// Only a `size` that is a direct member of a file entry counts, i.e. the
/// object that also carries `server_filename` or `fs_id`. Sizes of
/// thumbnails, quotas and other page objects are ignored.
pub fn size_from_html(html: &str) -> Option<u64> {
    let file_key = cached(&FILE_KEY, r#""(?:server_filename|fs_id)"\s*:"#)?;
    let size = cached(&SIZE, r#""size"\s*:\s*"?(\d+)"?"#)?;
    let bytes = html.as_bytes();
    file_key.find_iter(html).find_map(|key| {
        let (open, close) = enclosing_object(bytes, key.start())?;
        let entry = &html[open..=close];
        size.captures_iter(entry)
            .filter(|c| c.get(0).is_some_and(|m| depth_at(entry.as_bytes(), m.start()) == 1))
            .find_map(|c| c.get(1)?.as_str().parse().ok())
    })
}

/// Direct media URL from embedded state (`"dlink":"https:\/\/..."`).
pub fn dlink_from_html(html: &str) -> Option<String> {
    let re = cached(&DLINK, r#""dlink"\s*:\s*"([^"]+)""#)?;
    let raw = re.captures(html)?.get(1)?.as_str();
    let url = unescape_json_url(raw);
    is_http_url(&url).then_some(url)
}

/// First `href` pointing at a download-looking resource.
pub fn download_href_from_html(html: &str) -> Option<String> {
    let re = cached(&DOWNLOAD_HREF, r#"href=['"]([^'"]+(?:download|dlink)[^'"]*)['"]"#)?;
    re.captures_iter(html)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().replace("&amp;", "&"))
        .find(|u| is_http_url(u))
}

/// Numeric share id from embedded state (`"shareid": 4321`).
pub fn share_id_from_html(html: &str) -> Option<String> {
    let re = cached(&SHARE_ID, r#""shareid"\s*:\s*"?(\d+)"?"#)?;
    Some(re.captures(html)?.get(1)?.as_str().to_string())
}

/// File name from embedded state (`"server_filename":"clip.mp4"`).
pub fn filename_from_html(html: &str) -> Option<String> {
    let re = cached(&FILENAME, r#""server_filename"\s*:\s*"([^"]+)""#)?;
    let name = re.captures(html)?.get(1)?.as_str().trim().to_string();
    (!name.is_empty()).then_some(name)
}

/// CSRF token from inline scripts, meta tags, or assignments.
pub fn csrf_token_from_html(html: &str) -> Option<String> {
    CSRF.iter().zip(CSRF_PATTERNS).find_map(|(cell, pattern)| {
        let re = cached(cell, pattern)?;
        Some(re.captures(html)?.get(1)?.as_str().to_string())
    })
}

/// True when the quote at `i` is preceded by an odd number of backslashes.
fn is_escaped(bytes: &[u8], i: usize) -> bool {
    bytes[..i].iter().rev().take_while(|&&b| b == b'\\').count() % 2 == 1
}

/// Braces outside of JSON strings, scanning forward from the start of `bytes`.
fn structural_braces(bytes: &[u8]) -> impl Iterator<Item = (usize, u8)> + '_ {
    let mut in_string = false;
    bytes.iter().enumerate().filter_map(move |(i, &b)| match b {
        b'"' if !is_escaped(bytes, i) => {
            in_string = !in_string;
            None
        }
        b'{' | b'}' if !in_string => Some((i, b)),
        _ => None,
    })
}

/// Byte range (inclusive) of the innermost `{ ... }` containing `at`, where
/// `at` sits outside any string.
fn enclosing_object(bytes: &[u8], at: usize) -> Option<(usize, usize)> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut open = None;
    for i in (0..at).rev() {
        match bytes[i] {
            b'"' if !is_escaped(bytes, i) => in_string = !in_string,
            b'}' if !in_string => depth += 1,
            b'{' if !in_string => {
                if depth == 0 {
                    open = Some(i);
                    break;
                }
                depth -= 1;
            }
            _ => {}
        }
    }
    let open = open?;
    let mut depth = 0usize;
    let close = structural_braces(&bytes[open..]).find_map(|(i, b)| {
        if b == b'{' {
            depth += 1;
        } else {
            depth -= 1;
        }
        (depth == 0).then_some(open + i)
    })?;
    Some((open, close))
}

/// Object nesting depth at `offset`, counted from the start of `bytes`.
fn depth_at(bytes: &[u8], offset: usize) -> usize {
    structural_braces(&bytes[..offset]).fold(0usize, |depth, (_, b)| {
        if b == b'{' {
            depth + 1
        } else {
            depth.saturating_sub(1)
        }
    })
}

fn unescape_json_url(raw: &str) -> String {
    raw.replace("\\/", "/")
        .replace("\\u0026", "&")
        .replace("\\u003d", "=")
}

fn is_http_url(s: &str) -> bool {
    s.starts_with("https://") || s.starts_with("http://")
}
