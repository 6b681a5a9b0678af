//! Local filename derivation for downloaded media.
//!
//! The share page's display name is the only naming source; it is sanitized
//! for common filesystems and given a video extension when it has none.

mod sanitize;

pub use sanitize::{sanitize_filename, truncate_keeping_extension, NAME_MAX};

use crate::storage::TEMP_SUFFIX;

/// Longest final name whose `.part` sibling still fits in `NAME_MAX`.
pub const MAX_FINAL_NAME: usize = NAME_MAX - TEMP_SUFFIX.len();

/// Filename used when the display name sanitizes to nothing usable.
pub const DEFAULT_FILENAME: &str = "video.mp4";

/// Extension appended to names that carry none.
const DEFAULT_EXTENSION: &str = "mp4";

/// Derives the on-disk filename for a display name.
///
/// # Examples
///
/// - `derive_filename("clip.mp4")` → `"clip.mp4"`
/// - `derive_filename("My Trip")` → `"My_Trip.mp4"`
/// - `derive_filename("movie.mkv")` → `"movie.mkv"`
pub fn derive_filename(display_name: &str) -> String {
    let sanitized = sanitize_filename(display_name);
    if sanitized.is_empty() || sanitized == "." || sanitized == ".." {
        return DEFAULT_FILENAME.to_string();
    }
    let with_ext = if has_extension(&sanitized) {
        sanitized
    } else {
        format!("{}.{}", sanitized, DEFAULT_EXTENSION)
    };
    truncate_keeping_extension(&with_ext, MAX_FINAL_NAME)
}

fn has_extension(name: &str) -> bool {
    match name.rsplit_once('.') {
        Some((stem, ext)) => {
            !stem.is_empty()
                && (1..=5).contains(&ext.len())
                && ext.chars().all(|c| c.is_ascii_alphanumeric())
        }
        None => false,
    }
}
