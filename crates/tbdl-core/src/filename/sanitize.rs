//! Filesystem-safe filename sanitization.

/// Longest filename most filesystems accept, in bytes (Linux NAME_MAX).
pub const NAME_MAX: usize = 255;

/// Sanitizes a display name for use as a filename on Linux, macOS, and Windows.
///
/// - Drops `<>:"/\|?*`, NUL, and control characters
/// - Replaces whitespace runs with a single `_` and collapses repeated `_`
/// - Collapses runs of `.` into one
/// - Trims leading/trailing spaces, dots, and underscores
pub fn sanitize_filename(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut prev: Option<char> = None;

    for c in name.chars() {
        if c == '\0' || c.is_control() && !c.is_whitespace() || "<>:\"/\\|?*".contains(c) {
            continue;
        }
        let c = if c.is_whitespace() { '_' } else { c };
        if (c == '_' || c == '.') && prev == Some(c) {
            continue;
        }
        out.push(c);
        prev = Some(c);
    }

    out.trim_matches(|c| c == ' ' || c == '.' || c == '_')
        .to_string()
}

/// Truncates `name` to at most `max` bytes on a char boundary, keeping the
/// extension (text after the last `.`) when it is short enough to survive.
pub fn truncate_keeping_extension(name: &str, max: usize) -> String {
    if name.len() <= max {
        return name.to_string();
    }
    let (stem, ext) = match name.rfind('.') {
        Some(i) if i > 0 && name.len() - i <= 16 => name.split_at(i),
        _ => (name, ""),
    };
    let mut take = max.saturating_sub(ext.len());
    while take > 0 && !stem.is_char_boundary(take) {
        take -= 1;
    }
    format!("{}{}", &stem[..take], ext)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removes_reserved_characters() {
        assert_eq!(sanitize_filename("a/b\\c:d*e?.mp4"), "abcde.mp4");
        assert_eq!(sanitize_filename("<clip>|\"x\".mp4"), "clipx.mp4");
    }

    #[test]
    fn whitespace_becomes_single_underscore() {
        assert_eq!(sanitize_filename("my  holiday\tclip.mp4"), "my_holiday_clip.mp4");
        assert_eq!(sanitize_filename("file___name.mp4"), "file_name.mp4");
    }

    #[test]
    fn collapses_dots_and_trims() {
        assert_eq!(sanitize_filename("  ..clip...mp4..  "), "clip.mp4");
    }

    #[test]
    fn control_chars_dropped() {
        assert_eq!(sanitize_filename("file\x00na\x07me.mp4"), "filename.mp4");
    }

    #[test]
    fn truncation_keeps_extension() {
        let long = format!("{}.mp4", "a".repeat(300));
        let t = truncate_keeping_extension(&long, NAME_MAX);
        assert_eq!(t.len(), NAME_MAX);
        assert!(t.ends_with(".mp4"));
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let long = format!("{}.mkv", "é".repeat(200));
        let t = truncate_keeping_extension(&long, NAME_MAX);
        assert!(t.len() <= NAME_MAX);
        assert!(t.ends_with(".mkv"));
    }
}
