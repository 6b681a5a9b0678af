//! Byte size parsing and formatting.

/// A size read from page text.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParsedSize {
    /// An exact byte count ("5000000", "5,000,000 bytes", "5000000 B").
    Exact(u64),
    /// A rounded human size ("10.00 MB"); only good for display.
    Approx(u64),
}

impl ParsedSize {
    pub fn exact(self) -> Option<u64> {
        match self {
            ParsedSize::Exact(n) => Some(n),
            ParsedSize::Approx(_) => None,
        }
    }
}

/// Parses a size as a share page displays it. Units are binary (1 KB = 1024 B),
/// matching how Terabox renders sizes.
pub fn parse_size_text(text: &str) -> Option<ParsedSize> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    let split = text
        .find(|c: char| !(c.is_ascii_digit() || c == '.' || c == ','))
        .unwrap_or(text.len());
    let (number, unit) = text.split_at(split);
    let number = number.replace(',', "");
    if number.is_empty() {
        return None;
    }
    let unit = unit.trim().to_ascii_lowercase();

    let multiplier: u64 = match unit.as_str() {
        "" | "b" | "byte" | "bytes" => {
            return number.parse::<u64>().ok().map(ParsedSize::Exact);
        }
        "k" | "kb" | "kib" => 1 << 10,
        "m" | "mb" | "mib" => 1 << 20,
        "g" | "gb" | "gib" => 1 << 30,
        "t" | "tb" | "tib" => 1 << 40,
        _ => return None,
    };
    let value: f64 = number.parse().ok()?;
    if !value.is_finite() || value < 0.0 {
        return None;
    }
    Some(ParsedSize::Approx((value * multiplier as f64).round() as u64))
}

/// Formats a byte count for display ("1.23 GB").
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    for unit in UNITS {
        if value < 1024.0 {
            return format!("{:.2} {}", value, unit);
        }
        value /= 1024.0;
    }
    format!("{:.2} TB", value)
}
