//! Progress reporting for a running download (bytes done, rate, ETA).
//!
//! The downloader samples its byte counter on a fixed interval and sends
//! snapshots to the CLI over a `tokio::sync::mpsc` channel.

/// Snapshot of download progress.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressStats {
    /// Bytes written so far.
    pub bytes_done: u64,
    /// Expected total, when the share page reported an exact size.
    pub total_bytes: Option<u64>,
    /// Elapsed time since the transfer started (seconds).
    pub elapsed_secs: f64,
}

impl ProgressStats {
    /// Download rate in bytes per second (0 if elapsed is 0).
    pub fn bytes_per_sec(&self) -> f64 {
        if self.elapsed_secs <= 0.0 {
            return 0.0;
        }
        self.bytes_done as f64 / self.elapsed_secs
    }

    /// Estimated seconds remaining. None without a known total or rate.
    pub fn eta_secs(&self) -> Option<f64> {
        let total = self.total_bytes?;
        let remaining = total.saturating_sub(self.bytes_done);
        if remaining == 0 {
            return Some(0.0);
        }
        let rate = self.bytes_per_sec();
        if rate <= 0.0 {
            return None;
        }
        Some(remaining as f64 / rate)
    }

    /// Fraction complete in [0.0, 1.0], when the total is known.
    pub fn fraction(&self) -> Option<f64> {
        let total = self.total_bytes?;
        if total == 0 {
            return Some(1.0);
        }
        Some((self.bytes_done as f64 / total as f64).min(1.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_and_eta_with_known_total() {
        let s = ProgressStats {
            bytes_done: 500,
            total_bytes: Some(1000),
            elapsed_secs: 5.0,
        };
        assert!((s.bytes_per_sec() - 100.0).abs() < 1e-9);
        assert!((s.eta_secs().unwrap() - 5.0).abs() < 1e-9);
        assert!((s.fraction().unwrap() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn unknown_total_has_no_eta_or_fraction() {
        let s = ProgressStats {
            bytes_done: 4096,
            total_bytes: None,
            elapsed_secs: 1.0,
        };
        assert_eq!(s.eta_secs(), None);
        assert_eq!(s.fraction(), None);
        assert!((s.bytes_per_sec() - 4096.0).abs() < 1e-9);
    }

    #[test]
    fn zero_elapsed_has_zero_rate() {
        let s = ProgressStats {
            bytes_done: 0,
            total_bytes: Some(10),
            elapsed_secs: 0.0,
        };
        assert_eq!(s.bytes_per_sec(), 0.0);
        assert_eq!(s.eta_secs(), None);
    }

    #[test]
    fn overshoot_is_clamped() {
        let s = ProgressStats {
            bytes_done: 20,
            total_bytes: Some(10),
            elapsed_secs: 1.0,
        };
        assert_eq!(s.fraction(), Some(1.0));
        assert_eq!(s.eta_secs(), Some(0.0));
    }
}
