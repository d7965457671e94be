//! Progress estimation from the encoder's diagnostic stream.
//!
//! The encoder reports its position in unstructured stderr text, either as
//! an elapsed-time marker (`time=HH:MM:SS.cc`) or a frame counter
//! (`frame= N`). Estimation is best-effort: lines with neither marker
//! produce no signal, and the tracker only surfaces strictly increasing
//! percentages so noisy output can never regress reported progress.

use once_cell::sync::Lazy;
use regex::Regex;

static TIME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"time=(\d{2}):(\d{2}):(\d{2})(?:\.(\d{2}))?").unwrap());

static FRAME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"frame=\s*(\d+)").unwrap());

/// Estimate completion from one diagnostic line.
///
/// A timestamp marker takes priority over a frame marker. Returns a
/// percentage clamped to 100, or `None` when the line carries no signal.
pub fn parse_progress(line: &str, total_duration: f64, fps: f64) -> Option<f64> {
    if total_duration <= 0.0 {
        return None;
    }

    if let Some(caps) = TIME_RE.captures(line) {
        let hours: f64 = caps[1].parse().ok()?;
        let minutes: f64 = caps[2].parse().ok()?;
        let seconds: f64 = caps[3].parse().ok()?;
        let centis: f64 = caps
            .get(4)
            .and_then(|m| m.as_str().parse().ok())
            .unwrap_or(0.0);
        let elapsed = hours * 3600.0 + minutes * 60.0 + seconds + centis / 100.0;
        return Some((elapsed / total_duration * 100.0).min(100.0));
    }

    if let Some(caps) = FRAME_RE.captures(line) {
        let frame: f64 = caps[1].parse().ok()?;
        let total_frames = total_duration * fps;
        return Some((frame / total_frames * 100.0).min(100.0));
    }

    None
}

/// Tracks the highest percentage seen and surfaces only strict increases,
/// rounded to two decimal places.
#[derive(Debug)]
pub struct ProgressTracker {
    total_duration: f64,
    fps: f64,
    last: f64,
}

impl ProgressTracker {
    /// Create a tracker for an encode of the given expected length.
    pub fn new(total_duration: f64, fps: f64) -> Self {
        Self {
            total_duration,
            fps,
            last: 0.0,
        }
    }

    /// Feed one diagnostic line.
    ///
    /// Returns a new percentage only if it strictly exceeds everything
    /// reported so far.
    pub fn observe(&mut self, line: &str) -> Option<f64> {
        let pct = parse_progress(line, self.total_duration, self.fps)?;
        if pct > self.last {
            self.last = pct;
            Some(round2(pct))
        } else {
            None
        }
    }

    /// Highest (unrounded) percentage observed so far.
    pub fn last(&self) -> f64 {
        self.last
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_sequence_is_monotonic() {
        let lines = [
            ("time=00:00:00.00", 0.0),
            ("time=00:00:02.00", 20.0),
            ("time=00:00:05.00", 50.0),
            ("time=00:00:09.90", 99.0),
            ("time=00:00:10.00", 100.0),
        ];
        for (line, expected) in lines {
            let pct = parse_progress(line, 10.0, 30.0).unwrap();
            assert!((pct - expected).abs() < 1e-9, "{line}: {pct}");
        }
    }

    #[test]
    fn timestamp_without_fraction_parses() {
        let pct = parse_progress("time=00:01:00", 120.0, 30.0).unwrap();
        assert_eq!(pct, 50.0);
    }

    #[test]
    fn timestamp_wins_over_frame_marker() {
        let line = "frame=  300 fps=30 time=00:00:05.00 bitrate=...";
        let pct = parse_progress(line, 10.0, 30.0).unwrap();
        assert_eq!(pct, 50.0);
    }

    #[test]
    fn frame_marker_used_as_fallback() {
        let pct = parse_progress("frame=  150 fps=30 q=28.0", 10.0, 30.0).unwrap();
        assert_eq!(pct, 50.0);
    }

    #[test]
    fn percentage_clamped_to_100() {
        let pct = parse_progress("time=00:00:20.00", 10.0, 30.0).unwrap();
        assert_eq!(pct, 100.0);
        let pct = parse_progress("frame= 9000", 10.0, 30.0).unwrap();
        assert_eq!(pct, 100.0);
    }

    #[test]
    fn unrelated_lines_produce_no_signal() {
        assert!(parse_progress("Stream mapping:", 10.0, 30.0).is_none());
        assert!(parse_progress("", 10.0, 30.0).is_none());
    }

    #[test]
    fn tracker_suppresses_regressions_and_repeats() {
        let mut tracker = ProgressTracker::new(10.0, 30.0);
        assert_eq!(tracker.observe("time=00:00:05.00"), Some(50.0));
        // Same value again: no update.
        assert_eq!(tracker.observe("time=00:00:05.00"), None);
        // A frame-based estimate below the high-water mark: no update.
        assert_eq!(tracker.observe("frame= 30"), None);
        // Strictly greater: update.
        assert_eq!(tracker.observe("time=00:00:06.00"), Some(60.0));
        assert_eq!(tracker.last(), 60.0);
    }

    #[test]
    fn tracker_rounds_to_two_decimals() {
        let mut tracker = ProgressTracker::new(3.0, 30.0);
        // 1/3 of the way: 33.333...%
        let pct = tracker.observe("time=00:00:01.00").unwrap();
        assert_eq!(pct, 33.33);
    }

    #[test]
    fn zero_duration_never_signals() {
        assert!(parse_progress("time=00:00:05.00", 0.0, 30.0).is_none());
    }
}
