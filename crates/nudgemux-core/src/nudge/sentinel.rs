//! Sentinel generation and convergence-loop cycle detection.

use chrono::Utc;
use data_encoding::BASE32;
use sha2::{Digest, Sha256};

/// Generate a unique sentinel like `§XXXX§`.
///
/// The inner 4 characters are base32 of the first bytes of a SHA-256 over
/// the current nanosecond timestamp. The sentinel has one job: to be
/// uniquely locatable in a capture. It is always inserted at the
/// beginning of a logical line, so the multiplexer cannot wrap it across
/// two rows.
pub fn make_sentinel() -> String {
    let ts = Utc::now().timestamp_nanos_opt().unwrap_or_default();
    let digest = Sha256::digest(ts.to_string().as_bytes());
    let mut encoded = BASE32.encode(&digest[..3]);
    while encoded.ends_with('=') {
        encoded.pop();
    }
    encoded.truncate(4);
    format!("§{encoded}§")
}

/// Where a sentinel was found in a capture.
pub(crate) struct SentinelHit {
    /// Logical lines between the sentinel line and the bottom of the pane.
    pub from_bottom: usize,
}

/// Search backward through the capture's lines for the sentinel.
pub(crate) fn find_sentinel_from_end(capture: &str, sentinel: &str) -> Option<SentinelHit> {
    let lines: Vec<&str> = capture.split('\n').collect();
    lines
        .iter()
        .rposition(|line| line.contains(sentinel))
        .map(|i| SentinelHit { from_bottom: lines.len() - 1 - i })
}

/// Tracks recent states of a convergence loop to detect oscillation.
///
/// A state seen twice within the bounded history means the loop is
/// cycling rather than converging. The caller handles convergence itself
/// by comparing consecutive states, so the detector only ever sees
/// distinct non-previous states.
pub(crate) struct CycleDetector {
    recent: Vec<String>,
    max_len: usize,
}

impl CycleDetector {
    pub fn new(max_len: usize) -> Self {
        Self { recent: Vec::with_capacity(max_len), max_len }
    }

    /// True if `state` was seen before; otherwise records it.
    pub fn check(&mut self, state: &str) -> bool {
        if self.recent.iter().any(|seen| seen == state) {
            return true;
        }
        self.recent.push(state.to_string());
        if self.recent.len() > self.max_len {
            self.recent.remove(0);
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinel_format() {
        let s = make_sentinel();
        assert!(s.starts_with('§'), "sentinel should start with a section sign: {:?}", s);
        assert!(s.ends_with('§'), "sentinel should end with a section sign: {:?}", s);

        let inner = &s['§'.len_utf8()..s.len() - '§'.len_utf8()];
        assert!(inner.len() <= 4, "inner should be at most 4 chars: {:?}", inner);
        assert!(inner.bytes().all(|b| b.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_sentinels_differ() {
        assert_ne!(make_sentinel(), make_sentinel());
    }

    #[test]
    fn test_find_sentinel_from_end() {
        let capture = "some output\nmore output\n❯ §TEST§hello world\n";
        let hit = find_sentinel_from_end(capture, "§TEST§").expect("sentinel present");
        assert_eq!(hit.from_bottom, 1);
    }

    #[test]
    fn test_find_sentinel_missing() {
        assert!(find_sentinel_from_end("no\nsentinel\nhere", "§NOPE§").is_none());
    }

    #[test]
    fn test_cycle_detector_distinct_states() {
        let mut d = CycleDetector::new(4);
        assert!(!d.check("a"));
        assert!(!d.check("b"));
        assert!(!d.check("c"));
        assert!(!d.check("d"));
    }

    #[test]
    fn test_cycle_detector_fires_on_repeat() {
        let mut d = CycleDetector::new(4);
        d.check("state-A");
        d.check("state-B");
        assert!(d.check("state-A"), "A-B-A oscillation must be detected");
    }

    #[test]
    fn test_cycle_detector_window_eviction() {
        let mut d = CycleDetector::new(2);
        d.check("old");
        d.check("newer");
        d.check("newest"); // evicts "old"
        assert!(!d.check("old"), "evicted state must not trigger detection");
    }

    #[test]
    fn test_cycle_detector_long_distinct_run() {
        // More distinct states than the window holds: never fires.
        let mut d = CycleDetector::new(4);
        for i in 0..10 {
            assert!(!d.check(&format!("state-{i}")));
        }
    }
}
