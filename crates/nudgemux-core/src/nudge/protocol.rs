//! Protocol orchestration: pre-checks, clear, diff, inject, restore.

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::error::NudgeError;
use crate::tmux::{KeyToken, PaneDriver};
use crate::types::NudgeRequest;

use super::extract::extract_original_input;
use super::sentinel::{find_sentinel_from_end, make_sentinel, CycleDetector};
use super::{
    CLEAR_ITER_DELAY, DIFF_MARGIN_LINES, ENTER_DELAY, INJECT_DELAY, MAX_CLEAR_ITERATIONS,
    MIN_CAPTURE_N, PASTE_SCAN_LINES, SENTINEL_DELAY,
};

/// Matches the placeholder Claude Code shows for a large in-progress
/// paste, e.g. `[Pasted text #3 +47 lines]`.
///
/// NOTE: this is a client-specific early-out and the only client pattern
/// in the crate. The protocol works without it - the check merely avoids
/// clearing while a large paste is in flight, which would corrupt the
/// pasted content. Other clients' markers can be added to the regex;
/// never to the extraction algorithm.
static PASTE_PLACEHOLDER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[Pasted text #\d+ \+\d+ lines\]").unwrap());

/// Bounded history of the convergence-loop cycle detector.
const CYCLE_HISTORY: usize = 8;

/// Delivers nudges to panes through a [`PaneDriver`].
///
/// One [`Nudger::deliver`] call drives one pane sequentially from
/// pre-checks to restoration. Deliveries to distinct panes are fully
/// independent; two deliveries against the same pane race on the clear
/// keystrokes and must be serialized by the caller.
pub struct Nudger {
    driver: Arc<dyn PaneDriver>,
}

impl Nudger {
    pub fn new(driver: Arc<dyn PaneDriver>) -> Self {
        Self { driver }
    }

    /// Deliver `message` into the input line of `session`, submit it as
    /// if typed, and restore whatever the user was typing.
    ///
    /// Submission is not verified afterwards: the TUI may wrap, style, or
    /// echo the text into its log, so exact matching is unreliable.
    /// Reliability comes from the clear-before-inject discipline.
    pub async fn deliver(&self, session: &str, message: &str) -> Result<(), NudgeError> {
        if self.driver.is_blocked(session).await {
            return Err(NudgeError::PaneBlocked);
        }
        if self.paste_placeholder_visible(session).await {
            return Err(NudgeError::PasteDetected);
        }

        let (original_capture, capture_n) = self.clear_input(session).await?;

        let cleared_capture = self
            .driver
            .capture_all(session, capture_n + DIFF_MARGIN_LINES)
            .await?;
        let original_input = extract_original_input(&original_capture, &cleared_capture, capture_n);

        self.driver.send_literal(session, message).await?;
        sleep(INJECT_DELAY).await;
        self.driver.send_raw(session, KeyToken::Enter).await?;

        if !original_input.is_empty() {
            sleep(ENTER_DELAY).await;
            debug!(session = %session, bytes = original_input.len(), "restoring user input");
            if let Err(err) = self.driver.send_literal(session, &original_input).await {
                warn!(session = %session, error = %err, "failed to restore user input");
            }
        }

        self.driver.wake(session).await;
        info!(session = %session, bytes = message.len(), "nudge delivered");
        Ok(())
    }

    /// Convenience wrapper for a request value.
    pub async fn deliver_request(&self, request: &NudgeRequest) -> Result<(), NudgeError> {
        self.deliver(&request.session, &request.message).await
    }

    async fn paste_placeholder_visible(&self, session: &str) -> bool {
        match self.driver.capture_window(session, PASTE_SCAN_LINES).await {
            Ok(tail) => PASTE_PLACEHOLDER_RE.is_match(&tail),
            Err(_) => false,
        }
    }

    /// Capture the untouched pane, locate the input region with a
    /// sentinel, and convergence-clear it. Returns the untouched capture
    /// and the window size N in logical lines from the bottom.
    ///
    /// The untouched capture happens before the sentinel goes in:
    /// inserting the sentinel can change word wrap, and the diff must see
    /// the original wrap points. The sentinel probe takes its own full
    /// capture because the cursor may sit anywhere in a large multi-line
    /// input, not just on the last line.
    async fn clear_input(&self, session: &str) -> Result<(String, usize), NudgeError> {
        let original_capture = self.driver.capture_all(session, 0).await?;

        let mut sentinel = make_sentinel();
        self.driver.send_raw(session, KeyToken::CtrlA).await?;
        self.driver.send_literal(session, &sentinel).await?;
        sleep(SENTINEL_DELAY).await;

        let probe = self.driver.capture_all(session, 0).await?;
        let hit = match find_sentinel_from_end(&probe, &sentinel) {
            Some(hit) => hit,
            None => {
                // The pane may host a modal editor in NORMAL mode, where
                // C-a incremented a number and the sentinel ran as
                // commands. Force INSERT mode and retry once with a fresh
                // sentinel in case the old one was partially inserted.
                debug!(session = %session, "sentinel not found, retrying in insert mode");
                let _ = self.driver.send_raw(session, KeyToken::Escape).await;
                sleep(SENTINEL_DELAY).await;
                let _ = self.driver.send_raw(session, KeyToken::InsertI).await;
                sleep(SENTINEL_DELAY).await;

                sentinel = make_sentinel();
                self.driver.send_raw(session, KeyToken::CtrlA).await?;
                self.driver.send_literal(session, &sentinel).await?;
                sleep(SENTINEL_DELAY).await;

                let probe = self.driver.capture_all(session, 0).await?;
                find_sentinel_from_end(&probe, &sentinel).ok_or(NudgeError::SentinelNotFound)?
            }
        };

        let capture_n = (hit.from_bottom + 2).max(MIN_CAPTURE_N);
        debug!(session = %session, capture_n, "input region located");

        self.convergence_clear(session, capture_n).await?;
        Ok((original_capture, capture_n))
    }

    /// Send C-a + C-k until two consecutive windowed captures are
    /// byte-identical, meaning the input field is empty. Each input line
    /// takes ~2 iterations: one for the content, one for the newline.
    ///
    /// The cycle detector aborts oscillation - e.g. a modal editor where
    /// C-k opens a digraph prompt that the next C-a dismisses, which
    /// would otherwise loop until the iteration cap.
    async fn convergence_clear(&self, session: &str, capture_n: usize) -> Result<(), NudgeError> {
        let mut prev = self.driver.capture_window(session, capture_n).await?;
        let mut detector = CycleDetector::new(CYCLE_HISTORY);

        for iteration in 0..MAX_CLEAR_ITERATIONS {
            self.driver.send_raw(session, KeyToken::CtrlA).await?;
            self.driver.send_raw(session, KeyToken::CtrlK).await?;
            sleep(CLEAR_ITER_DELAY).await;

            let cur = self.driver.capture_window(session, capture_n).await?;
            if cur == prev {
                debug!(session = %session, iterations = iteration + 1, "input clear converged");
                return Ok(());
            }
            if detector.check(&cur) {
                return Err(NudgeError::ClearStalled);
            }
            prev = cur;
        }

        Err(NudgeError::ClearIterationLimitExceeded(MAX_CLEAR_ITERATIONS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tmux::script::{ScriptedPane, Sent};

    fn nudger(pane: ScriptedPane) -> (Nudger, Arc<ScriptedPane>) {
        let pane = Arc::new(pane);
        (Nudger::new(pane.clone()), pane)
    }

    #[test]
    fn test_paste_placeholder_regex() {
        assert!(PASTE_PLACEHOLDER_RE.is_match("❯ [Pasted text #3 +47 lines]"));
        assert!(PASTE_PLACEHOLDER_RE.is_match("[Pasted text #12 +1 lines]"));
        assert!(!PASTE_PLACEHOLDER_RE.is_match("[Pasted text]"));
        assert!(!PASTE_PLACEHOLDER_RE.is_match("❯ regular input"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_deliver_blocked_pane() {
        let mut pane = ScriptedPane::new(&[], &[]);
        pane.blocked = true;
        let (nudger, pane) = nudger(pane);

        let result = nudger.deliver("agent:0.0", "hello").await;
        assert!(matches!(result, Err(NudgeError::PaneBlocked)));
        assert!(pane.sent_keys().is_empty(), "no keystrokes on a blocked pane");
    }

    #[tokio::test(start_paused = true)]
    async fn test_deliver_paste_detected() {
        let pane = ScriptedPane::new(&[], &["❯ [Pasted text #3 +47 lines]"]);
        let (nudger, pane) = nudger(pane);

        let result = nudger.deliver("agent:0.0", "hello").await;
        assert!(matches!(result, Err(NudgeError::PasteDetected)));
        assert!(pane.sent_keys().is_empty(), "no keystrokes during a paste");
    }

    #[tokio::test(start_paused = true)]
    async fn test_deliver_restores_user_input() {
        let original = "output line 1\noutput line 2\n❯ hello world";
        let probe = "output line 1\noutput line 2\n❯ <LIT>hello world";
        let cleared = "output line 1\noutput line 2\n❯ ";
        let pane = ScriptedPane::new(&[original, probe, cleared], &["output tail", "❯ ", "❯ "]);
        let (nudger, pane) = nudger(pane);

        nudger.deliver("agent:0.0", "status update please").await.expect("delivery");

        let sent = pane.sent_keys();
        assert_eq!(sent.len(), 7, "unexpected interaction sequence: {:?}", sent);
        assert_eq!(sent[0], Sent::Raw(KeyToken::CtrlA));
        let Sent::Literal(sentinel) = &sent[1] else {
            panic!("expected sentinel literal, got {:?}", sent[1]);
        };
        assert!(sentinel.starts_with('§') && sentinel.ends_with('§'));
        assert_eq!(sent[2], Sent::Raw(KeyToken::CtrlA));
        assert_eq!(sent[3], Sent::Raw(KeyToken::CtrlK));
        assert_eq!(sent[4], Sent::Literal("status update please".to_string()));
        assert_eq!(sent[5], Sent::Raw(KeyToken::Enter));
        assert_eq!(sent[6], Sent::Literal("hello world".to_string()));
        assert!(*pane.woken.lock().expect("lock"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_deliver_empty_input_skips_restore() {
        let original = "output\n❯ ";
        let probe = "output\n❯ <LIT>";
        let cleared = "output\n❯ ";
        let pane = ScriptedPane::new(&[original, probe, cleared], &["tail", "❯ ", "❯ "]);
        let (nudger, pane) = nudger(pane);

        nudger.deliver("agent:0.0", "ping").await.expect("delivery");

        let sent = pane.sent_keys();
        assert_eq!(
            sent.last(),
            Some(&Sent::Raw(KeyToken::Enter)),
            "nothing to restore: Enter must be the last interaction"
        );
        assert_eq!(
            sent.iter().filter(|s| matches!(s, Sent::Literal(_))).count(),
            2,
            "only the sentinel and the message are sent as literals"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_deliver_sentinel_never_appears() {
        // Neither probe contains the sentinel: a pane that eats input.
        let pane = ScriptedPane::new(
            &["❯ output", "❯ output", "❯ output"],
            &["tail"],
        );
        let (nudger, pane) = nudger(pane);

        let result = nudger.deliver("agent:0.0", "hello").await;
        assert!(matches!(result, Err(NudgeError::SentinelNotFound)));

        // The modal-editor retry must have been attempted.
        let sent = pane.sent_keys();
        assert!(sent.contains(&Sent::Raw(KeyToken::Escape)));
        assert!(sent.contains(&Sent::Raw(KeyToken::InsertI)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_deliver_clear_oscillation_stalls() {
        // Window captures repeat a previously seen state: A, B, A.
        let pane = ScriptedPane::new(
            &["❯ input", "❯ <LIT>input"],
            &["tail", "start", "state A", "state B", "state A"],
        );
        let (nudger, _pane) = nudger(pane);

        let result = nudger.deliver("agent:0.0", "hello").await;
        assert!(matches!(result, Err(NudgeError::ClearStalled)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_deliver_clear_iteration_limit() {
        // Every windowed capture is distinct: the pane never converges.
        let pane = ScriptedPane::new(&["❯ input", "❯ <LIT>input"], &["tail"]);
        let (nudger, _pane) = nudger(pane);

        let result = nudger.deliver("agent:0.0", "hello").await;
        assert!(matches!(
            result,
            Err(NudgeError::ClearIterationLimitExceeded(MAX_CLEAR_ITERATIONS))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_deliver_request_wrapper() {
        let pane = ScriptedPane::new(
            &["❯ ", "❯ <LIT>", "❯ "],
            &["tail", "w", "w"],
        );
        let (nudger, pane) = nudger(pane);

        let request = NudgeRequest {
            session: "agent:0.0".to_string(),
            message: "ping".to_string(),
        };
        nudger.deliver_request(&request).await.expect("delivery");
        assert!(pane.sent_keys().contains(&Sent::Literal("ping".to_string())));
    }
}
