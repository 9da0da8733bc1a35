//! Pane driver trait and the live tmux adapter.

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, trace};

use crate::error::DriverError;
use crate::nudge::last_n_lines;

/// Named control tokens the protocol is allowed to send. Arbitrary text
/// goes through [`PaneDriver::send_literal`]; this set is closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyToken {
    /// Beginning of line in readline-style inputs. A modal editor in
    /// NORMAL mode treats it as increment-number instead, which the
    /// sentinel retry path compensates for.
    CtrlA,
    /// Kill to end of line.
    CtrlK,
    Enter,
    Escape,
    /// The `i` key, entering INSERT mode in modal editors.
    InsertI,
}

impl KeyToken {
    /// The `send-keys` spelling of the token.
    pub fn as_tmux(&self) -> &'static str {
        match self {
            KeyToken::CtrlA => "C-a",
            KeyToken::CtrlK => "C-k",
            KeyToken::Enter => "Enter",
            KeyToken::Escape => "Escape",
            KeyToken::InsertI => "i",
        }
    }
}

/// Opaque adapter to the terminal multiplexer.
///
/// Observable side effects are confined to the identified session.
#[async_trait]
pub trait PaneDriver: Send + Sync {
    /// Send a named control token.
    async fn send_raw(&self, session: &str, token: KeyToken) -> Result<(), DriverError>;

    /// Send a UTF-8 string as if typed verbatim. No backslash escapes, no
    /// control-sequence interpretation.
    async fn send_literal(&self, session: &str, text: &str) -> Result<(), DriverError>;

    /// Capture pane content joined into logical lines (wrapped visual
    /// rows merged), with trailing spaces per line stripped to counteract
    /// join padding. `line_hint` bounds the capture for cost control;
    /// `0` means all scrollback.
    async fn capture_all(&self, session: &str, line_hint: usize) -> Result<String, DriverError>;

    /// Capture exactly the last `n` logical lines.
    async fn capture_window(&self, session: &str, n: usize) -> Result<String, DriverError>;

    /// Whether the pane is in copy mode, search, or another modal state
    /// where keystrokes would not reach the TUI.
    async fn is_blocked(&self, session: &str) -> bool;

    /// Hint the multiplexer to redeliver recent output to clients that
    /// may have disconnected. Idempotent; failures are ignored.
    async fn wake(&self, session: &str);
}

/// Live adapter that shells out to `tmux`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TmuxDriver;

impl TmuxDriver {
    pub fn new() -> Self {
        Self
    }

    async fn run(&self, args: &[&str]) -> Result<String, DriverError> {
        trace!(args = ?args, "tmux");
        let output = Command::new("tmux").args(args).output().await?;
        if !output.status.success() {
            return Err(DriverError::CommandFailed {
                command: args.first().unwrap_or(&"tmux").to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim_end().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Wrap-joined capture of the last `last_lines` logical lines
    /// (`0` = all scrollback).
    async fn capture_joined(&self, session: &str, last_lines: usize) -> Result<String, DriverError> {
        let start = if last_lines == 0 { "-".to_string() } else { format!("-{last_lines}") };
        let raw = self
            .run(&["capture-pane", "-p", "-J", "-t", session, "-S", &start])
            .await?;
        Ok(depad(&raw))
    }
}

/// Strip per-line trailing spaces (the `-J` join pads short visual rows)
/// and trailing blank lines below the cursor.
fn depad(raw: &str) -> String {
    let mut lines: Vec<&str> = raw.lines().map(|l| l.trim_end_matches(' ')).collect();
    while matches!(lines.last(), Some(l) if l.is_empty()) {
        lines.pop();
    }
    lines.join("\n")
}

#[async_trait]
impl PaneDriver for TmuxDriver {
    async fn send_raw(&self, session: &str, token: KeyToken) -> Result<(), DriverError> {
        debug!(session = %session, token = token.as_tmux(), "send raw key");
        self.run(&["send-keys", "-t", session, token.as_tmux()]).await?;
        Ok(())
    }

    async fn send_literal(&self, session: &str, text: &str) -> Result<(), DriverError> {
        debug!(session = %session, bytes = text.len(), "send literal text");
        self.run(&["send-keys", "-t", session, "-l", "--", text]).await?;
        Ok(())
    }

    async fn capture_all(&self, session: &str, line_hint: usize) -> Result<String, DriverError> {
        self.capture_joined(session, line_hint).await
    }

    async fn capture_window(&self, session: &str, n: usize) -> Result<String, DriverError> {
        let joined = self.capture_joined(session, n).await?;
        Ok(last_n_lines(&joined, n).to_string())
    }

    async fn is_blocked(&self, session: &str) -> bool {
        let result = self
            .run(&["display-message", "-t", session, "-p", "#{pane_in_mode}"])
            .await;
        matches!(result, Ok(out) if out.trim() == "1")
    }

    async fn wake(&self, session: &str) {
        if let Err(err) = self.run(&["refresh-client", "-t", session]).await {
            debug!(session = %session, error = %err, "refresh-client failed");
        }
    }
}
