//! Error taxonomy for nudge delivery.
//!
//! Each variant means something a caller can act on distinctly. No step
//! of the protocol masks one kind into another.

use thiserror::Error;

/// Failure from the underlying multiplexer adapter.
#[derive(Debug, Error)]
pub enum DriverError {
    /// The tmux subcommand exited non-zero.
    #[error("tmux {command} failed: {stderr}")]
    CommandFailed { command: String, stderr: String },

    /// Spawning or waiting on the tmux process failed.
    #[error("tmux io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Why a delivery attempt did not complete.
#[derive(Debug, Error)]
pub enum NudgeError {
    /// Pane is in copy mode, search, or another modal state where
    /// keystrokes would not reach the TUI. Retry after the user leaves it.
    #[error("pane is in copy mode or another blocking state")]
    PaneBlocked,

    /// A large-paste placeholder is visible; clearing now would corrupt
    /// the pasted content. Retry later.
    #[error("large paste placeholder detected in input")]
    PasteDetected,

    /// The sentinel never appeared in a capture, even after the
    /// modal-editor retry. The input field is unreachable right now.
    #[error("sentinel not found after modal-editor retry")]
    SentinelNotFound,

    /// The convergence clear loop oscillated between states instead of
    /// settling, typically a modal editor interpreting C-k. Do not retry
    /// blindly; surface to operators.
    #[error("input clearing stalled (oscillating state detected)")]
    ClearStalled,

    /// The clear loop hit its iteration cap: extremely long input or a
    /// slow TUI. May be retried with a larger cap.
    #[error("convergence clear exceeded {0} iterations")]
    ClearIterationLimitExceeded(usize),

    /// The multiplexer command itself failed.
    #[error("pane driver failure: {0}")]
    Driver(#[from] DriverError),
}
