//! nudgemux-core - nudge delivery for terminal-multiplexer panes
//!
//! Injects a short message into the input line of an interactive TUI
//! running in a tmux pane, submits it as if typed by the user, and
//! restores whatever the user was typing when the nudge arrived.
//!
//! The protocol knows nothing about the target TUI. Input recovery works
//! by diffing the pane before and after clearing and detecting
//! continuation prefixes dynamically; no prompt glyphs, separator
//! patterns, or client state machines appear in the extraction path.
//! Decisions that require interpreting the TUI belong to callers.

pub mod diff;
pub mod error;
pub mod nudge;
pub mod tmux;
mod types;

pub use error::{DriverError, NudgeError};
pub use nudge::Nudger;
pub use tmux::{KeyToken, PaneDriver, TmuxDriver};
pub use types::*;
