//! The nudge delivery protocol.
//!
//! Flow: pre-checks, sentinel clear, diff-based input recovery, inject,
//! submit, restore. The input extraction path is strictly client-agnostic
//! (see [`extract`]); the single client-specific early-out lives in the
//! pre-checks and is marked at its point of use.

pub mod extract;
mod protocol;
mod sentinel;

use std::time::Duration;

pub use extract::{detect_continuation_prefix, extract_original_input, last_n_lines};
pub use protocol::Nudger;
pub use sentinel::make_sentinel;

/// Wait after sentinel insertion for the TUI to render.
pub const SENTINEL_DELAY: Duration = Duration::from_millis(50);

/// Wait after each C-a + C-k for the TUI to render. Skipping a delay
/// before a capture produces partial renders and a wrong window size.
pub const CLEAR_ITER_DELAY: Duration = Duration::from_millis(50);

/// Wait after injecting the message before Enter.
pub const INJECT_DELAY: Duration = Duration::from_millis(100);

/// Wait after Enter, letting the TUI settle, before restoring the
/// user's input.
pub const ENTER_DELAY: Duration = Duration::from_millis(200);

/// How many trailing lines to scan for a paste placeholder.
pub const PASTE_SCAN_LINES: usize = 50;

/// Hard upper bound on convergence-clear iterations. Each input line
/// takes ~2 iterations (content, then the newline), so 200 supports
/// inputs of ~100 lines.
pub const MAX_CLEAR_ITERATIONS: usize = 200;

/// Minimum window size, in logical lines, for convergence captures.
pub const MIN_CAPTURE_N: usize = 5;

/// Extra lines added to the window when trimming captures before the
/// diff, so the region still holds the full input after wrap-joining
/// reduces the line count.
pub const DIFF_MARGIN_LINES: usize = 20;
