//! Byte-level diff engine.
//!
//! Myers shortest-edit-script over raw capture bytes, hunk grouping with
//! small-Equal absorption, and post-hoc location of an injected message
//! inside a before/after capture pair.

mod hunk;
mod myers;

pub use hunk::{find_nudge_in_diff, group_hunks, Hunk, NudgeSplice, MIN_EQUAL_TO_BREAK_HUNK};
pub use myers::{myers_diff, DiffOp};
