//! Shared public types.

use serde::{Deserialize, Serialize};

/// A single nudge to deliver: the target pane and the literal message.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NudgeRequest {
    /// Target identifier the multiplexer understands
    /// (a session name, or `session:window.pane`).
    pub session: String,
    /// Message text, injected exactly as provided.
    pub message: String,
}
