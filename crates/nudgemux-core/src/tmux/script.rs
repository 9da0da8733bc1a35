//! Scripted pane driver for tests.
//!
//! Full captures and windowed captures are queued per call; every sent
//! key and literal is recorded so tests can assert the exact interaction
//! sequence without a live multiplexer. A full-capture entry may contain
//! the `<LIT>` marker, which is replaced with the most recently sent
//! literal - this is how a scripted probe capture "contains" a sentinel
//! the test cannot know in advance.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use super::driver::{KeyToken, PaneDriver};
use crate::error::DriverError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Sent {
    Raw(KeyToken),
    Literal(String),
}

#[derive(Default)]
pub(crate) struct ScriptedPane {
    pub blocked: bool,
    /// Queued results for `capture_all`, popped per call.
    pub full_captures: Mutex<VecDeque<String>>,
    /// Queued results for `capture_window`, popped per call. Once the
    /// queue drains, each call returns a fresh unique state (a pane that
    /// never converges).
    pub window_captures: Mutex<VecDeque<String>>,
    pub sent: Mutex<Vec<Sent>>,
    pub woken: Mutex<bool>,
    fallback_counter: Mutex<u64>,
}

impl ScriptedPane {
    pub fn new(full: &[&str], windows: &[&str]) -> Self {
        Self {
            full_captures: Mutex::new(full.iter().map(|s| s.to_string()).collect()),
            window_captures: Mutex::new(windows.iter().map(|s| s.to_string()).collect()),
            ..Self::default()
        }
    }

    pub fn sent_keys(&self) -> Vec<Sent> {
        self.sent.lock().expect("lock").clone()
    }

    pub fn last_literal(&self) -> Option<String> {
        self.sent
            .lock()
            .expect("lock")
            .iter()
            .rev()
            .find_map(|s| match s {
                Sent::Literal(text) => Some(text.clone()),
                Sent::Raw(_) => None,
            })
    }
}

#[async_trait]
impl PaneDriver for ScriptedPane {
    async fn send_raw(&self, _session: &str, token: KeyToken) -> Result<(), DriverError> {
        self.sent.lock().expect("lock").push(Sent::Raw(token));
        Ok(())
    }

    async fn send_literal(&self, _session: &str, text: &str) -> Result<(), DriverError> {
        self.sent.lock().expect("lock").push(Sent::Literal(text.to_string()));
        Ok(())
    }

    async fn capture_all(&self, _session: &str, _line_hint: usize) -> Result<String, DriverError> {
        let template = self
            .full_captures
            .lock()
            .expect("lock")
            .pop_front()
            .unwrap_or_default();
        Ok(template.replace("<LIT>", &self.last_literal().unwrap_or_default()))
    }

    async fn capture_window(&self, _session: &str, _n: usize) -> Result<String, DriverError> {
        if let Some(capture) = self.window_captures.lock().expect("lock").pop_front() {
            return Ok(capture);
        }
        let mut counter = self.fallback_counter.lock().expect("lock");
        *counter += 1;
        Ok(format!("distinct window state {counter}"))
    }

    async fn is_blocked(&self, _session: &str) -> bool {
        self.blocked
    }

    async fn wake(&self, _session: &str) {
        *self.woken.lock().expect("lock") = true;
    }
}
