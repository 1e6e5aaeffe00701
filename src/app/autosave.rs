use std::time::{Duration, Instant};

use crate::form::SaveMode;

/// Shared save timer for the whole builder.
///
/// Debounced requests restart the window; an immediate request is due on
/// the next tick and absorbs any pending debounced one. Changes on different
/// cards coalesce into the same window.
#[derive(Debug, Clone)]
pub struct AutosaveScheduler {
    window: Duration,
    deadline: Option<Instant>,
}

impl AutosaveScheduler {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            deadline: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn request(&mut self, mode: SaveMode, now: Instant) {
        match mode {
            SaveMode::Debounced => self.debounce(now),
            SaveMode::Immediate => self.deadline = Some(now),
        }
    }

    /// Cancels any pending timer and starts a fresh window from `now`.
    pub fn debounce(&mut self, now: Instant) {
        self.deadline = Some(now + self.window);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    /// Returns `true` exactly once per window, when its deadline has passed.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}
