//! Input debouncer for typeahead
//!
//! Accumulates keystrokes within a configurable time window and releases only
//! the last value once input has been quiet for the whole window. Values equal
//! to the last released one are swallowed, so retyping the same term does not
//! trigger another request.

use std::time::{Duration, Instant};

/// Debouncer that keeps the latest input within a time window
#[derive(Debug, Clone)]
pub struct InputDebouncer {
    window: Duration,
    /// Latest input not yet released
    pending: Option<String>,
    /// Time of the last input
    last_input: Option<Instant>,
    /// Last value released by `flush`
    last_emitted: Option<String>,
}

impl InputDebouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: None,
            last_input: None,
            last_emitted: None,
        }
    }

    /// Record an input observed at `now`. Restarts the window.
    pub fn push_at(&mut self, value: impl Into<String>, now: Instant) {
        self.pending = Some(value.into());
        self.last_input = Some(now);
    }

    /// Check if the debounce window has elapsed since the last input
    pub fn is_ready_at(&self, now: Instant) -> bool {
        match (self.last_input, &self.pending) {
            (Some(last), Some(_)) => now.saturating_duration_since(last) >= self.window,
            _ => false,
        }
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Time until the pending input is released (None if nothing is pending)
    pub fn time_until_ready_at(&self, now: Instant) -> Option<Duration> {
        self.pending.as_ref()?;
        self.last_input
            .map(|last| self.window.saturating_sub(now.saturating_duration_since(last)))
    }

    /// Release the pending input if the window has elapsed. Returns None when
    /// nothing is ready or the value repeats the last released one.
    pub fn flush_at(&mut self, now: Instant) -> Option<String> {
        if !self.is_ready_at(now) {
            return None;
        }
        let value = self.pending.take()?;
        self.last_input = None;

        if self.last_emitted.as_deref() == Some(value.as_str()) {
            tracing::trace!(term = %value, "Suppressed repeated typeahead input");
            return None;
        }
        self.last_emitted = Some(value.clone());
        Some(value)
    }

    /// Drop pending input and forget the last released value
    pub fn clear(&mut self) {
        self.pending = None;
        self.last_input = None;
        self.last_emitted = None;
    }
}
