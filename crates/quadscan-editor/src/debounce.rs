//! Latest-wins coalescing of rapid triggers.

use std::time::Duration;

use web_time::Instant;

/// Coalesces triggers arriving within `window` of each other into one
/// value: the latest.
///
/// Sans-IO: the host supplies the clock and decides how to wait. Each
/// trigger pushes the deadline out to `now + window`.
#[derive(Debug, Clone)]
pub struct Debouncer<T> {
    window: Duration,
    pending: Option<(T, Instant)>,
}

impl<T> Debouncer<T> {
    /// Create an idle debouncer.
    #[must_use]
    pub const fn new(window: Duration) -> Self {
        Self {
            window,
            pending: None,
        }
    }

    /// Record `value`, replacing any pending one. Returns the new
    /// deadline.
    pub fn trigger(&mut self, value: T, now: Instant) -> Instant {
        let deadline = now + self.window;
        self.pending = Some((value, deadline));
        deadline
    }

    /// Take the pending value if its deadline has passed.
    pub fn take_due(&mut self, now: Instant) -> Option<T> {
        if self.deadline().is_some_and(|deadline| now >= deadline) {
            self.cancel()
        } else {
            None
        }
    }

    /// Deadline of the pending value.
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(_, deadline)| *deadline)
    }

    /// Pending value, if any.
    #[must_use]
    pub fn peek(&self) -> Option<&T> {
        self.pending.as_ref().map(|(value, _)| value)
    }

    /// Whether a value is waiting.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Drop the pending value.
    pub fn cancel(&mut self) -> Option<T> {
        self.pending.take().map(|(value, _)| value)
    }

    /// Coalescing window.
    #[must_use]
    pub const fn window(&self) -> Duration {
        self.window
    }
}
