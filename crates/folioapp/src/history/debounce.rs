use chrono::{DateTime, Duration, Utc};

/// A single cancellable delayed commit.
///
/// Each `schedule` replaces the pending payload and restarts the window, so a burst of
/// calls collapses into the last one. Nothing fires on its own: the owner polls with the
/// current time, which keeps the core free of timers and threads.
#[derive(Debug)]
pub struct Debouncer<P> {
    window: Duration,
    pending: Option<Pending<P>>,
}

#[derive(Debug)]
struct Pending<P> {
    payload: P,
    due: DateTime<Utc>,
}

impl<P> Debouncer<P> {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: None,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn schedule(&mut self, payload: P, now: DateTime<Utc>) {
        self.pending = Some(Pending {
            payload,
            due: now + self.window,
        });
    }

    /// Take the payload if its window has elapsed at `now`.
    pub fn take_due(&mut self, now: DateTime<Utc>) -> Option<P> {
        match &self.pending {
            Some(pending) if pending.due <= now => self.take(),
            _ => None,
        }
    }

    /// Take the payload regardless of the window.
    pub fn take(&mut self) -> Option<P> {
        self.pending.take().map(|pending| pending.payload)
    }

    pub fn cancel(&mut self) -> bool {
        self.pending.take().is_some()
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn deadline(&self) -> Option<DateTime<Utc>> {
        self.pending.as_ref().map(|pending| pending.due)
    }
}
