//! Cancellable single-slot timer used to debounce the search box.
//!
//! The event loop owns the clock: callers pass `Instant`s in and ask
//! [`Debouncer::poll`] whether the pending action is due. Scheduling again
//! replaces the pending action and pushes the deadline out, so a burst of
//! events yields exactly one action, one quiet period after the last event.
use std::time::{Duration, Instant};

/// Identifies one scheduled action. Stale once superseded, fired or cancelled.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TimerHandle(u64);

#[derive(Debug)]
struct Pending<A> {
    handle: TimerHandle,
    deadline: Instant,
    action: A,
}

#[derive(Debug)]
pub struct Debouncer<A> {
    delay: Duration,
    pending: Option<Pending<A>>,
    issued: u64,
}

impl<A> Debouncer<A> {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
            issued: 0,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Schedule `action` one quiet period after `now`, replacing whatever was pending.
    pub fn schedule(&mut self, now: Instant, action: A) -> TimerHandle {
        self.schedule_in(now, self.delay, action)
    }

    pub fn schedule_in(&mut self, now: Instant, delay: Duration, action: A) -> TimerHandle {
        self.issued += 1;
        let handle = TimerHandle(self.issued);
        self.pending = Some(Pending {
            handle,
            deadline: now + delay,
            action,
        });
        handle
    }

    /// Cancel `handle` if it is still the pending one.
    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        if self.is_pending(handle) {
            self.pending = None;
            true
        } else {
            false
        }
    }

    /// Drop the pending action, whatever it is.
    pub fn clear(&mut self) {
        self.pending = None;
    }

    /// Take the pending action immediately, ignoring its deadline.
    pub fn flush(&mut self) -> Option<A> {
        self.pending.take().map(|p| p.action)
    }

    pub fn is_pending(&self, handle: TimerHandle) -> bool {
        self.pending.as_ref().is_some_and(|p| p.handle == handle)
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|p| p.deadline)
    }

    /// Time left until the pending action is due; zero when overdue.
    pub fn time_until(&self, now: Instant) -> Option<Duration> {
        self.deadline().map(|d| d.saturating_duration_since(now))
    }

    /// Yield the pending action once its deadline has passed.
    pub fn poll(&mut self, now: Instant) -> Option<A> {
        match &self.pending {
            Some(p) if now >= p.deadline => self.flush(),
            _ => None,
        }
    }
}
