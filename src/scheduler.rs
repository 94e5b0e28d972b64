//! Cooperative timer queue.
//!
//! The engine never blocks: buffer flushes, throttled renders, and cursor
//! blinking are all expressed as timers whose payloads the owner interprets
//! when [`Scheduler::due`] hands them back. Time is passed in explicitly so
//! the queue is deterministic under test.

use std::time::{Duration, Instant};

/// Handle for cancelling or un-referencing a timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(u64);

#[derive(Debug)]
struct Timer<T> {
    id: TimerId,
    due: Instant,
    interval: Option<Duration>,
    unref: bool,
    payload: T,
}

/// One-shot and repeating timers carrying a payload of type `T`.
#[derive(Debug)]
pub struct Scheduler<T> {
    next_id: u64,
    timers: Vec<Timer<T>>,
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self { next_id: 1, timers: Vec::new() }
    }
}

impl<T: Clone> Scheduler<T> {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, due: Instant, interval: Option<Duration>, payload: T) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.timers.push(Timer { id, due, interval, unref: false, payload });
        id
    }

    /// Fire `payload` once, `delay` after `now`.
    pub fn after(&mut self, now: Instant, delay: Duration, payload: T) -> TimerId {
        self.push(now + delay, None, payload)
    }

    /// Fire `payload` every `interval`, first at `now + interval`.
    pub fn every(&mut self, now: Instant, interval: Duration, payload: T) -> TimerId {
        self.push(now + interval, Some(interval), payload)
    }

    /// Mark a timer as not keeping the event loop alive.
    pub fn unref(&mut self, id: TimerId) {
        if let Some(t) = self.timers.iter_mut().find(|t| t.id == id) {
            t.unref = true;
        }
    }

    /// Drop a timer. Returns false if it already fired or was cancelled.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        let before = self.timers.len();
        self.timers.retain(|t| t.id != id);
        self.timers.len() != before
    }

    pub fn is_pending(&self, id: TimerId) -> bool {
        self.timers.iter().any(|t| t.id == id)
    }

    /// Collect payloads whose deadline has passed, in deadline order.
    ///
    /// One-shot timers are removed; repeating timers are rescheduled from
    /// `now`, so a stalled loop does not produce a burst of catch-up fires.
    pub fn due(&mut self, now: Instant) -> Vec<T> {
        let mut fired: Vec<(Instant, u64, T)> = Vec::new();
        self.timers.retain_mut(|t| {
            if t.due > now {
                return true;
            }
            fired.push((t.due, t.id.0, t.payload.clone()));
            match t.interval {
                Some(iv) => {
                    t.due = now + iv;
                    true
                }
                None => false,
            }
        });
        fired.sort_by_key(|(due, id, _)| (*due, *id));
        fired.into_iter().map(|(_, _, p)| p).collect()
    }

    /// Earliest pending deadline.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.iter().map(|t| t.due).min()
    }

    /// True while any referenced timer is pending.
    pub fn keeps_alive(&self) -> bool {
        self.timers.iter().any(|t| !t.unref)
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }
}
