//! Per-context timer scheduling for `setTimeout`/`setInterval`.
//!
//! The scheduler only keeps the queue; firing is driven by the owner, which
//! takes the due timers out and invokes them outside any lock so a callback
//! may register or cancel timers itself. Timers with equal deadlines fire in
//! registration order.

use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, Instant};

/// Stable per-context timer identifier. Never zero, never reused.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(pub u64);

/// Whether a timer fires once or repeats.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TimerKind {
    Timeout,
    Interval,
}

/// Queue position: deadline first, then registration sequence.
type QueueKey = (Instant, u64);

struct TimerEntry<F> {
    id: TimerId,
    kind: TimerKind,
    delay: Duration,
    callback: F,
}

/// A timer whose deadline has elapsed, handed to the owner for invocation.
#[derive(Debug, Clone)]
pub struct DueTimer<F> {
    pub id: TimerId,
    pub kind: TimerKind,
    pub callback: F,
}

/// Deadline-ordered timer queue.
pub struct TimerScheduler<F> {
    queue: BTreeMap<QueueKey, TimerEntry<F>>,
    index: HashMap<TimerId, QueueKey>,
    next_id: u64,
    next_seq: u64,
}

impl<F: Clone> TimerScheduler<F> {
    /// Create an empty scheduler; the first timer gets id 1.
    pub fn new() -> Self {
        Self { queue: BTreeMap::new(), index: HashMap::new(), next_id: 1, next_seq: 0 }
    }

    /// Register a one-shot callback due `delay` after `now`.
    pub fn set_timeout_at(&mut self, now: Instant, callback: F, delay: Duration) -> TimerId {
        self.schedule(now, callback, delay, TimerKind::Timeout)
    }

    /// Register a repeating callback first due `delay` after `now`.
    pub fn set_interval_at(&mut self, now: Instant, callback: F, delay: Duration) -> TimerId {
        self.schedule(now, callback, delay, TimerKind::Interval)
    }

    /// Register a one-shot callback relative to the current instant.
    pub fn set_timeout(&mut self, callback: F, delay: Duration) -> TimerId {
        self.set_timeout_at(Instant::now(), callback, delay)
    }

    /// Register a repeating callback relative to the current instant.
    pub fn set_interval(&mut self, callback: F, delay: Duration) -> TimerId {
        self.set_interval_at(Instant::now(), callback, delay)
    }

    /// Cancel a timer. Unknown or already-fired ids are ignored.
    pub fn clear_timeout(&mut self, id: TimerId) -> bool {
        match self.index.remove(&id) {
            Some(key) => self.queue.remove(&key).is_some(),
            None => {
                log::debug!("clearTimeout ignored unknown timer {}", id.0);
                false
            }
        }
    }

    /// Drop every pending timer.
    pub fn clear_all(&mut self) {
        self.queue.clear();
        self.index.clear();
    }

    /// Number of pending timers.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Whether no timer is pending.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Whether `id` is still pending.
    pub fn is_pending(&self, id: TimerId) -> bool {
        self.index.contains_key(&id)
    }

    /// The earliest pending deadline.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.queue.keys().next().map(|(deadline, _)| *deadline)
    }

    /// Remove up to `limit` timers due at `now`, in firing order.
    ///
    /// Intervals are re-armed at `now + delay` before being returned, so a
    /// callback that clears its own interval cancels the next occurrence, and
    /// nothing re-armed here can fire again within the same call.
    pub fn take_due(&mut self, now: Instant, limit: usize) -> Vec<DueTimer<F>> {
        let due_keys: Vec<QueueKey> = self
            .queue
            .range(..=(now, u64::MAX))
            .take(limit)
            .map(|(key, _)| *key)
            .collect();

        let mut due = Vec::with_capacity(due_keys.len());
        for key in due_keys {
            let Some(entry) = self.queue.remove(&key) else {
                continue;
            };
            self.index.remove(&entry.id);
            due.push(DueTimer { id: entry.id, kind: entry.kind, callback: entry.callback.clone() });
            if entry.kind == TimerKind::Interval {
                self.insert(now, entry);
            }
        }
        due
    }

    fn schedule(&mut self, now: Instant, callback: F, delay: Duration, kind: TimerKind) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.insert(now, TimerEntry { id, kind, delay, callback });
        id
    }

    fn insert(&mut self, now: Instant, entry: TimerEntry<F>) {
        let key = (now + entry.delay, self.next_seq);
        self.next_seq += 1;
        self.index.insert(entry.id, key);
        self.queue.insert(key, entry);
    }
}

impl<F: Clone> Default for TimerScheduler<F> {
    fn default() -> Self {
        Self::new()
    }
}
