// src/preheat/timer.rs - Single-shot deadline queue and clocks
//! Timers are `{deadline, key}` entries in a min-heap owned by whoever drives
//! the control loop. Restarting a key pushes a new entry and leaves the old
//! one behind as stale; stale entries are skipped when they surface.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use std::hash::Hash;
use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;

/// Source of "now" as an offset from the clock's own origin.
pub trait Clock: Send + Sync {
    fn now(&self) -> Duration;
}

/// Wall time since construction. Built on tokio's clock so paused test
/// runtimes move it too.
#[derive(Debug, Clone)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Manually advanced clock for simulations and tests.
#[derive(Debug, Default)]
pub struct SimClock {
    current_time: Mutex<Duration>,
}

impl SimClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, dt: Duration) {
        *self.lock() += dt;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Duration> {
        self.current_time.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Clock for SimClock {
    fn now(&self) -> Duration {
        *self.lock()
    }
}

#[derive(Debug)]
struct TimerEntry<K> {
    deadline: Duration,
    seq: u64,
    key: K,
}

impl<K> PartialEq for TimerEntry<K> {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline && self.seq == other.seq
    }
}

impl<K> Eq for TimerEntry<K> {}

impl<K> PartialOrd for TimerEntry<K> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// Reversed so the BinaryHeap pops the earliest deadline first.
impl<K> Ord for TimerEntry<K> {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .deadline
            .cmp(&self.deadline)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// One single-shot timer per key.
#[derive(Debug)]
pub struct TimerQueue<K> {
    queue: BinaryHeap<TimerEntry<K>>,
    /// key -> (seq of the live entry, its deadline)
    armed: HashMap<K, (u64, Duration)>,
    next_seq: u64,
}

impl<K: Copy + Eq + Hash> TimerQueue<K> {
    pub fn new() -> Self {
        Self {
            queue: BinaryHeap::new(),
            armed: HashMap::new(),
            next_seq: 0,
        }
    }

    /// Arm `key` to expire `interval` after `now`, replacing any pending
    /// deadline for it.
    pub fn start(&mut self, key: K, now: Duration, interval: Duration) {
        let seq = self.next_seq;
        self.next_seq += 1;
        let deadline = now.saturating_add(interval);
        self.armed.insert(key, (seq, deadline));
        self.queue.push(TimerEntry { deadline, seq, key });
        if self.queue.len() > 2 * self.armed.len() + 16 {
            let armed = &self.armed;
            self.queue
                .retain(|entry| armed.get(&entry.key).is_some_and(|(seq, _)| *seq == entry.seq));
        }
    }

    /// Disarm `key`. Returns whether it was armed.
    pub fn stop(&mut self, key: K) -> bool {
        self.armed.remove(&key).is_some()
    }

    pub fn is_armed(&self, key: K) -> bool {
        self.armed.contains_key(&key)
    }

    pub fn deadline(&self, key: K) -> Option<Duration> {
        self.armed.get(&key).map(|(_, deadline)| *deadline)
    }

    /// Earliest live deadline.
    pub fn next_deadline(&self) -> Option<Duration> {
        self.armed.values().map(|(_, deadline)| *deadline).min()
    }

    /// Pop the next key whose deadline is at or before `now`, disarming it.
    pub fn pop_expired(&mut self, now: Duration) -> Option<K> {
        while let Some(entry) = self.queue.peek() {
            if entry.deadline > now {
                return None;
            }
            let Some(entry) = self.queue.pop() else {
                break;
            };
            let live = self
                .armed
                .get(&entry.key)
                .is_some_and(|(seq, _)| *seq == entry.seq);
            if live {
                self.armed.remove(&entry.key);
                return Some(entry.key);
            }
        }
        None
    }
}

impl<K: Copy + Eq + Hash> Default for TimerQueue<K> {
    fn default() -> Self {
        Self::new()
    }
}
