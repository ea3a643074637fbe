//! Sliding window over a per-key event log
//!
//! This is the shared primitive behind both the rate limiter and the alert
//! cooldown: record timestamped events for a key, then ask "how many events
//! for this key happened in the last N seconds".
//!
//! Pruning is lazy. Events that have left the window are discarded the next
//! time the key is touched, never by a background sweep. Idle keys keep
//! their last events until the next access; keys whose log empties are
//! removed entirely.

use std::collections::{HashMap, VecDeque};
use std::hash::Hash;

use chrono::{DateTime, Duration, Utc};

/// Per-key log of event timestamps with window queries
///
/// Deliberately not synchronized. Callers serialize access per subsystem:
/// the rate limiter wraps its counter in a mutex, the alert manager owns
/// its counter inside the monitor actor.
#[derive(Debug, Default)]
pub struct SlidingWindowCounter<K> {
    events: HashMap<K, VecDeque<DateTime<Utc>>>,
}

impl<K: Hash + Eq> SlidingWindowCounter<K> {
    pub fn new() -> Self {
        Self {
            events: HashMap::new(),
        }
    }

    /// Record an event for `key`.
    ///
    /// Timestamps usually arrive in order; a late event is inserted at its
    /// sorted position so that pruning from the front stays correct.
    pub fn record(&mut self, key: K, timestamp: DateTime<Utc>) {
        let log = self.events.entry(key).or_default();
        match log.back() {
            Some(last) if *last > timestamp => {
                let index = log.partition_point(|ts| *ts <= timestamp);
                log.insert(index, timestamp);
            }
            _ => log.push_back(timestamp),
        }
    }

    /// Count the events for `key` inside the window ending at `now`.
    ///
    /// The window is half-open: an event exactly `window_seconds` old has
    /// already left it. Events that left the window are pruned permanently
    /// as a side effect. Events newer than `now` are kept but not counted.
    pub fn count_in_window(&mut self, key: &K, now: DateTime<Utc>, window_seconds: u64) -> usize {
        let cutoff = now - Duration::seconds(window_seconds as i64);
        self.prune(key, cutoff);

        self.events
            .get(key)
            .map_or(0, |log| log.iter().take_while(|ts| **ts <= now).count())
    }

    /// Drop all events for `key` with a timestamp at or before `cutoff`.
    ///
    /// A key whose log empties is removed from the map.
    pub fn prune(&mut self, key: &K, cutoff: DateTime<Utc>) {
        if let Some(log) = self.events.get_mut(key) {
            while log.front().is_some_and(|ts| *ts <= cutoff) {
                log.pop_front();
            }

            if log.is_empty() {
                self.events.remove(key);
            }
        }
    }

    /// Number of keys currently holding at least one event.
    pub fn tracked_keys(&self) -> usize {
        self.events.len()
    }
}
