//! Short-lived user-facing messages
//!
//! Compile errors, reload results and script faults are pushed here so a
//! front end can show them for a few seconds.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Oldest entries are dropped beyond this
const MAX_NOTIFICATIONS: usize = 32;

#[derive(Debug, Clone)]
pub struct Notification {
    pub message: String,
    pub duration: Duration,
    created: Instant,
}

impl Notification {
    pub fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.created) >= self.duration
    }

    pub fn remaining(&self, now: Instant) -> Duration {
        self.duration
            .saturating_sub(now.saturating_duration_since(self.created))
    }
}

/// FIFO of messages that expire after their duration
#[derive(Debug)]
pub struct Notifications {
    queue: VecDeque<Notification>,
    default_duration: Duration,
}

impl Default for Notifications {
    fn default() -> Self {
        Self::new(Duration::from_secs(3))
    }
}

impl Notifications {
    pub fn new(default_duration: Duration) -> Self {
        Self {
            queue: VecDeque::new(),
            default_duration,
        }
    }

    pub fn push(&mut self, message: impl Into<String>) {
        self.push_for(message, self.default_duration);
    }

    pub fn push_for(&mut self, message: impl Into<String>, duration: Duration) {
        if self.queue.len() == MAX_NOTIFICATIONS {
            self.queue.pop_front();
        }
        self.queue.push_back(Notification {
            message: message.into(),
            duration,
            created: Instant::now(),
        });
    }

    /// Drop expired entries
    pub fn prune(&mut self, now: Instant) {
        self.queue.retain(|n| !n.is_expired(now));
    }

    /// Entries still visible at `now`, oldest first
    pub fn active(&mut self, now: Instant) -> impl Iterator<Item = &Notification> {
        self.prune(now);
        self.queue.iter()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn clear(&mut self) {
        self.queue.clear();
    }
}
