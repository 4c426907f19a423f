//! Cool-down gates for searches and notifications

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Duration, Utc};

/// Source of the current time
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Single process-wide gate: at most one pass per cool-down window
pub struct SearchGate {
    cooldown: Duration,
    last: Mutex<Option<DateTime<Utc>>>,
}

impl SearchGate {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            last: Mutex::new(None),
        }
    }

    /// Returns true and closes the gate if the cool-down has elapsed.
    pub fn try_pass(&self, now: DateTime<Utc>) -> bool {
        let mut last = self.last.lock().unwrap_or_else(PoisonError::into_inner);
        if last.is_some_and(|previous| previous + self.cooldown > now) {
            return false;
        }
        *last = Some(now);
        true
    }
}

/// Per-recipient gate
///
/// Entries are kept for the whole process lifetime. The map is keyed by
/// stable recipient ids and stays small.
pub struct NotificationThrottle {
    cooldown: Duration,
    last: Mutex<HashMap<String, DateTime<Utc>>>,
}

impl NotificationThrottle {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            last: Mutex::new(HashMap::new()),
        }
    }

    /// Returns true and records `now` if `recipient` may be notified.
    pub fn try_pass(&self, recipient: &str, now: DateTime<Utc>) -> bool {
        let mut last = self.last.lock().unwrap_or_else(PoisonError::into_inner);
        if last
            .get(recipient)
            .is_some_and(|previous| *previous + self.cooldown > now)
        {
            return false;
        }
        last.insert(recipient.to_string(), now);
        true
    }
}
