//! Time-to-live expiry for cached documents
//!
//! Staleness is bounded by elapsed time only. A record carries the external
//! marker observed at read time (a file modification stamp, for instance)
//! for diagnostics, but a changed marker never invalidates a record early.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::fmt;
use std::time::Duration;

use crate::source::DEFAULT_TTL;

/// Injectable time source.
pub trait Clock: fmt::Debug + Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock();
        *now += chrono::Duration::from_std(by).unwrap_or_else(|_| chrono::Duration::zero());
    }

    pub fn set(&self, to: DateTime<Utc>) {
        *self.now.lock() = to;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

/// Per source-key read record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TtlRecord {
    pub last_read: DateTime<Utc>,
    pub marker: Option<String>,
}

impl TtlRecord {
    pub fn new(last_read: DateTime<Utc>, marker: Option<String>) -> Self {
        Self { last_read, marker }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TtlPolicy {
    ttl: Duration,
}

impl TtlPolicy {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// A missing record is expired, as is one older than the TTL. A record
    /// stamped in the future (clock moved backwards) is still fresh.
    pub fn expired(&self, record: Option<&TtlRecord>, now: DateTime<Utc>) -> bool {
        let Some(record) = record else {
            return true;
        };
        match now.signed_duration_since(record.last_read).to_std() {
            Ok(elapsed) => elapsed > self.ttl,
            Err(_) => false,
        }
    }
}

impl Default for TtlPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}
