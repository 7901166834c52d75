//! In-memory escalating-lockout failure tracker.
//!
//! Tracks consecutive failures per identifier and enforces an escalating
//! lockout window. Ephemeral: records live only in process memory and are
//! lost on restart — this is a defense-in-depth throttle, not an audit
//! source. Single-process only; a multi-instance deployment needs an
//! external TTL store instead.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Failures before the first (short) lockout.
const SOFT_THRESHOLD: u32 = 3;
/// Short lockout window.
const SOFT_LOCK: Duration = Duration::from_secs(5 * 60);
/// Failures before the long lockout.
const HARD_THRESHOLD: u32 = 10;
/// Long lockout window.
const HARD_LOCK: Duration = Duration::from_secs(15 * 60);

struct FailureRecord {
    count: u32,
    locked_until: Option<Instant>,
}

/// Mutex-guarded failure map. Concurrent requests for the same
/// identifier race on this map, so every access holds the lock.
pub struct LockoutGuard {
    entries: Mutex<HashMap<String, FailureRecord>>,
}

impl LockoutGuard {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Check whether the identifier is currently locked out.
    /// Returns `Err(remaining_secs)` if locked; lapsed locks are cleared
    /// lazily and treated as fresh.
    pub fn check(&self, identifier: &str) -> Result<(), u64> {
        self.check_at(identifier, Instant::now())
    }

    /// Record a failed attempt, escalating the lockout window.
    /// Returns the lock duration in seconds when this failure engages a
    /// lock, so callers can answer the tripping attempt with a throttle
    /// response instead of a credential error.
    pub fn register_failure(&self, identifier: &str) -> Option<u64> {
        self.register_failure_at(identifier, Instant::now())
    }

    /// Record a success: the failure record is deleted entirely
    /// (full reset, not decrement).
    pub fn reset(&self, identifier: &str) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.remove(identifier);
    }

    fn check_at(&self, identifier: &str, now: Instant) -> Result<(), u64> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let Some(record) = entries.get(identifier) else {
            return Ok(());
        };
        match record.locked_until {
            Some(until) if until > now => {
                let remaining = until.duration_since(now);
                // Round up so "1ms left" still reports a full second.
                Err(remaining.as_secs().max(1))
            }
            Some(_) => {
                // Lock lapsed: clear the record, treat as fresh.
                entries.remove(identifier);
                Ok(())
            }
            None => Ok(()),
        }
    }

    fn register_failure_at(&self, identifier: &str, now: Instant) -> Option<u64> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let record = entries
            .entry(identifier.to_string())
            .or_insert(FailureRecord {
                count: 0,
                locked_until: None,
            });
        record.count += 1;
        if record.count >= HARD_THRESHOLD {
            record.locked_until = Some(now + HARD_LOCK);
            Some(HARD_LOCK.as_secs())
        } else if record.count >= SOFT_THRESHOLD {
            record.locked_until = Some(now + SOFT_LOCK);
            Some(SOFT_LOCK.as_secs())
        } else {
            None
        }
    }
}

impl Default for LockoutGuard {
    fn default() -> Self {
        Self::new()
    }
}
