//! Per-Key Expiry Table
//!
//! Deadlines live in their own table next to the value table, so setting or
//! clearing a TTL never rewrites the stored value.
//!
//! ## Lazy Expiry Only
//!
//! There is no background sweeper. A key whose deadline has passed is
//! *logically absent* from the moment the deadline passes, and is physically
//! removed the next time any operation observes it:
//!
//! ```text
//!   set_with_expiry(k, v, 50ms)
//!          │
//!          ▼
//!   ┌──────────────┐   deadline passes   ┌────────────────────┐
//!   │ live (ttl>0) │ ──────────────────> │ logically absent   │
//!   └──────────────┘                     │ (still in tables)  │
//!                                        └─────────┬──────────┘
//!                                                  │ next get/ttl/keys/...
//!                                                  ▼
//!                                        ┌────────────────────┐
//!                                        │ purged (exclusive  │
//!                                        │ guard, re-checked) │
//!                                        └────────────────────┘
//! ```

use crate::error::{Error, Result};
use bytes::Bytes;
use std::collections::HashMap;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Remaining lifetime of a live key, as reported by `TTL`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ttl {
    /// The key exists and never expires
    NoExpiry,
    /// The key exists and expires after this long
    Remaining(Duration),
}

impl Ttl {
    /// Whole seconds for the wire: `0` means "no expiry".
    ///
    /// A partial second rounds up, so a live expiring key never reports `0`.
    pub fn as_secs(&self) -> i64 {
        match self {
            Ttl::NoExpiry => 0,
            Ttl::Remaining(d) => {
                let secs = d.as_secs() + u64::from(d.subsec_nanos() > 0);
                i64::try_from(secs).unwrap_or(i64::MAX)
            }
        }
    }
}

/// The instant `ttl` from now.
///
/// The deadline must be expressible as signed 64-bit Unix milliseconds;
/// anything later fails with `InvalidFormat`.
pub fn deadline_after(ttl: Duration) -> Result<Instant> {
    let now_millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |since| i64::try_from(since.as_millis()).unwrap_or(i64::MAX));

    i64::try_from(ttl.as_millis())
        .ok()
        .and_then(|millis| millis.checked_add(now_millis))
        .and_then(|_| Instant::now().checked_add(ttl))
        .ok_or(Error::InvalidFormat)
}

/// Absolute deadlines keyed by store key.
#[derive(Debug, Default)]
pub struct ExpiryTable {
    deadlines: HashMap<Bytes, Instant>,
}

impl ExpiryTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs a deadline of `now + ttl`. The table is left untouched when
    /// the deadline overflows.
    pub fn set(&mut self, key: Bytes, ttl: Duration) -> Result<()> {
        let deadline = deadline_after(ttl)?;
        self.deadlines.insert(key, deadline);
        Ok(())
    }

    /// Installs an absolute deadline.
    pub fn set_deadline(&mut self, key: Bytes, deadline: Instant) {
        self.deadlines.insert(key, deadline);
    }

    /// Removes the deadline, returning it if one was set.
    pub fn clear(&mut self, key: &[u8]) -> Option<Instant> {
        self.deadlines.remove(key)
    }

    pub fn deadline(&self, key: &[u8]) -> Option<Instant> {
        self.deadlines.get(key).copied()
    }

    /// Returns true if the key has a deadline at or before `now`.
    #[inline]
    pub fn is_expired(&self, key: &[u8], now: Instant) -> bool {
        self.deadlines
            .get(key)
            .map(|deadline| now >= *deadline)
            .unwrap_or(false)
    }

    /// Remaining lifetime at `now`. Callers check `is_expired` first.
    pub fn ttl(&self, key: &[u8], now: Instant) -> Ttl {
        match self.deadlines.get(key) {
            Some(deadline) => Ttl::Remaining(deadline.saturating_duration_since(now)),
            None => Ttl::NoExpiry,
        }
    }

    /// Number of keys carrying a deadline.
    pub fn len(&self) -> usize {
        self.deadlines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deadlines.is_empty()
    }

    pub fn clear_all(&mut self) {
        self.deadlines.clear();
    }
}
