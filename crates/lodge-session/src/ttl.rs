//! Deadline tracking for session expiry.

use std::collections::HashMap;
use std::time::{Duration, Instant};

/// A value paired with the instant it stops being reachable.
#[derive(Debug, Clone)]
pub struct TtlEntry<V> {
    /// Stored value.
    pub value: V,

    /// When this entry expires.
    pub deadline: Instant,
}

impl<V> TtlEntry<V> {
    /// Check whether the deadline has passed at `now`.
    pub fn is_expired_at(&self, now: Instant) -> bool {
        now >= self.deadline
    }
}

/// Map whose entries carry individual expiry deadlines.
///
/// Not synchronized; the store wraps each one in a lock.
#[derive(Debug)]
pub struct TtlMap<V> {
    entries: HashMap<String, TtlEntry<V>>,
}

impl<V> Default for TtlMap<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> TtlMap<V> {
    /// Create an empty map.
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Insert or replace `key`, expiring `ttl` from now.
    pub fn insert(&mut self, key: &str, value: V, ttl: Duration) -> Option<V> {
        let entry = TtlEntry {
            value,
            deadline: deadline_from_now(ttl),
        };
        self.entries.insert(key.to_string(), entry).map(|e| e.value)
    }

    /// Get the value for `key` if it has not expired at `now`.
    pub fn get_live(&self, key: &str, now: Instant) -> Option<&V> {
        self.entries
            .get(key)
            .filter(|e| !e.is_expired_at(now))
            .map(|e| &e.value)
    }

    /// Push a live entry's deadline to `ttl` from now.
    ///
    /// Returns `false` if the key is absent or already expired.
    pub fn touch(&mut self, key: &str, ttl: Duration) -> bool {
        let now = Instant::now();
        match self.entries.get_mut(key) {
            Some(entry) if !entry.is_expired_at(now) => {
                entry.deadline = deadline_from_now(ttl);
                true
            }
            _ => false,
        }
    }

    /// Get a live entry and push its deadline to `ttl` from now.
    ///
    /// Expired entries are left in place and reported as absent.
    pub fn get_and_touch(&mut self, key: &str, ttl: Duration) -> Option<&V> {
        let now = Instant::now();
        let entry = self.entries.get_mut(key)?;
        if entry.is_expired_at(now) {
            return None;
        }
        entry.deadline = deadline_from_now(ttl);
        Some(&entry.value)
    }

    /// Check if `key` is present, expired or not.
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Check if `key` is absent or expired.
    pub fn is_expired(&self, key: &str) -> bool {
        let now = Instant::now();
        self.entries.get(key).is_none_or(|e| e.is_expired_at(now))
    }

    /// Remove `key` regardless of its deadline.
    pub fn remove(&mut self, key: &str) -> Option<V> {
        self.entries.remove(key).map(|e| e.value)
    }

    /// Remove `key` only if its deadline has passed.
    pub fn remove_if_expired(&mut self, key: &str) -> Option<V> {
        let now = Instant::now();
        if self.entries.get(key)?.is_expired_at(now) {
            self.remove(key)
        } else {
            None
        }
    }

    /// Remove all expired entries and return their keys.
    pub fn drain_expired(&mut self) -> Vec<String> {
        let now = Instant::now();
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, e)| e.is_expired_at(now))
            .map(|(k, _)| k.clone())
            .collect();
        for key in &expired {
            self.entries.remove(key);
        }
        expired
    }

    /// Number of entries, expired or not.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if there are no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of entries that have not expired.
    pub fn live_count(&self) -> usize {
        let now = Instant::now();
        self.entries
            .values()
            .filter(|e| !e.is_expired_at(now))
            .count()
    }
}

/// `now + ttl`, saturating far in the future instead of overflowing.
fn deadline_from_now(ttl: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(ttl)
        .unwrap_or_else(|| now + Duration::from_secs(100 * 365 * 24 * 3600))
}
