//! Per-identifier attribute bag.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::id::SessionId;

/// A value stored in a session.
pub type AttributeValue = Arc<dyn Any + Send + Sync>;

/// Thread-safe mapping from string keys to arbitrary values.
///
/// Reads share the lock; writes are exclusive. The lock is per session, so
/// activity on one session never waits on another.
pub struct Session {
    id: SessionId,
    created_at: DateTime<Utc>,
    data: RwLock<HashMap<String, AttributeValue>>,
}

impl Session {
    /// Create an empty session.
    pub fn new(id: SessionId) -> Self {
        Self {
            id,
            created_at: Utc::now(),
            data: RwLock::new(HashMap::new()),
        }
    }

    /// The identifier this session is registered under.
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// When the session was created.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Insert or overwrite the value for `key`.
    pub fn set<T: Any + Send + Sync>(&self, key: impl Into<String>, value: T) {
        self.set_raw(key, Arc::new(value));
    }

    /// Insert or overwrite an already shared value.
    pub fn set_raw(&self, key: impl Into<String>, value: AttributeValue) {
        self.data.write().insert(key.into(), value);
    }

    /// Get the value for `key` if present and of type `T`.
    pub fn get<T: Any + Send + Sync>(&self, key: &str) -> Option<Arc<T>> {
        self.get_raw(key)?.downcast::<T>().ok()
    }

    /// Get the untyped value for `key`.
    pub fn get_raw(&self, key: &str) -> Option<AttributeValue> {
        self.data.read().get(key).cloned()
    }

    /// Remove `key`. Returns whether a value was present.
    pub fn delete(&self, key: &str) -> bool {
        self.data.write().remove(key).is_some()
    }

    /// Check whether `key` is set.
    pub fn contains(&self, key: &str) -> bool {
        self.data.read().contains_key(key)
    }

    /// Number of stored attributes.
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// Check if no attributes are stored.
    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    /// Snapshot of the stored keys.
    pub fn keys(&self) -> Vec<String> {
        self.data.read().keys().cloned().collect()
    }

    /// Remove every attribute.
    pub fn clear(&self) {
        self.data.write().clear();
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("created_at", &self.created_at)
            .field("keys", &self.keys())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::IdGenerator;
    use std::thread;

    fn session() -> Session {
        Session::new(IdGenerator::default().generate().unwrap())
    }

    #[test]
    fn test_set_then_get() {
        let s = session();
        s.set("k", "v".to_string());

        assert_eq!(s.get::<String>("k").as_deref(), Some(&"v".to_string()));
        assert!(s.contains("k"));
        assert_eq!(s.len(), 1);
    }

    #[test]
    fn test_get_missing_key() {
        let s = session();
        assert!(s.get::<String>("missing").is_none());
        assert!(s.get_raw("missing").is_none());
    }

    #[test]
    fn test_get_wrong_type() {
        let s = session();
        s.set("count", 3u32);
        assert!(s.get::<String>("count").is_none());
        assert_eq!(s.get::<u32>("count").as_deref(), Some(&3));
    }

    #[test]
    fn test_overwrite() {
        let s = session();
        s.set("k", 1i64);
        s.set("k", 2i64);
        assert_eq!(s.get::<i64>("k").as_deref(), Some(&2));
        assert_eq!(s.len(), 1);
    }

    #[test]
    fn test_delete() {
        let s = session();
        s.set("k", "v".to_string());

        assert!(s.delete("k"));
        assert!(s.get::<String>("k").is_none());
        // Deleting an absent key is a no-op
        assert!(!s.delete("k"));
        assert!(s.is_empty());
    }

    #[test]
    fn test_clear_and_keys() {
        let s = session();
        s.set("a", 1u8);
        s.set("b", 2u8);

        let mut keys = s.keys();
        keys.sort();
        assert_eq!(keys, vec!["a", "b"]);

        s.clear();
        assert!(s.is_empty());
    }

    #[test]
    fn test_concurrent_sets_on_distinct_keys() {
        let s = Arc::new(session());

        let handles: Vec<_> = (0..16)
            .map(|t| {
                let s = Arc::clone(&s);
                thread::spawn(move || {
                    for i in 0..250 {
                        s.set(format!("t{t}-k{i}"), i);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(s.len(), 16 * 250);
        assert_eq!(s.get::<i32>("t7-k100").as_deref(), Some(&100));
    }

    #[test]
    fn test_concurrent_readers_and_writer() {
        let s = Arc::new(session());
        s.set("shared", 0usize);

        let writer = {
            let s = Arc::clone(&s);
            thread::spawn(move || {
                for i in 1..=1000usize {
                    s.set("shared", i);
                }
            })
        };

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let s = Arc::clone(&s);
                thread::spawn(move || {
                    let mut last = 0usize;
                    for _ in 0..1000 {
                        let v = *s.get::<usize>("shared").unwrap();
                        // A single writer only moves the value forward
                        assert!(v >= last);
                        last = v;
                    }
                })
            })
            .collect();

        writer.join().unwrap();
        for reader in readers {
            reader.join().unwrap();
        }

        assert_eq!(s.get::<usize>("shared").as_deref(), Some(&1000));
    }
}
