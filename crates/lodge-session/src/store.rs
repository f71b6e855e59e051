//! Sharded session registry with TTL expiry.

use std::hash::{BuildHasher, RandomState};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::config::SessionConfig;
use crate::id::SessionId;
use crate::session::Session;
use crate::ttl::TtlMap;

/// Shortest period accepted by [`SessionStore::spawn_sweeper`].
const MIN_SWEEP_INTERVAL: Duration = Duration::from_millis(1);

/// One independently locked slice of the store.
struct Shard {
    map: RwLock<TtlMap<Arc<Session>>>,
    last_sweep: Mutex<Instant>,
}

impl Shard {
    fn new() -> Self {
        Self {
            map: RwLock::new(TtlMap::new()),
            last_sweep: Mutex::new(Instant::now()),
        }
    }

    fn sweep(&self) -> usize {
        let expired = self.map.write().drain_expired();
        *self.last_sweep.lock() = Instant::now();
        for id in &expired {
            debug!(session_id = %id, "Reclaimed expired session");
        }
        expired.len()
    }
}

struct StoreInner {
    shards: Box<[Shard]>,
    hasher: RandomState,
    compaction_interval: Duration,
}

/// Process-wide registry mapping identifiers to live sessions.
///
/// Every entry carries its own deadline. Expired entries are unreachable
/// immediately and are reclaimed three ways:
/// - `lookup` removes an expired entry it encounters
/// - `register` compacts its shard if that shard has not been swept for a
///   full compaction interval
/// - [`SessionStore::spawn_sweeper`] runs [`SessionStore::sweep`] periodically
///
/// Identifiers are spread over shards by hash. Point operations lock a single
/// shard, and the sweep never holds more than one shard lock at a time.
///
/// Cloning is cheap and yields a handle to the same store.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<StoreInner>,
}

impl SessionStore {
    /// Create a store sized and timed from the session config.
    pub fn new(config: &SessionConfig) -> Self {
        Self::with_shards(config.shards, config.cleanup_interval())
    }

    /// Create a store with an explicit shard count and compaction interval.
    pub fn with_shards(shards: usize, compaction_interval: Duration) -> Self {
        let shards = (0..shards.max(1)).map(|_| Shard::new()).collect();
        Self {
            inner: Arc::new(StoreInner {
                shards,
                hasher: RandomState::new(),
                compaction_interval,
            }),
        }
    }

    fn shard(&self, id: &SessionId) -> &Shard {
        let shards = &self.inner.shards;
        let index = self.inner.hasher.hash_one(id.as_str()) as usize % shards.len();
        &shards[index]
    }

    /// Get the live session registered under `id`.
    ///
    /// An entry past its deadline is removed and reported as absent.
    pub fn lookup(&self, id: &SessionId) -> Option<Arc<Session>> {
        let shard = self.shard(id);
        let key = id.as_str();

        let expired = {
            let map = shard.map.read();
            if let Some(session) = map.get_live(key, Instant::now()) {
                trace!(session_id = %id, "Session found in store");
                return Some(Arc::clone(session));
            }
            map.contains_key(key)
        };

        // Re-checked under the write lock: a concurrent register may have
        // refreshed the entry in between.
        if expired && shard.map.write().remove_if_expired(key).is_some() {
            debug!(session_id = %id, "Session expired, removing from store");
        }

        None
    }

    /// Get the live session registered under `id` and push its deadline to
    /// `ttl` from now, under a single shard lock.
    ///
    /// An entry past its deadline is removed and reported as absent, so a
    /// returned session is always one whose deadline was refreshed.
    pub fn lookup_and_touch(&self, id: &SessionId, ttl: Duration) -> Option<Arc<Session>> {
        let key = id.as_str();
        let mut map = self.shard(id).map.write();

        if let Some(session) = map.get_and_touch(key, ttl) {
            trace!(session_id = %id, "Session found in store, deadline refreshed");
            return Some(Arc::clone(session));
        }
        if map.remove_if_expired(key).is_some() {
            debug!(session_id = %id, "Session expired, removing from store");
        }
        None
    }

    /// Insert or refresh the entry for `session`, expiring `ttl` from now.
    pub fn register(&self, session: Arc<Session>, ttl: Duration) {
        let id = session.id().clone();
        let shard = self.shard(&id);

        let replaced = shard.map.write().insert(id.as_str(), session, ttl);
        trace!(
            session_id = %id,
            ttl_ms = ttl.as_millis() as u64,
            replaced = replaced.is_some(),
            "Session registered"
        );

        self.maybe_compact(shard);
    }

    /// Push the deadline of a live entry to `ttl` from now.
    ///
    /// Returns `false` if the entry is absent or already expired.
    pub fn touch(&self, id: &SessionId, ttl: Duration) -> bool {
        self.shard(id).map.write().touch(id.as_str(), ttl)
    }

    /// Remove the entry for `id` if its deadline has elapsed.
    ///
    /// Returns `true` if an expired entry was removed.
    pub fn expire(&self, id: &SessionId) -> bool {
        let removed = self.shard(id).map.write().remove_if_expired(id.as_str());
        if removed.is_some() {
            debug!(session_id = %id, "Session expired");
        }
        removed.is_some()
    }

    /// Remove the entry for `id` whether or not it has expired.
    pub fn remove(&self, id: &SessionId) -> Option<Arc<Session>> {
        let removed = self.shard(id).map.write().remove(id.as_str());
        if removed.is_some() {
            debug!(session_id = %id, "Session removed from store");
        }
        removed
    }

    /// Reclaim every expired entry, one shard at a time.
    ///
    /// Returns the number of entries removed.
    pub fn sweep(&self) -> usize {
        let count: usize = self.inner.shards.iter().map(Shard::sweep).sum();
        if count > 0 {
            debug!(count, "Swept expired sessions");
        }
        count
    }

    /// Sweep the shard just written to if it is overdue.
    fn maybe_compact(&self, shard: &Shard) {
        let due = {
            let Some(last) = shard.last_sweep.try_lock() else {
                return;
            };
            last.elapsed() >= self.inner.compaction_interval
        };
        if due {
            let count = shard.sweep();
            if count > 0 {
                debug!(count, "Compacted expired sessions on register");
            }
        }
    }

    /// Number of entries held, including expired ones not yet reclaimed.
    pub fn len(&self) -> usize {
        self.inner.shards.iter().map(|s| s.map.read().len()).sum()
    }

    /// Check if the store holds no entries.
    pub fn is_empty(&self) -> bool {
        self.inner.shards.iter().all(|s| s.map.read().is_empty())
    }

    /// Get store statistics.
    pub fn stats(&self) -> StoreStats {
        let (entries, live) = self
            .inner
            .shards
            .iter()
            .map(|s| {
                let map = s.map.read();
                (map.len(), map.live_count())
            })
            .fold((0, 0), |(e, l), (se, sl)| (e + se, l + sl));

        StoreStats {
            entries,
            live,
            shards: self.inner.shards.len(),
        }
    }

    /// Start a background task that sweeps the store every `interval`.
    ///
    /// The task holds only a weak reference and stops on its own once every
    /// store handle is dropped. Intervals shorter than one millisecond are
    /// raised to it. Must be called from within a tokio runtime.
    pub fn spawn_sweeper(&self, interval: Duration) -> Sweeper {
        let interval = interval.max(MIN_SWEEP_INTERVAL);
        let weak = Arc::downgrade(&self.inner);
        let token = CancellationToken::new();
        let cancelled = token.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately
            ticker.tick().await;

            debug!(interval_ms = interval.as_millis() as u64, "Session sweeper started");
            loop {
                tokio::select! {
                    _ = cancelled.cancelled() => break,
                    _ = ticker.tick() => {}
                }

                let Some(inner) = weak.upgrade() else {
                    break;
                };
                SessionStore { inner }.sweep();
            }
            debug!("Session sweeper stopped");
        });

        Sweeper {
            token,
            handle: Some(handle),
        }
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("shards", &self.inner.shards.len())
            .field("compaction_interval", &self.inner.compaction_interval)
            .finish()
    }
}

/// Handle to a background sweep task.
///
/// Dropping the handle stops the task.
#[derive(Debug)]
pub struct Sweeper {
    token: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl Sweeper {
    /// Stop the task and wait for it to finish.
    pub async fn shutdown(mut self) {
        self.token.cancel();
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }

    /// Check whether the task has exited.
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().is_none_or(JoinHandle::is_finished)
    }
}

impl Drop for Sweeper {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// Store statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    /// Entries held, including expired ones not yet reclaimed.
    pub entries: usize,

    /// Entries whose deadline has not passed.
    pub live: usize,

    /// Number of shards.
    pub shards: usize,
}
