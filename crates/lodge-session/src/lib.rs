//! Concurrent, time-limited session store.
//!
//! This crate maps opaque session identifiers to per-session attribute bags:
//! - Unguessable identifiers from the OS CSPRNG with a userspace fallback
//! - Reader/writer locked attribute bags, one lock per session
//! - A sharded store with per-entry deadlines, lazy expiry on lookup and a
//!   background sweeper so abandoned sessions are reclaimed
//! - A transport-agnostic resolver that finds or creates the session for a
//!   carried identifier
//!
//! # Example
//!
//! ```rust,ignore
//! use lodge_session::{SessionConfig, SessionResolver};
//!
//! let config = SessionConfig::default().with_ttl(Duration::from_secs(3600));
//! let resolver = SessionResolver::from_config(&config);
//! let _sweeper = resolver.store().spawn_sweeper(config.cleanup_interval());
//!
//! let resolved = resolver.resolve(cookie_value.as_deref())?;
//! resolved.session.set("visits", 1u32);
//! if let Some(id) = resolved.renewed_id() {
//!     // send `id` back to the client
//! }
//! ```

mod config;
mod error;
mod id;
mod identity;
mod resolver;
mod session;
mod store;
mod ttl;

pub use config::{
    DEFAULT_CLEANUP_INTERVAL_SECS, DEFAULT_COOKIE_NAME, DEFAULT_ID_BYTES, DEFAULT_MAX_AGE_SECS,
    DEFAULT_SHARDS, MAX_ID_BYTES, MIN_ID_BYTES, SessionConfig,
};
pub use error::{Error, Result};
pub use id::{EntropySource, IdGenerator, OsEntropy, SessionId, ThreadEntropy};
pub use identity::{Identity, SESSION_USER, current_user, login, logout};
pub use resolver::{Resolved, SessionResolver};
pub use session::{AttributeValue, Session};
pub use store::{SessionStore, StoreStats, Sweeper};
pub use ttl::{TtlEntry, TtlMap};
