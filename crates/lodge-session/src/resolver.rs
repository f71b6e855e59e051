//! Translate a carried identifier into a live session.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, trace, warn};

use crate::config::SessionConfig;
use crate::error::{Error, Result};
use crate::id::{IdGenerator, SessionId};
use crate::session::Session;
use crate::store::SessionStore;

/// Attempts at finding an unused identifier before giving up.
const MAX_ID_ATTEMPTS: usize = 3;

/// Outcome of resolving one unit of work.
#[derive(Debug, Clone)]
pub struct Resolved {
    /// The session downstream logic should use.
    pub session: Arc<Session>,

    /// Whether the session was created for this request. The caller must
    /// send the identifier back (e.g. as a cookie) when this is set.
    pub is_new: bool,

    /// Whether an existing session's deadline was pushed out by this
    /// resolution. The caller should re-send the identifier so the client's
    /// copy lives as long as the server's.
    pub refreshed: bool,
}

impl Resolved {
    /// Identifier to hand back to the client, if one was just issued.
    pub fn issued_id(&self) -> Option<&SessionId> {
        self.is_new.then(|| self.session.id())
    }

    /// Identifier the client must be (re)sent: a new one, or one whose
    /// lifetime was just extended.
    pub fn renewed_id(&self) -> Option<&SessionId> {
        (self.is_new || self.refreshed).then(|| self.session.id())
    }
}

/// Looks up or creates sessions for carried identifiers.
///
/// Holds its store and generator by value; both are cheap handles, so one
/// resolver per process can be cloned into every request handler.
#[derive(Debug, Clone)]
pub struct SessionResolver {
    store: SessionStore,
    generator: IdGenerator,
    ttl: Duration,
    sliding_expiry: bool,
}

impl SessionResolver {
    /// Create a resolver over an existing store.
    pub fn new(store: SessionStore, generator: IdGenerator, config: &SessionConfig) -> Self {
        Self {
            store,
            generator,
            ttl: config.ttl(),
            sliding_expiry: config.sliding_expiry,
        }
    }

    /// Build a store and generator from `config` and wrap them.
    pub fn from_config(config: &SessionConfig) -> Self {
        Self::new(
            SessionStore::new(config),
            IdGenerator::new(config.id_bytes),
            config,
        )
    }

    /// Override the session lifetime.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// The underlying store.
    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Lifetime given to new and refreshed sessions.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Resolve the identifier presented by a client, if any.
    ///
    /// A missing, malformed, unknown or expired identifier yields a fresh,
    /// registered, empty session with `is_new` set.
    pub fn resolve(&self, presented: Option<&str>) -> Result<Resolved> {
        if let Some(id) = presented.and_then(SessionId::parse) {
            let found = if self.sliding_expiry {
                self.store.lookup_and_touch(&id, self.ttl)
            } else {
                self.store.lookup(&id)
            };
            if let Some(session) = found {
                trace!(session_id = %id, "Resolved existing session");
                return Ok(Resolved {
                    session,
                    is_new: false,
                    refreshed: self.sliding_expiry,
                });
            }
            debug!(session_id = %id, "Presented session unknown or expired");
        } else if presented.is_some() {
            debug!("Presented session identifier is malformed");
        }

        let session = self.create()?;
        Ok(Resolved {
            session,
            is_new: true,
            refreshed: false,
        })
    }

    /// Register a brand new empty session.
    fn create(&self) -> Result<Arc<Session>> {
        for _ in 0..MAX_ID_ATTEMPTS {
            let id = self.generator.generate()?;
            if self.store.lookup(&id).is_some() {
                warn!(session_id = %id, "Generated identifier already live, regenerating");
                continue;
            }

            let session = Arc::new(Session::new(id));
            self.store.register(Arc::clone(&session), self.ttl);
            debug!(session_id = %session.id(), "Created new session");
            return Ok(session);
        }

        Err(Error::RandomnessUnavailable(format!(
            "no unused identifier after {MAX_ID_ATTEMPTS} attempts"
        )))
    }
}
