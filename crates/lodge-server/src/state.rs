//! State shared by the session middleware and auth guards.

use std::fmt;
use std::sync::Arc;

use lodge_session::{Identity, SessionConfig, SessionResolver};

use crate::config::AuthConfig;

/// Builds the identity given to visitors who have none yet.
pub type IdentityFactory<U> = Arc<dyn Fn() -> U + Send + Sync>;

/// State for [`session_middleware`](crate::session_middleware) and the
/// login guards.
///
/// `U` is the application's identity type.
pub struct SessionState<U> {
    /// Resolves carried identifiers to sessions.
    pub resolver: SessionResolver,

    /// Cookie settings and session lifetime.
    pub config: Arc<SessionConfig>,

    /// Guard redirect settings.
    pub auth: Arc<AuthConfig>,

    /// Creates an anonymous identity for new visitors.
    pub new_identity: IdentityFactory<U>,
}

impl<U: Identity> SessionState<U> {
    /// Create state around an existing resolver.
    pub fn new(
        resolver: SessionResolver,
        config: SessionConfig,
        new_identity: impl Fn() -> U + Send + Sync + 'static,
    ) -> Self {
        Self {
            resolver,
            config: Arc::new(config),
            auth: Arc::new(AuthConfig::default()),
            new_identity: Arc::new(new_identity),
        }
    }

    /// Create state with a fresh store built from `config`.
    pub fn from_config(
        config: SessionConfig,
        new_identity: impl Fn() -> U + Send + Sync + 'static,
    ) -> Self {
        let resolver = SessionResolver::from_config(&config);
        Self::new(resolver, config, new_identity)
    }

    /// Set the guard redirect settings.
    pub fn with_auth(mut self, auth: AuthConfig) -> Self {
        self.auth = Arc::new(auth);
        self
    }
}

impl<U> Clone for SessionState<U> {
    fn clone(&self) -> Self {
        Self {
            resolver: self.resolver.clone(),
            config: Arc::clone(&self.config),
            auth: Arc::clone(&self.auth),
            new_identity: Arc::clone(&self.new_identity),
        }
    }
}

impl<U> fmt::Debug for SessionState<U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionState")
            .field("resolver", &self.resolver)
            .field("config", &self.config)
            .field("auth", &self.auth)
            .finish_non_exhaustive()
    }
}
