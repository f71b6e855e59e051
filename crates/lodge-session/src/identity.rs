//! Caller-supplied identity capability.
//!
//! The store knows nothing about authentication. Applications plug in their
//! own user type by implementing [`Identity`]; the helpers here only move
//! that value in and out of the session under [`SESSION_USER`].

use std::sync::Arc;

use tracing::{debug, error};

use crate::error::{Error, Result};
use crate::session::Session;

/// Session key holding the current identity.
pub const SESSION_USER: &str = "session_user";

/// Capabilities an application user type must provide.
///
/// Methods take `&self` because the value is shared through the session;
/// implementations keep mutable login state behind their own lock.
pub trait Identity: Send + Sync + 'static {
    /// Error returned by login, logout and lookup.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Authenticate this identity.
    fn login(&self) -> std::result::Result<(), Self::Error>;

    /// End this identity's authenticated state.
    fn logout(&self) -> std::result::Result<(), Self::Error>;

    /// Whether the identity has administrator rights.
    fn is_admin(&self) -> bool;

    /// Whether the identity is currently logged in.
    fn is_authenticated(&self) -> bool;

    /// Stable identifier of the underlying user, if known.
    fn unique_id(&self) -> Option<String>;

    /// Load another identity of the same kind by its unique id.
    fn find_by_id(&self, id: &str) -> std::result::Result<Option<Self>, Self::Error>
    where
        Self: Sized;
}

/// Log `user` in and store it as the session's current identity.
pub fn login<U: Identity>(session: &Session, user: Arc<U>) -> Result<()> {
    if let Err(e) = user.login() {
        error!(session_id = %session.id(), error = %e, "Login failed");
        return Err(Error::Identity(Box::new(e)));
    }

    debug!(
        session_id = %session.id(),
        user_id = user.unique_id().as_deref().unwrap_or("-"),
        "Identity logged in"
    );
    session.set_raw(SESSION_USER, user);
    Ok(())
}

/// Log `user` out and clear the session's current identity.
pub fn logout<U: Identity>(session: &Session, user: &U) -> Result<()> {
    if let Err(e) = user.logout() {
        error!(session_id = %session.id(), error = %e, "Logout failed");
        return Err(Error::Identity(Box::new(e)));
    }

    session.delete(SESSION_USER);
    debug!(session_id = %session.id(), "Identity logged out");
    Ok(())
}

/// The identity stored in the session, if it is of type `U`.
pub fn current_user<U: Identity>(session: &Session) -> Option<Arc<U>> {
    session.get::<U>(SESSION_USER)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::IdGenerator;
    use parking_lot::RwLock;

    #[derive(Debug, thiserror::Error)]
    #[error("bad credentials for {0}")]
    struct BadCredentials(String);

    /// Identity whose login succeeds unless `password_ok` is cleared.
    #[derive(Debug, Default)]
    struct TestUser {
        name: String,
        admin: bool,
        password_ok: bool,
        logged_in: RwLock<bool>,
    }

    impl TestUser {
        fn new(name: &str, admin: bool) -> Self {
            Self {
                name: name.to_string(),
                admin,
                password_ok: true,
                logged_in: RwLock::new(false),
            }
        }
    }

    impl Identity for TestUser {
        type Error = BadCredentials;

        fn login(&self) -> std::result::Result<(), BadCredentials> {
            if !self.password_ok {
                return Err(BadCredentials(self.name.clone()));
            }
            *self.logged_in.write() = true;
            Ok(())
        }

        fn logout(&self) -> std::result::Result<(), BadCredentials> {
            *self.logged_in.write() = false;
            Ok(())
        }

        fn is_admin(&self) -> bool {
            self.admin
        }

        fn is_authenticated(&self) -> bool {
            *self.logged_in.read()
        }

        fn unique_id(&self) -> Option<String> {
            (!self.name.is_empty()).then(|| self.name.clone())
        }

        fn find_by_id(&self, id: &str) -> std::result::Result<Option<Self>, BadCredentials> {
            Ok((id == self.name).then(|| TestUser::new(id, self.admin)))
        }
    }

    fn session() -> Session {
        Session::new(IdGenerator::default().generate().unwrap())
    }

    #[test]
    fn test_login_stores_identity() {
        let s = session();
        let user = Arc::new(TestUser::new("alice", false));

        login(&s, Arc::clone(&user)).unwrap();

        let current = current_user::<TestUser>(&s).unwrap();
        assert!(Arc::ptr_eq(&current, &user));
        assert!(current.is_authenticated());
    }

    #[test]
    fn test_failed_login_leaves_session_untouched() {
        let s = session();
        let mut user = TestUser::new("mallory", false);
        user.password_ok = false;

        let err = login(&s, Arc::new(user)).unwrap_err();
        assert!(matches!(err, Error::Identity(_)));
        assert!(err.to_string().contains("mallory"));
        assert!(!s.contains(SESSION_USER));
    }

    #[test]
    fn test_logout_clears_identity() {
        let s = session();
        let user = Arc::new(TestUser::new("alice", false));
        login(&s, Arc::clone(&user)).unwrap();

        logout(&s, user.as_ref()).unwrap();

        assert!(current_user::<TestUser>(&s).is_none());
        assert!(!user.is_authenticated());
    }

    #[test]
    fn test_find_by_id() {
        let user = TestUser::new("alice", true);
        let found = user.find_by_id("alice").unwrap().unwrap();
        assert!(found.is_admin());
        assert!(user.find_by_id("bob").unwrap().is_none());
    }
}
