//! axum integration for the Lodge session store.
//!
//! This crate is the HTTP transport around [`lodge_session`]:
//!
//! - Cookie-carried session identifiers, resolved once per request
//! - [`CurrentSession`] and [`CurrentUser`] extractors for handlers
//! - [`login_required`] and [`admin_required`] route guards that redirect to
//!   a login page
//! - Request logging tagged with the session identifier
//!
//! # Example
//!
//! ```ignore
//! use axum::{Router, middleware, routing::get};
//! use lodge_server::{SessionState, login_required, with_sessions};
//!
//! let state = SessionState::from_config(config, MyUser::anonymous);
//! let members = Router::new()
//!     .route("/me", get(me))
//!     .route_layer(middleware::from_fn_with_state(state.clone(), login_required::<MyUser>));
//!
//! let app = with_sessions(Router::new().merge(members), state);
//! ```

pub mod auth;
pub mod config;
pub mod error;
pub mod logging;
pub mod session;
pub mod state;

pub use auth::{admin_required, login_required};
pub use config::{AuthConfig, ServerConfig};
pub use error::{Result, ServerError};
pub use logging::request_logging_middleware;
pub use session::{CurrentSession, CurrentUser, session_cookie, session_middleware};
pub use state::{IdentityFactory, SessionState};

use axum::{Router, middleware};
use lodge_session::Identity;
use tower_cookies::CookieManagerLayer;

/// Wrap `router` with the session middleware and the cookie layer it needs.
pub fn with_sessions<U, S>(router: Router<S>, state: SessionState<U>) -> Router<S>
where
    U: Identity,
    S: Clone + Send + Sync + 'static,
{
    router
        .layer(middleware::from_fn_with_state(state, session_middleware::<U>))
        .layer(CookieManagerLayer::new())
}
