//! Demo application served by `lodge serve`.
//!
//! A small site that exercises every part of the session stack: a visit
//! counter kept in the session, a login form that stores an identity, and
//! two guarded pages.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Query, State},
    middleware,
    response::Redirect,
    routing::get,
};
use lodge_server::{
    CurrentSession, CurrentUser, Result, ServerError, SessionState, admin_required,
    login_required, request_logging_middleware, with_sessions,
};
use lodge_session::{Identity, StoreStats};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Users whose login grants administrator rights.
const ADMIN_USERS: &[&str] = &["admin", "root"];

/// Session key of the visit counter.
const VISITS_KEY: &str = "visits";

#[derive(Debug, thiserror::Error)]
pub enum DemoUserError {
    #[error("anonymous visitors cannot log in")]
    Anonymous,
}

/// Identity for the demo site.
///
/// Anonymous until a name is supplied through the login page.
#[derive(Debug, Default)]
pub struct DemoUser {
    name: Option<String>,
    logged_in: RwLock<bool>,
}

impl DemoUser {
    /// A visitor without a name.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// A named user, not yet logged in.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            logged_in: RwLock::new(false),
        }
    }
}

impl Identity for DemoUser {
    type Error = DemoUserError;

    fn login(&self) -> std::result::Result<(), DemoUserError> {
        if self.name.is_none() {
            return Err(DemoUserError::Anonymous);
        }
        *self.logged_in.write() = true;
        Ok(())
    }

    fn logout(&self) -> std::result::Result<(), DemoUserError> {
        *self.logged_in.write() = false;
        Ok(())
    }

    fn is_admin(&self) -> bool {
        self.name
            .as_deref()
            .is_some_and(|name| ADMIN_USERS.contains(&name))
    }

    fn is_authenticated(&self) -> bool {
        *self.logged_in.read()
    }

    fn unique_id(&self) -> Option<String> {
        self.name.clone()
    }

    fn find_by_id(&self, id: &str) -> std::result::Result<Option<Self>, DemoUserError> {
        Ok(Some(Self::named(id)))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// Response body for `/` and `/me`.
#[derive(Debug, Serialize, Deserialize)]
pub struct VisitorInfo {
    pub session_id: String,
    pub visits: u64,
    pub user: Option<String>,
    pub authenticated: bool,
    pub admin: bool,
}

fn visitor_info(session: &CurrentSession, user: &DemoUser) -> VisitorInfo {
    VisitorInfo {
        session_id: session.id().to_string(),
        visits: session.get::<u64>(VISITS_KEY).map_or(0, |n| *n),
        user: user.unique_id(),
        authenticated: user.is_authenticated(),
        admin: user.is_admin(),
    }
}

async fn index_handler(
    session: CurrentSession,
    user: CurrentUser<DemoUser>,
) -> Json<VisitorInfo> {
    let visits = session.get::<u64>(VISITS_KEY).map_or(1, |n| *n + 1);
    session.set(VISITS_KEY, visits);
    Json(visitor_info(&session, &user))
}

#[derive(Debug, Deserialize)]
struct LoginQuery {
    user: Option<String>,
    next: Option<String>,
}

async fn login_handler(
    session: CurrentSession,
    Query(query): Query<LoginQuery>,
) -> Result<Redirect> {
    let name = query
        .user
        .filter(|name| !name.trim().is_empty())
        .ok_or_else(|| ServerError::BadRequest("missing 'user' parameter".to_string()))?;

    lodge_session::login(&session, Arc::new(DemoUser::named(name.trim())))?;
    info!(session_id = %session.id(), user = %name.trim(), "User logged in");

    // Only local paths are followed.
    let next = query
        .next
        .filter(|next| next.starts_with('/') && !next.starts_with("//"))
        .unwrap_or_else(|| "/".to_string());
    Ok(Redirect::to(&next))
}

async fn logout_handler(
    session: CurrentSession,
    user: CurrentUser<DemoUser>,
) -> Result<Redirect> {
    lodge_session::logout(&session, user.0.as_ref())?;
    info!(session_id = %session.id(), "User logged out");
    Ok(Redirect::to("/"))
}

async fn me_handler(session: CurrentSession, user: CurrentUser<DemoUser>) -> Json<VisitorInfo> {
    Json(visitor_info(&session, &user))
}

async fn admin_handler(State(state): State<SessionState<DemoUser>>) -> Json<StoreStats> {
    Json(state.resolver.store().stats())
}

// ─────────────────────────────────────────────────────────────────────────────
// Router
// ─────────────────────────────────────────────────────────────────────────────

/// Build the demo router.
pub fn router(state: SessionState<DemoUser>, request_logging: bool) -> Router {
    let login_url = state.auth.login_url.clone();
    let admin_login_url = state.auth.admin_login_url.clone();

    let members = Router::new()
        .route("/me", get(me_handler))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            login_required::<DemoUser>,
        ));

    let admin = Router::new()
        .route("/admin", get(admin_handler))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            admin_required::<DemoUser>,
        ));

    let mut router = Router::new()
        .route("/", get(index_handler))
        .route(&login_url, get(login_handler))
        .route("/account/logout", get(logout_handler))
        .merge(members)
        .merge(admin);
    if admin_login_url != login_url {
        router = router.route(&admin_login_url, get(login_handler));
    }
    if request_logging {
        router = router.layer(middleware::from_fn(request_logging_middleware));
    }

    with_sessions(router.with_state(state.clone()), state)
}
