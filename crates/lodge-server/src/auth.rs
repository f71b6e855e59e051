//! Login guards.
//!
//! Route layers that redirect visitors whose session identity is not
//! authenticated (or not an administrator) to a login page, remembering the
//! path they asked for. They read the identity attached by
//! [`session_middleware`](crate::session_middleware), so they must sit
//! inside it.

use axum::{
    extract::{Request, State},
    http::{StatusCode, header::LOCATION},
    middleware::Next,
    response::{IntoResponse, Response},
};
use lodge_session::Identity;
use tracing::debug;

use crate::session::CurrentUser;
use crate::state::SessionState;

/// Which check a guard applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Requirement {
    Authenticated,
    Admin,
}

impl Requirement {
    fn allows<U: Identity>(self, user: &U) -> bool {
        match self {
            Requirement::Authenticated => user.is_authenticated(),
            Requirement::Admin => user.is_authenticated() && user.is_admin(),
        }
    }
}

fn guard<U: Identity>(
    state: &SessionState<U>,
    request: &Request,
    requirement: Requirement,
) -> Option<Response> {
    let allowed = request
        .extensions()
        .get::<CurrentUser<U>>()
        .is_some_and(|user| requirement.allows(user.0.as_ref()));
    if allowed {
        return None;
    }

    let login_url = match requirement {
        Requirement::Authenticated => &state.auth.login_url,
        Requirement::Admin => &state.auth.admin_login_url,
    };
    let path = request.uri().path();
    debug!(path = %path, ?requirement, "Guard rejected request, redirecting to login");

    let location = state.auth.redirect_location(login_url, path);
    Some((StatusCode::FOUND, [(LOCATION, location)]).into_response())
}

/// Redirect to the login page unless the visitor is logged in.
pub async fn login_required<U: Identity>(
    State(state): State<SessionState<U>>,
    request: Request,
    next: Next,
) -> Response {
    match guard(&state, &request, Requirement::Authenticated) {
        Some(redirect) => redirect,
        None => next.run(request).await,
    }
}

/// Redirect to the admin login page unless the visitor is a logged-in
/// administrator.
pub async fn admin_required<U: Identity>(
    State(state): State<SessionState<U>>,
    request: Request,
    next: Next,
) -> Response {
    match guard(&state, &request, Requirement::Admin) {
        Some(redirect) => redirect,
        None => next.run(request).await,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
