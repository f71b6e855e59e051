//! Session middleware.
//!
//! Carries the session identifier in a cookie, resolves it once per request
//! and exposes the session and the current identity to handlers through
//! request extensions.

use std::borrow::Cow;
use std::sync::Arc;

use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use lodge_session::{Identity, SESSION_USER, Session, SessionConfig, SessionId, current_user};
use tower_cookies::{Cookie, Cookies, cookie::time::Duration};
use tracing::{debug, trace};

use crate::error::{Result, ServerError};
use crate::state::SessionState;

// ─────────────────────────────────────────────────────────────────────────────
// Extractors
// ─────────────────────────────────────────────────────────────────────────────

/// The session resolved for this request.
///
/// ```ignore
/// async fn visits(session: CurrentSession) -> String {
///     let n = session.get::<u32>("visits").map_or(1, |n| *n + 1);
///     session.set("visits", n);
///     n.to_string()
/// }
/// ```
#[derive(Debug, Clone)]
pub struct CurrentSession(pub Arc<Session>);

impl std::ops::Deref for CurrentSession {
    type Target = Session;

    fn deref(&self) -> &Session {
        &self.0
    }
}

impl<S: Send + Sync> FromRequestParts<S> for CurrentSession {
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self> {
        parts
            .extensions
            .get::<CurrentSession>()
            .cloned()
            .ok_or(ServerError::MissingSession)
    }
}

/// The identity stored in this request's session.
#[derive(Debug)]
pub struct CurrentUser<U>(pub Arc<U>);

impl<U> Clone for CurrentUser<U> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<U> std::ops::Deref for CurrentUser<U> {
    type Target = U;

    fn deref(&self) -> &U {
        &self.0
    }
}

impl<S: Send + Sync, U: Identity> FromRequestParts<S> for CurrentUser<U> {
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self> {
        parts
            .extensions
            .get::<CurrentUser<U>>()
            .cloned()
            .ok_or(ServerError::MissingSession)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Cookies
// ─────────────────────────────────────────────────────────────────────────────

/// Build the cookie that carries `id` back to the client.
pub fn session_cookie(config: &SessionConfig, id: &SessionId) -> Cookie<'static> {
    let max_age = i64::try_from(config.max_age_secs).unwrap_or(i64::MAX);
    let mut builder = Cookie::build((config.cookie_name.clone(), id.as_str().to_string()))
        .path(config.path.clone())
        .http_only(config.http_only)
        .secure(config.secure)
        .max_age(Duration::seconds(max_age));
    if let Some(domain) = &config.domain {
        builder = builder.domain(domain.clone());
    }
    builder.build()
}

/// Read the carried identifier, percent-decoding it.
fn presented_id(cookies: &Cookies, name: &str) -> Option<String> {
    let cookie = cookies.get(name)?;
    urlencoding::decode(cookie.value())
        .ok()
        .map(Cow::into_owned)
}

// ─────────────────────────────────────────────────────────────────────────────
// Middleware
// ─────────────────────────────────────────────────────────────────────────────

/// Resolve the request's session and attach it, with its identity, to the
/// request.
///
/// Visitors without a live session get a new one and a `Set-Cookie` header.
/// With sliding expiry the cookie is re-sent on every hit so its `Max-Age`
/// tracks the refreshed server-side deadline.
/// Sessions without an identity get one from the state's factory. Requires
/// `tower_cookies::CookieManagerLayer` outside this layer.
pub async fn session_middleware<U: Identity>(
    State(state): State<SessionState<U>>,
    cookies: Cookies,
    mut request: Request,
    next: Next,
) -> Result<Response> {
    let presented = presented_id(&cookies, &state.config.cookie_name);
    let resolved = state.resolver.resolve(presented.as_deref())?;

    if let Some(id) = resolved.issued_id() {
        cookies.add(session_cookie(&state.config, id));
        debug!(session_id = %id, path = %request.uri().path(), "Issued session cookie");
    } else if let Some(id) = resolved.renewed_id() {
        // The deadline moved, so the cookie's Max-Age has to move with it.
        cookies.add(session_cookie(&state.config, id));
        trace!(session_id = %id, "Renewed session cookie");
    }

    let session = resolved.session;
    let user = match current_user::<U>(&session) {
        Some(user) => user,
        None => {
            let user = Arc::new((state.new_identity)());
            session.set_raw(SESSION_USER, user.clone());
            trace!(session_id = %session.id(), "Attached anonymous identity");
            user
        }
    };

    request.extensions_mut().insert(CurrentSession(session));
    request.extensions_mut().insert(CurrentUser(user));

    Ok(next.run(request).await)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
