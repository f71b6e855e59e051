//! Common test utilities for integration tests.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::{Router, extract::Path, http::StatusCode, middleware, routing::get};
use lodge_server::{
    CurrentSession, CurrentUser, SessionState, admin_required, login_required, with_sessions,
};
use lodge_session::{Identity, SessionConfig};
use parking_lot::RwLock;
use reqwest::Client;
use tokio::task::JoinHandle;
use tokio::time::timeout;

#[derive(Debug, thiserror::Error)]
#[error("anonymous login")]
pub struct AnonymousLogin;

/// Identity used by the test app.
#[derive(Debug, Default)]
pub struct Member {
    pub name: Option<String>,
    pub admin: bool,
    logged_in: RwLock<bool>,
}

impl Member {
    pub fn named(name: &str, admin: bool) -> Self {
        Self {
            name: Some(name.to_string()),
            admin,
            logged_in: RwLock::new(false),
        }
    }
}

impl Identity for Member {
    type Error = AnonymousLogin;

    fn login(&self) -> std::result::Result<(), AnonymousLogin> {
        if self.name.is_none() {
            return Err(AnonymousLogin);
        }
        *self.logged_in.write() = true;
        Ok(())
    }

    fn logout(&self) -> std::result::Result<(), AnonymousLogin> {
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
        self.name.clone()
    }

    fn find_by_id(&self, id: &str) -> std::result::Result<Option<Self>, AnonymousLogin> {
        Ok(Some(Self::named(id, false)))
    }
}

async fn count(session: CurrentSession) -> String {
    let n = session.get::<u64>("count").map_or(1, |n| *n + 1);
    session.set("count", n);
    n.to_string()
}

async fn login(session: CurrentSession, Path((name, admin)): Path<(String, bool)>) -> StatusCode {
    match lodge_session::login(&session, Arc::new(Member::named(&name, admin))) {
        Ok(()) => StatusCode::NO_CONTENT,
        Err(_) => StatusCode::UNAUTHORIZED,
    }
}

async fn logout(session: CurrentSession, user: CurrentUser<Member>) -> StatusCode {
    match lodge_session::logout(&session, user.0.as_ref()) {
        Ok(()) => StatusCode::NO_CONTENT,
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

async fn whoami(user: CurrentUser<Member>) -> String {
    user.unique_id().unwrap_or_default()
}

/// Build the test app.
pub fn app(state: SessionState<Member>) -> Router {
    let members = Router::new()
        .route("/me", get(whoami))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            login_required::<Member>,
        ));
    let admin = Router::new()
        .route("/admin", get(whoami))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            admin_required::<Member>,
        ));

    let router = Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/count", get(count))
        .route("/login/{name}/{admin}", get(login))
        .route("/logout", get(logout))
        .merge(members)
        .merge(admin);
    with_sessions(router, state)
}

/// A test server that runs in the background.
pub struct TestServer {
    /// The server's address.
    pub addr: SocketAddr,
    /// Session state shared with the server.
    pub state: SessionState<Member>,
    /// Handle to the server task.
    _handle: JoinHandle<()>,
}

impl TestServer {
    /// Start a new test server with default session settings.
    pub async fn start() -> Result<Self> {
        Self::start_with(SessionConfig::default()).await
    }

    /// Start a new test server with the given session settings.
    pub async fn start_with(config: SessionConfig) -> Result<Self> {
        let state = SessionState::from_config(config, Member::default);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let router = app(state.clone());
        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });

        wait_for_server(&Client::new(), addr).await?;

        Ok(Self {
            addr,
            state,
            _handle: handle,
        })
    }

    /// Get the URL for a path on the server.
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// A client that keeps cookies and does not follow redirects.
    pub fn browser(&self) -> Client {
        Client::builder()
            .cookie_store(true)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .expect("Failed to build client")
    }
}

/// Wait for the server to become ready.
async fn wait_for_server(client: &Client, addr: SocketAddr) -> Result<()> {
    let url = format!("http://{}/health", addr);

    let result = timeout(Duration::from_secs(5), async {
        loop {
            match client.get(&url).send().await {
                Ok(resp) if resp.status().is_success() => return,
                _ => tokio::time::sleep(Duration::from_millis(50)).await,
            }
        }
    })
    .await;

    match result {
        Ok(()) => Ok(()),
        Err(_) => anyhow::bail!("Timeout waiting for server to start"),
    }
}
