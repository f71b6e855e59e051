//! Serve command - runs the demo site on the session store.

use std::net::SocketAddr;

use anyhow::{Context as _, Result};
use clap::Args;
use lodge_session::SessionResolver;
use lodge_server::SessionState;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

use super::Context;
use crate::demo::{self, DemoUser};

/// Arguments for the serve command.
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Address to bind to (overrides config)
    #[arg(short, long)]
    pub bind: Option<SocketAddr>,
}

/// Run the serve command.
pub async fn run(args: ServeArgs, ctx: &Context) -> Result<()> {
    let config = &ctx.config;
    let addr = args.bind.unwrap_or(config.server.bind_address);

    match &ctx.config_path {
        Some(path) => println!("Loaded config: {}", path.display()),
        None => println!("No config file found, using defaults"),
    }
    if ctx.verbose {
        println!(
            "Sessions: cookie '{}', ttl {}s, {} shards, sweep every {}s",
            config.session.cookie_name,
            config.session.max_age_secs,
            config.session.shards,
            config.session.cleanup_interval_secs,
        );
    }

    let resolver = SessionResolver::from_config(&config.session);
    let sweeper = resolver
        .store()
        .spawn_sweeper(config.session.cleanup_interval());
    let state = SessionState::new(resolver, config.session.clone(), DemoUser::anonymous)
        .with_auth(config.auth.clone());

    let router =
        demo::router(state, config.server.request_logging).layer(TraceLayer::new_for_http());

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    println!("Listening on http://{}", listener.local_addr()?);
    info!(%addr, "Starting server");

    let served = axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    sweeper.shutdown().await;
    info!("Server stopped");
    served.context("server error")
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
