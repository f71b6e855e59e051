//! Lodge - session-backed web server
//!
//! Main entry point for the Lodge CLI.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod config;
mod demo;

use commands::{config as config_cmd, serve};

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// Lodge - session-backed web server
#[derive(Parser)]
#[command(name = "lodge")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file (default: <config dir>/lodge/lodge.toml)
    #[arg(long, global = true, env = "LODGE_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Serve the demo site
    Serve(serve::ServeArgs),

    /// Configuration inspection
    Config(config_cmd::ConfigArgs),
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Console (human-readable) + rotating JSON file
    let filter = if cli.verbose {
        "lodge=debug,lodge_server=debug,lodge_session=debug,tower_http=debug,info"
    } else {
        "lodge=info,lodge_server=info,lodge_session=info,warn"
    };

    let log_dir = config::config_dir()
        .map(|d| d.join("logs"))
        .unwrap_or_else(|| PathBuf::from("logs"));
    let file_appender = tracing_appender::rolling::daily(&log_dir, "lodge.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    use tracing_subscriber::prelude::*;
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_filter(tracing_subscriber::EnvFilter::new(filter)),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_filter(tracing_subscriber::EnvFilter::new(
                    "lodge=trace,lodge_server=trace,lodge_session=trace,info",
                )),
        )
        .init();

    let (config, config_path) = config::load(cli.config.as_deref())?;

    let ctx = commands::Context {
        config,
        config_path,
        verbose: cli.verbose,
    };

    match cli.command {
        Commands::Serve(args) => serve::run(args, &ctx).await,
        Commands::Config(args) => config_cmd::run(args, &ctx).await,
    }
}
