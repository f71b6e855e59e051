//! Config command - show the effective configuration.

use anyhow::Result;
use clap::{Args, Subcommand};

use super::Context;
use crate::config;

/// Arguments for the config command.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: Option<ConfigCommand>,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print the effective configuration as TOML (default)
    Show,

    /// Show which config file is loaded
    Path,
}

/// Run the config command.
pub async fn run(args: ConfigArgs, ctx: &Context) -> Result<()> {
    match args.command.unwrap_or(ConfigCommand::Show) {
        ConfigCommand::Show => cmd_show(ctx),
        ConfigCommand::Path => cmd_path(ctx),
    }
}

fn cmd_show(ctx: &Context) -> Result<()> {
    match &ctx.config_path {
        Some(path) => println!("# Loaded from {}\n", path.display()),
        None => println!("# No config file loaded (using defaults)\n"),
    }
    print!("{}", ctx.config.to_toml()?);
    Ok(())
}

fn cmd_path(ctx: &Context) -> Result<()> {
    match &ctx.config_path {
        Some(path) => println!("{}", path.display()),
        None => match config::default_config_path() {
            Some(path) => println!("{} (not found)", path.display()),
            None => println!("No config directory available"),
        },
    }
    Ok(())
}
