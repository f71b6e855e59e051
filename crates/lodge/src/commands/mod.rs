//! CLI command handlers.

pub mod config;
pub mod serve;

use std::path::PathBuf;

use crate::config::LodgeConfig;

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Effective configuration.
    pub config: LodgeConfig,
    /// File the configuration was read from, if any.
    pub config_path: Option<PathBuf>,
    /// Verbose output enabled.
    pub verbose: bool,
}
