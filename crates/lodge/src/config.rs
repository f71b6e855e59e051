//! Config file discovery and loading.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use lodge_server::{AuthConfig, ServerConfig};
use lodge_session::SessionConfig;
use serde::{Deserialize, Serialize};

/// Application name used for config and log directories.
const APP_NAME: &str = "lodge";

/// Config file name inside the config directory.
const CONFIG_FILE: &str = "lodge.toml";

/// Environment variable overriding the config directory.
const CONFIG_DIR_ENV: &str = "LODGE_CONFIG_DIR";

/// Full application configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LodgeConfig {
    /// `[server]` table.
    pub server: ServerConfig,

    /// `[session]` table.
    pub session: SessionConfig,

    /// `[auth]` table.
    pub auth: AuthConfig,
}

impl LodgeConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: Self = toml::from_str(toml_str).context("failed to parse config")?;
        config.session.validate()?;
        Ok(config)
    }

    /// Serialize to pretty TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("failed to serialize config")
    }
}

/// Get the config directory for lodge.
///
/// Checks `LODGE_CONFIG_DIR` first, then the platform default.
pub fn config_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var(CONFIG_DIR_ENV)
        && !dir.is_empty()
    {
        return Some(PathBuf::from(dir));
    }
    dirs::config_dir().map(|d| d.join(APP_NAME))
}

/// Default config file location.
pub fn default_config_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join(CONFIG_FILE))
}

/// Load the config.
///
/// An explicit path must exist. Without one, the default location is used
/// if present, otherwise built-in defaults apply.
pub fn load(explicit: Option<&Path>) -> Result<(LodgeConfig, Option<PathBuf>)> {
    let path = match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => default_config_path().filter(|p| p.is_file()),
    };

    let Some(path) = path else {
        return Ok((LodgeConfig::default(), None));
    };

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read config file '{}'", path.display()))?;
    let config = LodgeConfig::from_toml(&content)
        .with_context(|| format!("invalid config file '{}'", path.display()))?;
    Ok((config, Some(path)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_document() {
        let config = LodgeConfig::from_toml(
            r#"
            [server]
            bind_address = "0.0.0.0:9000"
            request_logging = false

            [session]
            cookie_name = "sid"
            max_age_secs = 600

            [auth]
            login_url = "/signin"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.bind_address.port(), 9000);
        assert!(!config.server.request_logging);
        assert_eq!(config.session.cookie_name, "sid");
        assert_eq!(config.session.max_age_secs, 600);
        assert_eq!(config.auth.login_url, "/signin");
        assert_eq!(config.auth.redirect_param, "next");
    }

    #[test]
    fn test_invalid_session_rejected() {
        let err = LodgeConfig::from_toml("[session]\nid_bytes = 4\n").unwrap_err();
        assert!(err.to_string().contains("id_bytes"));
    }

    #[test]
    fn test_round_trip_through_toml() {
        let config = LodgeConfig::default();
        let text = config.to_toml().unwrap();
        assert_eq!(LodgeConfig::from_toml(&text).unwrap(), config);
    }

    #[test]
    fn test_load_explicit_missing_file() {
        assert!(load(Some(Path::new("/nonexistent/lodge.toml"))).is_err());
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lodge.toml");
        std::fs::write(&path, "[session]\nmax_age_secs = 42\n").unwrap();

        let (config, loaded_from) = load(Some(&path)).unwrap();
        assert_eq!(config.session.max_age_secs, 42);
        assert_eq!(loaded_from, Some(path));
    }
}
