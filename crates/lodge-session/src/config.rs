//! Configuration for the session store.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default name of the carried identifier (cookie name).
pub const DEFAULT_COOKIE_NAME: &str = "sessionid";

/// Default session lifetime in seconds (1 hour).
pub const DEFAULT_MAX_AGE_SECS: u64 = 3600;

/// Default number of random bytes per session identifier.
pub const DEFAULT_ID_BYTES: usize = 16;

/// Smallest identifier strength accepted by [`SessionConfig::validate`].
pub const MIN_ID_BYTES: usize = 16;

/// Largest identifier strength accepted by [`SessionConfig::validate`].
pub const MAX_ID_BYTES: usize = 64;

/// Default number of store shards.
pub const DEFAULT_SHARDS: usize = 16;

/// Default interval between expiry sweeps in seconds.
pub const DEFAULT_CLEANUP_INTERVAL_SECS: u64 = 60;

/// Configuration for sessions and the store that holds them.
///
/// Only `max_age_secs`, `id_bytes`, `shards`, `cleanup_interval_secs` and
/// `sliding_expiry` affect the store itself. The cookie fields are carried
/// here so the transport layer reads them from the same `[session]` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Name under which the identifier is carried (cookie name).
    pub cookie_name: String,

    /// Session lifetime in seconds. Also sent as the cookie `Max-Age`.
    pub max_age_secs: u64,

    /// Only send the cookie over HTTPS.
    pub secure: bool,

    /// Hide the cookie from client-side scripts.
    pub http_only: bool,

    /// Cookie path attribute.
    pub path: String,

    /// Optional cookie domain attribute.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,

    /// Random bytes per generated identifier.
    pub id_bytes: usize,

    /// Number of independently locked store shards.
    pub shards: usize,

    /// Seconds between background expiry sweeps.
    pub cleanup_interval_secs: u64,

    /// Refresh a session's deadline every time it is resolved.
    pub sliding_expiry: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: DEFAULT_COOKIE_NAME.to_string(),
            max_age_secs: DEFAULT_MAX_AGE_SECS,
            secure: false,
            http_only: true,
            path: "/".to_string(),
            domain: None,
            id_bytes: DEFAULT_ID_BYTES,
            shards: DEFAULT_SHARDS,
            cleanup_interval_secs: DEFAULT_CLEANUP_INTERVAL_SECS,
            sliding_expiry: true,
        }
    }
}

/// On-disk layout: the session settings live under a `[session]` table so
/// they can share a file with other sections.
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    session: SessionConfig,
}

impl SessionConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the `[session]` table of a TOML document and validate it.
    ///
    /// A document without a `[session]` table yields the defaults.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let file: ConfigFile = toml::from_str(toml_str)?;
        file.session.validate()?;
        Ok(file.session)
    }

    /// Load the `[session]` table from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| Error::ReadConfig {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Check that the values can drive a working store.
    pub fn validate(&self) -> Result<()> {
        if !(MIN_ID_BYTES..=MAX_ID_BYTES).contains(&self.id_bytes) {
            return Err(Error::InvalidConfig(format!(
                "id_bytes must be between {MIN_ID_BYTES} and {MAX_ID_BYTES}, got {}",
                self.id_bytes
            )));
        }
        if self.shards == 0 {
            return Err(Error::InvalidConfig("shards must be at least 1".into()));
        }
        if self.max_age_secs == 0 {
            return Err(Error::InvalidConfig("max_age_secs must be positive".into()));
        }
        if self.cleanup_interval_secs == 0 {
            return Err(Error::InvalidConfig(
                "cleanup_interval_secs must be positive".into(),
            ));
        }
        if !is_cookie_token(&self.cookie_name) {
            return Err(Error::InvalidConfig(format!(
                "cookie_name '{}' is not a valid cookie token",
                self.cookie_name
            )));
        }
        Ok(())
    }

    /// Session time-to-live.
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.max_age_secs)
    }

    /// Interval between expiry sweeps.
    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs)
    }

    /// Set the cookie name.
    pub fn with_cookie_name(mut self, name: impl Into<String>) -> Self {
        self.cookie_name = name.into();
        self
    }

    /// Set the session lifetime. Sub-second precision is rounded up.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.max_age_secs = ttl.as_secs() + u64::from(ttl.subsec_nanos() > 0);
        self
    }

    /// Set the cookie `Secure` flag.
    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    /// Set the cookie `HttpOnly` flag.
    pub fn with_http_only(mut self, http_only: bool) -> Self {
        self.http_only = http_only;
        self
    }

    /// Set the cookie domain.
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    /// Set the number of random bytes per identifier.
    pub fn with_id_bytes(mut self, bytes: usize) -> Self {
        self.id_bytes = bytes;
        self
    }

    /// Set the number of store shards.
    pub fn with_shards(mut self, shards: usize) -> Self {
        self.shards = shards;
        self
    }

    /// Set the sweep interval.
    pub fn with_cleanup_interval(mut self, interval: Duration) -> Self {
        self.cleanup_interval_secs = interval.as_secs().max(1);
        self
    }

    /// Enable or disable sliding expiry.
    pub fn with_sliding_expiry(mut self, enabled: bool) -> Self {
        self.sliding_expiry = enabled;
        self
    }
}

/// RFC 6265 cookie-name token: visible ASCII without separators.
fn is_cookie_token(name: &str) -> bool {
    !name.is_empty()
        && name.bytes().all(|b| {
            b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b)
        })
}
