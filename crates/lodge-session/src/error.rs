//! Error types for session store operations.

/// Error type for session store operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Neither the primary nor the fallback entropy source produced bytes.
    #[error("Randomness unavailable: {0}")]
    RandomnessUnavailable(String),

    /// Configuration values failed validation.
    #[error("Invalid session config: {0}")]
    InvalidConfig(String),

    /// Failed to read a config file.
    #[error("failed to read config file '{path}': {source}")]
    ReadConfig {
        path: String,
        source: std::io::Error,
    },

    /// Failed to parse TOML.
    #[error("failed to parse config: {0}")]
    ParseConfig(#[from] toml::de::Error),

    /// The caller-supplied identity failed to log in or out.
    #[error("Identity error: {0}")]
    Identity(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Result type for session store operations.
pub type Result<T> = std::result::Result<T, Error>;
