//! Server and auth guard configuration.

use std::net::SocketAddr;

use serde::{Deserialize, Serialize};

/// Default bind address.
pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:8080";

/// Default login page for unauthenticated requests.
pub const DEFAULT_LOGIN_URL: &str = "/account/login";

/// Default login page for requests needing an administrator.
pub const DEFAULT_ADMIN_LOGIN_URL: &str = "/admin/account/login";

/// Default query parameter carrying the originally requested path.
pub const DEFAULT_REDIRECT_PARAM: &str = "next";

/// Server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind the server to.
    pub bind_address: SocketAddr,

    /// Enable request logging.
    pub request_logging: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([127, 0, 0, 1], 8080)),
            request_logging: true,
        }
    }
}

impl ServerConfig {
    /// Set the bind address.
    pub fn with_bind_address(mut self, addr: SocketAddr) -> Self {
        self.bind_address = addr;
        self
    }

    /// Enable or disable request logging.
    pub fn with_request_logging(mut self, enabled: bool) -> Self {
        self.request_logging = enabled;
        self
    }
}

/// Where the login guards send visitors who fail them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Redirect target for [`login_required`](crate::login_required).
    pub login_url: String,

    /// Redirect target for [`admin_required`](crate::admin_required).
    pub admin_login_url: String,

    /// Query parameter carrying the path the visitor asked for.
    pub redirect_param: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            login_url: DEFAULT_LOGIN_URL.to_string(),
            admin_login_url: DEFAULT_ADMIN_LOGIN_URL.to_string(),
            redirect_param: DEFAULT_REDIRECT_PARAM.to_string(),
        }
    }
}

impl AuthConfig {
    /// Build the redirect location for `login_url` returning to `path`.
    pub fn redirect_location(&self, login_url: &str, path: &str) -> String {
        format!(
            "{}?{}={}",
            login_url,
            self.redirect_param,
            urlencoding::encode(path)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_bind_address() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_address.to_string(), DEFAULT_BIND_ADDRESS);
    }

    #[test]
    fn test_redirect_location_encodes_path() {
        let auth = AuthConfig::default();
        assert_eq!(
            auth.redirect_location(&auth.login_url, "/orders/7"),
            "/account/login?next=%2Forders%2F7"
        );
    }

    #[test]
    fn test_deserialize_partial() {
        let auth: AuthConfig = serde_json::from_str(r#"{"login_url": "/signin"}"#).unwrap();
        assert_eq!(auth.login_url, "/signin");
        assert_eq!(auth.admin_login_url, DEFAULT_ADMIN_LOGIN_URL);
        assert_eq!(auth.redirect_param, "next");
    }
}
