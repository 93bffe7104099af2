//! Session layer configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use fieldkey_core::{ApiOrigin, Error, error::TransportError};

/// Remaining validity below which an access token is refreshed before use.
pub const DEFAULT_EXPIRY_MARGIN_SECS: u64 = 15;

/// Per-request network timeout for identity calls and the default client.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Configuration read once when the session layer is assembled.
///
/// # Example
///
/// ```
/// use fieldkey_http::SessionConfig;
///
/// let config: SessionConfig = serde_json::from_str(
///     r#"{ "api_base": "https://api.example.com", "identity_base": "https://api.example.com/auth" }"#,
/// ).unwrap();
/// assert!(config.honor_expiry);
/// assert_eq!(config.identity_base().endpoint("login"), "https://api.example.com/auth/login");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Origin whose host receives bearer tokens.
    pub api_base: ApiOrigin,

    /// Base of the login/refresh/validate/logout endpoints. Defaults to
    /// `api_base`.
    #[serde(default)]
    pub identity_base: Option<ApiOrigin>,

    /// When false, stored tokens are used without any expiry check. Only for
    /// development backends: a silently expired session is never refreshed.
    #[serde(default = "default_true")]
    pub honor_expiry: bool,

    #[serde(default = "default_expiry_margin_secs")]
    pub expiry_margin_secs: u64,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default)]
    pub user_agent: Option<String>,
}

fn default_true() -> bool {
    true
}

fn default_expiry_margin_secs() -> u64 {
    DEFAULT_EXPIRY_MARGIN_SECS
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

impl SessionConfig {
    pub fn new(api_base: ApiOrigin) -> Self {
        Self {
            api_base,
            identity_base: None,
            honor_expiry: true,
            expiry_margin_secs: DEFAULT_EXPIRY_MARGIN_SECS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            user_agent: None,
        }
    }

    pub fn with_identity_base(mut self, identity_base: ApiOrigin) -> Self {
        self.identity_base = Some(identity_base);
        self
    }

    pub fn with_honor_expiry(mut self, honor_expiry: bool) -> Self {
        self.honor_expiry = honor_expiry;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout_secs = timeout.as_secs();
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Where the identity endpoints live.
    pub fn identity_base(&self) -> &ApiOrigin {
        self.identity_base.as_ref().unwrap_or(&self.api_base)
    }

    pub fn expiry_margin(&self) -> chrono::Duration {
        i64::try_from(self.expiry_margin_secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .unwrap_or(chrono::Duration::MAX)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Build a reqwest client carrying this configuration's timeout and user agent.
    pub fn http_client(&self) -> Result<reqwest::Client, Error> {
        let user_agent = self
            .user_agent
            .clone()
            .unwrap_or_else(|| concat!("fieldkey/", env!("CARGO_PKG_VERSION")).to_string());

        reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(self.request_timeout())
            .build()
            .map_err(|e| Error::Transport(TransportError::from(e)))
    }
}
