//! Configuration for the session controller.

use std::time::Duration;

use reqwest::Url;
use serde::Deserialize;

use crate::{error::GoalKitError, store::is_valid_key};

/// Identity service used when no base URL is configured.
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";

/// Store key holding the bearer token.
pub const DEFAULT_TOKEN_KEY: &str = "auth_token";

/// Store key holding the JSON-serialized user record.
pub const DEFAULT_USER_KEY: &str = "user_data";

/// Settings for a [`crate::SessionController`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Base URL of the identity service (e.g. `https://api.example.org`).
    pub api_base_url: String,
    /// API key used to construct the wallet SDK. Without it the SDK is unavailable.
    pub wallet_api_key: Option<String>,
    /// Per-request timeout. `None` lets a request wait indefinitely.
    pub timeout: Option<Duration>,
    /// Store key for the cached bearer token.
    pub token_key: String,
    /// Store key for the cached user record.
    pub user_key: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            wallet_api_key: None,
            timeout: None,
            token_key: DEFAULT_TOKEN_KEY.to_string(),
            user_key: DEFAULT_USER_KEY.to_string(),
        }
    }
}

#[derive(Deserialize)]
struct RawSessionConfig {
    api_base_url: Option<String>,
    wallet_api_key: Option<String>,
    timeout_secs: Option<u64>,
    token_key: Option<String>,
    user_key: Option<String>,
}

impl SessionConfig {
    /// Creates a config pointing at `api_base_url` with all other settings defaulted.
    #[must_use]
    pub fn new(api_base_url: impl Into<String>) -> Self {
        Self {
            api_base_url: api_base_url.into(),
            ..Self::default()
        }
    }

    /// Sets the wallet SDK API key.
    #[must_use]
    pub fn with_wallet_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.wallet_api_key = Some(api_key.into());
        self
    }

    /// Sets a per-request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Parses a config from JSON. Missing fields take their defaults.
    ///
    /// # Errors
    /// Returns an error if the JSON is malformed or the resulting config is invalid.
    pub fn from_json(json: &str) -> Result<Self, GoalKitError> {
        let raw: RawSessionConfig =
            serde_json::from_str(json).map_err(|e| GoalKitError::InvalidInput {
                attribute: "config".to_string(),
                reason: format!("invalid config json: {e}"),
            })?;

        let defaults = Self::default();
        let config = Self {
            api_base_url: raw.api_base_url.unwrap_or(defaults.api_base_url),
            wallet_api_key: raw.wallet_api_key.filter(|key| !key.is_empty()),
            timeout: raw.timeout_secs.map(Duration::from_secs),
            token_key: raw.token_key.unwrap_or(defaults.token_key),
            user_key: raw.user_key.unwrap_or(defaults.user_key),
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks the base URL and the store keys.
    ///
    /// Plain `http` is only accepted for loopback hosts.
    ///
    /// # Errors
    /// Returns [`GoalKitError::InvalidInput`] describing the first problem found.
    pub fn validate(&self) -> Result<(), GoalKitError> {
        self.base_url().map(|_| ())?;

        for key in [&self.token_key, &self.user_key] {
            if !is_valid_key(key) {
                return Err(GoalKitError::InvalidInput {
                    attribute: "store_keys".to_string(),
                    reason: format!(
                        "store key `{key}` must be non-empty and use only ASCII letters, digits, `_` or `-`"
                    ),
                });
            }
        }
        if self.token_key == self.user_key {
            return Err(GoalKitError::InvalidInput {
                attribute: "store_keys".to_string(),
                reason: "token and user keys must differ".to_string(),
            });
        }
        Ok(())
    }

    /// Parses and checks `api_base_url`.
    pub(crate) fn base_url(&self) -> Result<Url, GoalKitError> {
        let url = Url::parse(&self.api_base_url).map_err(|e| {
            GoalKitError::InvalidInput {
                attribute: "api_base_url".to_string(),
                reason: e.to_string(),
            }
        })?;

        match url.scheme() {
            "https" => Ok(url),
            "http" if is_loopback(&url) => Ok(url),
            scheme => Err(GoalKitError::InvalidInput {
                attribute: "api_base_url".to_string(),
                reason: format!("scheme `{scheme}` is not allowed for this host"),
            }),
        }
    }
}

fn is_loopback(url: &Url) -> bool {
    matches!(
        url.host_str(),
        Some("localhost" | "127.0.0.1" | "[::1]" | "::1")
    )
}
