//! Client for the remote identity service (`/auth/*` endpoints).
use reqwest::Response;
use secrecy::{ExposeSecret, SecretString};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::{
    config::SessionConfig,
    error::GoalKitError,
    http_request::{error_from_response, Request},
};

/// Assertion marker sent in place of a wallet signature. The wallet SDK's own
/// authorization step stands as proof of control of the address.
pub const UNIVERSAL_AUTH_SIGNATURE: &str = "xumm_universal_auth";

/// A user record as returned by `GET /auth/me`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct User {
    /// Backend identifier of the user.
    pub id: String,
    /// The XRPL account the user signed in with.
    pub wallet_address: String,
    /// Creation timestamp, as rendered by the service.
    pub created_at: String,
    /// Timestamp of the most recent sign-in, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_login: Option<String>,
}

/// Credential returned by `POST /auth/verify`.
#[derive(Debug)]
pub struct AuthToken {
    /// The bearer token.
    pub access_token: SecretString,
    /// Token type, normally `bearer`.
    pub token_type: Option<String>,
    /// Lifetime of the token in seconds.
    pub expires_in: Option<u64>,
}

#[derive(Deserialize)]
struct AuthTokenResponse {
    access_token: String,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    expires_in: Option<u64>,
}

impl From<AuthTokenResponse> for AuthToken {
    fn from(raw: AuthTokenResponse) -> Self {
        Self {
            access_token: SecretString::from(raw.access_token),
            token_type: raw.token_type,
            expires_in: raw.expires_in,
        }
    }
}

#[derive(Serialize)]
struct ChallengeRequest<'a> {
    wallet_address: &'a str,
}

#[derive(Deserialize)]
struct ChallengeResponse {
    challenge: String,
}

#[derive(Serialize)]
struct VerifyRequest<'a> {
    wallet_address: &'a str,
    signature: &'a str,
    challenge: &'a str,
    xumm_sdk_auth: bool,
}

/// Identity service API client
pub struct IdentityClient {
    base_url: String,
    request: Request,
}

impl IdentityClient {
    /// Creates a client for the service configured in `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured base URL is invalid.
    pub fn new(config: &SessionConfig) -> Result<Self, GoalKitError> {
        let base_url = config.base_url()?;
        Ok(Self {
            base_url: base_url.as_str().trim_end_matches('/').to_string(),
            request: Request::new(config.timeout),
        })
    }

    /// Returns the base URL requests are sent to.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Requests a one-time challenge for `wallet_address`.
    ///
    /// # Errors
    ///
    /// Returns error on network failure, a non-2xx status or an invalid response.
    pub async fn request_challenge(
        &self,
        wallet_address: &str,
    ) -> Result<String, GoalKitError> {
        let url = format!("{}/auth/challenge", self.base_url);
        let builder = self
            .request
            .post(&url)
            .json(&ChallengeRequest { wallet_address });
        let response = self.request.handle(builder).await?;

        if !response.status().is_success() {
            return Err(error_from_response(response, "challenge request failed").await);
        }
        let body: ChallengeResponse = parse_json(response, "challenge").await?;
        Ok(body.challenge)
    }

    /// Submits the challenge back and obtains a bearer token.
    ///
    /// # Errors
    ///
    /// Returns error on network failure, a non-2xx status or an invalid response.
    pub async fn verify(
        &self,
        wallet_address: &str,
        challenge: &str,
    ) -> Result<AuthToken, GoalKitError> {
        let url = format!("{}/auth/verify", self.base_url);
        let builder = self.request.post(&url).json(&VerifyRequest {
            wallet_address,
            signature: UNIVERSAL_AUTH_SIGNATURE,
            challenge,
            xumm_sdk_auth: true,
        });
        let response = self.request.handle(builder).await?;

        if !response.status().is_success() {
            return Err(error_from_response(response, "verification failed").await);
        }
        let body: AuthTokenResponse = parse_json(response, "verify").await?;
        Ok(body.into())
    }

    /// Fetches the user the bearer `token` belongs to.
    ///
    /// # Errors
    ///
    /// Returns error on network failure, a non-2xx status or an invalid response.
    pub async fn me(&self, token: &SecretString) -> Result<User, GoalKitError> {
        let url = format!("{}/auth/me", self.base_url);
        let builder = self.request.get(&url).bearer_auth(token.expose_secret());
        let response = self.request.handle(builder).await?;

        if !response.status().is_success() {
            return Err(error_from_response(response, "failed to get user").await);
        }
        parse_json(response, "user").await
    }

    /// Tells the service the bearer `token` is no longer in use.
    ///
    /// # Errors
    ///
    /// Returns error on network failure or a non-2xx status.
    pub async fn logout(&self, token: &SecretString) -> Result<(), GoalKitError> {
        let url = format!("{}/auth/logout", self.base_url);
        let builder = self.request.post(&url).bearer_auth(token.expose_secret());
        let response = self.request.handle(builder).await?;

        if !response.status().is_success() {
            return Err(error_from_response(response, "logout failed").await);
        }
        Ok(())
    }
}

async fn parse_json<T: DeserializeOwned>(
    response: Response,
    what: &str,
) -> Result<T, GoalKitError> {
    let text = response.text().await?;
    serde_json::from_str(&text).map_err(|e| GoalKitError::SerializationError {
        error: format!("Failed to parse {what} response: {e}"),
    })
}

#[cfg(test)]
impl IdentityClient {
    /// Create a client with a custom base URL (for testing).
    #[must_use]
    pub fn with_base_url(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            request: Request::new(None),
        }
    }
}
