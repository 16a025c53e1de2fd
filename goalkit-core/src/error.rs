use thiserror::Error;

use crate::store::StoreError;
use crate::wallet::WalletError;

/// Error outputs from `GoalKit`
#[derive(Debug, Error)]
#[cfg_attr(feature = "ffi", derive(uniffi::Error))]
#[cfg_attr(feature = "ffi", uniffi(flat_error))]
pub enum GoalKitError {
    /// The presented input is not valid for the requested operation
    #[error("invalid_input_{attribute}: {reason}")]
    InvalidInput {
        /// The attribute that is invalid
        attribute: String,
        /// The reason the attribute is invalid
        reason: String,
    },
    /// Network connection error or unsuccessful response from the identity service
    #[error("network_error: {url} ({status:?}): {error}")]
    NetworkError {
        /// The URL of the request
        url: String,
        /// The HTTP status code, if a response was received
        status: Option<u16>,
        /// Error details
        error: String,
    },
    /// Unexpected error serializing or deserializing information
    #[error("serialization_error: {error}")]
    SerializationError {
        /// Error details
        error: String,
    },
    /// The persistent session store failed
    #[error(transparent)]
    Store(#[from] StoreError),
    /// The wallet SDK reported a failure
    #[error(transparent)]
    Wallet(#[from] WalletError),
    /// The wallet SDK could not be constructed (e.g. missing API key)
    #[error("wallet_unavailable")]
    WalletUnavailable,
    /// The runtime is neither an embedded wallet app nor a standalone browser
    #[error("unknown_runtime")]
    UnknownRuntime,
    /// The wallet SDK did not report a connected account
    #[error("no_account")]
    NoAccount,
}

impl GoalKitError {
    /// Returns the HTTP status carried by a [`GoalKitError::NetworkError`], if any.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::NetworkError { status, .. } => *status,
            _ => None,
        }
    }
}

impl From<reqwest::Error> for GoalKitError {
    fn from(error: reqwest::Error) -> Self {
        Self::NetworkError {
            url: error
                .url()
                .map_or_else(|| "<unknown>".to_string(), ToString::to_string),
            status: error.status().map(|status| status.as_u16()),
            error: error.to_string(),
        }
    }
}
