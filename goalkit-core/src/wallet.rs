//! Wallet SDK interfaces.
//!
//! The host supplies the wallet SDK (e.g. the Xaman universal SDK) through [`WalletProvider`];
//! the session controller only talks to it through [`WalletSdk`].

use std::{future::Future, pin::Pin, sync::Arc};

use strum::{Display, EnumString};
use thiserror::Error;

/// Result type for wallet SDK operations.
pub type WalletResult<T> = Result<T, WalletError>;

/// Errors reported by a wallet SDK.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "ffi", derive(uniffi::Error))]
#[cfg_attr(feature = "ffi", uniffi(flat_error))]
pub enum WalletError {
    /// The SDK could not be constructed, usually because of missing configuration.
    #[error("wallet sdk initialization failed: {0}")]
    Initialization(String),
    /// The user declined or the authorization flow failed.
    #[error("wallet authorization failed: {0}")]
    Authorization(String),
    /// The SDK could not report the connected account.
    #[error("wallet account unavailable: {0}")]
    Account(String),
    /// The SDK does not offer the requested action.
    #[error("wallet action not supported")]
    Unsupported,
}

/// Capability flags reported by the SDK about the environment it runs in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct RuntimeFlags {
    /// Hosted inside the wallet's own app shell (an xApp).
    pub embedded: bool,
    /// Running as an ordinary web page.
    pub standalone: bool,
}

/// The runtime context, derived once at startup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
#[cfg_attr(feature = "ffi", derive(uniffi::Enum))]
pub enum RuntimeMode {
    /// A wallet account is already connected by the host app.
    Embedded,
    /// Wallet connection requires an explicit authorization step.
    Standalone,
    /// No usable wallet SDK.
    #[default]
    Unknown,
}

impl RuntimeMode {
    /// Derives the mode from SDK capability flags. Embedded wins if both are reported.
    #[must_use]
    pub const fn from_flags(flags: RuntimeFlags) -> Self {
        if flags.embedded {
            Self::Embedded
        } else if flags.standalone {
            Self::Standalone
        } else {
            Self::Unknown
        }
    }
}

/// Notifications a wallet SDK can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "lowercase")]
pub enum WalletEventKind {
    /// An authorization flow completed.
    Success,
    /// A pre-existing wallet session was restored.
    Retrieved,
    /// The SDK hit an error.
    Error,
}

/// A notification delivered to a subscribed handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalletEvent {
    /// An authorization flow completed.
    Success,
    /// A pre-existing wallet session was restored.
    Retrieved,
    /// The SDK hit an error.
    Error(String),
}

impl WalletEvent {
    /// The kind a handler subscribes to in order to receive this event.
    #[must_use]
    pub const fn kind(&self) -> WalletEventKind {
        match self {
            Self::Success => WalletEventKind::Success,
            Self::Retrieved => WalletEventKind::Retrieved,
            Self::Error(_) => WalletEventKind::Error,
        }
    }
}

/// Future returned by an event handler. The SDK adapter decides how to drive it.
pub type HandlerFuture = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Callback registered for wallet notifications.
pub type WalletEventHandler = Arc<dyn Fn(WalletEvent) -> HandlerFuture + Send + Sync>;

/// The wallet SDK surface the session controller consumes.
pub trait WalletSdk: Send + Sync {
    /// Capability flags describing the runtime.
    fn runtime(&self) -> RuntimeFlags;

    /// The currently connected account, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the SDK cannot determine the account.
    fn account(&self) -> impl Future<Output = WalletResult<Option<String>>> + Send;

    /// Starts the SDK's authorization flow.
    ///
    /// Completion is reported through a [`WalletEventKind::Success`] notification.
    ///
    /// # Errors
    ///
    /// Returns an error if the flow cannot be started or is rejected.
    fn authorize(&self) -> impl Future<Output = WalletResult<()>> + Send;

    /// Registers `handler` for every future `event` notification.
    fn on(&self, event: WalletEventKind, handler: WalletEventHandler);

    /// Registers `handler` for the next `event` notification only.
    fn once(&self, event: WalletEventKind, handler: WalletEventHandler);

    /// Ends the SDK's own session.
    ///
    /// # Errors
    ///
    /// Returns [`WalletError::Unsupported`] unless the SDK exposes a logout.
    fn logout(&self) -> impl Future<Output = WalletResult<()>> + Send {
        async { Err(WalletError::Unsupported) }
    }
}

/// Constructs the wallet SDK from its API key.
pub trait WalletProvider {
    /// The SDK type produced.
    type Sdk: WalletSdk + 'static;

    /// Builds an SDK handle.
    ///
    /// # Errors
    ///
    /// Returns [`WalletError::Initialization`] if the SDK cannot be constructed.
    fn create(&self, api_key: &str) -> WalletResult<Arc<Self::Sdk>>;
}
