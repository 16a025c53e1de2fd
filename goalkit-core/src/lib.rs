//! Wallet-based session client for Ripple Goals.
//!
//! [`SessionController`] connects a wallet SDK (embedded xApp or standalone browser flow) to
//! the identity service's challenge/verify endpoints, caches the resulting bearer token and
//! user record in a [`SessionStore`], and restores them on the next start.
#![deny(clippy::all, clippy::pedantic, clippy::nursery)]

pub mod config;
pub use config::SessionConfig;

mod error;
pub use error::*;

pub mod identity;
pub use identity::{AuthToken, IdentityClient, User};

pub mod logger;

pub mod router;
pub use router::LoginRouter;

mod session;
pub use session::{SessionController, SyncOutcome};

pub mod store;
pub use store::{FileStore, MemoryStore, SessionStore, StoreError};

pub mod wallet;
pub use wallet::{
    RuntimeFlags, RuntimeMode, WalletError, WalletEvent, WalletEventHandler, WalletEventKind,
    WalletProvider, WalletSdk,
};

// private modules
mod http_request;

#[cfg(feature = "ffi")]
uniffi::setup_scaffolding!("goalkit_core");
