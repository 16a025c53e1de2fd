//! A wallet that is already connected to a fixed account, as an xApp host would provide.

use std::sync::Arc;

use goalkit_core::{
    wallet::WalletResult, RuntimeFlags, WalletEventHandler, WalletEventKind, WalletProvider,
    WalletSdk,
};

/// Embedded wallet reporting a fixed account. Authorization is a no-op.
pub struct PresetWallet {
    account: Option<String>,
}

impl WalletSdk for PresetWallet {
    fn runtime(&self) -> RuntimeFlags {
        RuntimeFlags {
            embedded: true,
            standalone: false,
        }
    }

    async fn account(&self) -> WalletResult<Option<String>> {
        Ok(self.account.clone())
    }

    async fn authorize(&self) -> WalletResult<()> {
        Ok(())
    }

    // Embedded hosts never emit notifications.
    fn on(&self, _event: WalletEventKind, _handler: WalletEventHandler) {}

    fn once(&self, _event: WalletEventKind, _handler: WalletEventHandler) {}
}

/// Builds a [`PresetWallet`] for `account`.
pub struct PresetProvider {
    /// Account the wallet reports as connected.
    pub account: Option<String>,
}

impl WalletProvider for PresetProvider {
    type Sdk = PresetWallet;

    fn create(&self, _api_key: &str) -> WalletResult<Arc<PresetWallet>> {
        Ok(Arc::new(PresetWallet {
            account: self.account.clone(),
        }))
    }
}
