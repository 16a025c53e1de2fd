//! Common test utilities shared across integration tests.
#![allow(dead_code, missing_docs)]

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};

use goalkit_core::{
    RuntimeFlags, WalletError, WalletEvent, WalletEventHandler, WalletEventKind,
    WalletProvider, WalletSdk,
};
use goalkit_core::wallet::WalletResult;
use serde_json::json;

/// Scriptable wallet SDK. Emitting an event drives every matching handler to completion
/// before returning, so tests observe the controller's reaction deterministically.
pub struct MockWallet {
    flags: RuntimeFlags,
    account: Mutex<WalletResult<Option<String>>>,
    authorize_result: Mutex<WalletResult<()>>,
    handlers: Mutex<Vec<(WalletEventKind, WalletEventHandler, bool)>>,
    supports_logout: bool,
    pub authorize_calls: AtomicUsize,
    pub logout_calls: AtomicUsize,
}

impl MockWallet {
    fn with_flags(flags: RuntimeFlags) -> Self {
        Self {
            flags,
            account: Mutex::new(Ok(None)),
            authorize_result: Mutex::new(Ok(())),
            handlers: Mutex::new(Vec::new()),
            supports_logout: true,
            authorize_calls: AtomicUsize::new(0),
            logout_calls: AtomicUsize::new(0),
        }
    }

    pub fn standalone() -> Arc<Self> {
        Arc::new(Self::with_flags(RuntimeFlags {
            embedded: false,
            standalone: true,
        }))
    }

    pub fn embedded() -> Arc<Self> {
        Arc::new(Self::with_flags(RuntimeFlags {
            embedded: true,
            standalone: false,
        }))
    }

    pub fn without_logout(flags: RuntimeFlags) -> Arc<Self> {
        Arc::new(Self {
            supports_logout: false,
            ..Self::with_flags(flags)
        })
    }

    pub fn set_account(&self, account: Option<&str>) {
        *self.account.lock().unwrap() = Ok(account.map(str::to_string));
    }

    pub fn fail_account(&self, reason: &str) {
        *self.account.lock().unwrap() = Err(WalletError::Account(reason.to_string()));
    }

    pub fn fail_authorize(&self, reason: &str) {
        *self.authorize_result.lock().unwrap() =
            Err(WalletError::Authorization(reason.to_string()));
    }

    pub fn handler_count(&self, kind: WalletEventKind) -> usize {
        self.handlers
            .lock()
            .unwrap()
            .iter()
            .filter(|(k, _, _)| *k == kind)
            .count()
    }

    pub async fn emit(&self, event: WalletEvent) {
        let matching: Vec<WalletEventHandler> = {
            let mut handlers = self.handlers.lock().unwrap();
            let kind = event.kind();
            let matching = handlers
                .iter()
                .filter(|(k, _, _)| *k == kind)
                .map(|(_, handler, _)| Arc::clone(handler))
                .collect();
            handlers.retain(|(k, _, once)| !(*k == kind && *once));
            matching
        };

        for handler in matching {
            handler(event.clone()).await;
        }
    }
}

impl WalletSdk for MockWallet {
    fn runtime(&self) -> RuntimeFlags {
        self.flags
    }

    async fn account(&self) -> WalletResult<Option<String>> {
        self.account.lock().unwrap().clone()
    }

    async fn authorize(&self) -> WalletResult<()> {
        self.authorize_calls.fetch_add(1, Ordering::SeqCst);
        let result = self.authorize_result.lock().unwrap().clone();
        if result.is_ok() {
            self.emit(WalletEvent::Success).await;
        }
        result
    }

    fn on(&self, event: WalletEventKind, handler: WalletEventHandler) {
        self.handlers.lock().unwrap().push((event, handler, false));
    }

    fn once(&self, event: WalletEventKind, handler: WalletEventHandler) {
        self.handlers.lock().unwrap().push((event, handler, true));
    }

    async fn logout(&self) -> WalletResult<()> {
        if !self.supports_logout {
            return Err(WalletError::Unsupported);
        }
        self.logout_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Hands out a shared [`MockWallet`], or fails like an SDK missing its configuration.
pub struct MockProvider {
    wallet: Arc<MockWallet>,
    fail: bool,
}

impl MockProvider {
    pub fn new(wallet: &Arc<MockWallet>) -> Self {
        Self {
            wallet: Arc::clone(wallet),
            fail: false,
        }
    }

    pub fn failing(wallet: &Arc<MockWallet>) -> Self {
        Self {
            wallet: Arc::clone(wallet),
            fail: true,
        }
    }
}

impl WalletProvider for MockProvider {
    type Sdk = MockWallet;

    fn create(&self, _api_key: &str) -> WalletResult<Arc<MockWallet>> {
        if self.fail {
            return Err(WalletError::Initialization("invalid api key".to_string()));
        }
        Ok(Arc::clone(&self.wallet))
    }
}

/// Router that counts redirects.
#[derive(Default)]
pub struct RecordingRouter {
    redirects: AtomicUsize,
}

impl RecordingRouter {
    pub fn redirects(&self) -> usize {
        self.redirects.load(Ordering::SeqCst)
    }
}

impl goalkit_core::LoginRouter for RecordingRouter {
    fn redirect_to_login(&self) {
        self.redirects.fetch_add(1, Ordering::SeqCst);
    }
}

pub fn user_json(id: &str, wallet_address: &str) -> String {
    json!({
        "id": id,
        "wallet_address": wallet_address,
        "created_at": "2025-06-01T10:00:00",
        "last_login": "2025-06-02T08:30:00",
    })
    .to_string()
}
