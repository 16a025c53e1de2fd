//! The session controller: mediates between the wallet SDK and the identity service to
//! establish, cache, restore and tear down an authenticated session.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, MutexGuard, PoisonError, Weak,
    },
};

use log::{debug, error, info, warn};
use secrecy::SecretString;
use tokio::sync::{oneshot, watch};

use crate::{
    config::SessionConfig,
    error::GoalKitError,
    identity::{IdentityClient, User},
    router::LoginRouter,
    store::SessionStore,
    wallet::{
        HandlerFuture, RuntimeMode, WalletError, WalletEvent, WalletEventHandler,
        WalletEventKind, WalletProvider, WalletSdk,
    },
};

mod cache;
use cache::SessionCache;

/// Result of a [`SessionController::sync_session`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// A challenge/verify exchange ran and the session is established.
    Synced,
    /// The cached user already belongs to this address; no network calls were made.
    AlreadySynced,
    /// An exchange for this address is already running; nothing was done.
    InProgress,
    /// The exchange failed and nothing was persisted.
    Failed,
}

impl SyncOutcome {
    /// Whether the session is established for the address.
    #[must_use]
    pub const fn is_completed(self) -> bool {
        matches!(self, Self::Synced | Self::AlreadySynced)
    }
}

#[derive(Default)]
struct SessionState {
    user: Option<User>,
    account: Option<String>,
    /// Exchanges currently running, keyed by wallet address. The receiver yields the
    /// exchange's result once it concludes.
    in_flight: HashMap<String, watch::Receiver<Option<bool>>>,
}

/// Removes its address from the in-flight map when dropped, whatever the outcome.
struct InFlight<'a> {
    state: &'a Mutex<SessionState>,
    address: String,
    done: watch::Sender<Option<bool>>,
}

impl InFlight<'_> {
    fn finish(&self, completed: bool) {
        self.done.send_replace(Some(completed));
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.done.borrow().is_none() {
            self.done.send_replace(Some(false));
        }
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .in_flight
            .remove(&self.address);
    }
}

/// Owns the wallet connection state and the authenticated session.
pub struct SessionController<W: WalletSdk + 'static> {
    identity: IdentityClient,
    cache: SessionCache,
    router: Arc<dyn LoginRouter>,
    wallet: Option<Arc<W>>,
    runtime_mode: RuntimeMode,
    state: Mutex<SessionState>,
    loading: AtomicBool,
}

impl<W: WalletSdk + 'static> SessionController<W> {
    /// Builds the controller and runs the startup sequence.
    ///
    /// The cached session (if any) is revalidated against the identity service, then the
    /// wallet SDK is wired up according to the runtime it reports. A missing or failing
    /// wallet SDK leaves the controller unauthenticated in [`RuntimeMode::Unknown`].
    ///
    /// # Errors
    ///
    /// Returns [`GoalKitError::InvalidInput`] if `config` is invalid. Nothing else is fatal.
    pub async fn start<P>(
        config: SessionConfig,
        provider: &P,
        store: Arc<dyn SessionStore>,
        router: Arc<dyn LoginRouter>,
    ) -> Result<Arc<Self>, GoalKitError>
    where
        P: WalletProvider<Sdk = W>,
    {
        config.validate()?;
        let identity = IdentityClient::new(&config)?;

        let wallet = match config.wallet_api_key.as_deref() {
            None => {
                warn!("Wallet SDK unavailable: no API key configured");
                None
            }
            Some(api_key) => match provider.create(api_key) {
                Ok(sdk) => Some(sdk),
                Err(e) => {
                    error!("Failed to initialize wallet SDK: {e}");
                    None
                }
            },
        };
        let runtime_mode = wallet
            .as_ref()
            .map_or(RuntimeMode::Unknown, |sdk| RuntimeMode::from_flags(sdk.runtime()));
        info!("Wallet runtime: {runtime_mode}");

        let controller = Arc::new(Self {
            identity,
            cache: SessionCache::new(store, &config),
            router,
            wallet,
            runtime_mode,
            state: Mutex::new(SessionState::default()),
            loading: AtomicBool::new(true),
        });

        controller.restore_cached_session().await;
        controller.connect_wallet().await;
        controller.loading.store(false, Ordering::SeqCst);

        Ok(controller)
    }

    /// The runtime detected at startup.
    #[must_use]
    pub const fn runtime_mode(&self) -> RuntimeMode {
        self.runtime_mode
    }

    /// The wallet SDK handle, if one could be constructed.
    #[must_use]
    pub const fn wallet(&self) -> Option<&Arc<W>> {
        self.wallet.as_ref()
    }

    /// The authenticated user record.
    #[must_use]
    pub fn user(&self) -> Option<User> {
        self.state().user.clone()
    }

    /// The wallet account confirmed by the last successful exchange.
    #[must_use]
    pub fn account(&self) -> Option<String> {
        self.state().account.clone()
    }

    /// True iff both a user record and a confirmed wallet account are present.
    ///
    /// A cached token on its own does not count.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        let state = self.state();
        state.user.is_some() && state.account.is_some()
    }

    /// True while startup or an explicit [`login`](Self::login) is running.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    /// The cached bearer token, if any.
    #[must_use]
    pub fn token(&self) -> Option<SecretString> {
        self.cache.token().unwrap_or_else(|e| {
            warn!("Failed to read cached token: {e}");
            None
        })
    }

    /// Sends the host application to its login entry point.
    pub fn redirect_to_login(&self) {
        info!("Redirecting to login");
        self.router.redirect_to_login();
    }

    /// Turns a bare wallet address into an authenticated session.
    ///
    /// Runs challenge, verify and user-fetch strictly in sequence. At most one exchange per
    /// address runs at a time: a second call while one is running returns
    /// [`SyncOutcome::InProgress`] without touching the network. A failed verification also
    /// redirects to the login entry point.
    pub async fn sync_session(&self, wallet_address: &str) -> SyncOutcome {
        let in_flight = {
            let mut state = self.state();
            if state.in_flight.contains_key(wallet_address) {
                info!("Sync already in progress for wallet: {wallet_address}");
                return SyncOutcome::InProgress;
            }
            if self.is_cached_user(&state, wallet_address) {
                info!("User already authenticated for wallet: {wallet_address}");
                state.account = Some(wallet_address.to_string());
                return SyncOutcome::AlreadySynced;
            }

            let (done, receiver) = watch::channel(None);
            state.in_flight.insert(wallet_address.to_string(), receiver);
            InFlight {
                state: &self.state,
                address: wallet_address.to_string(),
                done,
            }
        };

        info!("Starting sync for wallet: {wallet_address}");
        let outcome = match self.exchange(wallet_address).await {
            Ok(user) => {
                let mut state = self.state();
                state.user = Some(user);
                state.account = Some(wallet_address.to_string());
                info!("Sync completed successfully for wallet: {wallet_address}");
                SyncOutcome::Synced
            }
            Err(e) => {
                error!("Backend sync failed for wallet {wallet_address}: {e}");
                SyncOutcome::Failed
            }
        };

        in_flight.finish(outcome.is_completed());
        drop(in_flight);
        debug!("Sync operation finished for wallet: {wallet_address}");
        outcome
    }

    /// Connects the wallet and establishes a session.
    ///
    /// In standalone mode this starts the SDK's authorization flow and waits for its success
    /// notification; in embedded mode the host's already-connected account is used. Resolves
    /// `false` on any failure, including an unknown runtime or a missing account.
    pub async fn login(&self) -> bool {
        let result = match self.wallet.clone() {
            None => Err(GoalKitError::WalletUnavailable),
            Some(wallet) => {
                self.loading.store(true, Ordering::SeqCst);
                let result = match self.runtime_mode {
                    RuntimeMode::Embedded => self.login_embedded(&wallet).await,
                    RuntimeMode::Standalone => self.login_standalone(&wallet).await,
                    RuntimeMode::Unknown => Err(GoalKitError::UnknownRuntime),
                };
                self.loading.store(false, Ordering::SeqCst);
                result
            }
        };

        result.unwrap_or_else(|e| {
            error!("Login failed: {e}");
            false
        })
    }

    /// Clears the cached and in-memory session, then signs out of the identity service and
    /// the wallet SDK on a best-effort basis. Safe to call without a session.
    pub async fn logout(&self) {
        let token = self.token();
        if let Err(e) = self.cache.clear() {
            error!("Failed to clear cached session: {e}");
        }
        {
            let mut state = self.state();
            state.user = None;
            state.account = None;
        }

        if let Some(token) = token {
            if let Err(e) = self.identity.logout(&token).await {
                debug!("Identity service logout failed: {e}");
            }
        }

        if let Some(wallet) = &self.wallet {
            match wallet.logout().await {
                Ok(()) | Err(WalletError::Unsupported) => {}
                Err(e) => warn!("Wallet logout failed: {e}"),
            }
        }
    }

    fn state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_cached_user(&self, state: &SessionState, wallet_address: &str) -> bool {
        let in_memory = state
            .user
            .as_ref()
            .is_some_and(|user| user.wallet_address == wallet_address);
        if !in_memory {
            return false;
        }
        match self.cache.user() {
            Ok(cached) => cached.is_some_and(|user| user.wallet_address == wallet_address),
            Err(e) => {
                warn!("Failed to read cached user: {e}");
                false
            }
        }
    }

    async fn exchange(&self, wallet_address: &str) -> Result<User, GoalKitError> {
        let challenge = self.identity.request_challenge(wallet_address).await?;

        let token = match self.identity.verify(wallet_address, &challenge).await {
            Ok(token) => token,
            Err(e) => {
                self.redirect_to_login();
                return Err(e);
            }
        };

        let user = self.identity.me(&token.access_token).await?;
        self.cache.persist(&token.access_token, &user)?;
        Ok(user)
    }

    async fn restore_cached_session(&self) {
        let cached = match self.cache.load() {
            Ok(Some(cached)) => cached,
            Ok(None) => return,
            Err(e) => {
                warn!("Failed to read cached session: {e}");
                return;
            }
        };
        let (token, _) = cached;

        match self.identity.me(&token).await {
            Ok(user) => {
                if let Err(e) = self.cache.store_user(&user) {
                    warn!("Failed to refresh cached user: {e}");
                }
                info!("Restored cached session for wallet: {}", user.wallet_address);
                self.state().user = Some(user);
            }
            Err(e) => {
                warn!("Token validation failed: {e}");
                if let Err(e) = self.cache.clear() {
                    error!("Failed to clear cached session: {e}");
                }
                self.redirect_to_login();
            }
        }
    }

    async fn connect_wallet(self: &Arc<Self>) {
        let Some(wallet) = &self.wallet else {
            return;
        };

        match self.runtime_mode {
            RuntimeMode::Embedded => match connected_account(wallet.as_ref()).await {
                Ok(account) => {
                    self.sync_session(&account).await;
                }
                Err(e) => info!("No existing embedded wallet authentication: {e}"),
            },
            RuntimeMode::Standalone => {
                wallet.on(WalletEventKind::Error, Arc::new(log_wallet_error));
                wallet.on(WalletEventKind::Success, self.event_handler());
                wallet.on(WalletEventKind::Retrieved, self.event_handler());
            }
            RuntimeMode::Unknown => {}
        }
    }

    fn event_handler(self: &Arc<Self>) -> WalletEventHandler {
        let controller: Weak<Self> = Arc::downgrade(self);
        Arc::new(move |event: WalletEvent| -> HandlerFuture {
            let controller = controller.clone();
            Box::pin(async move {
                if let Some(controller) = controller.upgrade() {
                    controller.handle_wallet_event(event).await;
                }
            })
        })
    }

    async fn handle_wallet_event(&self, event: WalletEvent) {
        info!("Wallet notification: {}", event.kind());
        let Some(wallet) = &self.wallet else {
            return;
        };
        match connected_account(wallet.as_ref()).await {
            Ok(account) => {
                self.sync_session(&account).await;
            }
            Err(e) => debug!("No account after wallet notification: {e}"),
        }
    }

    async fn login_embedded(&self, wallet: &W) -> Result<bool, GoalKitError> {
        let account = connected_account(wallet).await?;
        Ok(self.complete_login(&account).await)
    }

    async fn login_standalone(&self, wallet: &W) -> Result<bool, GoalKitError> {
        let (authorized, on_success) = oneshot::channel();
        let authorized = Mutex::new(Some(authorized));
        wallet.once(
            WalletEventKind::Success,
            Arc::new(move |_: WalletEvent| -> HandlerFuture {
                let sender = authorized
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .take();
                if let Some(sender) = sender {
                    // the receiver is gone only if login was abandoned
                    let _ = sender.send(());
                }
                Box::pin(async {})
            }),
        );

        wallet.authorize().await?;
        on_success.await.map_err(|_| {
            WalletError::Authorization("authorization ended without success".to_string())
        })?;

        let account = connected_account(wallet).await?;
        Ok(self.complete_login(&account).await)
    }

    /// Runs the exchange for `account`. If an SDK notification already started one, waits
    /// for it instead of reporting failure.
    async fn complete_login(&self, account: &str) -> bool {
        match self.sync_session(account).await {
            SyncOutcome::InProgress => match self.wait_for_sync(account).await {
                Some(completed) => completed,
                None => self.account().as_deref() == Some(account) && self.is_authenticated(),
            },
            outcome => outcome.is_completed(),
        }
    }

    async fn wait_for_sync(&self, wallet_address: &str) -> Option<bool> {
        let mut receiver = self.state().in_flight.get(wallet_address).cloned()?;
        let result = receiver.wait_for(Option::is_some).await;
        result.ok().and_then(|completed| *completed)
    }
}

async fn connected_account<W: WalletSdk>(wallet: &W) -> Result<String, GoalKitError> {
    wallet
        .account()
        .await?
        .filter(|account| !account.is_empty())
        .ok_or(GoalKitError::NoAccount)
}

fn log_wallet_error(event: WalletEvent) -> HandlerFuture {
    if let WalletEvent::Error(message) = event {
        error!("Wallet SDK error: {message}");
    }
    Box::pin(async {})
}
