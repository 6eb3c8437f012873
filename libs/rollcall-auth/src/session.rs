use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use rollcall_utils::SecretString;
use tokio::sync::{broadcast, watch};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::error::{ProviderError, RefreshError, StoreError};
use crate::provider::{AuthStateChange, IdentityProvider};
use crate::store::KeyValueStore;
use crate::token::TokenHandle;
use crate::types::{Identity, SessionState};

/// Storage key of the JSON profile blob
pub const USER_KEY: &str = "@auth_user";
/// Storage key of the raw bearer token
pub const TOKEN_KEY: &str = "@auth_token";

/// Tokens are issued for an hour; refresh well before that.
const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(50 * 60);

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Period of the background forced refresh
    pub refresh_interval: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
        }
    }
}

/// Owner of the signed-in session.
///
/// The manager is the only writer of the session state, the in-memory
/// token and the persisted copy under [`USER_KEY`] and [`TOKEN_KEY`].
/// Everything else observes it through [`subscribe`](Self::subscribe),
/// [`state`](Self::state) or a [`TokenHandle`].
///
/// Background work (the provider event listener and the refresh timer)
/// runs on child tasks that stop on [`shutdown`](Self::shutdown) or when
/// the manager is dropped.
pub struct SessionManager {
    inner: Arc<Inner>,
}

struct Inner {
    provider: Arc<dyn IdentityProvider>,
    store: Arc<dyn KeyValueStore>,
    config: SessionConfig,
    state: watch::Sender<SessionState>,
    token: TokenHandle,
    refresh: Mutex<Option<RefreshTask>>,
    /// Held across every write of the persisted session
    persist_lock: tokio::sync::Mutex<()>,
    started: AtomicBool,
    cancel: CancellationToken,
}

/// The one refresh timer a manager may run, tied to the uid it serves.
struct RefreshTask {
    uid: String,
    cancel: CancellationToken,
}

impl SessionManager {
    #[must_use]
    pub fn new(
        provider: Arc<dyn IdentityProvider>,
        store: Arc<dyn KeyValueStore>,
        config: SessionConfig,
    ) -> Arc<Self> {
        let (state, _) = watch::channel(SessionState::Loading);
        Arc::new(Self {
            inner: Arc::new(Inner {
                provider,
                store,
                config,
                state,
                token: TokenHandle::default(),
                refresh: Mutex::new(None),
                persist_lock: tokio::sync::Mutex::new(()),
                started: AtomicBool::new(false),
                cancel: CancellationToken::new(),
            }),
        })
    }

    /// Hydrate from storage, then follow the provider's state changes.
    ///
    /// A stored profile and token are trusted as-is: the session becomes
    /// authenticated without contacting the provider. Calling `start` again
    /// has no effect.
    pub async fn start(&self) {
        if self.inner.started.swap(true, Ordering::SeqCst) {
            tracing::debug!("session manager already started");
            return;
        }

        // Subscribe first so no change is missed while storage is read
        let events = self.inner.provider.subscribe();
        self.inner.hydrate().await;
        spawn_event_listener(&self.inner, events);
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.inner.state.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.inner.state.subscribe()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.inner.state.borrow().is_authenticated()
    }

    #[must_use]
    pub fn identity(&self) -> Option<Identity> {
        self.inner.state.borrow().identity().cloned()
    }

    /// Read-only token accessor for API clients.
    #[must_use]
    pub fn token_handle(&self) -> TokenHandle {
        self.inner.token.clone()
    }

    /// Sign in with email and password.
    ///
    /// On success the session is persisted and authenticated before this
    /// returns. Provider errors are returned unchanged and leave the previous
    /// state in place.
    ///
    /// # Errors
    /// Returns the provider's error, for example a rejected credential.
    pub async fn sign_in(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<Identity, ProviderError> {
        let previous = self.inner.state.send_replace(SessionState::Authenticating);

        let result = async {
            let identity = self
                .inner
                .provider
                .sign_in_with_password(email, password)
                .await?;
            let token = self.inner.provider.id_token(false).await?;
            Ok::<_, ProviderError>((identity, token))
        }
        .await;

        match result {
            Ok((identity, token)) => {
                self.inner.apply_signed_in(identity.clone(), token).await;
                Ok(identity)
            }
            Err(e) => {
                // Restore unless a provider event has moved the state on
                self.inner.state.send_if_modified(|state| {
                    if *state == SessionState::Authenticating {
                        *state = previous;
                        true
                    } else {
                        false
                    }
                });
                Err(e)
            }
        }
    }

    /// Sign out.
    ///
    /// Local credentials are cleared before the provider is asked to end its
    /// session, so they are gone even when that call fails.
    ///
    /// # Errors
    /// Returns the provider's sign-out error after local state was cleared.
    pub async fn sign_out(&self) -> Result<(), ProviderError> {
        self.inner.clear_session().await;
        self.inner.provider.sign_out().await
    }

    /// Force a token refresh now, the same way the background timer does.
    ///
    /// # Errors
    /// Returns `NotAuthenticated` without a session, the provider's error if
    /// the refresh fails, `IdentityChanged` if the session changed while the
    /// refresh was in flight, and `Store` if the new token could not be persisted.
    pub async fn refresh_token(&self) -> Result<(), RefreshError> {
        self.inner.refresh().await
    }

    /// The token persisted in storage, which may differ from the in-memory
    /// one if another process wrote it.
    pub async fn stored_token(&self) -> Option<SecretString> {
        match self.inner.store.get(TOKEN_KEY).await {
            Ok(token) => token.map(SecretString::new),
            Err(e) => {
                tracing::error!(error = %e, "failed to read stored token");
                None
            }
        }
    }

    /// Stop the event listener and the refresh timer. Idempotent.
    pub fn shutdown(&self) {
        self.inner.cancel.cancel();
        if let Some(task) = self.inner.refresh.lock().take() {
            task.cancel.cancel();
        }
    }
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl Inner {
    async fn hydrate(self: &Arc<Self>) {
        let user = self.store.get(USER_KEY).await;
        let token = self.store.get(TOKEN_KEY).await;

        let restored = match (user, token) {
            (Ok(Some(user)), Ok(Some(token))) => match serde_json::from_str::<Identity>(&user) {
                Ok(identity) => Some((identity, token)),
                Err(source) => {
                    let e = StoreError::Malformed {
                        key: USER_KEY.to_owned(),
                        source,
                    };
                    tracing::error!(error = %e, "ignoring stored session");
                    None
                }
            },
            (Err(e), _) | (_, Err(e)) => {
                tracing::error!(error = %e, "failed to read stored session");
                None
            }
            _ => None,
        };

        let Some((identity, token)) = restored else {
            tracing::debug!("no stored session");
            self.state.send_if_modified(|state| {
                if *state == SessionState::Loading {
                    *state = SessionState::Unauthenticated;
                    true
                } else {
                    false
                }
            });
            return;
        };

        tracing::info!(uid = %identity.uid, "restored session from storage");
        let uid = identity.uid.clone();
        self.token.set(Some(SecretString::new(token)));
        self.state.send_replace(SessionState::Authenticated(identity));
        self.ensure_refresh_task(&uid);
    }

    /// Persist and activate a signed-in identity.
    ///
    /// Repeating this for the uid already signed in only replaces the token;
    /// the refresh timer keeps its schedule.
    async fn apply_signed_in(self: &Arc<Self>, identity: Identity, token: SecretString) {
        let _guard = self.persist_lock.lock().await;
        self.persist(&identity, &token).await;

        let uid = identity.uid.clone();
        self.token.set(Some(token));
        self.state.send_replace(SessionState::Authenticated(identity));
        self.ensure_refresh_task(&uid);
    }

    async fn persist(&self, identity: &Identity, token: &SecretString) {
        match serde_json::to_string(identity) {
            Ok(profile) => {
                if let Err(e) = self.store.set(USER_KEY, &profile).await {
                    tracing::error!(error = %e, "failed to persist session profile");
                }
            }
            Err(e) => tracing::error!(error = %e, "failed to serialize session profile"),
        }
        if let Err(e) = self.store.set(TOKEN_KEY, token.expose()).await {
            tracing::error!(error = %e, "failed to persist session token");
        }
    }

    /// Drop the session locally.
    ///
    /// Memory and the timer go first, then storage. A refresh still in
    /// flight sees the session gone once it gets the persist lock and
    /// writes nothing.
    async fn clear_session(&self) {
        let _guard = self.persist_lock.lock().await;
        self.stop_refresh_task();
        self.token.set(None);
        self.state.send_replace(SessionState::Unauthenticated);

        if let Err(e) = self.store.remove_many(&[USER_KEY, TOKEN_KEY]).await {
            tracing::error!(error = %e, "failed to clear stored session");
        }
    }

    fn current_uid(&self) -> Option<String> {
        self.state.borrow().identity().map(|identity| identity.uid.clone())
    }

    async fn refresh(&self) -> Result<(), RefreshError> {
        let identity = self
            .state
            .borrow()
            .identity()
            .cloned()
            .ok_or(RefreshError::NotAuthenticated)?;
        let uid = identity.uid.clone();
        self.state.send_replace(SessionState::Refreshing(identity));

        let result = self.provider.id_token(true).await;
        let _guard = self.persist_lock.lock().await;

        // Only touch the session if it still belongs to the same uid
        let mut same_session = false;
        self.state.send_if_modified(|state| {
            if state.identity().is_none_or(|current| current.uid != uid) {
                return false;
            }
            same_session = true;
            if let SessionState::Refreshing(identity) = state {
                let identity = identity.clone();
                *state = SessionState::Authenticated(identity);
                return true;
            }
            false
        });

        let token = result?;
        if !same_session {
            return Err(RefreshError::IdentityChanged);
        }

        self.token.set(Some(token.clone()));
        self.store.set(TOKEN_KEY, token.expose()).await?;
        Ok(())
    }

    /// Make sure exactly one refresh timer runs, serving `uid`.
    fn ensure_refresh_task(self: &Arc<Self>, uid: &str) {
        let mut slot = self.refresh.lock();
        if let Some(task) = slot.as_ref()
            && task.uid == uid
            && !task.cancel.is_cancelled()
        {
            return;
        }
        if let Some(old) = slot.take() {
            old.cancel.cancel();
        }
        if self.cancel.is_cancelled() {
            return;
        }

        let cancel = self.cancel.child_token();
        *slot = Some(RefreshTask {
            uid: uid.to_owned(),
            cancel: cancel.clone(),
        });
        drop(slot);

        tracing::debug!(uid = %uid, period = ?self.config.refresh_interval, "starting token refresh timer");
        tokio::spawn(refresh_loop(
            Arc::downgrade(self),
            uid.to_owned(),
            self.config.refresh_interval,
            cancel,
        ));
    }

    fn stop_refresh_task(&self) {
        if let Some(task) = self.refresh.lock().take() {
            task.cancel.cancel();
        }
    }
}

async fn refresh_loop(inner: Weak<Inner>, uid: String, period: Duration, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let Some(inner) = inner.upgrade() else { break };
        if inner.current_uid().as_deref() != Some(uid.as_str()) {
            tracing::debug!(uid = %uid, "session changed; stopping refresh timer");
            break;
        }

        tokio::select! {
            () = cancel.cancelled() => break,
            result = inner.refresh() => match result {
                Ok(()) => tracing::debug!(uid = %uid, "refreshed session token"),
                Err(e) => tracing::warn!(uid = %uid, error = %e, "token refresh failed"),
            },
        }
    }
}

fn spawn_event_listener(inner: &Arc<Inner>, mut events: broadcast::Receiver<AuthStateChange>) {
    let weak = Arc::downgrade(inner);
    let cancel = inner.cancel.child_token();

    tokio::spawn(async move {
        loop {
            let event = tokio::select! {
                () = cancel.cancelled() => break,
                event = events.recv() => event,
            };

            let Some(inner) = weak.upgrade() else { break };
            match event {
                Ok(AuthStateChange::SignedIn { identity, id_token }) => {
                    tracing::debug!(uid = %identity.uid, "provider reported sign-in");
                    inner.apply_signed_in(identity, id_token).await;
                }
                Ok(AuthStateChange::SignedOut) => {
                    tracing::debug!("provider reported sign-out");
                    inner.clear_session().await;
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "missed identity provider events");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });
}
