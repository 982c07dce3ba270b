//! The session controller state machine.
//!
//! States: `Unauthenticated → Authenticating → Authenticated → Expiring →
//! Refreshing → {Authenticated | Unauthenticated}`. `Expiring` is derived
//! from the token clock rather than stored: a token inside the refresh skew
//! window is expiring wherever it is observed.
//!
//! The controller is the single logical writer of session state. The
//! [`RefreshCoordinator`](crate::refresh::RefreshCoordinator) it owns shares
//! the same inner state and performs the only other mutation, the wholesale
//! token replace after a refresh. Everything else (the HTTP pipeline,
//! consumers) only reads.
//!
//! Construct one controller per process and share it as an `Arc`; passing it
//! explicitly (rather than a process-global) keeps initialization order
//! visible.

use std::sync::Arc;

use time::OffsetDateTime;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

use stockpile_core::ApiResult;

use crate::api::{AuthApi, Navigator};
use crate::profile::UserProfile;
use crate::refresh::RefreshCoordinator;
use crate::storage::{CredentialStorage, MemoryCredentialStorage, StoredSession};
use crate::token::{AuthToken, TokenGrant};

/// Observable session lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No valid token.
    Unauthenticated,
    /// A login request is outstanding.
    Authenticating,
    /// Token present and fresh.
    Authenticated,
    /// Token present but inside the refresh skew window.
    Expiring,
    /// A refresh call is outstanding.
    Refreshing,
}

pub(crate) struct SessionInner {
    api: Arc<dyn AuthApi>,
    navigator: Arc<dyn Navigator>,
    durable: Arc<dyn CredentialStorage>,
    transient: Arc<dyn CredentialStorage>,
    token: RwLock<Option<AuthToken>>,
    profile: RwLock<Option<UserProfile>>,
    state: RwLock<SessionState>,
    remember: RwLock<bool>,
    last_activity: RwLock<OffsetDateTime>,
}

impl SessionInner {
    pub(crate) fn api(&self) -> &dyn AuthApi {
        self.api.as_ref()
    }

    pub(crate) async fn set_state(&self, state: SessionState) {
        *self.state.write().await = state;
    }

    pub(crate) async fn refresh_token_value(&self) -> Option<String> {
        self.token
            .read()
            .await
            .as_ref()
            .map(|t| t.refresh_token.clone())
    }

    pub(crate) async fn touch(&self) {
        *self.last_activity.write().await = OffsetDateTime::now_utc();
    }

    /// Replaces the token wholesale after a successful refresh.
    pub(crate) async fn apply_grant(&self, grant: TokenGrant) -> AuthToken {
        let token = AuthToken::from(grant);
        *self.token.write().await = Some(token.clone());
        self.set_state(SessionState::Authenticated).await;
        self.touch().await;
        self.persist().await;
        token
    }

    /// Writes the current snapshot to the active store. The in-memory token
    /// stays authoritative, so persistence failures are logged, not fatal.
    pub(crate) async fn persist(&self) {
        let token = self.token.read().await.clone();
        let Some(token) = token else { return };
        let remember = *self.remember.read().await;
        let snapshot = StoredSession {
            token,
            profile: self.profile.read().await.clone(),
            remember,
            saved_at: OffsetDateTime::now_utc(),
        };
        let store = if remember {
            &self.durable
        } else {
            &self.transient
        };
        if let Err(e) = store.save(&snapshot).await {
            tracing::warn!(error = %e, "failed to persist session");
        }
    }

    async fn clear_local(&self) {
        *self.token.write().await = None;
        *self.profile.write().await = None;
        self.set_state(SessionState::Unauthenticated).await;
        if let Err(e) = self.durable.clear().await {
            tracing::warn!(error = %e, "failed to clear durable session store");
        }
        if let Err(e) = self.transient.clear().await {
            tracing::warn!(error = %e, "failed to clear transient session store");
        }
    }

    /// Terminal authentication failure: clear everything and send the user
    /// to login, once. Repeated failures while already unauthenticated are
    /// silent so waiters draining after a failed refresh don't fire the
    /// redirect again.
    pub(crate) async fn handle_auth_failure(&self, return_to: Option<&str>) {
        if *self.state.read().await == SessionState::Unauthenticated {
            return;
        }
        tracing::info!("session terminated; redirecting to login");
        self.clear_local().await;
        self.navigator.redirect_to_login(return_to);
    }
}

/// Drives login, logout, session restoration, and expiry checks, and owns
/// every mutation of the token store.
pub struct SessionController {
    inner: Arc<SessionInner>,
    refresh: RefreshCoordinator,
}

impl SessionController {
    /// Creates a controller wired to its network, navigation, and durable
    /// storage collaborators. Sessions without "remember me" live in an
    /// internal in-memory store.
    #[must_use]
    pub fn new(
        api: Arc<dyn AuthApi>,
        navigator: Arc<dyn Navigator>,
        durable: Arc<dyn CredentialStorage>,
    ) -> Self {
        Self::with_transient(api, navigator, durable, Arc::new(MemoryCredentialStorage::new()))
    }

    /// Like [`SessionController::new`] with an explicit transient store.
    #[must_use]
    pub fn with_transient(
        api: Arc<dyn AuthApi>,
        navigator: Arc<dyn Navigator>,
        durable: Arc<dyn CredentialStorage>,
        transient: Arc<dyn CredentialStorage>,
    ) -> Self {
        let inner = Arc::new(SessionInner {
            api,
            navigator,
            durable,
            transient,
            token: RwLock::new(None),
            profile: RwLock::new(None),
            state: RwLock::new(SessionState::Unauthenticated),
            remember: RwLock::new(false),
            last_activity: RwLock::new(OffsetDateTime::now_utc()),
        });
        let refresh = RefreshCoordinator::new(Arc::clone(&inner));
        Self { inner, refresh }
    }

    /// Authenticates with the backend and installs the returned session.
    ///
    /// # Errors
    ///
    /// Surfaces the login failure; the controller returns to
    /// `Unauthenticated`.
    pub async fn login(
        &self,
        username: &str,
        password: &str,
        remember: bool,
    ) -> ApiResult<AuthToken> {
        self.inner.set_state(SessionState::Authenticating).await;
        match self.inner.api.login(username, password, remember).await {
            Ok(grant) => {
                let (token, profile) = grant.into_parts();
                *self.inner.token.write().await = Some(token.clone());
                *self.inner.profile.write().await = Some(profile);
                *self.inner.remember.write().await = remember;
                self.inner.set_state(SessionState::Authenticated).await;
                self.inner.touch().await;
                self.inner.persist().await;
                tracing::info!(username, remember, "login succeeded");
                Ok(token)
            }
            Err(e) => {
                self.inner.set_state(SessionState::Unauthenticated).await;
                tracing::warn!(username, error = %e, "login failed");
                Err(e)
            }
        }
    }

    /// Restores a persisted session at process start. Returns whether the
    /// process ends up authenticated.
    ///
    /// A fresh stored token is used as-is; an expiring or expired one is
    /// refreshed eagerly through the coordinator; anything else leaves the
    /// session unauthenticated.
    ///
    /// # Errors
    ///
    /// Returns a `Storage` error when persisted state cannot be read.
    pub async fn restore_session(&self) -> ApiResult<bool> {
        let stored = match self.inner.durable.load().await? {
            Some(stored) => Some(stored),
            None => self.inner.transient.load().await?,
        };
        let Some(stored) = stored else {
            self.inner.set_state(SessionState::Unauthenticated).await;
            return Ok(false);
        };

        *self.inner.remember.write().await = stored.remember;
        *self.inner.profile.write().await = stored.profile;
        *self.inner.token.write().await = Some(stored.token.clone());

        if stored.token.is_fresh() {
            self.inner.set_state(SessionState::Authenticated).await;
            self.inner.touch().await;
            tracing::info!("session restored from storage");
            return Ok(true);
        }

        tracing::info!("restored token is stale; refreshing eagerly");
        match self.refresh.refresh(None).await {
            Ok(_) => Ok(true),
            Err(e) => {
                tracing::warn!(error = %e, "eager refresh on restore failed");
                Ok(false)
            }
        }
    }

    /// Ends the session. Unless `silent`, the backend is notified first;
    /// that notification is best-effort and its failure changes nothing.
    /// Local state is cleared unconditionally and the user is sent to login.
    pub async fn logout(&self, silent: bool) {
        if !silent {
            let token = self.access_token().await;
            if let Some(token) = token {
                if let Err(e) = self.inner.api.logout(&token).await {
                    tracing::warn!(error = %e, "logout notification failed; clearing anyway");
                }
            }
        }
        self.inner.clear_local().await;
        self.inner.navigator.redirect_to_login(None);
        tracing::info!("logged out");
    }

    /// Refreshes the token if it has entered the skew window. Idempotent:
    /// fresh tokens are a no-op, and concurrent callers collapse into one
    /// refresh call. Returns `false` when there is no session to check.
    ///
    /// # Errors
    ///
    /// Propagates the refresh failure after the session has been torn down.
    pub async fn check_expiration(&self, silent: bool) -> ApiResult<bool> {
        let token = self.inner.token.read().await.clone();
        let Some(token) = token else {
            return Ok(false);
        };
        if token.is_fresh() {
            return Ok(true);
        }
        if !silent {
            tracing::info!("access token expiring; refreshing");
        }
        self.refresh.refresh(None).await.map(|_| true)
    }

    /// Single-flight token refresh. `origin` is the request path that
    /// observed the failure, forwarded to the navigator if the session
    /// terminates.
    ///
    /// # Errors
    ///
    /// Every caller of a failed refresh receives the same error.
    pub async fn refresh(&self, origin: Option<String>) -> ApiResult<AuthToken> {
        self.refresh.refresh(origin).await
    }

    /// Tears the session down after an unrecoverable authorization failure
    /// (a 401 that survived one refresh-and-retry cycle).
    pub async fn handle_auth_failure(&self, return_to: Option<&str>) {
        self.inner.handle_auth_failure(return_to).await;
    }

    /// `true` iff a token exists and is fresh.
    pub async fn is_authenticated(&self) -> bool {
        self.inner
            .token
            .read()
            .await
            .as_ref()
            .is_some_and(AuthToken::is_fresh)
    }

    /// The current access token, if any.
    pub async fn access_token(&self) -> Option<String> {
        self.inner
            .token
            .read()
            .await
            .as_ref()
            .map(|t| t.access_token.clone())
    }

    /// The current lifecycle state, deriving `Expiring` from the token clock.
    pub async fn state(&self) -> SessionState {
        let stored = *self.inner.state.read().await;
        if stored == SessionState::Authenticated {
            let expiring = self
                .inner
                .token
                .read()
                .await
                .as_ref()
                .is_some_and(AuthToken::is_expiring);
            if expiring {
                return SessionState::Expiring;
            }
        }
        stored
    }

    /// The profile of the authenticated user, fetched lazily on first use
    /// and cached for the session. `None` when unauthenticated.
    ///
    /// # Errors
    ///
    /// Propagates the profile fetch failure.
    pub async fn current_user(&self) -> ApiResult<Option<UserProfile>> {
        if let Some(profile) = self.inner.profile.read().await.clone() {
            return Ok(Some(profile));
        }
        let Some(token) = self.access_token().await else {
            return Ok(None);
        };
        let profile = self.inner.api.fetch_profile(&token).await?;
        *self.inner.profile.write().await = Some(profile.clone());
        Ok(Some(profile))
    }

    /// Timestamp of the last authentication event.
    pub async fn last_activity(&self) -> OffsetDateTime {
        *self.inner.last_activity.read().await
    }

    /// Spawns the periodic expiry check. The task runs until aborted and
    /// swallows refresh errors; the failure hook has already handled them.
    pub fn spawn_expiry_checker(self: Arc<Self>, period: std::time::Duration) -> JoinHandle<()> {
        let controller = self;
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.tick().await;
            loop {
                interval.tick().await;
                if let Err(e) = controller.check_expiration(true).await {
                    tracing::debug!(error = %e, "periodic expiry check failed");
                }
            }
        })
    }
}
