//! Single-flight token refresh.
//!
//! Many callers can observe an expiring token in the same instant: the
//! periodic expiry check, the lazy check before each request, and any number
//! of 401 handlers. All of them must converge on exactly one
//! `/auth/refresh-token` network call. The coordinator keeps a single
//! optional in-flight future; whoever finds the slot empty creates it, and
//! everyone else awaits a clone of the same shared future and observes the
//! identical outcome.

use std::sync::Arc;

use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use tokio::sync::Mutex;

use stockpile_core::{ApiError, ApiResult};

use crate::session::{SessionInner, SessionState};
use crate::token::AuthToken;

type SharedRefresh = Shared<BoxFuture<'static, Result<AuthToken, ApiError>>>;

/// Ensures at most one refresh network call is outstanding at any time.
pub struct RefreshCoordinator {
    session: Arc<SessionInner>,
    inflight: Arc<Mutex<Option<SharedRefresh>>>,
}

impl RefreshCoordinator {
    pub(crate) fn new(session: Arc<SessionInner>) -> Self {
        Self {
            session,
            inflight: Arc::new(Mutex::new(None)),
        }
    }

    /// Joins the in-flight refresh, or starts one if none exists.
    ///
    /// On success the token store holds the new pair before any waiter
    /// resumes. On failure the session is torn down (token cleared, redirect
    /// fired once) before the shared error fans out; later callers fail fast
    /// on the missing refresh token without issuing further network calls.
    ///
    /// `origin` is the request path that triggered the refresh; it reaches
    /// the navigator if the session terminates.
    ///
    /// # Errors
    ///
    /// All concurrent callers receive the same error.
    pub async fn refresh(&self, origin: Option<String>) -> ApiResult<AuthToken> {
        let shared = {
            let mut slot = self.inflight.lock().await;
            if let Some(existing) = slot.as_ref() {
                existing.clone()
            } else {
                let session = Arc::clone(&self.session);
                let inflight = Arc::clone(&self.inflight);
                let fut: BoxFuture<'static, Result<AuthToken, ApiError>> =
                    Box::pin(async move {
                        let result = run_refresh(&session, origin.as_deref()).await;
                        // Free the slot before waiters resume so the next
                        // expiry starts a new cycle.
                        inflight.lock().await.take();
                        result
                    });
                let shared = fut.shared();
                *slot = Some(shared.clone());
                shared
            }
        };
        shared.await
    }
}

async fn run_refresh(
    session: &Arc<SessionInner>,
    origin: Option<&str>,
) -> Result<AuthToken, ApiError> {
    let Some(refresh_token) = session.refresh_token_value().await else {
        return Err(ApiError::unauthorized("no refresh token available"));
    };
    session.set_state(SessionState::Refreshing).await;
    tracing::debug!("refreshing access token");

    match session.api().refresh(&refresh_token).await {
        Ok(grant) => {
            let token = session.apply_grant(grant).await;
            tracing::info!(expires_at = %token.expires_at, "access token refreshed");
            Ok(token)
        }
        Err(e) => {
            tracing::warn!(error = %e, "token refresh failed; terminating session");
            session.handle_auth_failure(origin).await;
            Err(e)
        }
    }
}
