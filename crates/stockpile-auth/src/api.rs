//! Network and navigation seams for the session machine.
//!
//! The session controller never talks to the network or the frontend
//! directly. [`AuthApi`] is implemented over reqwest in `stockpile-client`;
//! [`Navigator`] is implemented by whatever hosts the session (a UI router,
//! the CLI, a test recorder).

use async_trait::async_trait;

use stockpile_core::ApiResult;

use crate::profile::UserProfile;
use crate::token::{LoginGrant, TokenGrant};

/// The authentication endpoints the session machine drives.
///
/// Implementations must not route these calls back through the coordinated
/// request pipeline: a refresh that itself triggered a refresh would recurse.
#[async_trait]
pub trait AuthApi: Send + Sync {
    /// `POST /auth/login`.
    ///
    /// # Errors
    ///
    /// Returns the classified transport or envelope error on failure.
    async fn login(&self, username: &str, password: &str, remember: bool)
    -> ApiResult<LoginGrant>;

    /// `POST /auth/refresh-token`.
    ///
    /// # Errors
    ///
    /// Returns `Unauthorized` when the refresh token is no longer accepted,
    /// or the classified transport error.
    async fn refresh(&self, refresh_token: &str) -> ApiResult<TokenGrant>;

    /// `POST /auth/logout`. Best-effort; the caller ignores failures.
    ///
    /// # Errors
    ///
    /// Returns the classified transport or envelope error on failure.
    async fn logout(&self, access_token: &str) -> ApiResult<()>;

    /// `GET /users/info` for the authenticated user.
    ///
    /// # Errors
    ///
    /// Returns the classified transport or envelope error on failure.
    async fn fetch_profile(&self, access_token: &str) -> ApiResult<UserProfile>;
}

/// Navigation side effects owned by the session controller.
///
/// `return_to` carries the originating request path when an authentication
/// failure interrupted a request, so the host can come back after login.
pub trait Navigator: Send + Sync {
    /// Sends the user to the login surface.
    fn redirect_to_login(&self, return_to: Option<&str>);
}

/// A navigator that does nothing, for headless embedders and tests that do
/// not care about navigation.
pub struct NoopNavigator;

impl Navigator for NoopNavigator {
    fn redirect_to_login(&self, _return_to: Option<&str>) {}
}
