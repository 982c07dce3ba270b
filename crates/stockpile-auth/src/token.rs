//! Token types and expiry predicates.
//!
//! The backend issues an access token (short-lived) and a refresh token
//! (long-lived) together with an `expiresIn` lifetime in seconds. The expiry
//! timestamp is always derived here from the issue time plus that lifetime;
//! it is never taken from a caller-provided absolute value.

use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

use crate::profile::UserProfile;

/// Safety margin subtracted from token expiry. A token inside this window is
/// treated as expiring and refreshed proactively, so requests never race the
/// actual expiry.
pub const REFRESH_SKEW: Duration = Duration::minutes(5);

/// The credential pair held by the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthToken {
    /// Short-lived credential attached to each authenticated request.
    pub access_token: String,

    /// Long-lived credential used solely to obtain a new access token.
    pub refresh_token: String,

    /// When the access token expires.
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
}

impl AuthToken {
    /// Builds a token from a grant response, deriving the expiry from the
    /// issue time and the granted lifetime.
    #[must_use]
    pub fn from_grant(
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
        expires_in_secs: i64,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
            expires_at: OffsetDateTime::now_utc() + Duration::seconds(expires_in_secs),
        }
    }

    /// Returns `true` while the token is outside the refresh window.
    #[must_use]
    pub fn is_fresh(&self) -> bool {
        OffsetDateTime::now_utc() < self.expires_at - REFRESH_SKEW
    }

    /// Returns `true` once the token has entered the refresh window.
    #[must_use]
    pub fn is_expiring(&self) -> bool {
        !self.is_fresh()
    }

    /// Returns `true` once the token is past its actual expiry.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        OffsetDateTime::now_utc() >= self.expires_at
    }
}

/// Wire shape of `POST /auth/refresh-token` response data.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenGrant {
    /// The new access token.
    pub token: String,
    /// The new refresh token.
    pub refresh_token: String,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
}

impl From<TokenGrant> for AuthToken {
    fn from(grant: TokenGrant) -> Self {
        Self::from_grant(grant.token, grant.refresh_token, grant.expires_in)
    }
}

/// Wire shape of `POST /auth/login` response data.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginGrant {
    /// The issued access token.
    pub token: String,
    /// The issued refresh token.
    pub refresh_token: String,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
    /// Profile of the authenticated user.
    pub user: UserProfile,
    /// Server-side login timestamp, informational only.
    #[serde(default)]
    pub login_time: Option<String>,
}

impl LoginGrant {
    /// Splits the grant into the token and the profile it carried.
    #[must_use]
    pub fn into_parts(self) -> (AuthToken, UserProfile) {
        let token = AuthToken::from_grant(self.token, self.refresh_token, self.expires_in);
        (token, self.user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expiry_is_derived_from_lifetime() {
        let before = OffsetDateTime::now_utc();
        let token = AuthToken::from_grant("acc", "ref", 7200);
        let after = OffsetDateTime::now_utc();

        assert!(token.expires_at >= before + Duration::seconds(7200));
        assert!(token.expires_at <= after + Duration::seconds(7200));
    }

    #[test]
    fn test_fresh_outside_skew_window() {
        // Two hours out: well clear of the five-minute skew.
        let token = AuthToken::from_grant("acc", "ref", 7200);
        assert!(token.is_fresh());
        assert!(!token.is_expiring());
        assert!(!token.is_expired());
    }

    #[test]
    fn test_expiring_inside_skew_window() {
        // Four minutes out: inside the skew, but not yet actually expired.
        let token = AuthToken::from_grant("acc", "ref", 240);
        assert!(!token.is_fresh());
        assert!(token.is_expiring());
        assert!(!token.is_expired());
    }

    #[test]
    fn test_expired_token() {
        let token = AuthToken::from_grant("acc", "ref", -60);
        assert!(token.is_expiring());
        assert!(token.is_expired());
    }

    #[test]
    fn test_grant_wire_names() {
        let grant: TokenGrant = serde_json::from_str(
            r#"{"token":"a2","refreshToken":"r2","expiresIn":3600}"#,
        )
        .unwrap();
        let token = AuthToken::from(grant);
        assert_eq!(token.access_token, "a2");
        assert_eq!(token.refresh_token, "r2");
    }

    #[test]
    fn test_token_round_trips_through_serde() {
        let token = AuthToken::from_grant("acc", "ref", 3600);
        let json = serde_json::to_string(&token).unwrap();
        assert!(json.contains("accessToken"));
        assert!(json.contains("expiresAt"));

        let back: AuthToken = serde_json::from_str(&json).unwrap();
        assert_eq!(back, token);
    }
}
