//! User profile and permission checks.

use serde::{Deserialize, Serialize};

/// Wildcard permission that grants everything.
const ALL_PERMISSIONS: &str = "*:*:*";

/// Profile of the authenticated user as returned by `GET /users/info`.
///
/// The profile is a derived view cached by the session; the token is the
/// authoritative credential.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    /// Backend identifier of the user.
    pub id: String,

    /// Login name.
    pub username: String,

    /// Display name; falls back to the username when the backend omits it.
    #[serde(default)]
    pub nickname: String,

    /// Avatar URL, possibly relative to the API base.
    #[serde(default)]
    pub avatar: String,

    /// Roles for page-level access control.
    #[serde(default)]
    pub roles: Vec<String>,

    /// Permission strings for action-level access control.
    #[serde(default)]
    pub permissions: Vec<String>,
}

impl UserProfile {
    /// Returns `true` if the user carries the given role.
    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    /// Returns `true` if the user may perform the action guarded by
    /// `permission`.
    ///
    /// The `ADMIN` role and the `*:*:*` wildcard grant everything; otherwise
    /// the check is exact membership.
    #[must_use]
    pub fn has_permission(&self, permission: &str) -> bool {
        if permission.is_empty() {
            return false;
        }
        if self.has_role("ADMIN") {
            return true;
        }
        self.permissions
            .iter()
            .any(|p| p == ALL_PERMISSIONS || p == permission)
    }
}
