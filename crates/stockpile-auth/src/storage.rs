//! Credential persistence.
//!
//! The session survives process restarts through a [`CredentialStorage`]
//! implementation. "Remember me" logins go to durable storage (a per-profile
//! JSON file under the user's home directory); other logins stay in a
//! process-lifetime in-memory store. Storage paths and file layout are an
//! implementation detail, not a compatibility surface.

use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tokio::sync::RwLock;

use stockpile_core::{ApiError, ApiResult};

use crate::profile::UserProfile;
use crate::token::AuthToken;

/// Snapshot of session state as persisted between runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredSession {
    /// The credential pair.
    pub token: AuthToken,

    /// Cached profile, if one was fetched before saving.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<UserProfile>,

    /// Whether the user opted into durable persistence.
    pub remember: bool,

    /// When this snapshot was written.
    #[serde(with = "time::serde::rfc3339")]
    pub saved_at: OffsetDateTime,
}

/// Storage seam for persisted sessions.
///
/// Implementations must treat `save` as a wholesale replace and `clear` as
/// idempotent.
#[async_trait]
pub trait CredentialStorage: Send + Sync {
    /// Reads the persisted session, if any.
    ///
    /// # Errors
    ///
    /// Returns a `Storage` error when the backing store cannot be read. A
    /// missing or corrupt entry is `Ok(None)`, not an error: a stale file
    /// must never wedge startup.
    async fn load(&self) -> ApiResult<Option<StoredSession>>;

    /// Replaces the persisted session.
    ///
    /// # Errors
    ///
    /// Returns a `Storage` error when the snapshot cannot be written.
    async fn save(&self, session: &StoredSession) -> ApiResult<()>;

    /// Removes any persisted session.
    ///
    /// # Errors
    ///
    /// Returns a `Storage` error when the removal fails for reasons other
    /// than the entry already being gone.
    async fn clear(&self) -> ApiResult<()>;
}

/// Process-lifetime storage for sessions without "remember me".
#[derive(Default)]
pub struct MemoryCredentialStorage {
    inner: RwLock<Option<StoredSession>>,
}

impl MemoryCredentialStorage {
    /// Creates an empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStorage for MemoryCredentialStorage {
    async fn load(&self) -> ApiResult<Option<StoredSession>> {
        Ok(self.inner.read().await.clone())
    }

    async fn save(&self, session: &StoredSession) -> ApiResult<()> {
        *self.inner.write().await = Some(session.clone());
        Ok(())
    }

    async fn clear(&self) -> ApiResult<()> {
        *self.inner.write().await = None;
        Ok(())
    }
}

/// Durable storage backed by a per-profile JSON file.
pub struct FileCredentialStorage {
    path: PathBuf,
}

impl FileCredentialStorage {
    /// Uses an explicit file path.
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Resolves the conventional location for a named profile:
    /// `~/.stockpile/session.<profile>.json`.
    ///
    /// # Errors
    ///
    /// Returns a `Storage` error when the home directory cannot be
    /// determined.
    pub fn for_profile(profile: &str) -> ApiResult<Self> {
        let dir = dirs::home_dir()
            .ok_or_else(|| ApiError::storage("cannot determine home directory"))?
            .join(".stockpile");
        Ok(Self::new(dir.join(format!("session.{profile}.json"))))
    }

    /// The file this store reads and writes.
    #[must_use]
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

#[async_trait]
impl CredentialStorage for FileCredentialStorage {
    async fn load(&self) -> ApiResult<Option<StoredSession>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(ApiError::storage(format!("read session file: {e}"))),
        };
        match serde_json::from_str(&content) {
            Ok(session) => Ok(Some(session)),
            Err(e) => {
                // A corrupt file is treated as absent rather than fatal.
                tracing::warn!(path = %self.path.display(), error = %e, "discarding unreadable session file");
                Ok(None)
            }
        }
    }

    async fn save(&self, session: &StoredSession) -> ApiResult<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ApiError::storage(format!("create session dir: {e}")))?;
        }
        let content = serde_json::to_string_pretty(session)
            .map_err(|e| ApiError::storage(format!("encode session: {e}")))?;
        tokio::fs::write(&self.path, content)
            .await
            .map_err(|e| ApiError::storage(format!("write session file: {e}")))
    }

    async fn clear(&self) -> ApiResult<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ApiError::storage(format!("remove session file: {e}"))),
        }
    }
}
