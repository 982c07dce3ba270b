//! User endpoints through the coordinated pipeline.

use std::sync::Arc;

use serde_json::Value;

use stockpile_auth::UserProfile;
use stockpile_core::ApiResult;

use crate::http::HttpClient;
use crate::request::RequestSpec;

/// Typed wrapper over the user endpoints. This is the shape consumers of
/// the pipeline are expected to take: reads go through the cache, and
/// mutations invalidate the reads they make stale.
pub struct UserApi {
    client: Arc<HttpClient>,
}

impl UserApi {
    /// Wraps the shared client.
    #[must_use]
    pub fn new(client: Arc<HttpClient>) -> Self {
        Self { client }
    }

    /// `GET /users/info`, served from cache within its TTL.
    ///
    /// # Errors
    ///
    /// Returns the classified failure.
    pub async fn info(&self) -> ApiResult<Option<UserProfile>> {
        self.client.request_json(RequestSpec::get("/users/info")).await
    }

    /// `PUT /users/info`. On success the cached profile read is dropped so
    /// the next [`UserApi::info`] observes the update.
    ///
    /// # Errors
    ///
    /// Returns the classified failure.
    pub async fn update_info(&self, changes: Value) -> ApiResult<Option<UserProfile>> {
        let updated = self
            .client
            .request_json(RequestSpec::put("/users/info").json(changes))
            .await?;
        if updated.is_some() {
            self.client.invalidate_cached("GET", "/users/info").await;
        }
        Ok(updated)
    }
}
