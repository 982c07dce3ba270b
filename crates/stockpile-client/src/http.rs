//! The composed request pipeline.
//!
//! Stage order, each stage short-circuiting on resolution:
//!
//! 1. Compute the request signature.
//! 2. GET with caching enabled: return a live cached payload without a
//!    network call.
//! 3. Mutation: supersede any in-flight duplicate, then register this one.
//! 4. Attach the current access token, refreshing first if it has entered
//!    the skew window.
//! 5. Issue the network call inside the per-request timeout budget.
//! 6. Success: store GET payloads in the cache, clear the dedup entry.
//! 7. HTTP 401: one refresh through the session's coordinator, then one
//!    retry with the new token. A second 401 tears the session down.
//! 8. Anything else: classify and propagate without retry, which bounds
//!    worst-case amplification to one extra request per caller.

use std::sync::Arc;

use futures_util::future::{AbortRegistration, Abortable};
use serde::de::DeserializeOwned;
use serde_json::Value;

use stockpile_auth::{SessionController, SessionState};
use stockpile_core::{ApiError, ApiResult, ResponseEnvelope, signature::RequestSignature};

use crate::cache::ResponseCache;
use crate::config::ClientConfig;
use crate::dedup::RequestDeduper;
use crate::request::{Outcome, RequestBody, RequestSpec};

enum Attempt {
    Success(Value),
    /// HTTP 401: recoverable through one refresh-and-retry cycle.
    Unauthorized(ApiError),
    /// Everything else, including the supersession signal.
    Failed(ApiError),
}

/// The coordinated HTTP client.
///
/// One instance per process, sharing the process-wide session controller.
/// Consumers issue requests through [`HttpClient::request`] and never touch
/// the cache or dedup state directly.
pub struct HttpClient {
    http: reqwest::Client,
    config: ClientConfig,
    session: Arc<SessionController>,
    cache: Arc<ResponseCache>,
    deduper: RequestDeduper,
}

impl HttpClient {
    /// Builds the client from its configuration and the session controller.
    ///
    /// # Errors
    ///
    /// Returns an internal error if the underlying HTTP client cannot be
    /// constructed.
    pub fn new(config: ClientConfig, session: Arc<SessionController>) -> ApiResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ApiError::internal(format!("http client construction: {e}")))?;
        let cache = Arc::new(ResponseCache::new(config.cache_ttl));
        Ok(Self {
            http,
            config,
            session,
            cache,
            deduper: RequestDeduper::new(),
        })
    }

    /// The session controller this client attaches credentials from.
    #[must_use]
    pub fn session(&self) -> &Arc<SessionController> {
        &self.session
    }

    /// Drops cached GET responses whose signature starts with the canonical
    /// prefix for `method`/`path`. Mutation handlers call this for the reads
    /// their mutation made stale. Returns the number of entries dropped.
    pub async fn invalidate_cached(&self, method: &str, path: &str) -> usize {
        self.cache
            .invalidate(&RequestSignature::prefix(method, path))
            .await
    }

    /// Spawns the periodic cache sweep using the configured interval.
    pub fn spawn_cache_sweeper(&self) -> tokio::task::JoinHandle<()> {
        Arc::clone(&self.cache).spawn_sweeper(self.config.sweep_interval)
    }

    /// Issues a request through the full pipeline.
    ///
    /// A request cancelled by its own newer duplicate resolves as
    /// `Ok(Outcome::Superseded)`; cancellation is a no-op signal, never an
    /// error.
    ///
    /// # Errors
    ///
    /// Returns the classified failure. `Unauthorized` means one refresh
    /// cycle was already spent and the session has been terminated.
    pub async fn request(&self, spec: RequestSpec) -> ApiResult<Outcome> {
        let signature = spec.signature();

        if spec.method.is_idempotent() && spec.cache.enabled {
            if let Some(hit) = self.cache.get(signature.as_str()).await {
                tracing::debug!(signature = %signature, "serving cached response");
                return Ok(Outcome::Payload(hit));
            }
        }

        let mut dedup_generation = None;
        let mut registration = None;
        if !spec.method.is_idempotent() {
            self.deduper.supersede(signature.as_str()).await;
            let (reg, generation) = self.deduper.register(signature.as_str()).await;
            registration = Some(reg);
            dedup_generation = Some(generation);
        }

        let first = self.attempt(&spec, registration).await;
        let attempt = match first {
            Attempt::Unauthorized(_) => {
                tracing::debug!(path = %spec.path, "401 received; refreshing once");
                match self.session.refresh(Some(spec.path.clone())).await {
                    Ok(_) => {
                        // Re-register so the retry can still be superseded.
                        let mut retry_registration = None;
                        if !spec.method.is_idempotent() {
                            let (reg, generation) =
                                self.deduper.register(signature.as_str()).await;
                            retry_registration = Some(reg);
                            dedup_generation = Some(generation);
                        }
                        match self.attempt(&spec, retry_registration).await {
                            Attempt::Unauthorized(retry_err) => {
                                // The refreshed token was rejected too.
                                self.session.handle_auth_failure(Some(&spec.path)).await;
                                Attempt::Failed(retry_err)
                            }
                            other => other,
                        }
                    }
                    Err(refresh_err) => {
                        tracing::debug!(error = %refresh_err, "refresh failed; propagating");
                        Attempt::Failed(refresh_err)
                    }
                }
            }
            other => other,
        };

        if let Some(generation) = dedup_generation {
            self.deduper.complete(signature.as_str(), generation).await;
        }

        match attempt {
            Attempt::Success(payload) => {
                if spec.method.is_idempotent() && spec.cache.enabled {
                    self.cache
                        .put(signature.as_str(), payload.clone(), spec.cache.ttl)
                        .await;
                }
                Ok(Outcome::Payload(payload))
            }
            Attempt::Failed(e) if e.is_superseded() => Ok(Outcome::Superseded),
            Attempt::Failed(e) | Attempt::Unauthorized(e) => Err(e),
        }
    }

    /// Issues a request and decodes the payload into `T`. Returns `None`
    /// when the request was superseded.
    ///
    /// # Errors
    ///
    /// Returns the classified failure, or a server error when the payload
    /// does not match `T`.
    pub async fn request_json<T: DeserializeOwned>(
        &self,
        spec: RequestSpec,
    ) -> ApiResult<Option<T>> {
        match self.request(spec).await? {
            Outcome::Superseded => Ok(None),
            Outcome::Payload(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|e| ApiError::server(format!("unexpected payload shape: {e}"))),
        }
    }

    async fn attempt(
        &self,
        spec: &RequestSpec,
        registration: Option<AbortRegistration>,
    ) -> Attempt {
        let call = self.execute(spec);
        match registration {
            None => call.await,
            Some(registration) => match Abortable::new(call, registration).await {
                Ok(attempt) => attempt,
                Err(_aborted) => Attempt::Failed(ApiError::Superseded),
            },
        }
    }

    async fn execute(&self, spec: &RequestSpec) -> Attempt {
        let token = self.bearer_token().await;
        let url = self.config.endpoint(&spec.path);
        let mut req = self.http.request(spec.method.into(), url);
        if !spec.query.is_empty() {
            req = req.query(&spec.query);
        }
        req = match &spec.body {
            RequestBody::Empty => req,
            RequestBody::Json(body) => req.json(body),
            RequestBody::Multipart(form) => req.multipart(form.to_form()),
        };
        if let Some(token) = token {
            req = req.bearer_auth(token);
        }

        let response = match req.send().await {
            Ok(response) => response,
            Err(e) => return Attempt::Failed(classify_transport(&e)),
        };

        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();

        if status == 401 {
            return Attempt::Unauthorized(ApiError::from_status(
                status,
                extract_message(&body),
            ));
        }
        if !(200..300).contains(&status) {
            return Attempt::Failed(ApiError::from_status(status, extract_message(&body)));
        }

        match serde_json::from_str::<ResponseEnvelope<Value>>(&body) {
            Ok(envelope) if envelope.is_success() => {
                Attempt::Success(envelope.data.unwrap_or(Value::Null))
            }
            Ok(envelope) => {
                Attempt::Failed(ApiError::from_envelope(envelope.code, envelope.message))
            }
            Err(e) => Attempt::Failed(ApiError::server(format!("undecodable response body: {e}"))),
        }
    }

    /// Reads the freshest usable access token, refreshing first when the
    /// current one has entered the skew window. A failed pre-request refresh
    /// is not fatal here: the request proceeds and the 401 path settles it.
    async fn bearer_token(&self) -> Option<String> {
        if self.session.state().await == SessionState::Expiring {
            if let Err(e) = self.session.check_expiration(true).await {
                tracing::debug!(error = %e, "pre-request refresh failed");
            }
        }
        self.session.access_token().await
    }
}

fn classify_transport(error: &reqwest::Error) -> ApiError {
    if error.is_timeout() {
        ApiError::network("request timed out")
    } else if error.is_connect() {
        ApiError::network("cannot connect to the server")
    } else {
        ApiError::network(error.to_string())
    }
}

/// Pulls the human-readable message out of an error body when the server
/// sent an envelope.
fn extract_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    value
        .get("message")
        .or_else(|| value.get("msg"))
        .and_then(Value::as_str)
        .map(ToString::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_message_prefers_message_field() {
        assert_eq!(
            extract_message(r#"{"message":"no such entity","msg":"other"}"#).as_deref(),
            Some("no such entity")
        );
        assert_eq!(
            extract_message(r#"{"msg":"fallback"}"#).as_deref(),
            Some("fallback")
        );
        assert!(extract_message("plain text").is_none());
    }
}
