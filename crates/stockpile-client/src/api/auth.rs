//! Authentication endpoints.
//!
//! [`AuthEndpoints`] is the reqwest implementation of the session machine's
//! [`AuthApi`] seam, plus the account-management calls that do not touch
//! session state (register, password recovery).
//!
//! These endpoints use a bare HTTP client on purpose: routing a refresh
//! call back through the coordinated pipeline would let a 401 on the
//! refresh itself trigger another refresh.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use stockpile_auth::{AuthApi, LoginGrant, TokenGrant, UserProfile};
use stockpile_core::{ApiError, ApiResult, ResponseEnvelope};

use crate::config::ClientConfig;

/// Direct client for `/auth/*` and `/users/info`.
pub struct AuthEndpoints {
    http: reqwest::Client,
    config: ClientConfig,
}

impl AuthEndpoints {
    /// Builds the endpoint client with the same base URL and timeout budget
    /// as the coordinated pipeline.
    ///
    /// # Errors
    ///
    /// Returns an internal error if the underlying HTTP client cannot be
    /// constructed.
    pub fn new(config: ClientConfig) -> ApiResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ApiError::internal(format!("http client construction: {e}")))?;
        Ok(Self { http, config })
    }

    async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &Value,
        bearer: Option<&str>,
    ) -> ApiResult<ResponseEnvelope<T>> {
        let mut req = self.http.post(self.config.endpoint(path)).json(body);
        if let Some(token) = bearer {
            req = req.bearer_auth(token);
        }
        self.send(req).await
    }

    async fn send<T: DeserializeOwned>(
        &self,
        req: reqwest::RequestBuilder,
    ) -> ApiResult<ResponseEnvelope<T>> {
        let response = req.send().await.map_err(|e| {
            if e.is_timeout() {
                ApiError::network("request timed out")
            } else {
                ApiError::network(format!("cannot reach the server: {e}"))
            }
        })?;

        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        if !(200..300).contains(&status) {
            let message = serde_json::from_str::<Value>(&body)
                .ok()
                .and_then(|v| v.get("message").and_then(Value::as_str).map(String::from));
            return Err(ApiError::from_status(status, message));
        }

        serde_json::from_str(&body)
            .map_err(|e| ApiError::server(format!("undecodable response body: {e}")))
    }

    /// `POST /auth/register`.
    ///
    /// # Errors
    ///
    /// Returns the classified transport or envelope error.
    pub async fn register(&self, username: &str, email: &str, password: &str) -> ApiResult<()> {
        let body = json!({
            "username": username,
            "email": email,
            "password": password,
        });
        self.post::<Value>("/auth/register", &body, None)
            .await?
            .into_unit()
    }

    /// `POST /auth/forgot-password`.
    ///
    /// # Errors
    ///
    /// Returns the classified transport or envelope error.
    pub async fn forgot_password(&self, email: &str) -> ApiResult<()> {
        self.post::<Value>("/auth/forgot-password", &json!({"email": email}), None)
            .await?
            .into_unit()
    }

    /// `POST /auth/reset-password`.
    ///
    /// # Errors
    ///
    /// Returns the classified transport or envelope error.
    pub async fn reset_password(&self, token: &str, new_password: &str) -> ApiResult<()> {
        let body = json!({
            "token": token,
            "newPassword": new_password,
        });
        self.post::<Value>("/auth/reset-password", &body, None)
            .await?
            .into_unit()
    }
}

#[async_trait]
impl AuthApi for AuthEndpoints {
    async fn login(
        &self,
        username: &str,
        password: &str,
        remember: bool,
    ) -> ApiResult<LoginGrant> {
        let body = json!({
            "username": username,
            "password": password,
            "rememberMe": remember,
        });
        self.post("/auth/login", &body, None).await?.into_result()
    }

    async fn refresh(&self, refresh_token: &str) -> ApiResult<TokenGrant> {
        let body = json!({"refreshToken": refresh_token});
        self.post("/auth/refresh-token", &body, None)
            .await?
            .into_result()
    }

    async fn logout(&self, access_token: &str) -> ApiResult<()> {
        self.post::<Value>("/auth/logout", &json!({}), Some(access_token))
            .await?
            .into_unit()
    }

    async fn fetch_profile(&self, access_token: &str) -> ApiResult<UserProfile> {
        let req = self
            .http
            .get(self.config.endpoint("/users/info"))
            .bearer_auth(access_token);
        self.send(req).await?.into_result()
    }
}
