use std::sync::Arc;

use anyhow::{Context, Result};

use stockpile_auth::{FileCredentialStorage, Navigator, SessionController};
use stockpile_client::{AuthEndpoints, ClientConfig, HttpClient};

/// The assembled coordination layer: one session controller and one
/// pipeline client per invocation.
pub struct CliContext {
    pub session: Arc<SessionController>,
    pub client: Arc<HttpClient>,
}

/// The CLI has no view router; auth-failure redirects surface as log lines
/// and the commands print their own guidance.
struct CliNavigator;

impl Navigator for CliNavigator {
    fn redirect_to_login(&self, return_to: Option<&str>) {
        tracing::info!(return_to, "login required");
    }
}

pub fn build_context(server: &str, profile: &str) -> Result<CliContext> {
    let config = ClientConfig::for_base_url(server)
        .with_context(|| format!("Invalid server URL: {server}"))?;
    let endpoints = Arc::new(AuthEndpoints::new(config.clone())?);
    let storage = Arc::new(FileCredentialStorage::for_profile(profile)?);
    let session = Arc::new(SessionController::new(
        endpoints,
        Arc::new(CliNavigator),
        storage,
    ));
    let client = Arc::new(HttpClient::new(config, session.clone())?);
    Ok(CliContext { session, client })
}
