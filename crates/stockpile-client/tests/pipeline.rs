//! End-to-end pipeline behavior against a mock backend.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::{Value, json};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use stockpile_auth::{MemoryCredentialStorage, Navigator, SessionController};
use stockpile_client::{AuthEndpoints, ClientConfig, HttpClient, Outcome, RequestSpec, UserApi};
use stockpile_core::ApiError;

#[derive(Default)]
struct RecordingNavigator {
    redirects: Mutex<Vec<Option<String>>>,
}

impl RecordingNavigator {
    fn count(&self) -> usize {
        self.redirects.lock().unwrap().len()
    }

    fn first(&self) -> Option<Option<String>> {
        self.redirects.lock().unwrap().first().cloned()
    }
}

impl Navigator for RecordingNavigator {
    fn redirect_to_login(&self, return_to: Option<&str>) {
        self.redirects
            .lock()
            .unwrap()
            .push(return_to.map(ToString::to_string));
    }
}

struct Harness {
    session: Arc<SessionController>,
    client: Arc<HttpClient>,
    navigator: Arc<RecordingNavigator>,
}

fn harness_with_timeout(server: &MockServer, timeout: Duration) -> Harness {
    let mut config = ClientConfig::for_base_url(&server.uri()).unwrap();
    config.request_timeout = timeout;

    let endpoints = Arc::new(AuthEndpoints::new(config.clone()).unwrap());
    let navigator = Arc::new(RecordingNavigator::default());
    let session = Arc::new(SessionController::new(
        endpoints,
        navigator.clone(),
        Arc::new(MemoryCredentialStorage::new()),
    ));
    let client = Arc::new(HttpClient::new(config, session.clone()).unwrap());
    Harness {
        session,
        client,
        navigator,
    }
}

fn harness(server: &MockServer) -> Harness {
    harness_with_timeout(server, Duration::from_secs(10))
}

fn ok(data: Value) -> Value {
    json!({"code": 200, "message": "ok", "data": data})
}

fn login_body(access_token: &str, expires_in: i64) -> Value {
    ok(json!({
        "token": access_token,
        "refreshToken": "refresh-1",
        "expiresIn": expires_in,
        "user": {"id": "u1", "username": "alice"},
        "loginTime": "2026-08-07T00:00:00Z",
    }))
}

fn refresh_body(access_token: &str) -> Value {
    ok(json!({
        "token": access_token,
        "refreshToken": "refresh-2",
        "expiresIn": 7200,
    }))
}

async fn mount_login(server: &MockServer, access_token: &str, expires_in: i64) {
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(login_body(access_token, expires_in)))
        .mount(server)
        .await;
}

// -----------------------------------------------------------------------------
// Login and token attachment
// -----------------------------------------------------------------------------

#[tokio::test]
async fn login_authenticates_and_attaches_bearer_token() {
    let server = MockServer::start().await;
    let h = harness(&server);
    mount_login(&server, "access-1", 7200).await;
    Mock::given(method("GET"))
        .and(path("/tags"))
        .and(header("Authorization", "Bearer access-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ok(json!(["tools"]))))
        .expect(1)
        .mount(&server)
        .await;

    h.session.login("alice", "pw", false).await.unwrap();
    assert!(h.session.is_authenticated().await);

    let outcome = h.client.request(RequestSpec::get("/tags")).await.unwrap();
    assert_eq!(outcome, Outcome::Payload(json!(["tools"])));
}

// -----------------------------------------------------------------------------
// Response cache
// -----------------------------------------------------------------------------

#[tokio::test]
async fn cached_get_is_served_without_network() {
    let server = MockServer::start().await;
    let h = harness(&server);
    mount_login(&server, "access-1", 7200).await;
    Mock::given(method("GET"))
        .and(path("/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ok(json!(["a"]))))
        .expect(1)
        .mount(&server)
        .await;

    h.session.login("alice", "pw", false).await.unwrap();
    let first = h.client.request(RequestSpec::get("/tags")).await.unwrap();
    let second = h.client.request(RequestSpec::get("/tags")).await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn expired_cache_entry_triggers_a_new_network_call() {
    let server = MockServer::start().await;
    let h = harness(&server);
    mount_login(&server, "access-1", 7200).await;
    Mock::given(method("GET"))
        .and(path("/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ok(json!(["a"]))))
        .expect(2)
        .mount(&server)
        .await;

    h.session.login("alice", "pw", false).await.unwrap();
    let spec = RequestSpec::get("/tags").cache_ttl(Duration::from_millis(30));
    h.client.request(spec.clone()).await.unwrap();
    tokio::time::sleep(Duration::from_millis(60)).await;
    h.client.request(spec).await.unwrap();
}

#[tokio::test]
async fn invalidate_evicts_the_cached_read() {
    let server = MockServer::start().await;
    let h = harness(&server);
    mount_login(&server, "access-1", 7200).await;
    Mock::given(method("GET"))
        .and(path("/entities/tree"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ok(json!([]))))
        .expect(2)
        .mount(&server)
        .await;

    h.session.login("alice", "pw", false).await.unwrap();
    h.client
        .request(RequestSpec::get("/entities/tree"))
        .await
        .unwrap();
    h.client.invalidate_cached("GET", "/entities/tree").await;
    h.client
        .request(RequestSpec::get("/entities/tree"))
        .await
        .unwrap();
}

#[tokio::test]
async fn disabled_cache_always_goes_to_the_network() {
    let server = MockServer::start().await;
    let h = harness(&server);
    mount_login(&server, "access-1", 7200).await;
    Mock::given(method("GET"))
        .and(path("/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ok(json!(["a"]))))
        .expect(2)
        .mount(&server)
        .await;

    h.session.login("alice", "pw", false).await.unwrap();
    h.client
        .request(RequestSpec::get("/tags").no_cache())
        .await
        .unwrap();
    h.client
        .request(RequestSpec::get("/tags").no_cache())
        .await
        .unwrap();
}

// -----------------------------------------------------------------------------
// Deduplication
// -----------------------------------------------------------------------------

#[tokio::test]
async fn duplicate_mutation_supersedes_the_first() {
    let server = MockServer::start().await;
    let h = harness(&server);
    mount_login(&server, "access-1", 7200).await;
    Mock::given(method("POST"))
        .and(path("/entities"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(ok(json!({"id": "e1"})))
                .set_delay(Duration::from_millis(300)),
        )
        .mount(&server)
        .await;

    h.session.login("alice", "pw", false).await.unwrap();

    let spec = RequestSpec::post("/entities").json(json!({"name": "drill"}));
    let first = {
        let client = h.client.clone();
        let spec = spec.clone();
        tokio::spawn(async move { client.request(spec).await })
    };
    // Let the first request get onto the wire before duplicating it.
    tokio::time::sleep(Duration::from_millis(50)).await;
    let second = h.client.request(spec).await.unwrap();

    let first = first.await.unwrap().unwrap();
    assert!(first.is_superseded());
    assert_eq!(second, Outcome::Payload(json!({"id": "e1"})));
}

#[tokio::test]
async fn different_mutations_run_independently() {
    let server = MockServer::start().await;
    let h = harness(&server);
    mount_login(&server, "access-1", 7200).await;
    Mock::given(method("POST"))
        .and(path("/entities"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(ok(json!({"id": "e"})))
                .set_delay(Duration::from_millis(100)),
        )
        .expect(2)
        .mount(&server)
        .await;

    h.session.login("alice", "pw", false).await.unwrap();

    let first = {
        let client = h.client.clone();
        tokio::spawn(async move {
            client
                .request(RequestSpec::post("/entities").json(json!({"name": "drill"})))
                .await
        })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    let second = h
        .client
        .request(RequestSpec::post("/entities").json(json!({"name": "saw"})))
        .await
        .unwrap();

    assert!(!first.await.unwrap().unwrap().is_superseded());
    assert!(!second.is_superseded());
}

// -----------------------------------------------------------------------------
// Refresh coordination
// -----------------------------------------------------------------------------

#[tokio::test]
async fn concurrent_requests_under_expiring_token_share_one_refresh() {
    let server = MockServer::start().await;
    let h = harness(&server);
    // Four minutes of lifetime: inside the five-minute refresh skew.
    mount_login(&server, "access-1", 240).await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh-token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(refresh_body("access-2"))
                .set_delay(Duration::from_millis(100)),
        )
        .expect(1)
        .mount(&server)
        .await;
    // Only the refreshed token is accepted.
    Mock::given(method("GET"))
        .and(path("/spaces"))
        .and(header("Authorization", "Bearer access-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ok(json!([]))))
        .mount(&server)
        .await;

    h.session.login("alice", "pw", false).await.unwrap();

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let client = h.client.clone();
            tokio::spawn(
                async move { client.request(RequestSpec::get("/spaces").no_cache()).await },
            )
        })
        .collect();
    for task in tasks {
        let outcome = task.await.unwrap().unwrap();
        assert_eq!(outcome, Outcome::Payload(json!([])));
    }
}

#[tokio::test]
async fn http_401_refreshes_once_and_retries_once() {
    let server = MockServer::start().await;
    let h = harness(&server);
    mount_login(&server, "access-1", 7200).await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(refresh_body("access-2")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/entities"))
        .and(header("Authorization", "Bearer access-1"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/entities"))
        .and(header("Authorization", "Bearer access-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ok(json!([{"id": "e1"}]))))
        .expect(1)
        .mount(&server)
        .await;

    h.session.login("alice", "pw", false).await.unwrap();
    let outcome = h
        .client
        .request(RequestSpec::get("/entities").no_cache())
        .await
        .unwrap();
    assert_eq!(outcome, Outcome::Payload(json!([{"id": "e1"}])));
    assert_eq!(h.navigator.count(), 0);
}

#[tokio::test]
async fn second_401_after_refresh_terminates_the_session() {
    let server = MockServer::start().await;
    let h = harness(&server);
    mount_login(&server, "access-1", 7200).await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(refresh_body("access-2")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/entities"))
        .respond_with(ResponseTemplate::new(401))
        .expect(2)
        .mount(&server)
        .await;

    h.session.login("alice", "pw", false).await.unwrap();
    let err = h
        .client
        .request(RequestSpec::get("/entities").no_cache())
        .await
        .unwrap_err();

    assert!(err.is_unauthorized());
    assert!(!h.session.is_authenticated().await);
    assert_eq!(h.navigator.count(), 1);
    assert_eq!(h.navigator.first(), Some(Some("/entities".to_string())));
}

#[tokio::test]
async fn failed_refresh_clears_session_and_navigates_once() {
    let server = MockServer::start().await;
    let h = harness(&server);
    mount_login(&server, "access-1", 7200).await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh-token"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(json!({"code": 401, "message": "refresh token revoked"})),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/entities"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    h.session.login("alice", "pw", false).await.unwrap();
    let err = h
        .client
        .request(RequestSpec::get("/entities").no_cache())
        .await
        .unwrap_err();

    assert!(err.is_unauthorized());
    assert!(!h.session.is_authenticated().await);
    assert!(h.session.access_token().await.is_none());
    assert_eq!(h.navigator.count(), 1);
    assert_eq!(h.navigator.first(), Some(Some("/entities".to_string())));
}

// -----------------------------------------------------------------------------
// Error classification
// -----------------------------------------------------------------------------

#[tokio::test]
async fn timeout_is_a_network_error_and_never_refreshes() {
    let server = MockServer::start().await;
    let h = harness_with_timeout(&server, Duration::from_millis(100));
    mount_login(&server, "access-1", 7200).await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(refresh_body("access-2")))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(ok(json!(null)))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    h.session.login("alice", "pw", false).await.unwrap();
    let err = h
        .client
        .request(RequestSpec::get("/slow").no_cache())
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Network { .. }));
    // The session is untouched by a transport failure.
    assert!(h.session.is_authenticated().await);
}

#[tokio::test]
async fn envelope_failure_inside_http_200_is_surfaced() {
    let server = MockServer::start().await;
    let h = harness(&server);
    mount_login(&server, "access-1", 7200).await;
    Mock::given(method("GET"))
        .and(path("/entities"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"code": 500, "message": "backup in progress"})),
        )
        .mount(&server)
        .await;

    h.session.login("alice", "pw", false).await.unwrap();
    let err = h
        .client
        .request(RequestSpec::get("/entities").no_cache())
        .await
        .unwrap_err();
    assert_eq!(err, ApiError::server("backup in progress"));
}

#[tokio::test]
async fn http_error_message_is_extracted_from_the_body() {
    let server = MockServer::start().await;
    let h = harness(&server);
    mount_login(&server, "access-1", 7200).await;
    Mock::given(method("GET"))
        .and(path("/entities/42"))
        .respond_with(
            ResponseTemplate::new(404)
                .set_body_json(json!({"code": 404, "message": "no such entity"})),
        )
        .mount(&server)
        .await;

    h.session.login("alice", "pw", false).await.unwrap();
    let err = h
        .client
        .request(RequestSpec::get("/entities/42").no_cache())
        .await
        .unwrap_err();
    assert_eq!(err, ApiError::not_found("no such entity"));
}

// -----------------------------------------------------------------------------
// Logout
// -----------------------------------------------------------------------------

#[tokio::test]
async fn logout_notifies_the_server_and_clears_locally_even_on_500() {
    let server = MockServer::start().await;
    let h = harness(&server);
    mount_login(&server, "access-1", 7200).await;
    Mock::given(method("POST"))
        .and(path("/auth/logout"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    h.session.login("alice", "pw", false).await.unwrap();
    h.session.logout(false).await;

    assert!(!h.session.is_authenticated().await);
    assert!(h.session.access_token().await.is_none());
    assert_eq!(h.navigator.count(), 1);
}

// -----------------------------------------------------------------------------
// Consumer surface
// -----------------------------------------------------------------------------

#[tokio::test]
async fn user_update_invalidates_the_cached_profile_read() {
    let server = MockServer::start().await;
    let h = harness(&server);
    mount_login(&server, "access-1", 7200).await;
    Mock::given(method("GET"))
        .and(path("/users/info"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(ok(json!({"id": "u1", "username": "alice"}))),
        )
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/users/info"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(ok(json!({"id": "u1", "username": "alice", "nickname": "Al"}))),
        )
        .expect(1)
        .mount(&server)
        .await;

    h.session.login("alice", "pw", false).await.unwrap();
    let users = UserApi::new(h.client.clone());

    let first = users.info().await.unwrap().unwrap();
    // Served from cache: no second GET yet.
    let cached = users.info().await.unwrap().unwrap();
    assert_eq!(first, cached);

    users
        .update_info(json!({"nickname": "Al"}))
        .await
        .unwrap()
        .unwrap();

    // The update dropped the cached read, so this one hits the network.
    users.info().await.unwrap().unwrap();
}
