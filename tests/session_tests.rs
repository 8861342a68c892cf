//! Integration tests for the session token lifecycle.
//!
//! Every login occupies a license slot on the server, so most of these tests
//! pin down exactly how many times the login endpoint is hit.

use std::sync::Arc;
use std::time::Duration;

use iiko_api::{
    AuthError, BaseUrl, HttpClient, IikoConfig, Login, Password, SessionManager, SessionState,
    TokenStore,
};
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn manager_for(base_url: &str, dir: &TempDir) -> SessionManager {
    let config = IikoConfig::builder()
        .base_url(BaseUrl::new(base_url).unwrap())
        .login(Login::new("admin").unwrap())
        .password(Password::new("secret").unwrap())
        .token_storage_path(dir.path().join(".iiko_token"))
        .max_retries(0)
        .retry_backoff(Duration::from_millis(10))
        .build()
        .unwrap();
    let http = HttpClient::new(&config).unwrap();
    SessionManager::new(Arc::new(config), Arc::new(http))
}

fn api_base(server: &MockServer) -> String {
    format!("{}/resto/api", server.uri())
}

async fn mount_login(server: &MockServer, token: &str, times: u64) {
    Mock::given(method("POST"))
        .and(path("/resto/api/auth"))
        .and(query_param("login", "admin"))
        .and(query_param("pass", "secret"))
        .respond_with(ResponseTemplate::new(200).set_body_string(token))
        .expect(times)
        .mount(server)
        .await;
}

// ============================================================================
// Login
// ============================================================================

#[tokio::test]
async fn test_cached_token_is_reused_without_second_login() {
    let server = MockServer::start().await;
    mount_login(&server, "token-1\n", 1).await;

    let dir = TempDir::new().unwrap();
    let manager = manager_for(&api_base(&server), &dir);

    assert_eq!(manager.authenticate(false).await.unwrap(), "token-1");
    assert_eq!(manager.authenticate(false).await.unwrap(), "token-1");
    assert_eq!(manager.state().await, SessionState::Authenticated);
}

#[tokio::test]
async fn test_forced_login_always_hits_the_server() {
    let server = MockServer::start().await;
    mount_login(&server, "token-2", 2).await;

    let dir = TempDir::new().unwrap();
    let manager = manager_for(&api_base(&server), &dir);

    manager.authenticate(false).await.unwrap();
    manager.authenticate(true).await.unwrap();
}

#[tokio::test]
async fn test_login_persists_token() {
    let server = MockServer::start().await;
    mount_login(&server, "persist-me", 1).await;

    let dir = TempDir::new().unwrap();
    let manager = manager_for(&api_base(&server), &dir);
    manager.get_token().await.unwrap();

    let stored = manager.store().load().unwrap();
    assert_eq!(stored.token, "persist-me");
    assert!(stored.created_at.is_some());
}

#[tokio::test]
async fn test_blank_login_response_is_an_error() {
    let server = MockServer::start().await;
    mount_login(&server, "  \n", 1).await;

    let dir = TempDir::new().unwrap();
    let manager = manager_for(&api_base(&server), &dir);

    let result = manager.authenticate(false).await;
    assert!(matches!(result, Err(AuthError::EmptyToken)));
    assert_eq!(manager.state().await, SessionState::NoToken);
    assert!(manager.store().load().is_none());
}

#[tokio::test]
async fn test_rejected_login_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/resto/api/auth"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = IikoConfig::builder()
        .base_url(BaseUrl::new(api_base(&server)).unwrap())
        .login(Login::new("admin").unwrap())
        .password(Password::new("secret").unwrap())
        .token_storage_path(dir.path().join(".iiko_token"))
        .max_retries(3)
        .retry_backoff(Duration::from_millis(10))
        .build()
        .unwrap();
    let http = HttpClient::new(&config).unwrap();
    let manager = SessionManager::new(Arc::new(config), Arc::new(http));

    match manager.authenticate(false).await {
        Err(AuthError::Http(e)) => assert_eq!(e.status(), Some(503)),
        other => panic!("expected HTTP error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_persisted_token_skips_login() {
    let server = MockServer::start().await;
    mount_login(&server, "unused", 0).await;

    let dir = TempDir::new().unwrap();
    TokenStore::new(dir.path().join(".iiko_token")).save("from-last-run");

    let manager = manager_for(&api_base(&server), &dir);
    assert_eq!(manager.get_token().await.unwrap(), "from-last-run");
}

// ============================================================================
// Validation and refresh
// ============================================================================

#[tokio::test]
async fn test_validate_reports_server_verdict() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/resto/api/corporation/organizations"))
        .and(query_param("key", "good"))
        .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/resto/api/corporation/organizations"))
        .and(query_param("key", "bad"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let good_dir = TempDir::new().unwrap();
    TokenStore::new(good_dir.path().join(".iiko_token")).save("good");
    assert!(manager_for(&api_base(&server), &good_dir).validate().await);

    let bad_dir = TempDir::new().unwrap();
    TokenStore::new(bad_dir.path().join(".iiko_token")).save("bad");
    assert!(!manager_for(&api_base(&server), &bad_dir).validate().await);
}

#[tokio::test]
async fn test_refresh_keeps_valid_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/resto/api/corporation/organizations"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    mount_login(&server, "unused", 0).await;

    let dir = TempDir::new().unwrap();
    TokenStore::new(dir.path().join(".iiko_token")).save("still-good");

    let manager = manager_for(&api_base(&server), &dir);
    assert_eq!(manager.refresh_if_needed().await.unwrap(), "still-good");
}

#[tokio::test]
async fn test_refresh_replaces_rejected_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/resto/api/corporation/organizations"))
        .and(query_param("key", "stale"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    mount_login(&server, "fresh", 1).await;

    let dir = TempDir::new().unwrap();
    TokenStore::new(dir.path().join(".iiko_token")).save("stale");

    let manager = manager_for(&api_base(&server), &dir);
    assert_eq!(manager.refresh_if_needed().await.unwrap(), "fresh");
    assert_eq!(manager.state().await, SessionState::Authenticated);
    assert_eq!(manager.store().load().unwrap().token, "fresh");
}

// ============================================================================
// Logout
// ============================================================================

#[tokio::test]
async fn test_logout_releases_token_on_server_and_disk() {
    let server = MockServer::start().await;
    mount_login(&server, "to-release", 1).await;
    Mock::given(method("GET"))
        .and(path("/resto/api/logout"))
        .and(query_param("key", "to-release"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let manager = manager_for(&api_base(&server), &dir);
    manager.get_token().await.unwrap();

    manager.logout().await;

    assert_eq!(manager.state().await, SessionState::NoToken);
    assert!(manager.token().await.is_none());
    assert!(!dir.path().join(".iiko_token").exists());
}

#[tokio::test]
async fn test_logout_clears_token_when_server_is_unreachable() {
    let dir = TempDir::new().unwrap();
    TokenStore::new(dir.path().join(".iiko_token")).save("orphaned");

    // Nothing listens on port 1
    let manager = manager_for("http://127.0.0.1:1/resto/api", &dir);
    assert!(manager.is_authenticated().await);

    manager.logout().await;

    assert_eq!(manager.state().await, SessionState::NoToken);
    assert!(manager.store().load().is_none());
}
