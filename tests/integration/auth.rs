//! Token sources driving the REST client against a mock login endpoint.

use serde_json::{json, Value};
use sfkit::auth::{
    CachingTokenSource, FileTokenCache, JwtAuth, OAuthClient, OAuthConfig, PasswordFlow,
    SalesforceCredentials, TokenCache,
};
use sfkit::rest::SalesforceRestClient;
use sfkit::CancellationToken;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::common::{contact_page, init_tracing, no_retry, API};

const TEST_KEY: &[u8] = include_bytes!("../../crates/sf-auth/src/testdata/test_key.pem");

fn token_body(token: &str, instance_url: &str) -> Value {
    json!({
        "access_token": token,
        "instance_url": instance_url,
        "token_type": "Bearer",
        "issued_at": "1700000000000"
    })
}

async fn mount_query(server: &MockServer, token: &str, times: u64) {
    Mock::given(method("GET"))
        .and(path(format!("{API}/query/")))
        .and(header("Authorization", format!("Bearer {token}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(contact_page(0, 3, 3, None)))
        .expect(times)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_password_login_happens_once() {
    init_tracing();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/services/oauth2/token"))
        .and(body_string_contains("grant_type=password"))
        .and(body_string_contains("client_id=consumer"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("pw-token", &server.uri())))
        .expect(1)
        .mount(&server)
        .await;
    mount_query(&server, "pw-token", 2).await;

    let flow = PasswordFlow::new(
        OAuthClient::new(OAuthConfig::new("consumer").with_secret("shh")),
        server.uri(),
        "integration@example.com",
        "passwordTOKEN",
    );
    let client = SalesforceRestClient::with_token_source(
        server.uri(),
        CachingTokenSource::new(flow),
        no_retry(),
    )
    .unwrap();

    let cancel = CancellationToken::new();
    for _ in 0..2 {
        let rows: Vec<Value> = client.query_all(&cancel, "SELECT Id FROM Contact").await.unwrap();
        assert_eq!(rows.len(), 3);
    }
}

#[tokio::test]
async fn test_file_cache_is_shared_between_sources() {
    init_tracing();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/services/oauth2/token"))
        .and(body_string_contains("grant_type=urn%3Aietf%3Aparams%3Aoauth%3Agrant-type%3Ajwt-bearer"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("jwt-token", &server.uri())))
        .expect(1)
        .mount(&server)
        .await;
    mount_query(&server, "jwt-token", 2).await;

    let dir = tempfile::tempdir().unwrap();
    let cache_path = dir.path().join("tokens").join("org.json");
    let cancel = CancellationToken::new();

    for _ in 0..2 {
        let auth = JwtAuth::new("consumer", "integration@example.com", TEST_KEY)
            .unwrap()
            .with_login_url(server.uri());
        let source = CachingTokenSource::new(auth).with_cache(FileTokenCache::new(&cache_path));
        let client = SalesforceRestClient::with_token_source(server.uri(), source, no_retry())
            .unwrap();
        let rows: Vec<Value> = client.query_all(&cancel, "SELECT Id FROM Contact").await.unwrap();
        assert_eq!(rows.len(), 3);
    }

    let stored = FileTokenCache::new(&cache_path).load().unwrap().unwrap();
    assert_eq!(stored.secret(), "jwt-token");
}

#[tokio::test]
async fn test_refresh_flow_from_credentials() {
    init_tracing();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/services/oauth2/token"))
        .and(body_string_contains("refresh_token=5Aep861"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("fresh", &server.uri())))
        .expect(1)
        .mount(&server)
        .await;
    mount_query(&server, "fresh", 1).await;

    let creds = SalesforceCredentials::new(server.uri(), "stale", "62.0").with_refresh_token("5Aep861");
    let flow = creds
        .refresh_flow(OAuthConfig::new("consumer"), &server.uri())
        .unwrap();
    let client = SalesforceRestClient::with_token_source(
        creds.instance_url(),
        CachingTokenSource::new(flow),
        no_retry(),
    )
    .unwrap();

    let rows: Vec<Value> = client
        .query_all(&CancellationToken::new(), "SELECT Id FROM Contact")
        .await
        .unwrap();
    assert_eq!(rows.len(), 3);
}

#[tokio::test]
async fn test_rejected_login_fails_the_call() {
    init_tracing();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/services/oauth2/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "authentication failure"
        })))
        .mount(&server)
        .await;
    mount_query(&server, "never", 0).await;

    let flow = PasswordFlow::new(
        OAuthClient::new(OAuthConfig::new("consumer")),
        server.uri(),
        "integration@example.com",
        "wrong",
    );
    let client =
        SalesforceRestClient::with_token_source(server.uri(), flow, no_retry()).unwrap();

    let err = client
        .query_all::<Value>(&CancellationToken::new(), "SELECT Id FROM Contact")
        .await
        .unwrap_err();
    assert!(err.to_string().contains("invalid_grant"));
}
