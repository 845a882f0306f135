//! Authenticated Salesforce transport.
//!
//! `SalesforceClient` resolves API paths against the org's instance URL,
//! asks its [`TokenSource`] for a bearer token on every call and races the
//! HTTP exchange against the caller's cancellation token.
//!
//! ## Security
//!
//! - Tokens never appear in Debug output
//! - Request bodies and tokens are skipped in tracing spans

use bytes::Bytes;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use crate::client::SfHttpClient;
use crate::config::ClientConfig;
use crate::error::{Error, ErrorKind, Result};
use crate::request::RequestBuilder;
use crate::response::Response;
use crate::token::{StaticToken, TokenSource};
use crate::transport::Transport;
use crate::DEFAULT_API_VERSION;

/// Salesforce API client bound to one org.
///
/// # Example
///
/// ```rust,ignore
/// use sfkit_client::{SalesforceClient, StaticToken, ClientConfig};
///
/// let client = SalesforceClient::with_token_source(
///     "https://myorg.my.salesforce.com",
///     StaticToken::new(std::env::var("SF_ACCESS_TOKEN")?),
///     ClientConfig::default(),
/// )?;
/// ```
#[derive(Clone)]
pub struct SalesforceClient {
    http: SfHttpClient,
    instance_url: String,
    api_version: String,
    tokens: Arc<dyn TokenSource>,
}

impl std::fmt::Debug for SalesforceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SalesforceClient")
            .field("instance_url", &self.instance_url)
            .field("api_version", &self.api_version)
            .finish_non_exhaustive()
    }
}

impl SalesforceClient {
    /// Client using a fixed access token and default configuration.
    pub fn new(instance_url: impl Into<String>, access_token: impl Into<String>) -> Result<Self> {
        Self::with_config(instance_url, access_token, ClientConfig::default())
    }

    /// Client using a fixed access token.
    pub fn with_config(
        instance_url: impl Into<String>,
        access_token: impl Into<String>,
        config: ClientConfig,
    ) -> Result<Self> {
        Self::with_token_source(instance_url, StaticToken::new(access_token), config)
    }

    /// Client drawing tokens from `tokens` on every call.
    pub fn with_token_source(
        instance_url: impl Into<String>,
        tokens: impl TokenSource + 'static,
        config: ClientConfig,
    ) -> Result<Self> {
        let instance_url = instance_url.into().trim_end_matches('/').to_string();
        url::Url::parse(&instance_url)?;
        Ok(Self {
            http: SfHttpClient::new(config)?,
            instance_url,
            api_version: DEFAULT_API_VERSION.to_string(),
            tokens: Arc::new(tokens),
        })
    }

    /// Set the API version (e.g. "62.0").
    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }

    pub fn instance_url(&self) -> &str {
        &self.instance_url
    }

    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    /// Versioned REST URL, e.g. `rest_url("composite/sobjects")`.
    pub fn rest_url(&self, path: &str) -> String {
        format!(
            "{}/services/data/v{}/{}",
            self.instance_url,
            self.api_version,
            path.trim_start_matches('/')
        )
    }

    /// Resolve a request target.
    ///
    /// Absolute URLs pass through, `/`-prefixed paths are instance-relative
    /// (the form `nextRecordsUrl` takes) and anything else is relative to
    /// the versioned REST root.
    pub fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else if path.starts_with('/') {
            format!("{}{}", self.instance_url, path)
        } else {
            self.rest_url(path)
        }
    }

    /// Send `request` and hand back the successful response with its
    /// headers, for endpoints that page through them (`Sforce-Locator`).
    pub async fn call_response(
        &self,
        cancel: &CancellationToken,
        request: RequestBuilder,
    ) -> Result<Response> {
        cancelable(cancel, self.send(request)).await
    }

    #[instrument(skip_all, fields(method = %request.method(), path = %request.url()))]
    async fn send(&self, mut request: RequestBuilder) -> Result<Response> {
        let token = self.tokens.token().await?;
        request.url = self.url(&request.url);
        request.bearer_token = Some(token.secret().to_string());

        let response = self.http.execute(&request).await?;
        if let Some(usage) = response.api_usage() {
            debug!(used = usage.used, limit = usage.limit, "API usage");
        }
        Ok(response)
    }
}

async fn cancelable<R>(
    cancel: &CancellationToken,
    work: impl std::future::Future<Output = Result<R>>,
) -> Result<R> {
    if cancel.is_cancelled() {
        return Err(Error::new(ErrorKind::Cancelled));
    }
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Error::new(ErrorKind::Cancelled)),
        result = work => result,
    }
}

impl Transport for SalesforceClient {
    async fn call(&self, cancel: &CancellationToken, request: RequestBuilder) -> Result<Bytes> {
        cancelable(cancel, async { self.send(request).await?.bytes().await }).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::RequestMethod;
    use std::time::Duration;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> SalesforceClient {
        SalesforceClient::with_config(
            server.uri(),
            "test-token",
            ClientConfig::builder().without_retry().build(),
        )
        .unwrap()
    }

    #[test]
    fn test_url_resolution() {
        let client = SalesforceClient::new("https://na1.salesforce.com/", "token").unwrap();

        assert_eq!(client.instance_url(), "https://na1.salesforce.com");
        assert_eq!(
            client.url("composite/sobjects"),
            "https://na1.salesforce.com/services/data/v62.0/composite/sobjects"
        );
        assert_eq!(
            client.url("/services/data/v62.0/query/01gD0000002HU6KIAW-2000"),
            "https://na1.salesforce.com/services/data/v62.0/query/01gD0000002HU6KIAW-2000"
        );
        assert_eq!(client.url("https://other.com/path"), "https://other.com/path");
    }

    #[test]
    fn test_api_version() {
        let client = SalesforceClient::new("https://na1.salesforce.com", "token")
            .unwrap()
            .with_api_version("60.0");

        assert_eq!(client.api_version(), "60.0");
        assert_eq!(
            client.rest_url("limits"),
            "https://na1.salesforce.com/services/data/v60.0/limits"
        );
    }

    #[test]
    fn test_invalid_instance_url() {
        let err = SalesforceClient::new("not a url", "token").unwrap_err();
        assert!(matches!(err.kind, ErrorKind::InvalidUrl(_)));
    }

    #[test]
    fn test_debug_hides_token() {
        let client = SalesforceClient::new("https://na1.salesforce.com", "super-secret").unwrap();
        assert!(!format!("{:?}", client).contains("super-secret"));
    }

    #[tokio::test]
    async fn test_call_injects_token_and_resolves_path() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/services/data/v62.0/query/"))
            .and(query_param("q", "SELECT Id FROM Account"))
            .and(header("Authorization", "Bearer test-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "totalSize": 0, "done": true, "records": []
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let request =
            RequestBuilder::new(RequestMethod::Get, "query/").query("q", "SELECT Id FROM Account");
        let body: serde_json::Value = client
            .call_json(&CancellationToken::new(), request)
            .await
            .unwrap();

        assert_eq!(body["done"], true);
    }

    #[tokio::test]
    async fn test_call_surfaces_salesforce_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/services/data/v62.0/composite/sobjects"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!([{
                "errorCode": "JSON_PARSER_ERROR",
                "message": "Unexpected character"
            }])))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let request = RequestBuilder::new(RequestMethod::Post, "composite/sobjects")
            .json_value(serde_json::json!({"allOrNone": false, "records": []}));

        let err = client
            .call(&CancellationToken::new(), request)
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(400));
    }

    #[tokio::test]
    async fn test_cancelled_before_call_sends_nothing() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = client_for(&server)
            .call(&cancel, RequestBuilder::new(RequestMethod::Get, "limits"))
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
    }

    #[tokio::test]
    async fn test_cancel_interrupts_in_flight_call() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(30)))
            .mount(&server)
            .await;

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let err = tokio::time::timeout(
            Duration::from_secs(5),
            client_for(&server).call(&cancel, RequestBuilder::new(RequestMethod::Get, "limits")),
        )
        .await
        .unwrap()
        .unwrap_err();
        assert!(err.is_cancelled());
    }

    #[tokio::test]
    async fn test_call_response_exposes_locator() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/services/data/v62.0/jobs/query/750xx/results"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("Sforce-Locator", "MTAwMDA")
                    .set_body_string("Id\n001xx\n"),
            )
            .mount(&server)
            .await;

        let response = client_for(&server)
            .call_response(
                &CancellationToken::new(),
                RequestBuilder::new(RequestMethod::Get, "jobs/query/750xx/results").accept_csv(),
            )
            .await
            .unwrap();
        assert_eq!(response.sforce_locator(), Some("MTAwMDA"));
        assert_eq!(response.text().await.unwrap(), "Id\n001xx\n");
    }
}
