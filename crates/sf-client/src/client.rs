//! Raw HTTP client with retry and Salesforce error classification.

use tracing::{debug, info, instrument, warn};

use crate::config::ClientConfig;
use crate::error::{Error, ErrorKind, Result};
use crate::request::{RequestBody, RequestBuilder};
use crate::response::{parse_retry_after, Response, ResponseExt};

const CALL_OPTIONS: &str = "Sforce-Call-Options";

/// HTTP client executing fully resolved requests.
///
/// Requests passed to [`SfHttpClient::execute`] must carry an absolute URL;
/// [`SalesforceClient`](crate::SalesforceClient) does the resolution.
#[derive(Debug, Clone)]
pub struct SfHttpClient {
    inner: reqwest::Client,
    config: ClientConfig,
    call_options: Option<String>,
}

impl SfHttpClient {
    /// Create a new HTTP client.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let inner = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .pool_idle_timeout(config.idle_timeout)
            .pool_max_idle_per_host(config.max_idle_per_host)
            .user_agent(&config.user_agent)
            .gzip(config.compression)
            .deflate(config.compression)
            .build()
            .map_err(|e| Error::with_source(ErrorKind::Config(e.to_string()), e))?;

        Ok(Self {
            inner,
            call_options: config.call_options(),
            config,
        })
    }

    /// Create a new HTTP client with default configuration.
    pub fn default_client() -> Result<Self> {
        Self::new(ClientConfig::default())
    }

    /// Get the client configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Execute a request, retrying transient failures when the method allows.
    #[instrument(skip(self, request), fields(method = %request.method, url = %request.url))]
    pub async fn execute(&self, request: &RequestBuilder) -> Result<Response> {
        let retry = self
            .config
            .retry
            .as_ref()
            .filter(|retry| retry.allows(request.method));
        let mut attempt = 0;

        loop {
            let err = match self.execute_once(request).await {
                Ok(response) => match response.check_salesforce_error().await {
                    Ok(response) => return Ok(response),
                    Err(err) => err,
                },
                Err(err) => err,
            };

            let Some(retry) = retry.filter(|_| err.is_retryable()) else {
                return Err(err);
            };
            let Some(delay) = retry.delay_for(attempt, err.retry_after()) else {
                return Err(Error::with_source(
                    ErrorKind::RetriesExhausted {
                        attempts: attempt + 1,
                    },
                    err,
                ));
            };

            attempt += 1;
            warn!(
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "Request failed, retrying"
            );
            tokio::time::sleep(delay).await;
        }
    }

    async fn execute_once(&self, request: &RequestBuilder) -> Result<Response> {
        let mut req = self
            .inner
            .request(request.method.to_reqwest(), &request.url);

        if let Some(ref token) = request.bearer_token {
            req = req.bearer_auth(token);
        }
        if let Some(ref options) = self.call_options {
            if request.header_value(CALL_OPTIONS).is_none() {
                req = req.header(CALL_OPTIONS, options.as_str());
            }
        }
        for (name, value) in &request.headers {
            req = req.header(name.as_str(), value.as_str());
        }
        if !request.query_params.is_empty() {
            req = req.query(&request.query_params);
        }
        if let Some(ref body) = request.body {
            req = match body {
                RequestBody::Json(value) => req.json(value),
                RequestBody::Text(text) => req.body(text.clone()),
                RequestBody::Bytes(bytes) => req.body(bytes.clone()),
                RequestBody::Form(data) => req.form(data),
            };
        }

        if self.config.log_requests {
            debug!("Sending request");
        }

        let response = req.send().await?;
        let status = response.status().as_u16();

        if self.config.log_requests {
            let content_length = response.content_length();
            if response.status().is_success() {
                debug!(status, content_length, "Response received");
            } else {
                info!(status, content_length, "Non-success response");
            }
        }

        if status == 429 {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(parse_retry_after);
            return Err(Error::new(ErrorKind::RateLimited { retry_after }));
        }

        if matches!(status, 500 | 502 | 503 | 504) {
            return Err(Error::new(ErrorKind::Http {
                status,
                message: format!("Server error: {}", status),
            }));
        }

        Ok(Response::new(response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::RequestMethod;
    use crate::retry::RetryConfig;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fast_retry() -> RetryConfig {
        RetryConfig::default()
            .with_max_attempts(3)
            .with_initial_delay(Duration::from_millis(10))
    }

    fn counting(fail_first: u32, status: u16) -> (Arc<AtomicU32>, impl wiremock::Respond) {
        let calls = Arc::new(AtomicU32::new(0));
        let seen = calls.clone();
        let responder = move |_: &wiremock::Request| {
            if seen.fetch_add(1, Ordering::SeqCst) < fail_first {
                ResponseTemplate::new(status)
            } else {
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"success": true}))
            }
        };
        (calls, responder)
    }

    #[tokio::test]
    async fn test_successful_request() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/test"))
            .and(header("Authorization", "Bearer test-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": true
            })))
            .mount(&mock_server)
            .await;

        let client = SfHttpClient::new(ClientConfig::builder().without_retry().build()).unwrap();
        let request = RequestBuilder::new(RequestMethod::Get, format!("{}/test", mock_server.uri()))
            .bearer_auth("test-token");

        let response = client.execute(&request).await.unwrap();
        assert!(response.is_success());
    }

    #[tokio::test]
    async fn test_client_name_sent_as_call_options() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/named"))
            .and(header("Sforce-Call-Options", "client=NightlyLoader"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&mock_server)
            .await;

        let config = ClientConfig::builder()
            .without_retry()
            .with_client_name("NightlyLoader")
            .build();
        let client = SfHttpClient::new(config).unwrap();
        let request = RequestBuilder::new(RequestMethod::Get, format!("{}/named", mock_server.uri()));

        assert!(client.execute(&request).await.unwrap().is_success());
    }

    #[tokio::test]
    async fn test_salesforce_error_response() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/error"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!([{
                "errorCode": "INVALID_FIELD",
                "message": "No such column 'foo' on entity 'Account'",
                "fields": ["foo"]
            }])))
            .mount(&mock_server)
            .await;

        let client = SfHttpClient::new(ClientConfig::builder().without_retry().build()).unwrap();
        let request = RequestBuilder::new(RequestMethod::Get, format!("{}/error", mock_server.uri()));

        let err = client.execute(&request).await.unwrap_err();
        assert!(matches!(err.kind, ErrorKind::SalesforceApi { status: 400, .. }));
    }

    #[tokio::test]
    async fn test_locked_row_is_retried() {
        let mock_server = MockServer::start().await;
        let calls = Arc::new(AtomicU32::new(0));
        let seen = calls.clone();

        Mock::given(method("GET"))
            .and(path("/locked"))
            .respond_with(move |_: &wiremock::Request| {
                if seen.fetch_add(1, Ordering::SeqCst) == 0 {
                    ResponseTemplate::new(400).set_body_json(serde_json::json!([{
                        "errorCode": "UNABLE_TO_LOCK_ROW",
                        "message": "unable to obtain exclusive access to this record"
                    }]))
                } else {
                    ResponseTemplate::new(200).set_body_json(serde_json::json!({"success": true}))
                }
            })
            .mount(&mock_server)
            .await;

        let client = SfHttpClient::new(ClientConfig::builder().with_retry(fast_retry()).build())
            .unwrap();
        let request = RequestBuilder::new(RequestMethod::Get, format!("{}/locked", mock_server.uri()));

        assert!(client.execute(&request).await.unwrap().is_success());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_rate_limiting() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/limited"))
            .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "30"))
            .mount(&mock_server)
            .await;

        let client = SfHttpClient::new(ClientConfig::builder().without_retry().build()).unwrap();
        let request =
            RequestBuilder::new(RequestMethod::Get, format!("{}/limited", mock_server.uri()));

        let err = client.execute(&request).await.unwrap_err();
        assert!(err.is_rate_limited());
        assert_eq!(err.retry_after(), Some(Duration::from_secs(30)));
    }

    #[tokio::test]
    async fn test_retry_on_503() {
        let mock_server = MockServer::start().await;
        let (calls, responder) = counting(2, 503);

        Mock::given(method("GET"))
            .and(path("/retry"))
            .respond_with(responder)
            .mount(&mock_server)
            .await;

        let client = SfHttpClient::new(ClientConfig::builder().with_retry(fast_retry()).build())
            .unwrap();
        let request = RequestBuilder::new(RequestMethod::Get, format!("{}/retry", mock_server.uri()));

        let response = client.execute(&request).await.unwrap();
        assert!(response.is_success());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retries_exhausted() {
        let mock_server = MockServer::start().await;
        let (calls, responder) = counting(u32::MAX, 502);

        Mock::given(method("GET"))
            .and(path("/down"))
            .respond_with(responder)
            .mount(&mock_server)
            .await;

        let client = SfHttpClient::new(ClientConfig::builder().with_retry(fast_retry()).build())
            .unwrap();
        let request = RequestBuilder::new(RequestMethod::Get, format!("{}/down", mock_server.uri()));

        let err = client.execute(&request).await.unwrap_err();
        assert!(matches!(err.kind, ErrorKind::RetriesExhausted { attempts: 4 }));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_post_is_not_retried() {
        let mock_server = MockServer::start().await;
        let (calls, responder) = counting(1, 503);

        Mock::given(method("POST"))
            .and(path("/composite/sobjects"))
            .respond_with(responder)
            .mount(&mock_server)
            .await;

        let client = SfHttpClient::new(ClientConfig::builder().with_retry(fast_retry()).build())
            .unwrap();
        let request = RequestBuilder::new(
            RequestMethod::Post,
            format!("{}/composite/sobjects", mock_server.uri()),
        )
        .json_value(serde_json::json!({"allOrNone": false, "records": []}));

        let err = client.execute(&request).await.unwrap_err();
        assert!(matches!(err.kind, ErrorKind::Http { status: 503, .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
