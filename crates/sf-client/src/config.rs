//! Transport settings shared by every API client built on [`SalesforceClient`](crate::SalesforceClient).

use crate::retry::RetryConfig;
use std::time::Duration;

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(90);
const DEFAULT_MAX_IDLE_PER_HOST: usize = 10;

/// Settings for the HTTP layer under the REST and Bulk clients.
///
/// Values are read once, when the client is built.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// `None` disables retries.
    pub retry: Option<RetryConfig>,
    /// Accept gzip and deflate encoded bodies.
    pub compression: bool,
    /// Whole-request timeout, body included.
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
    /// How long an idle pooled connection is kept.
    pub idle_timeout: Duration,
    pub max_idle_per_host: usize,
    pub user_agent: String,
    /// Sent as `Sforce-Call-Options: client=<name>`.
    pub client_name: Option<String>,
    /// Emit a debug event per request and response.
    pub log_requests: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            retry: Some(RetryConfig::default()),
            compression: true,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            max_idle_per_host: DEFAULT_MAX_IDLE_PER_HOST,
            user_agent: crate::USER_AGENT.to_string(),
            client_name: None,
            log_requests: true,
        }
    }
}

impl ClientConfig {
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// The `Sforce-Call-Options` value, if a client name is set.
    pub fn call_options(&self) -> Option<String> {
        self.client_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .map(|name| format!("client={name}"))
    }
}

/// Builder for [`ClientConfig`].
#[derive(Debug, Default)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.config.retry = Some(retry);
        self
    }

    pub fn without_retry(mut self) -> Self {
        self.config.retry = None;
        self
    }

    pub fn with_compression(mut self, enabled: bool) -> Self {
        self.config.compression = enabled;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.config.idle_timeout = timeout;
        self
    }

    pub fn with_max_idle_per_host(mut self, max: usize) -> Self {
        self.config.max_idle_per_host = max;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Name this integration in `Sforce-Call-Options` on every call.
    pub fn with_client_name(mut self, name: impl Into<String>) -> Self {
        self.config.client_name = Some(name.into());
        self
    }

    pub fn with_request_logging(mut self, enabled: bool) -> Self {
        self.config.log_requests = enabled;
        self
    }

    pub fn build(self) -> ClientConfig {
        self.config
    }
}
