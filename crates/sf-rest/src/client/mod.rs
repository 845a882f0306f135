//! Salesforce REST API client.
//!
//! The client wraps any [`Transport`] (by default the reqwest-backed
//! [`SalesforceClient`] from `sfkit-client`) together with an immutable
//! [`ServiceConfig`], and provides typed methods for the REST API:
//! batched collections, paginated queries, single-record CRUD and describe.

use sfkit_client::{ClientConfig, SalesforceClient, TokenSource, Transport};

use crate::config::{BatchLogger, ServiceConfig};
use crate::error::Result;

mod collections;
mod crud;
mod describe;
mod query;

/// Salesforce REST API client.
///
/// # Example
///
/// ```rust,ignore
/// use sfkit_rest::{RecordMap, SalesforceRestClient};
/// use tokio_util::sync::CancellationToken;
///
/// let client = SalesforceRestClient::new("https://myorg.my.salesforce.com", "token")?
///     .with_batch_size(100);
/// let cancel = CancellationToken::new();
///
/// let contacts = vec![RecordMap::new("Contact").with("LastName", "Smith")];
/// let results = client.create_records(&cancel, false, &contacts).await?;
///
/// let mut rows: Vec<serde_json::Value> = Vec::new();
/// client.query(&cancel, "SELECT Id FROM Contact", &mut rows).await?;
/// ```
#[derive(Debug, Clone)]
pub struct SalesforceRestClient<T = SalesforceClient> {
    transport: T,
    config: ServiceConfig,
}

impl SalesforceRestClient<SalesforceClient> {
    /// Create a new REST client with the given instance URL and access token.
    pub fn new(instance_url: impl Into<String>, access_token: impl Into<String>) -> Result<Self> {
        let client = SalesforceClient::new(instance_url, access_token)?;
        Ok(Self::from_client(client))
    }

    /// Create a new REST client with custom HTTP configuration.
    pub fn with_config(
        instance_url: impl Into<String>,
        access_token: impl Into<String>,
        config: ClientConfig,
    ) -> Result<Self> {
        let client = SalesforceClient::with_config(instance_url, access_token, config)?;
        Ok(Self::from_client(client))
    }

    /// Create a REST client that asks `tokens` for a bearer token on every call.
    pub fn with_token_source(
        instance_url: impl Into<String>,
        tokens: impl TokenSource + 'static,
        config: ClientConfig,
    ) -> Result<Self> {
        let client = SalesforceClient::with_token_source(instance_url, tokens, config)?;
        Ok(Self::from_client(client))
    }

    /// Create a REST client from an existing SalesforceClient.
    pub fn from_client(client: SalesforceClient) -> Self {
        Self::from_transport(client)
    }

    pub fn instance_url(&self) -> &str {
        self.transport.instance_url()
    }

    pub fn api_version(&self) -> &str {
        self.transport.api_version()
    }

    /// Set the API version.
    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.transport = self.transport.with_api_version(version);
        self
    }
}

impl<T: Transport> SalesforceRestClient<T> {
    /// Wrap any transport with the default service settings.
    pub fn from_transport(transport: T) -> Self {
        Self {
            transport,
            config: ServiceConfig::default(),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// The settings every call starts from.
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn with_service_config(mut self, config: ServiceConfig) -> Self {
        self.config = config;
        self
    }

    /// Records per collection request, rows per query page. 0 uses the
    /// largest size the API allows.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.config = self.config.with_batch_size(batch_size);
        self
    }

    /// Stop queries after this many rows. 0 removes the cap.
    pub fn with_max_rows(mut self, max_rows: usize) -> Self {
        self.config = self.config.with_max_rows(max_rows);
        self
    }

    /// Call `logger` after every collection batch.
    pub fn with_logger(mut self, logger: impl BatchLogger + 'static) -> Self {
        self.config = self.config.with_logger(logger);
        self
    }
}
