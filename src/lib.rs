//! # sfkit
//!
//! Salesforce REST and Bulk API client library for Rust.
//!
//! ## Security
//!
//! - Sensitive data (tokens, secrets) are redacted in Debug output
//! - Tracing/logging skips credential parameters
//! - Error messages sanitize any credential data
//!
//! ## Crates
//!
//! - **sfkit-client** - HTTP transport: token injection, retry, cancellation, error mapping
//! - **sfkit-auth** - Token sources: static session, OAuth password and refresh, JWT Bearer, caching
//! - **sfkit-rest** - REST API: batched collections, paginated SOQL, CRUD, Describe
//! - **sfkit-bulk** - Bulk API 2.0: ingest and query jobs
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use sfkit::auth::SalesforceCredentials;
//! use sfkit::rest::{filter_failures, RecordMap, SalesforceRestClient};
//! use sfkit::{CancellationToken, ClientConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let creds = SalesforceCredentials::from_env()?;
//!     let client = SalesforceRestClient::from_client(creds.client(ClientConfig::default())?);
//!     let cancel = CancellationToken::new();
//!
//!     let accounts: Vec<serde_json::Value> = client
//!         .query_all(&cancel, "SELECT Id, Name FROM Account LIMIT 10")
//!         .await?;
//!
//!     let contacts: Vec<RecordMap> = accounts
//!         .iter()
//!         .map(|a| RecordMap::new("Contact").with("LastName", "Doe").with("AccountId", a["Id"].clone()))
//!         .collect();
//!     let results = client.create_records(&cancel, false, &contacts).await?;
//!     for failed in filter_failures(&results, &contacts) {
//!         eprintln!("contact {} failed: {:?}", failed.index, failed.result.errors);
//!     }
//!
//!     Ok(())
//! }
//! ```

#[cfg(feature = "auth")]
pub use sfkit_auth as auth;
#[cfg(feature = "bulk")]
pub use sfkit_bulk as bulk;
#[cfg(feature = "client")]
pub use sfkit_client as client;
#[cfg(feature = "rest")]
pub use sfkit_rest as rest;

#[cfg(feature = "auth")]
pub use sfkit_auth::SalesforceCredentials;
#[cfg(feature = "bulk")]
pub use sfkit_bulk::BulkApiClient;
#[cfg(feature = "client")]
pub use sfkit_client::{CancellationToken, ClientConfig, SalesforceClient, TokenSource};
#[cfg(feature = "rest")]
pub use sfkit_rest::SalesforceRestClient;
