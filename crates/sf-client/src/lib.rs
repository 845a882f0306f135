//! # sfkit-client
//!
//! HTTP transport shared by the sfkit API crates.
//!
//! This crate provides:
//! - A [`Transport`] abstraction: one authenticated call per invocation,
//!   cancellable through a [`CancellationToken`]
//! - A [`TokenSource`] abstraction supplying bearer tokens
//! - [`SalesforceClient`], the reqwest-backed implementation of both seams
//! - Retry with exponential backoff and jitter for idempotent requests
//! - Salesforce error body parsing with message sanitization
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │        sfkit-rest (collections, query)   sfkit-bulk         │
//! └─────────────────────────────────────────────────────────────┘
//!                              │  Transport::call
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   SalesforceClient                          │
//! │  - Resolves API paths against the instance URL              │
//! │  - Injects bearer tokens from a TokenSource                 │
//! │  - Races each call against the cancellation token           │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    SfHttpClient                             │
//! │  - Raw HTTP with retry, compression, rate limiting          │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use sfkit_client::{RequestBuilder, RequestMethod, SalesforceClient, Transport};
//! use tokio_util::sync::CancellationToken;
//!
//! let client = SalesforceClient::new("https://myorg.my.salesforce.com", "token")?;
//! let cancel = CancellationToken::new();
//!
//! let limits: serde_json::Value = client
//!     .call_json(&cancel, RequestBuilder::new(RequestMethod::Get, "limits"))
//!     .await?;
//! ```

mod client;
mod config;
mod error;
mod request;
mod response;
mod retry;
mod salesforce_client;
pub mod security;
mod token;
mod transport;

pub use client::SfHttpClient;
pub use config::{ClientConfig, ClientConfigBuilder};
pub use error::{Error, ErrorKind, Result};
pub use request::{RequestBody, RequestBuilder, RequestMethod};
pub use response::{ApiUsage, Response, ResponseExt};
pub use retry::{BackoffStrategy, RetryConfig};
pub use salesforce_client::SalesforceClient;
pub use token::{AccessToken, StaticToken, TokenSource};
pub use transport::Transport;

pub use tokio_util::sync::CancellationToken;

/// Default Salesforce API version
pub const DEFAULT_API_VERSION: &str = "62.0";

/// User-Agent string for the client
pub const USER_AGENT: &str = concat!("sfkit/", env!("CARGO_PKG_VERSION"));
