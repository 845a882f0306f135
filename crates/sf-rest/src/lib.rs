//! # sfkit-rest
//!
//! Salesforce REST API client built around batched SObject Collections and
//! paginated SOQL.
//!
//! ## Features
//!
//! - **Collections** - create, update, upsert and delete any number of
//!   records, split into requests of at most 200, with an optional logger
//!   called after every batch
//! - **Result aggregation** - one outcome per record in input order, and
//!   [`filter_failures`] to pair failed outcomes with their records
//! - **SOQL Query** - follows `nextRecordsUrl` until done or a row cap,
//!   decoding each page straight into the caller's [`RecordSink`]
//! - **CRUD** - single-record create, get, update, upsert, delete and
//!   multi-record retrieve
//! - **Relationships and blobs** - read, update or detach related records,
//!   and download attachment bodies as raw bytes
//! - **Describe** - object metadata and the deleted/updated change feeds
//!
//! Every operation takes a [`CancellationToken`](sfkit_client::CancellationToken)
//! and runs over any [`Transport`](sfkit_client::Transport).
//!
//! ## Example
//!
//! ```rust,ignore
//! use sfkit_rest::{filter_failures, RecordMap, SalesforceRestClient};
//! use sfkit_client::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), sfkit_rest::Error> {
//!     let client = SalesforceRestClient::new(
//!         "https://myorg.my.salesforce.com",
//!         "access_token_here",
//!     )?
//!     .with_batch_size(100);
//!     let cancel = CancellationToken::new();
//!
//!     let contacts: Vec<RecordMap> = (0..500)
//!         .map(|i| RecordMap::new("Contact").with("LastName", format!("Smith {i}")))
//!         .collect();
//!     let results = client.create_records(&cancel, false, &contacts).await?;
//!     for failed in filter_failures(&results, &contacts) {
//!         eprintln!("record {} failed: {:?}", failed.index, failed.result.errors);
//!     }
//!
//!     let mut rows: Vec<serde_json::Value> = Vec::new();
//!     client
//!         .query(&cancel, "SELECT Id, LastName FROM Contact", &mut rows)
//!         .await?;
//!
//!     Ok(())
//! }
//! ```

pub mod batch;
mod client;
mod collections;
mod config;
mod describe;
mod error;
mod query;
mod sobject;
mod types;

// Main client
pub use client::SalesforceRestClient;

// Collection operations
pub use batch::batches;
pub use collections::{
    filter_failures, filter_failures_from, CollectionError, CollectionOutcome, CollectionRequest,
    CollectionResult, FailedRecord,
};

// Service settings and the batch logger
pub use config::{BatchLog, BatchLogger, BoxError, CallKind, ServiceConfig};

// Describe types
pub use describe::{
    ChildRelationship, DeletedRecord, DescribeGlobalResult, DescribeSObjectResult, FieldDescribe,
    GetDeletedResult, GetUpdatedResult, PicklistValue, RecordTypeInfo, SObjectSummary,
};

// Error types
pub use error::{Error, ErrorKind, Result};

// Query types
pub use query::{QuerySummary, RecordSink};

// SObject types
pub use sobject::{
    Attributes, CreateResult, DeleteId, RecordMap, SObject, SalesforceError, UpsertResult,
};

// Field wrappers
pub use types::{Binary, Date, Datetime, Time};

// Re-export sf-client types that users might need
pub use sfkit_client::{CancellationToken, ClientConfig, ClientConfigBuilder, Transport};
