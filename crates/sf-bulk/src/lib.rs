//! # sfkit-bulk
//!
//! Salesforce Bulk API 2.0 client for large-scale data operations.
//!
//! ## Features
//!
//! - **Ingest Jobs** - Insert, Update, Upsert, Delete, Hard Delete from CSV
//! - **Query Jobs** - Query and QueryAll with results paged by `Sforce-Locator`
//! - **Job Management** - Create, close, abort, delete, poll and list jobs
//! - **CSV Results** - raw result files, or rows decoded through serde
//!
//! ## Example - Bulk Insert
//!
//! ```rust,ignore
//! use sfkit_bulk::{BulkApiClient, BulkOperation, JobDefinition};
//! use sfkit_client::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), sfkit_bulk::Error> {
//!     let client = BulkApiClient::new(
//!         "https://myorg.my.salesforce.com",
//!         "access_token",
//!     )?;
//!
//!     let csv_data = "Name,Industry\nAcme Corp,Technology\nGlobal Inc,Finance\n";
//!     let result = client
//!         .execute_ingest(
//!             &CancellationToken::new(),
//!             &JobDefinition::new("Account", BulkOperation::Insert),
//!             csv_data,
//!         )
//!         .await?;
//!
//!     println!("Processed {} records", result.job.number_records_processed);
//!     Ok(())
//! }
//! ```

mod client;
mod error;
mod types;

pub use client::{parse_csv, BulkApiClient};
pub use error::{Error, ErrorKind, Result};
pub use types::{
    BulkOperation, BulkQuery, ColumnDelimiter, FailedRecord, IngestJobResult, Job, JobDefinition,
    JobList, JobState, LineEnding, QueryJobResult, QueryResults, SuccessfulRecord,
};
