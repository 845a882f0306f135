//! Types for Bulk API 2.0.

use serde::{Deserialize, Deserializer, Serialize};

/// Deserialize API version that can be either a float (59.0) or string ("59.0").
pub(crate) fn deserialize_api_version<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum ApiVersion {
        Float(f64),
        String(String),
    }

    Option::<ApiVersion>::deserialize(deserializer).map(|opt| {
        opt.map(|v| match v {
            ApiVersion::Float(f) => format!("{:.1}", f),
            ApiVersion::String(s) => s,
        })
    })
}

/// Bulk API 2.0 job states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobState {
    /// Job is open and accepting data
    Open,
    /// Upload is complete, job is ready for processing
    UploadComplete,
    InProgress,
    Aborted,
    JobComplete,
    Failed,
}

impl JobState {
    /// Check if job is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobState::Aborted | JobState::JobComplete | JobState::Failed
        )
    }

    pub fn is_success(&self) -> bool {
        matches!(self, JobState::JobComplete)
    }
}

/// Bulk API 2.0 operation types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BulkOperation {
    Insert,
    Update,
    /// Upsert based on external ID
    Upsert,
    /// Delete records (soft delete)
    Delete,
    /// Hard delete records (permanent)
    HardDelete,
    Query,
    /// Query all records including deleted
    QueryAll,
}

impl BulkOperation {
    /// Get the API string for this operation.
    pub fn api_name(&self) -> &'static str {
        match self {
            BulkOperation::Insert => "insert",
            BulkOperation::Update => "update",
            BulkOperation::Upsert => "upsert",
            BulkOperation::Delete => "delete",
            BulkOperation::HardDelete => "hardDelete",
            BulkOperation::Query => "query",
            BulkOperation::QueryAll => "queryAll",
        }
    }

    pub fn is_query(&self) -> bool {
        matches!(self, BulkOperation::Query | BulkOperation::QueryAll)
    }

    pub fn is_ingest(&self) -> bool {
        !self.is_query()
    }
}

/// Line ending style for Bulk API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum LineEnding {
    /// Unix-style (LF)
    #[default]
    #[serde(rename = "LF")]
    Lf,
    /// Windows-style (CRLF)
    #[serde(rename = "CRLF")]
    Crlf,
}

/// Column delimiter for Bulk API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum ColumnDelimiter {
    #[default]
    Comma,
    Tab,
    Semicolon,
    Pipe,
    Backquote,
    Caret,
}

impl ColumnDelimiter {
    /// The delimiter byte, as the `csv` reader expects it.
    pub fn byte(&self) -> u8 {
        match self {
            ColumnDelimiter::Comma => b',',
            ColumnDelimiter::Tab => b'\t',
            ColumnDelimiter::Semicolon => b';',
            ColumnDelimiter::Pipe => b'|',
            ColumnDelimiter::Backquote => b'`',
            ColumnDelimiter::Caret => b'^',
        }
    }
}

// =============================================================================
// Request Types
// =============================================================================

/// Definition of an ingest job.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobDefinition {
    /// SObject API name
    pub object: String,
    pub operation: BulkOperation,
    /// External ID field for upsert
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id_field_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignment_rule_id: Option<String>,
    content_type: &'static str,
    pub column_delimiter: ColumnDelimiter,
    pub line_ending: LineEnding,
}

impl JobDefinition {
    pub fn new(sobject: impl Into<String>, operation: BulkOperation) -> Self {
        Self {
            object: sobject.into(),
            operation,
            external_id_field_name: None,
            assignment_rule_id: None,
            content_type: "CSV",
            column_delimiter: ColumnDelimiter::default(),
            line_ending: LineEnding::default(),
        }
    }

    /// Set the external ID field for upsert operations.
    pub fn with_external_id_field(mut self, field: impl Into<String>) -> Self {
        self.external_id_field_name = Some(field.into());
        self
    }

    pub fn with_assignment_rule(mut self, rule_id: impl Into<String>) -> Self {
        self.assignment_rule_id = Some(rule_id.into());
        self
    }

    pub fn with_column_delimiter(mut self, delimiter: ColumnDelimiter) -> Self {
        self.column_delimiter = delimiter;
        self
    }

    pub fn with_line_ending(mut self, line_ending: LineEnding) -> Self {
        self.line_ending = line_ending;
        self
    }
}

/// SOQL run by a query job, with the CSV shape of its results.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkQuery {
    pub query: String,
    pub column_delimiter: ColumnDelimiter,
    pub line_ending: LineEnding,
}

impl BulkQuery {
    pub fn new(soql: impl Into<String>) -> Self {
        Self {
            query: soql.into(),
            column_delimiter: ColumnDelimiter::default(),
            line_ending: LineEnding::default(),
        }
    }

    pub fn with_column_delimiter(mut self, delimiter: ColumnDelimiter) -> Self {
        self.column_delimiter = delimiter;
        self
    }

    pub fn with_line_ending(mut self, line_ending: LineEnding) -> Self {
        self.line_ending = line_ending;
        self
    }
}

/// Wire body of a query job creation.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateQueryJobRequest<'a> {
    pub operation: BulkOperation,
    pub content_type: &'static str,
    #[serde(flatten)]
    pub query: &'a BulkQuery,
}

/// Request to update job state.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct UpdateJobStateRequest {
    pub state: JobState,
}

// =============================================================================
// Response Types
// =============================================================================

/// Job information returned by create, get, close and abort.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: String,
    pub state: JobState,
    #[serde(default)]
    pub object: Option<String>,
    pub operation: BulkOperation,
    /// SOQL of a query job
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub external_id_field_name: Option<String>,
    #[serde(default)]
    pub job_type: Option<String>,
    #[serde(default)]
    pub column_delimiter: Option<ColumnDelimiter>,
    #[serde(default)]
    pub line_ending: Option<LineEnding>,
    #[serde(default)]
    pub content_url: Option<String>,
    #[serde(default)]
    pub number_records_processed: i64,
    #[serde(default)]
    pub number_records_failed: i64,
    #[serde(default)]
    pub created_by_id: Option<String>,
    #[serde(default)]
    pub created_date: Option<String>,
    #[serde(default)]
    pub system_modstamp: Option<String>,
    /// Total processing time in milliseconds
    #[serde(default)]
    pub total_processing_time: Option<i64>,
    /// API version (can be float like 59.0 or string like "59.0")
    #[serde(default, deserialize_with = "deserialize_api_version")]
    pub api_version: Option<String>,
    #[serde(default)]
    pub concurrency_mode: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
}

/// One page of the job listing.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobList {
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub records: Vec<Job>,
    #[serde(default)]
    pub next_records_url: Option<String>,
}

/// One page of query job results.
#[derive(Debug, Clone)]
pub struct QueryResults {
    pub csv_data: String,
    /// Locator for next page (None if no more pages)
    pub locator: Option<String>,
}

/// Row of `successfulResults`. Columns other than the `sf__` ones are
/// ignored; parse with your own type to keep them.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SuccessfulRecord {
    #[serde(rename = "sf__Id")]
    pub id: String,
    #[serde(rename = "sf__Created")]
    pub created: bool,
}

/// Row of `failedResults`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FailedRecord {
    /// Empty for records that never got an Id.
    #[serde(rename = "sf__Id", default)]
    pub id: String,
    #[serde(rename = "sf__Error")]
    pub error: String,
}

// =============================================================================
// Result Types
// =============================================================================

/// Result of a completed ingest job.
#[derive(Debug, Clone)]
pub struct IngestJobResult {
    pub job: Job,
    /// Successful records CSV (if any)
    pub successful_results: Option<String>,
    /// Failed records CSV (if any)
    pub failed_results: Option<String>,
}

impl IngestJobResult {
    pub fn is_success(&self) -> bool {
        self.job.state.is_success()
    }

    /// Share of processed records that did not fail.
    pub fn success_rate(&self) -> f64 {
        let processed = self.job.number_records_processed;
        if processed == 0 {
            return 1.0;
        }
        (processed - self.job.number_records_failed) as f64 / processed as f64
    }

    pub fn has_failures(&self) -> bool {
        self.job.number_records_failed > 0
    }
}

/// Result of a completed query job.
#[derive(Debug, Clone)]
pub struct QueryJobResult {
    pub job: Job,
    /// Query results CSV, header included once (if successful)
    pub results: Option<String>,
}

impl QueryJobResult {
    pub fn is_success(&self) -> bool {
        self.job.state.is_success()
    }

    pub fn record_count(&self) -> i64 {
        self.job.number_records_processed
    }
}
