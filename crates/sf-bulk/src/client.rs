//! Bulk API 2.0 client.
//!
//! Provides a high-level interface to Salesforce Bulk API 2.0 for
//! efficient large-scale data operations.

use std::time::Duration;

use serde::de::DeserializeOwned;
use tokio::time::{sleep, Instant};
use tracing::{debug, instrument, warn};

use sfkit_client::security::{soql, url as url_security};
use sfkit_client::{
    CancellationToken, ClientConfig, RequestBuilder, RequestMethod, SalesforceClient, Transport,
};

use crate::error::{Error, ErrorKind, Result};
use crate::types::*;

/// Default polling interval for job status checks.
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Default maximum wait time for job completion.
const DEFAULT_MAX_WAIT: Duration = Duration::from_secs(3600);

const INGEST: &str = "jobs/ingest";
const QUERY: &str = "jobs/query";

/// Salesforce Bulk API 2.0 client.
///
/// # Example
///
/// ```rust,ignore
/// use sfkit_bulk::{BulkApiClient, BulkOperation, JobDefinition};
/// use sfkit_client::CancellationToken;
///
/// let client = BulkApiClient::new(
///     "https://myorg.my.salesforce.com",
///     "access_token_here",
/// )?;
/// let cancel = CancellationToken::new();
///
/// let job = client
///     .create_job(&cancel, &JobDefinition::new("Account", BulkOperation::Insert))
///     .await?;
/// client.upload_job_data(&cancel, &job.id, "Name\nAcme\nGlobex\n").await?;
/// client.close_job(&cancel, &job.id).await?;
/// let done = client.wait_for_job(&cancel, &job.id).await?;
/// for failed in client.failed_results(&cancel, &job.id).await? {
///     eprintln!("{}: {}", failed.id, failed.error);
/// }
/// ```
#[derive(Debug, Clone)]
pub struct BulkApiClient {
    client: SalesforceClient,
    poll_interval: Duration,
    max_wait: Duration,
}

impl BulkApiClient {
    pub fn new(instance_url: impl Into<String>, access_token: impl Into<String>) -> Result<Self> {
        Ok(Self::from_client(SalesforceClient::new(
            instance_url,
            access_token,
        )?))
    }

    /// Create a new Bulk API client with custom HTTP configuration.
    pub fn with_config(
        instance_url: impl Into<String>,
        access_token: impl Into<String>,
        config: ClientConfig,
    ) -> Result<Self> {
        Ok(Self::from_client(SalesforceClient::with_config(
            instance_url,
            access_token,
            config,
        )?))
    }

    /// Create a Bulk API client from an existing SalesforceClient.
    pub fn from_client(client: SalesforceClient) -> Self {
        Self {
            client,
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_wait: DEFAULT_MAX_WAIT,
        }
    }

    pub fn inner(&self) -> &SalesforceClient {
        &self.client
    }

    pub fn instance_url(&self) -> &str {
        self.client.instance_url()
    }

    pub fn api_version(&self) -> &str {
        self.client.api_version()
    }

    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.client = self.client.with_api_version(version);
        self
    }

    /// Set the polling interval for job status checks.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set the maximum wait time for job completion.
    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = max_wait;
        self
    }

    // =========================================================================
    // Ingest Job Operations
    // =========================================================================

    /// Create a new ingest job.
    #[instrument(skip(self, cancel, definition), fields(object = %definition.object))]
    pub async fn create_job(
        &self,
        cancel: &CancellationToken,
        definition: &JobDefinition,
    ) -> Result<Job> {
        if !definition.operation.is_ingest() {
            return Err(Error::new(ErrorKind::InvalidJob(format!(
                "{} is not an ingest operation",
                definition.operation.api_name()
            ))));
        }
        if !soql::is_safe_sobject_name(&definition.object) {
            return Err(Error::new(ErrorKind::InvalidJob(format!(
                "invalid object name {:?}",
                definition.object
            ))));
        }
        if let Some(field) = &definition.external_id_field_name {
            if !soql::is_safe_field_name(field) {
                return Err(Error::new(ErrorKind::InvalidJob(format!(
                    "invalid external id field {field:?}"
                ))));
            }
        }

        let request = RequestBuilder::new(RequestMethod::Post, INGEST).json(definition)?;
        let job: Job = self.client.call_json(cancel, request).await?;
        debug!(job_id = %job.id, "created ingest job");
        Ok(job)
    }

    /// Upload CSV data to an open ingest job.
    #[instrument(skip(self, cancel, csv_data))]
    pub async fn upload_job_data(
        &self,
        cancel: &CancellationToken,
        job_id: &str,
        csv_data: impl Into<String>,
    ) -> Result<()> {
        let request =
            RequestBuilder::new(RequestMethod::Put, job_path(INGEST, job_id, "/batches")?)
                .csv(csv_data);
        self.client.call(cancel, request).await.map_err(|e| {
            Error::with_source(
                ErrorKind::Upload {
                    job_id: job_id.to_string(),
                },
                e,
            )
        })?;
        Ok(())
    }

    /// Mark the upload complete so Salesforce starts processing.
    #[instrument(skip(self, cancel))]
    pub async fn close_job(&self, cancel: &CancellationToken, job_id: &str) -> Result<Job> {
        self.set_state(cancel, INGEST, job_id, JobState::UploadComplete)
            .await
    }

    #[instrument(skip(self, cancel))]
    pub async fn abort_job(&self, cancel: &CancellationToken, job_id: &str) -> Result<Job> {
        self.set_state(cancel, INGEST, job_id, JobState::Aborted).await
    }

    #[instrument(skip(self, cancel))]
    pub async fn delete_job(&self, cancel: &CancellationToken, job_id: &str) -> Result<()> {
        let request = RequestBuilder::new(RequestMethod::Delete, job_path(INGEST, job_id, "")?);
        self.client.call(cancel, request).await?;
        Ok(())
    }

    #[instrument(skip(self, cancel))]
    pub async fn get_job(&self, cancel: &CancellationToken, job_id: &str) -> Result<Job> {
        self.job(cancel, INGEST, job_id).await
    }

    /// Poll until the ingest job reaches a terminal state.
    #[instrument(skip(self, cancel))]
    pub async fn wait_for_job(&self, cancel: &CancellationToken, job_id: &str) -> Result<Job> {
        self.wait(cancel, INGEST, job_id).await
    }

    /// `successfulResults` as raw CSV.
    #[instrument(skip(self, cancel))]
    pub async fn successful_records(
        &self,
        cancel: &CancellationToken,
        job_id: &str,
    ) -> Result<String> {
        self.csv(cancel, job_path(INGEST, job_id, "/successfulResults/")?)
            .await
    }

    /// `failedResults` as raw CSV.
    #[instrument(skip(self, cancel))]
    pub async fn failed_records(&self, cancel: &CancellationToken, job_id: &str) -> Result<String> {
        self.csv(cancel, job_path(INGEST, job_id, "/failedResults/")?)
            .await
    }

    /// `unprocessedrecords` as raw CSV.
    #[instrument(skip(self, cancel))]
    pub async fn unprocessed_records(
        &self,
        cancel: &CancellationToken,
        job_id: &str,
    ) -> Result<String> {
        self.csv(cancel, job_path(INGEST, job_id, "/unprocessedrecords/")?)
            .await
    }

    /// Id and created flag of every successful row.
    pub async fn successful_results(
        &self,
        cancel: &CancellationToken,
        job_id: &str,
    ) -> Result<Vec<SuccessfulRecord>> {
        let csv = self.successful_records(cancel, job_id).await?;
        parse_csv(&csv, self.delimiter_of(cancel, job_id).await?)
    }

    /// Id and error message of every failed row.
    pub async fn failed_results(
        &self,
        cancel: &CancellationToken,
        job_id: &str,
    ) -> Result<Vec<FailedRecord>> {
        let csv = self.failed_records(cancel, job_id).await?;
        parse_csv(&csv, self.delimiter_of(cancel, job_id).await?)
    }

    /// Every ingest job visible to the user, following `nextRecordsUrl`.
    #[instrument(skip(self, cancel))]
    pub async fn list_jobs(&self, cancel: &CancellationToken) -> Result<Vec<Job>> {
        let mut jobs = Vec::new();
        let mut next = INGEST.to_string();
        loop {
            let page: JobList = self
                .client
                .call_json(cancel, RequestBuilder::new(RequestMethod::Get, next))
                .await?;
            jobs.extend(page.records);
            match page.next_records_url {
                Some(url) if !page.done && !url.is_empty() => next = url,
                _ => break,
            }
        }
        debug!(count = jobs.len(), "listed ingest jobs");
        Ok(jobs)
    }

    /// Create, fill, close and wait for an ingest job, then fetch its
    /// result files.
    #[instrument(skip(self, cancel, definition, csv_data), fields(object = %definition.object))]
    pub async fn execute_ingest(
        &self,
        cancel: &CancellationToken,
        definition: &JobDefinition,
        csv_data: impl Into<String>,
    ) -> Result<IngestJobResult> {
        let job = self.create_job(cancel, definition).await?;
        if let Err(e) = self.upload_job_data(cancel, &job.id, csv_data).await {
            if !cancel.is_cancelled() {
                if let Err(err) = self.abort_job(cancel, &job.id).await {
                    warn!(job_id = %job.id, error = %err, "abort after failed upload failed");
                }
            }
            return Err(e);
        }
        self.close_job(cancel, &job.id).await?;
        let job = self.wait_for_job(cancel, &job.id).await?;

        let (successful_results, failed_results) = if job.state.is_success() {
            (
                Some(self.successful_records(cancel, &job.id).await?),
                Some(self.failed_records(cancel, &job.id).await?),
            )
        } else {
            (None, None)
        };

        Ok(IngestJobResult {
            job,
            successful_results,
            failed_results,
        })
    }

    // =========================================================================
    // Query Job Operations
    // =========================================================================

    /// Start a query job; `query_all` includes deleted and archived rows.
    #[instrument(skip(self, cancel, query))]
    pub async fn create_query_job(
        &self,
        cancel: &CancellationToken,
        query: &BulkQuery,
        query_all: bool,
    ) -> Result<Job> {
        let body = CreateQueryJobRequest {
            operation: if query_all {
                BulkOperation::QueryAll
            } else {
                BulkOperation::Query
            },
            content_type: "CSV",
            query,
        };
        let request = RequestBuilder::new(RequestMethod::Post, QUERY).json(&body)?;
        let job: Job = self.client.call_json(cancel, request).await?;
        debug!(job_id = %job.id, "created query job");
        Ok(job)
    }

    #[instrument(skip(self, cancel))]
    pub async fn get_query_job(&self, cancel: &CancellationToken, job_id: &str) -> Result<Job> {
        self.job(cancel, QUERY, job_id).await
    }

    #[instrument(skip(self, cancel))]
    pub async fn abort_query_job(&self, cancel: &CancellationToken, job_id: &str) -> Result<Job> {
        self.set_state(cancel, QUERY, job_id, JobState::Aborted).await
    }

    #[instrument(skip(self, cancel))]
    pub async fn wait_for_query_job(
        &self,
        cancel: &CancellationToken,
        job_id: &str,
    ) -> Result<Job> {
        self.wait(cancel, QUERY, job_id).await
    }

    /// One page of query results. Pass the previous page's locator to get
    /// the next one; `locator` is `None` on the last page.
    #[instrument(skip(self, cancel))]
    pub async fn query_results(
        &self,
        cancel: &CancellationToken,
        job_id: &str,
        locator: Option<&str>,
        max_records: Option<usize>,
    ) -> Result<QueryResults> {
        let mut request =
            RequestBuilder::new(RequestMethod::Get, job_path(QUERY, job_id, "/results")?)
                .accept_csv();
        if let Some(loc) = locator {
            request = request.query("locator", loc);
        }
        if let Some(max) = max_records {
            request = request.query("maxRecords", max.to_string());
        }

        let response = self.client.call_response(cancel, request).await?;
        let next = response.sforce_locator().map(str::to_string);
        let csv_data = response.text().await?;

        Ok(QueryResults {
            csv_data,
            locator: next,
        })
    }

    /// All pages of query results joined into one CSV document with a
    /// single header row.
    #[instrument(skip(self, cancel))]
    pub async fn all_query_results(
        &self,
        cancel: &CancellationToken,
        job_id: &str,
    ) -> Result<String> {
        let mut all = String::new();
        let mut locator: Option<String> = None;
        loop {
            let page = self
                .query_results(cancel, job_id, locator.as_deref(), None)
                .await?;
            if all.is_empty() {
                all = page.csv_data;
            } else {
                all.push_str(without_header(&page.csv_data));
            }
            match page.locator {
                Some(next) => locator = Some(next),
                None => break,
            }
        }
        Ok(all)
    }

    /// All pages of query results decoded into `R`, one item per row.
    #[instrument(skip(self, cancel))]
    pub async fn query_records<R: DeserializeOwned>(
        &self,
        cancel: &CancellationToken,
        job_id: &str,
        delimiter: ColumnDelimiter,
    ) -> Result<Vec<R>> {
        let mut rows = Vec::new();
        let mut locator: Option<String> = None;
        loop {
            let page = self
                .query_results(cancel, job_id, locator.as_deref(), None)
                .await?;
            rows.extend(parse_csv::<R>(&page.csv_data, delimiter)?);
            match page.locator {
                Some(next) => locator = Some(next),
                None => break,
            }
        }
        Ok(rows)
    }

    /// Create a query job, wait for it and collect every result page.
    #[instrument(skip(self, cancel, query))]
    pub async fn execute_query(
        &self,
        cancel: &CancellationToken,
        query: &BulkQuery,
        query_all: bool,
    ) -> Result<QueryJobResult> {
        let job = self.create_query_job(cancel, query, query_all).await?;
        let job = self.wait_for_query_job(cancel, &job.id).await?;
        let results = if job.state.is_success() {
            Some(self.all_query_results(cancel, &job.id).await?)
        } else {
            None
        };
        Ok(QueryJobResult { job, results })
    }

    // =========================================================================
    // Shared
    // =========================================================================

    async fn job(&self, cancel: &CancellationToken, kind: &str, job_id: &str) -> Result<Job> {
        let request = RequestBuilder::new(RequestMethod::Get, job_path(kind, job_id, "")?);
        Ok(self.client.call_json(cancel, request).await?)
    }

    async fn set_state(
        &self,
        cancel: &CancellationToken,
        kind: &str,
        job_id: &str,
        state: JobState,
    ) -> Result<Job> {
        let request = RequestBuilder::new(RequestMethod::Patch, job_path(kind, job_id, "")?)
            .json(&UpdateJobStateRequest { state })?;
        Ok(self.client.call_json(cancel, request).await?)
    }

    async fn wait(&self, cancel: &CancellationToken, kind: &str, job_id: &str) -> Result<Job> {
        let deadline = Instant::now() + self.max_wait;
        loop {
            let job = self.job(cancel, kind, job_id).await?;
            if job.state.is_terminal() {
                debug!(state = ?job.state, processed = job.number_records_processed, "job finished");
                return Ok(job);
            }
            if Instant::now() >= deadline {
                return Err(Error::new(ErrorKind::Timeout {
                    job_id: job_id.to_string(),
                    waited: self.max_wait,
                }));
            }
            debug!(state = ?job.state, "job still running");

            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    return Err(sfkit_client::Error::new(sfkit_client::ErrorKind::Cancelled).into());
                }
                _ = sleep(self.poll_interval) => {}
            }
        }
    }

    async fn csv(&self, cancel: &CancellationToken, path: String) -> Result<String> {
        let request = RequestBuilder::new(RequestMethod::Get, path).accept_csv();
        let body = self.client.call(cancel, request).await?;
        String::from_utf8(body.to_vec()).map_err(|e| {
            Error::with_source(ErrorKind::Csv("result file is not UTF-8".to_string()), e)
        })
    }

    async fn delimiter_of(&self, cancel: &CancellationToken, job_id: &str) -> Result<ColumnDelimiter> {
        Ok(self
            .get_job(cancel, job_id)
            .await?
            .column_delimiter
            .unwrap_or_default())
    }
}

fn job_path(kind: &str, job_id: &str, suffix: &str) -> Result<String> {
    if !url_security::is_valid_salesforce_id(job_id) {
        return Err(Error::new(ErrorKind::InvalidJob(format!(
            "invalid job id {job_id:?}"
        ))));
    }
    Ok(format!("{kind}/{job_id}{suffix}"))
}

fn without_header(page: &str) -> &str {
    match page.find('\n') {
        Some(end) => &page[end + 1..],
        None => "",
    }
}

/// Decode a Bulk API CSV document, one `R` per data row, matching columns
/// to fields by header name.
pub fn parse_csv<R: DeserializeOwned>(data: &str, delimiter: ColumnDelimiter) -> Result<Vec<R>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter.byte())
        .from_reader(data.as_bytes());
    let mut rows = Vec::new();
    for row in reader.deserialize() {
        rows.push(row?);
    }
    Ok(rows)
}
