//! Per-client service settings: batch sizes, row cap and the batch logger.

use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::collections::{filter_failures_from, CollectionResult, FailedRecord};

/// Boxed error returned by a [`BatchLogger`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

const MAX_WRITE_BATCH: usize = 200;
const MAX_QUERY_BATCH: usize = 2000;
const MIN_QUERY_BATCH: usize = 200;

/// Which batch-size bounds apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    /// Collection create/update/upsert/delete: 1 to 200 records per request.
    Write,
    /// Query paging: 200 to 2000 rows per page.
    Query,
}

/// One completed collection batch, as handed to a [`BatchLogger`].
#[derive(Debug, Clone, Copy)]
pub struct BatchLog<'a> {
    /// Index of the batch's first record in the caller's list. Equals the
    /// number of records processed before this batch.
    pub offset: usize,
    /// The records as sent, attributes included. Deletes carry the ids as
    /// JSON strings.
    pub records: &'a [Value],
    /// One result per record, in the same order.
    pub results: &'a [CollectionResult],
}

impl<'a> BatchLog<'a> {
    /// Failed results of this batch, indexed against the caller's list.
    pub fn failures(&self) -> Vec<FailedRecord<'a, Value>> {
        filter_failures_from(self.offset, self.results, self.records)
    }
}

/// Called after every collection batch, before the next one is sent.
///
/// Returning an error stops the operation; the results gathered so far are
/// returned together with that error.
pub trait BatchLogger: Send + Sync {
    fn log_batch(&self, cancel: &CancellationToken, batch: &BatchLog<'_>) -> Result<(), BoxError>;
}

impl<F> BatchLogger for F
where
    F: Fn(&CancellationToken, &BatchLog<'_>) -> Result<(), BoxError> + Send + Sync,
{
    fn log_batch(&self, cancel: &CancellationToken, batch: &BatchLog<'_>) -> Result<(), BoxError> {
        self(cancel, batch)
    }
}

/// Immutable service settings. Every `with_*` returns a new value, so a
/// call in flight keeps the settings it started with.
#[derive(Clone, Default)]
pub struct ServiceConfig {
    batch_size: usize,
    max_rows: usize,
    logger: Option<Arc<dyn BatchLogger>>,
}

impl std::fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceConfig")
            .field("batch_size", &self.batch_size)
            .field("max_rows", &self.max_rows)
            .field("logger", &self.logger.is_some())
            .finish()
    }
}

impl ServiceConfig {
    /// Requested batch size. 0 means the largest batch allowed.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Stop queries after this many rows. 0 means no cap.
    pub fn with_max_rows(mut self, max_rows: usize) -> Self {
        self.max_rows = max_rows;
        self
    }

    pub fn with_logger(mut self, logger: impl BatchLogger + 'static) -> Self {
        self.logger = Some(Arc::new(logger));
        self
    }

    pub fn without_logger(mut self) -> Self {
        self.logger = None;
        self
    }

    /// Effective batch size for `kind`, clamped to the API's bounds.
    pub fn max_batch_size(&self, kind: CallKind) -> usize {
        let (min, max) = match kind {
            CallKind::Write => (1, MAX_WRITE_BATCH),
            CallKind::Query => (MIN_QUERY_BATCH, MAX_QUERY_BATCH),
        };
        match self.batch_size {
            0 => max,
            n => n.clamp(min, max),
        }
    }

    /// Row cap for queries, if any.
    pub fn max_rows(&self) -> Option<usize> {
        (self.max_rows > 0).then_some(self.max_rows)
    }

    pub fn logger(&self) -> Option<&Arc<dyn BatchLogger>> {
        self.logger.as_ref()
    }
}
