//! SObject Collections wire types and result aggregation.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Error;
use crate::sobject::SalesforceError;

/// Body of a collection create, update or upsert request.
#[derive(Debug, Clone, Serialize)]
pub struct CollectionRequest<'a> {
    #[serde(rename = "allOrNone")]
    pub all_or_none: bool,
    pub records: &'a [Value],
}

/// Outcome for one submitted record.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CollectionResult {
    pub id: Option<String>,
    pub success: bool,
    #[serde(default)]
    pub errors: Vec<SalesforceError>,
    /// Upsert only: true when the record was inserted.
    #[serde(default)]
    pub created: bool,
}

/// A collection operation that stopped early.
///
/// `results` holds the outcomes of every batch that completed before the
/// failure, in input order, so `results.len()` is the number of records the
/// server is known to have processed.
#[derive(Debug, thiserror::Error)]
#[error("{source} (after {} records)", .results.len())]
pub struct CollectionError {
    pub results: Vec<CollectionResult>,
    #[source]
    pub source: Error,
}

impl CollectionError {
    pub fn new(results: Vec<CollectionResult>, source: Error) -> Self {
        Self { results, source }
    }

    /// A failure before any request was made.
    pub(crate) fn precondition(source: Error) -> Self {
        Self::new(Vec::new(), source)
    }

    pub fn kind(&self) -> &crate::ErrorKind {
        &self.source.kind
    }
}

impl From<CollectionError> for Error {
    fn from(err: CollectionError) -> Self {
        err.source
    }
}

/// Result of a collection operation. The error side always carries the
/// partial aggregate.
pub type CollectionOutcome = std::result::Result<Vec<CollectionResult>, CollectionError>;

/// A failed outcome paired with its position and source record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FailedRecord<'a, E> {
    /// Position in the caller's original list.
    pub index: usize,
    pub result: &'a CollectionResult,
    /// The source record, when `index` falls inside the supplied list.
    pub record: Option<&'a E>,
}

/// Pick the failed outcomes out of `results`, pairing each with the record
/// at the same position in `sources`.
pub fn filter_failures<'a, E>(
    results: &'a [CollectionResult],
    sources: &'a [E],
) -> Vec<FailedRecord<'a, E>> {
    filter_failures_from(0, results, sources)
}

/// Like [`filter_failures`] for a batch that starts at `start` in the
/// caller's list. `sources` is batch-relative.
pub fn filter_failures_from<'a, E>(
    start: usize,
    results: &'a [CollectionResult],
    sources: &'a [E],
) -> Vec<FailedRecord<'a, E>> {
    results
        .iter()
        .enumerate()
        .filter(|(_, result)| !result.success)
        .map(|(position, result)| FailedRecord {
            index: start + position,
            result,
            record: sources.get(position),
        })
        .collect()
}
