use serde::Serialize;
use serde_json::Value;
use tracing::{debug, instrument};

use sfkit_client::security::{soql, url as url_security};
use sfkit_client::{CancellationToken, RequestBuilder, RequestMethod, Transport};

use crate::batch::batches;
use crate::collections::{CollectionError, CollectionOutcome, CollectionRequest, CollectionResult};
use crate::config::{BatchLog, CallKind};
use crate::error::{Error, ErrorKind, Result};
use crate::sobject::{DeleteId, SObject};

impl<T: Transport> super::SalesforceRestClient<T> {
    /// Create records through SObject Collections, in batches.
    ///
    /// Records may be of different kinds. On failure the error carries the
    /// results of every batch that completed.
    #[instrument(skip(self, cancel, records), fields(records = records.len()))]
    pub async fn create_records<E: SObject + Serialize>(
        &self,
        cancel: &CancellationToken,
        all_or_none: bool,
        records: &[E],
    ) -> CollectionOutcome {
        let wire = prepare_records(records, |_, _| Ok(()))?;
        self.run_collection(cancel, &wire, |batch| {
            Ok(RequestBuilder::new(RequestMethod::Post, "composite/sobjects").json(
                &CollectionRequest {
                    all_or_none,
                    records: batch,
                },
            )?)
        })
        .await
    }

    /// Update records through SObject Collections, in batches. Each record
    /// must carry its `Id`.
    #[instrument(skip(self, cancel, records), fields(records = records.len()))]
    pub async fn update_records<E: SObject + Serialize>(
        &self,
        cancel: &CancellationToken,
        all_or_none: bool,
        records: &[E],
    ) -> CollectionOutcome {
        let wire = prepare_records(records, |index, value| {
            match value.get("Id").and_then(Value::as_str) {
                Some(id) if url_security::is_valid_salesforce_id(id) => Ok(()),
                _ => Err(invalid(format!("record {index} has no valid Id"))),
            }
        })?;
        self.run_collection(cancel, &wire, |batch| {
            Ok(RequestBuilder::new(RequestMethod::Patch, "composite/sobjects").json(
                &CollectionRequest {
                    all_or_none,
                    records: batch,
                },
            )?)
        })
        .await
    }

    /// Upsert records of a single kind keyed on `external_id_field`.
    ///
    /// The kind is taken from the first record; every other record must
    /// share it.
    #[instrument(skip(self, cancel, records), fields(records = records.len()))]
    pub async fn upsert_records<E: SObject + Serialize>(
        &self,
        cancel: &CancellationToken,
        all_or_none: bool,
        external_id_field: &str,
        records: &[E],
    ) -> CollectionOutcome {
        let Some(first) = records.first() else {
            return Err(CollectionError::precondition(Error::new(ErrorKind::ZeroRecords)));
        };
        let kind = first.sobject_name();
        if !soql::is_safe_field_name(external_id_field) {
            return Err(CollectionError::precondition(invalid(format!(
                "invalid external id field {external_id_field:?}"
            ))));
        }
        if let Some(index) = records.iter().position(|r| r.sobject_name() != kind) {
            return Err(CollectionError::precondition(invalid(format!(
                "record {index} is a {}, expected {kind}",
                records[index].sobject_name()
            ))));
        }

        let wire = prepare_records(records, |_, _| Ok(()))?;
        let path = format!("composite/sobjects/{kind}/{external_id_field}");
        self.run_collection(cancel, &wire, |batch| {
            Ok(RequestBuilder::new(RequestMethod::Patch, path.as_str()).json(
                &CollectionRequest {
                    all_or_none,
                    records: batch,
                },
            )?)
        })
        .await
    }

    /// Delete records by id, in batches.
    #[instrument(skip(self, cancel, ids), fields(ids = ids.len()))]
    pub async fn delete_records<S: AsRef<str> + Sync>(
        &self,
        cancel: &CancellationToken,
        all_or_none: bool,
        ids: &[S],
    ) -> CollectionOutcome {
        let wrappers: Vec<DeleteId> = ids.iter().map(|id| DeleteId::new(id.as_ref())).collect();
        let wire = prepare_records(&wrappers, |index, value| {
            match value.get("Id").and_then(Value::as_str) {
                Some(id) if url_security::is_valid_salesforce_id(id) => Ok(()),
                _ => Err(invalid(format!(
                    "invalid record id {:?} at {index}",
                    ids[index].as_ref()
                ))),
            }
        })?;

        self.run_collection(cancel, &wire, |batch| {
            let joined = batch
                .iter()
                .filter_map(|record| record.get("Id").and_then(Value::as_str))
                .collect::<Vec<_>>()
                .join(",");
            Ok(RequestBuilder::new(RequestMethod::Delete, "composite/sobjects")
                .query("ids", joined)
                .query("allOrNone", all_or_none.to_string()))
        })
        .await
    }

    /// Send `wire` in batches, one request per batch built by `build`.
    async fn run_collection(
        &self,
        cancel: &CancellationToken,
        wire: &[Value],
        build: impl Fn(&[Value]) -> Result<RequestBuilder> + Send,
    ) -> CollectionOutcome {
        let batch_size = self.config.max_batch_size(CallKind::Write);
        let logger = self.config.logger().cloned();
        let mut aggregate: Vec<CollectionResult> = Vec::with_capacity(wire.len());

        for (offset, batch) in batches(wire, batch_size) {
            let request = match build(batch) {
                Ok(request) => request,
                Err(err) => return Err(CollectionError::new(aggregate, err)),
            };
            let results: Vec<CollectionResult> =
                match self.transport.call_json(cancel, request).await {
                    Ok(results) => results,
                    Err(err) => return Err(CollectionError::new(aggregate, err.into())),
                };
            if results.len() != batch.len() {
                let mismatch = ErrorKind::ResultMismatch {
                    expected: batch.len(),
                    actual: results.len(),
                };
                return Err(CollectionError::new(aggregate, Error::new(mismatch)));
            }
            aggregate.extend(results);
            debug!(
                offset,
                size = batch.len(),
                done = aggregate.len(),
                total = wire.len(),
                "collection batch complete"
            );

            if let Some(logger) = &logger {
                let log = BatchLog {
                    offset,
                    records: batch,
                    results: &aggregate[offset..],
                };
                if let Err(err) = logger.log_batch(cancel, &log) {
                    let source = Error {
                        kind: ErrorKind::Hook(err.to_string()),
                        source: Some(err),
                    };
                    return Err(CollectionError::new(aggregate, source));
                }
            }
        }

        Ok(aggregate)
    }
}

fn invalid(message: String) -> Error {
    Error::new(ErrorKind::InvalidInput(message))
}

/// Tag and serialize every record up front, so that nothing is sent when any
/// record is unusable.
fn prepare_records<E: SObject + Serialize>(
    records: &[E],
    check: impl Fn(usize, &Value) -> Result<()>,
) -> std::result::Result<Vec<Value>, CollectionError> {
    if records.is_empty() {
        return Err(CollectionError::precondition(Error::new(ErrorKind::ZeroRecords)));
    }
    records
        .iter()
        .enumerate()
        .map(|(index, record)| {
            let kind = record.sobject_name();
            if !soql::is_safe_sobject_name(kind) {
                return Err(invalid(format!("record {index} has invalid object name {kind:?}")));
            }
            let value = serde_json::to_value(record.with_attributes(None))?;
            check(index, &value)?;
            Ok(value)
        })
        .collect::<Result<Vec<_>>>()
        .map_err(CollectionError::precondition)
}
