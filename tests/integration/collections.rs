//! SObject Collections: batching, the batch logger and failure filtering.

use std::sync::{Arc, Mutex};

use serde::Serialize;
use sfkit::rest::{
    filter_failures, Attributes, BatchLog, BoxError, ErrorKind, RecordMap, SObject,
};
use sfkit::CancellationToken;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, ResponseTemplate};

use super::common::{mock_org, record_id, CollectionsResponder, API};

/// Every hundredth contact has no last name and is rejected.
fn contacts(count: usize) -> Vec<RecordMap> {
    (0..count)
        .map(|i| {
            let name = if i % 100 == 0 { String::new() } else { format!("Doe {i}") };
            RecordMap::new("Contact").with("LastName", name)
        })
        .collect()
}

#[tokio::test]
async fn test_create_splits_logs_and_filters_failures() {
    let (server, client) = mock_org().await;
    Mock::given(method("POST"))
        .and(path(format!("{API}/composite/sobjects")))
        .and(body_partial_json(serde_json::json!({"allOrNone": false})))
        .respond_with(CollectionsResponder)
        .expect(3)
        .mount(&server)
        .await;

    let logged = Arc::new(Mutex::new(Vec::new()));
    let logged_by_logger = Arc::clone(&logged);
    let client = client.with_logger(
        move |_: &CancellationToken, batch: &BatchLog<'_>| -> Result<(), BoxError> {
            let failed: Vec<usize> = batch.failures().iter().map(|f| f.index).collect();
            logged_by_logger
                .lock()
                .unwrap()
                .push((batch.offset, batch.results.len(), failed));
            Ok(())
        },
    );

    let records = contacts(450);
    let results = client
        .create_records(&CancellationToken::new(), false, &records)
        .await
        .expect("create should succeed");

    assert_eq!(results.len(), 450);
    assert_eq!(results[1].id.as_deref(), Some(record_id(1).as_str()));
    assert_eq!(results[449].id.as_deref(), Some(record_id(449).as_str()));
    assert_eq!(
        *logged.lock().unwrap(),
        vec![
            (0, 200, vec![0, 100]),
            (200, 200, vec![200, 300]),
            (400, 50, vec![400]),
        ]
    );

    let failures = filter_failures(&results, &records);
    assert_eq!(
        failures.iter().map(|f| f.index).collect::<Vec<_>>(),
        vec![0, 100, 200, 300, 400]
    );
    assert!(failures.iter().all(|f| f.record.is_some()));
    assert_eq!(failures[2].result.errors[0].status_code, "REQUIRED_FIELD_MISSING");
}

#[tokio::test]
async fn test_server_error_keeps_completed_batches() {
    let (server, client) = mock_org().await;
    Mock::given(method("POST"))
        .and(path(format!("{API}/composite/sobjects")))
        .respond_with(CollectionsResponder)
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("{API}/composite/sobjects")))
        .respond_with(ResponseTemplate::new(500).set_body_json(serde_json::json!([{
            "errorCode": "UNKNOWN_EXCEPTION",
            "message": "An unexpected error occurred"
        }])))
        .expect(1)
        .mount(&server)
        .await;

    let err = client
        .with_batch_size(100)
        .create_records(&CancellationToken::new(), true, &contacts(250))
        .await
        .unwrap_err();

    assert_eq!(err.results.len(), 100);
    assert!(matches!(err.kind(), ErrorKind::Client(_)));
    assert_eq!(err.source.status(), Some(500));
}

#[derive(Debug, Clone, Serialize)]
struct Contact {
    #[serde(skip_serializing_if = "Option::is_none")]
    attributes: Option<Attributes>,
    #[serde(rename = "LastName")]
    last_name: String,
    #[serde(rename = "Email__c")]
    email: String,
}

impl SObject for Contact {
    fn sobject_name(&self) -> &str {
        "Contact"
    }

    fn with_attributes(&self, reference: Option<&str>) -> Self {
        Self {
            attributes: Some(Attributes::new("Contact").with_reference(reference)),
            ..self.clone()
        }
    }
}

#[tokio::test]
async fn test_typed_upsert_uses_external_id_path() {
    let (server, client) = mock_org().await;
    Mock::given(method("PATCH"))
        .and(path(format!("{API}/composite/sobjects/Contact/Email__c")))
        .and(body_partial_json(serde_json::json!({
            "records": [{"attributes": {"type": "Contact"}}]
        })))
        .respond_with(CollectionsResponder)
        .expect(3)
        .mount(&server)
        .await;

    let records: Vec<Contact> = (1..=5)
        .map(|i| Contact {
            attributes: None,
            last_name: format!("Doe {i}"),
            email: format!("doe{i}@example.com"),
        })
        .collect();

    let results = client
        .with_batch_size(2)
        .upsert_records(&CancellationToken::new(), false, "Email__c", &records)
        .await
        .expect("upsert should succeed");

    assert_eq!(results.len(), 5);
    assert!(results.iter().all(|r| r.success));
    assert!(filter_failures(&results, &records).is_empty());
}

#[tokio::test]
async fn test_update_then_delete_round() {
    let (server, client) = mock_org().await;
    Mock::given(method("PATCH"))
        .and(path(format!("{API}/composite/sobjects")))
        .respond_with(CollectionsResponder)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path(format!("{API}/composite/sobjects")))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            {"id": record_id(1), "success": true, "errors": []},
            {"id": record_id(2), "success": false, "errors": [{
                "statusCode": "ENTITY_IS_DELETED",
                "message": "entity is deleted",
                "fields": []
            }]}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let cancel = CancellationToken::new();
    let updates: Vec<RecordMap> = (1..=2)
        .map(|i| {
            RecordMap::new("Contact")
                .with("Id", record_id(i))
                .with("LastName", format!("Doe {i}"))
        })
        .collect();
    let updated = client.update_records(&cancel, true, &updates).await.unwrap();
    assert_eq!(updated[0].id.as_deref(), Some(record_id(1).as_str()));

    let ids: Vec<String> = updated.iter().filter_map(|r| r.id.clone()).collect();
    let deleted = client.delete_records(&cancel, false, &ids).await.unwrap();
    let failures = filter_failures(&deleted, &ids);
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].record, Some(&record_id(2)));
}
