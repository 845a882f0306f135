//! Bulk API 2.0 ingest and query jobs end to end.

use std::time::Duration;

use serde::Deserialize;
use serde_json::{json, Value};
use sfkit::bulk::{BulkOperation, BulkQuery, ColumnDelimiter, JobDefinition, JobState};
use sfkit::{BulkApiClient, CancellationToken};
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::common::{init_tracing, no_retry, API};

const INGEST_ID: &str = "750xx0000000011AAA";
const QUERY_ID: &str = "750xx0000000012AAA";

fn client_for(server: &MockServer) -> BulkApiClient {
    init_tracing();
    BulkApiClient::with_config(server.uri(), "00Dxx!session", no_retry())
        .unwrap()
        .with_poll_interval(Duration::from_millis(10))
}

fn job(id: &str, operation: &str, state: &str) -> Value {
    json!({
        "id": id,
        "state": state,
        "object": "Contact",
        "operation": operation,
        "apiVersion": 62.0,
        "columnDelimiter": "PIPE",
        "lineEnding": "LF",
        "numberRecordsProcessed": 2,
        "numberRecordsFailed": 0
    })
}

#[tokio::test]
async fn test_upsert_ingest_with_pipe_delimiter() {
    let server = MockServer::start().await;
    let base = format!("{API}/jobs/ingest/{INGEST_ID}");
    Mock::given(method("POST"))
        .and(path(format!("{API}/jobs/ingest")))
        .and(body_partial_json(json!({
            "object": "Contact",
            "operation": "upsert",
            "externalIdFieldName": "Email__c",
            "columnDelimiter": "PIPE"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(job(INGEST_ID, "upsert", "Open")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path(format!("{base}/batches")))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path(base.as_str()))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(job(INGEST_ID, "upsert", "UploadComplete")),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(base.as_str()))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(job(INGEST_ID, "upsert", "JobComplete")),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{base}/successfulResults/")))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "sf__Id|sf__Created|Email__c\n003xx0000000001AAA|true|a@example.com\n003xx0000000002AAA|false|b@example.com\n",
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{base}/failedResults/")))
        .respond_with(ResponseTemplate::new(200).set_body_string("sf__Id|sf__Error|Email__c\n"))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let cancel = CancellationToken::new();
    let definition = JobDefinition::new("Contact", BulkOperation::Upsert)
        .with_external_id_field("Email__c")
        .with_column_delimiter(ColumnDelimiter::Pipe);

    let result = client
        .execute_ingest(
            &cancel,
            &definition,
            "Email__c|LastName\na@example.com|Doe\nb@example.com|Roe\n",
        )
        .await
        .unwrap();
    assert_eq!(result.job.state, JobState::JobComplete);
    assert!(!result.has_failures());

    let created: Vec<bool> = client
        .successful_results(&cancel, INGEST_ID)
        .await
        .unwrap()
        .iter()
        .map(|r| r.created)
        .collect();
    assert_eq!(created, vec![true, false]);
    assert!(client.failed_results(&cancel, INGEST_ID).await.unwrap().is_empty());
}

#[derive(Debug, Deserialize)]
struct ContactRow {
    #[serde(rename = "Id")]
    id: String,
    #[serde(rename = "LastName")]
    last_name: String,
}

#[tokio::test]
async fn test_query_job_pages_by_locator() {
    let server = MockServer::start().await;
    let base = format!("{API}/jobs/query/{QUERY_ID}");
    Mock::given(method("POST"))
        .and(path(format!("{API}/jobs/query")))
        .and(body_partial_json(json!({
            "operation": "query",
            "query": "SELECT Id, LastName FROM Contact",
            "columnDelimiter": "PIPE"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(job(QUERY_ID, "query", "UploadComplete")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(base.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(job(QUERY_ID, "query", "InProgress")))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(base.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(job(QUERY_ID, "query", "JobComplete")))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{base}/results")))
        .and(query_param("locator", "MjAwMA"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Sforce-Locator", "null")
                .set_body_string("Id|LastName\n003xx0000000003AAA|Moe\n"),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{base}/results")))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Sforce-Locator", "MjAwMA")
                .set_body_string("Id|LastName\n003xx0000000001AAA|Doe\n003xx0000000002AAA|Roe\n"),
        )
        .mount(&server)
        .await;

    let client = client_for(&server);
    let cancel = CancellationToken::new();
    let query = BulkQuery::new("SELECT Id, LastName FROM Contact")
        .with_column_delimiter(ColumnDelimiter::Pipe);

    let result = client.execute_query(&cancel, &query, false).await.unwrap();
    assert!(result.is_success());
    assert_eq!(
        result.results.as_deref(),
        Some("Id|LastName\n003xx0000000001AAA|Doe\n003xx0000000002AAA|Roe\n003xx0000000003AAA|Moe\n")
    );

    let rows: Vec<ContactRow> = client
        .query_records(&cancel, QUERY_ID, ColumnDelimiter::Pipe)
        .await
        .unwrap();
    assert_eq!(
        rows.iter().map(|r| r.last_name.as_str()).collect::<Vec<_>>(),
        vec!["Doe", "Roe", "Moe"]
    );
    assert_eq!(rows[2].id, "003xx0000000003AAA");
}
