//! Paginated SOQL reads.

use serde::Deserialize;
use serde_json::Value;
use sfkit::rest::{QuerySummary, RecordSink};
use sfkit::CancellationToken;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

use super::common::{contact_page, mock_org, record_id, API};

#[derive(Debug, Deserialize)]
struct Contact {
    #[serde(rename = "Id")]
    id: String,
    #[serde(rename = "LastName")]
    last_name: String,
}

const SOQL: &str = "SELECT Id, LastName FROM Contact";

#[tokio::test]
async fn test_query_follows_next_records_url() {
    let (server, client) = mock_org().await;
    let next = format!("{API}/query/01gxx0000001-2000");
    Mock::given(method("GET"))
        .and(path(format!("{API}/query/")))
        .and(query_param("q", SOQL))
        .and(header("Sforce-Query-Options", "batchSize=2000"))
        .and(header("Authorization", "Bearer 00Dxx!session"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(contact_page(0, 2000, 2500, Some(&next))),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(next.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(contact_page(2000, 500, 2500, None)))
        .expect(1)
        .mount(&server)
        .await;

    let mut rows: Vec<Contact> = Vec::new();
    let summary = client
        .query(&CancellationToken::new(), SOQL, &mut rows)
        .await
        .expect("query should succeed");

    assert_eq!(summary, QuerySummary { total_size: 2500, pages: 2, truncated: false });
    assert_eq!(rows.len(), 2500);
    assert_eq!(rows[2499].id, record_id(2499));
    assert_eq!(rows[2000].last_name, "Doe 2000");
}

#[tokio::test]
async fn test_row_cap_stops_paging() {
    let (server, client) = mock_org().await;
    let next = format!("{API}/query/01gxx0000002-300");
    Mock::given(method("GET"))
        .and(path(format!("{API}/query/")))
        .and(header("Sforce-Query-Options", "batchSize=300"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(contact_page(0, 300, 1000, Some(&next))),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(next.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(contact_page(300, 300, 1000, None)))
        .expect(0)
        .mount(&server)
        .await;

    let client = client.with_batch_size(300).with_max_rows(250);
    let mut rows: Vec<Value> = Vec::new();
    let summary = client
        .query(&CancellationToken::new(), SOQL, &mut rows)
        .await
        .unwrap();

    assert_eq!(rows.len(), 250);
    assert!(summary.truncated);
    assert_eq!(summary.pages, 1);
}

/// Counts rows instead of keeping them.
#[derive(Default)]
struct Counter {
    rows: usize,
}

impl RecordSink for Counter {
    fn append<'de, D>(&mut self, records: D) -> Result<(), D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let page = Option::<Vec<serde::de::IgnoredAny>>::deserialize(records)?;
        self.rows += page.map_or(0, |rows| rows.len());
        Ok(())
    }

    fn len(&self) -> usize {
        self.rows
    }

    fn truncate(&mut self, len: usize) {
        self.rows = self.rows.min(len);
    }
}

#[tokio::test]
async fn test_query_with_deleted_into_custom_sink() {
    let (server, client) = mock_org().await;
    Mock::given(method("GET"))
        .and(path(format!("{API}/queryAll/")))
        .respond_with(ResponseTemplate::new(200).set_body_json(contact_page(0, 42, 42, None)))
        .expect(1)
        .mount(&server)
        .await;

    let mut counter = Counter::default();
    client
        .query_with_deleted(&CancellationToken::new(), SOQL, &mut counter)
        .await
        .unwrap();
    assert_eq!(counter.rows, 42);
}

#[tokio::test]
async fn test_expired_session_is_reported() {
    let (server, client) = mock_org().await;
    Mock::given(method("GET"))
        .and(path(format!("{API}/query/")))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!([{
            "errorCode": "INVALID_SESSION_ID",
            "message": "Session expired or invalid"
        }])))
        .mount(&server)
        .await;

    let err = client
        .query_all::<Value>(&CancellationToken::new(), SOQL)
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(401));
}
