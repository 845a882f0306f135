use serde_json::{json, Value};
use sfkit::client::ClientConfig;
use sfkit::rest::SalesforceRestClient;
use wiremock::{MockServer, Request, Respond, ResponseTemplate};

pub const API: &str = "/services/data/v62.0";

/// Install a test subscriber once; honours `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn no_retry() -> ClientConfig {
    ClientConfig::builder().without_retry().build()
}

pub async fn mock_org() -> (MockServer, SalesforceRestClient) {
    init_tracing();
    let server = MockServer::start().await;
    let client = SalesforceRestClient::with_config(server.uri(), "00Dxx!session", no_retry())
        .expect("client for mock org");
    (server, client)
}

/// Fake id for the `n`th record, 18 characters.
pub fn record_id(n: usize) -> String {
    format!("003xx{n:010}AAA")
}

/// Answers SObject Collections writes with one result per submitted record.
/// A record with an empty `LastName` fails with REQUIRED_FIELD_MISSING; the
/// others get ids numbered from their `LastName`.
pub struct CollectionsResponder;

impl Respond for CollectionsResponder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let body: Value = match serde_json::from_slice(&request.body) {
            Ok(body) => body,
            Err(_) => return ResponseTemplate::new(400),
        };
        let results: Vec<Value> = body["records"]
            .as_array()
            .map(Vec::as_slice)
            .unwrap_or_default()
            .iter()
            .map(|record| match record["LastName"].as_str() {
                Some(name) if !name.is_empty() => json!({
                    "id": record["Id"].as_str().map(str::to_string).unwrap_or_else(|| {
                        record_id(name.trim_start_matches("Doe ").parse().unwrap_or(0))
                    }),
                    "success": true,
                    "errors": []
                }),
                _ => json!({
                    "id": null,
                    "success": false,
                    "errors": [{
                        "statusCode": "REQUIRED_FIELD_MISSING",
                        "message": "Required fields are missing: [LastName]",
                        "fields": ["LastName"]
                    }]
                }),
            })
            .collect();
        ResponseTemplate::new(200).set_body_json(results)
    }
}

/// One query page of `count` Contact rows starting at `from`.
pub fn contact_page(from: usize, count: usize, total: usize, next: Option<&str>) -> Value {
    let records: Vec<Value> = (from..from + count)
        .map(|i| {
            json!({
                "attributes": {
                    "type": "Contact",
                    "url": format!("{API}/sobjects/Contact/{}", record_id(i))
                },
                "Id": record_id(i),
                "LastName": format!("Doe {i}")
            })
        })
        .collect();
    json!({
        "totalSize": total,
        "done": next.is_none(),
        "nextRecordsUrl": next,
        "records": records
    })
}
