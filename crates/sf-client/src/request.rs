//! HTTP request description passed to a [`Transport`](crate::Transport).

use bytes::Bytes;
use serde::Serialize;
use std::collections::HashMap;

use crate::error::Result;

/// HTTP request method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestMethod {
    Get,
    Post,
    Patch,
    Put,
    Delete,
}

impl RequestMethod {
    /// Convert to reqwest::Method.
    pub fn to_reqwest(self) -> reqwest::Method {
        match self {
            RequestMethod::Get => reqwest::Method::GET,
            RequestMethod::Post => reqwest::Method::POST,
            RequestMethod::Patch => reqwest::Method::PATCH,
            RequestMethod::Put => reqwest::Method::PUT,
            RequestMethod::Delete => reqwest::Method::DELETE,
        }
    }

    /// Upper-case method name.
    pub fn as_str(self) -> &'static str {
        match self {
            RequestMethod::Get => "GET",
            RequestMethod::Post => "POST",
            RequestMethod::Patch => "PATCH",
            RequestMethod::Put => "PUT",
            RequestMethod::Delete => "DELETE",
        }
    }

    /// GET, PUT and DELETE can be repeated without changing the outcome.
    pub fn is_idempotent(self) -> bool {
        matches!(
            self,
            RequestMethod::Get | RequestMethod::Put | RequestMethod::Delete
        )
    }
}

impl std::fmt::Display for RequestMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single API request.
///
/// `url` may be a full URL, an instance-relative path (`/services/...`) or
/// a path relative to the versioned REST root (`composite/sobjects`); the
/// transport resolves it.
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    pub(crate) method: RequestMethod,
    pub(crate) url: String,
    pub(crate) headers: HashMap<String, String>,
    pub(crate) query_params: Vec<(String, String)>,
    pub(crate) body: Option<RequestBody>,
    pub(crate) bearer_token: Option<String>,
}

/// Request body content.
#[derive(Debug, Clone)]
pub enum RequestBody {
    Json(serde_json::Value),
    Text(String),
    Bytes(Bytes),
    Form(Vec<(String, String)>),
}

impl RequestBuilder {
    /// Create a new request.
    pub fn new(method: RequestMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HashMap::new(),
            query_params: Vec::new(),
            body: None,
            bearer_token: None,
        }
    }

    /// Set the bearer token explicitly. Transports with a token source
    /// overwrite it.
    pub fn bearer_auth(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    /// Add a header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Add a query parameter.
    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query_params.push((name.into(), value.into()));
        self
    }

    /// Set JSON body.
    pub fn json<T: Serialize + ?Sized>(self, body: &T) -> Result<Self> {
        let value = serde_json::to_value(body)?;
        Ok(self.json_value(value))
    }

    /// Set an already serialized JSON body.
    pub fn json_value(mut self, body: serde_json::Value) -> Self {
        self.body = Some(RequestBody::Json(body));
        self.headers
            .insert("Content-Type".to_string(), "application/json".to_string());
        self
    }

    /// Set bytes body with an explicit content type.
    pub fn bytes(mut self, body: impl Into<Bytes>, content_type: &str) -> Self {
        self.body = Some(RequestBody::Bytes(body.into()));
        self.headers
            .insert("Content-Type".to_string(), content_type.to_string());
        self
    }

    /// Set URL-encoded form body.
    pub fn form(mut self, data: Vec<(String, String)>) -> Self {
        self.body = Some(RequestBody::Form(data));
        self.headers.insert(
            "Content-Type".to_string(),
            "application/x-www-form-urlencoded".to_string(),
        );
        self
    }

    /// Set CSV body (Bulk API uploads).
    pub fn csv(mut self, data: impl Into<String>) -> Self {
        self.body = Some(RequestBody::Text(data.into()));
        self.headers
            .insert("Content-Type".to_string(), "text/csv".to_string());
        self
    }

    /// Ask for a CSV response.
    pub fn accept_csv(self) -> Self {
        self.header("Accept", "text/csv")
    }

    /// Set `Sforce-Query-Options` (query page size).
    pub fn sforce_query_options(self, batch_size: usize) -> Self {
        self.header("Sforce-Query-Options", format!("batchSize={}", batch_size))
    }

    /// The request method.
    pub fn method(&self) -> RequestMethod {
        self.method
    }

    /// The request URL or path as given.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Look up a header value set on this request.
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Query parameters added through [`RequestBuilder::query`].
    pub fn query_params(&self) -> &[(String, String)] {
        &self.query_params
    }

    /// The JSON body, if this request carries one.
    pub fn json_body(&self) -> Option<&serde_json::Value> {
        match &self.body {
            Some(RequestBody::Json(value)) => Some(value),
            _ => None,
        }
    }

    /// The request body.
    pub fn body(&self) -> Option<&RequestBody> {
        self.body.as_ref()
    }
}
