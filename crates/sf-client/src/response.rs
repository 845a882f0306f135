//! HTTP response wrapper and Salesforce error body parsing.

use serde::de::DeserializeOwned;
use std::sync::LazyLock;
use std::time::Duration;

use crate::error::{Error, ErrorKind, Result};

/// Wrapper around a reqwest response.
#[derive(Debug)]
pub struct Response {
    inner: reqwest::Response,
}

impl Response {
    pub(crate) fn new(inner: reqwest::Response) -> Self {
        Self { inner }
    }

    /// Get the HTTP status code.
    pub fn status(&self) -> u16 {
        self.inner.status().as_u16()
    }

    /// Returns true if the response status is 2xx.
    pub fn is_success(&self) -> bool {
        self.inner.status().is_success()
    }

    /// Get a header value.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.inner.headers().get(name)?.to_str().ok()
    }

    /// `Retry-After` in seconds. HTTP-date values are ignored.
    pub fn retry_after(&self) -> Option<Duration> {
        parse_retry_after(self.header("retry-after")?)
    }

    /// `Sforce-Locator` (Bulk API result paging).
    pub fn sforce_locator(&self) -> Option<&str> {
        self.header("sforce-locator")
            .filter(|locator| !locator.is_empty() && *locator != "null")
    }

    /// Response body as text.
    pub async fn text(self) -> Result<String> {
        self.inner.text().await.map_err(Into::into)
    }

    /// Response body as bytes.
    pub async fn bytes(self) -> Result<bytes::Bytes> {
        self.inner.bytes().await.map_err(Into::into)
    }

    /// Deserialize the body as JSON.
    pub async fn json<T: DeserializeOwned>(self) -> Result<T> {
        let body = self.inner.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// API usage from the `Sforce-Limit-Info` header (`api-usage=25/15000`).
    pub fn api_usage(&self) -> Option<ApiUsage> {
        parse_api_usage(self.header("sforce-limit-info")?)
    }
}

pub(crate) fn parse_retry_after(value: &str) -> Option<Duration> {
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}

fn parse_api_usage(info: &str) -> Option<ApiUsage> {
    let usage = info
        .split(',')
        .map(str::trim)
        .find_map(|part| part.strip_prefix("api-usage="))?;
    let (used, limit) = usage.split_once('/')?;
    Some(ApiUsage {
        used: used.parse().ok()?,
        limit: limit.parse().ok()?,
    })
}

/// API usage information from response headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApiUsage {
    /// Number of API calls used.
    pub used: u64,
    /// Total API call limit.
    pub limit: u64,
}

impl ApiUsage {
    /// Remaining API calls.
    pub fn remaining(&self) -> u64 {
        self.limit.saturating_sub(self.used)
    }

    /// Usage as a percentage of the limit.
    pub fn percentage(&self) -> f64 {
        if self.limit == 0 {
            100.0
        } else {
            (self.used as f64 / self.limit as f64) * 100.0
        }
    }

    /// Returns true if usage is at or above the given percentage.
    pub fn is_above_threshold(&self, threshold_percent: f64) -> bool {
        self.percentage() >= threshold_percent
    }
}

/// Extension trait turning non-2xx responses into typed errors.
pub trait ResponseExt {
    /// Pass 2xx responses through; read and classify everything else.
    fn check_salesforce_error(self) -> impl std::future::Future<Output = Result<Response>> + Send;
}

impl ResponseExt for Response {
    async fn check_salesforce_error(self) -> Result<Response> {
        if self.is_success() {
            return Ok(self);
        }
        let status = self.status();
        let retry_after = self.retry_after();
        let body = self.text().await.unwrap_or_default();
        let mut err = parse_error_response(status, &body);
        if let ErrorKind::RateLimited { retry_after: slot } = &mut err.kind {
            *slot = retry_after;
        }
        Err(err)
    }
}

/// Classify an error body. Salesforce answers with either a JSON array of
/// `{errorCode, message, fields}` or a single such object.
pub(crate) fn parse_error_response(status: u16, body: &str) -> Error {
    if status == 429 {
        return Error::new(ErrorKind::RateLimited { retry_after: None });
    }

    let first = serde_json::from_str::<Vec<SalesforceErrorResponse>>(body)
        .ok()
        .and_then(|errors| errors.into_iter().next())
        .or_else(|| serde_json::from_str::<SalesforceErrorResponse>(body).ok());

    if let Some(err) = first {
        return Error::new(ErrorKind::SalesforceApi {
            status,
            error_code: err.error_code,
            message: sanitize_error_message(&err.message),
            fields: err.fields.unwrap_or_default(),
        });
    }

    let sanitized = sanitize_error_message(body);
    let kind = match status {
        401 => ErrorKind::Authentication(sanitized),
        403 => ErrorKind::Authorization(sanitized),
        404 => ErrorKind::NotFound(sanitized),
        _ => ErrorKind::Http {
            status,
            message: sanitized,
        },
    };
    Error::new(kind)
}

static TOKEN_PATTERN: LazyLock<Option<regex_lite::Regex>> =
    LazyLock::new(|| regex_lite::Regex::new(r"00[A-Za-z0-9]{13,}[!][A-Za-z0-9_.]+").ok());

static SESSION_PATTERN: LazyLock<Option<regex_lite::Regex>> =
    LazyLock::new(|| regex_lite::Regex::new(r"sid=[A-Za-z0-9]{20,}").ok());

/// Redact access tokens and session ids, cap the length at 500 bytes.
pub(crate) fn sanitize_error_message(message: &str) -> String {
    const MAX_LENGTH: usize = 500;

    let mut sanitized = message.to_string();
    if let Some(re) = TOKEN_PATTERN.as_ref() {
        sanitized = re.replace_all(&sanitized, "[REDACTED_TOKEN]").into_owned();
    }
    if let Some(re) = SESSION_PATTERN.as_ref() {
        sanitized = re.replace_all(&sanitized, "sid=[REDACTED]").into_owned();
    }

    if sanitized.len() > MAX_LENGTH {
        let mut cut = MAX_LENGTH;
        while !sanitized.is_char_boundary(cut) {
            cut -= 1;
        }
        sanitized.truncate(cut);
        sanitized.push_str("...[truncated]");
    }
    sanitized
}

#[derive(Debug, serde::Deserialize)]
struct SalesforceErrorResponse {
    #[serde(alias = "errorCode")]
    error_code: String,
    message: String,
    fields: Option<Vec<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_usage() {
        let usage = parse_api_usage("api-usage=100/1000").unwrap();
        assert_eq!(usage, ApiUsage { used: 100, limit: 1000 });
        assert_eq!(usage.remaining(), 900);
        assert!((usage.percentage() - 10.0).abs() < 0.001);
        assert!(!usage.is_above_threshold(50.0));

        let usage = parse_api_usage("per-app-api-usage=1/10, api-usage=7/15000").unwrap();
        assert_eq!(usage.used, 7);

        assert!(parse_api_usage("api-usage=garbage").is_none());
    }

    #[test]
    fn test_api_usage_zero_limit() {
        let usage = ApiUsage { used: 0, limit: 0 };
        assert_eq!(usage.remaining(), 0);
        assert!((usage.percentage() - 100.0).abs() < 0.001);
    }

    #[test]
    fn test_retry_after_parsing() {
        assert_eq!(parse_retry_after("30"), Some(Duration::from_secs(30)));
        assert_eq!(parse_retry_after("Wed, 21 Oct 2015 07:28:00 GMT"), None);
    }

    #[test]
    fn test_sanitize_redacts_access_tokens() {
        let msg = "Session expired: 00Dxx0000001gEF!AQcAQH3k9s7LKbp_example_token_value.here";
        let sanitized = sanitize_error_message(msg);
        assert!(sanitized.contains("[REDACTED_TOKEN]"), "{sanitized}");
        assert!(!sanitized.contains("AQcAQH3k9s7LKbp"), "{sanitized}");
    }

    #[test]
    fn test_sanitize_redacts_session_ids() {
        let sanitized = sanitize_error_message("Invalid session: sid=abc123def456ghi789jkl012");
        assert!(sanitized.contains("sid=[REDACTED]"), "{sanitized}");
        assert!(!sanitized.contains("abc123def456"), "{sanitized}");
    }

    #[test]
    fn test_sanitize_truncates_long_messages() {
        let sanitized = sanitize_error_message(&"é".repeat(400));
        assert!(sanitized.ends_with("...[truncated]"));
        assert!(sanitized.len() <= 500 + "...[truncated]".len());
    }

    #[test]
    fn test_sanitize_passes_through_clean_messages() {
        let msg = "No such column 'foo' on entity 'Account'";
        assert_eq!(sanitize_error_message(msg), msg);
    }

    #[test]
    fn test_parse_error_array_keeps_status() {
        let body = r#"[{"errorCode":"INVALID_FIELD","message":"No such column","fields":["Foo"]}]"#;
        let err = parse_error_response(400, body);
        match err.kind {
            ErrorKind::SalesforceApi {
                status,
                error_code,
                fields,
                ..
            } => {
                assert_eq!(status, 400);
                assert_eq!(error_code, "INVALID_FIELD");
                assert_eq!(fields, vec!["Foo".to_string()]);
            }
            other => panic!("unexpected kind: {other:?}"),
        }
    }

    #[test]
    fn test_parse_error_single_object() {
        let body = r#"{"errorCode":"NOT_FOUND","message":"The requested resource does not exist"}"#;
        let err = parse_error_response(404, body);
        assert_eq!(err.status(), Some(404));
        assert!(matches!(err.kind, ErrorKind::SalesforceApi { .. }));
    }

    #[test]
    fn test_parse_error_falls_back_to_status() {
        assert!(matches!(
            parse_error_response(401, "Session expired or invalid").kind,
            ErrorKind::Authentication(_)
        ));
        assert!(matches!(
            parse_error_response(404, "").kind,
            ErrorKind::NotFound(_)
        ));
        assert!(matches!(
            parse_error_response(400, "[]").kind,
            ErrorKind::Http { status: 400, .. }
        ));
        assert!(parse_error_response(429, "").is_rate_limited());
    }
}
