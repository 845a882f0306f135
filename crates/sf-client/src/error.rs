//! Transport errors.
//!
//! Every failed call ends up as one [`ErrorKind`]. Salesforce error bodies
//! keep their `errorCode`; callers branch on the code rather than the status.

use std::time::Duration;

pub type Result<T> = std::result::Result<T, Error>;

/// Salesforce error codes worth another attempt.
const TRANSIENT_CODES: &[&str] = &["UNABLE_TO_LOCK_ROW", "SERVER_UNAVAILABLE"];
const INVALID_SESSION: &str = "INVALID_SESSION_ID";
const LIMIT_EXCEEDED: &str = "REQUEST_LIMIT_EXCEEDED";

#[derive(Debug, thiserror::Error)]
#[error("{kind}")]
pub struct Error {
    pub kind: ErrorKind,
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl Error {
    pub fn new(kind: ErrorKind) -> Self {
        Self { kind, source: None }
    }

    pub fn with_source(
        kind: ErrorKind,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            source: Some(Box::new(source)),
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self.kind, ErrorKind::RateLimited { .. })
    }

    /// The call was stopped by its cancellation token.
    pub fn is_cancelled(&self) -> bool {
        matches!(self.kind, ErrorKind::Cancelled)
    }

    /// The bearer token was rejected; a fresh token may succeed.
    pub fn is_session_invalid(&self) -> bool {
        match &self.kind {
            ErrorKind::Authentication(_) => true,
            ErrorKind::SalesforceApi { status, error_code, .. } => {
                *status == 401 || error_code == INVALID_SESSION
            }
            _ => false,
        }
    }

    /// The org's rolling API request allowance is used up.
    pub fn is_limit_exceeded(&self) -> bool {
        self.error_code() == Some(LIMIT_EXCEEDED)
    }

    /// `errorCode` of a Salesforce error body.
    pub fn error_code(&self) -> Option<&str> {
        match &self.kind {
            ErrorKind::SalesforceApi { error_code, .. } => Some(error_code),
            _ => None,
        }
    }

    pub fn retry_after(&self) -> Option<Duration> {
        match &self.kind {
            ErrorKind::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }

    /// HTTP status behind this error, when the server answered.
    pub fn status(&self) -> Option<u16> {
        match &self.kind {
            ErrorKind::Http { status, .. } => Some(*status),
            ErrorKind::RateLimited { .. } => Some(429),
            ErrorKind::Authentication(_) => Some(401),
            ErrorKind::Authorization(_) => Some(403),
            ErrorKind::NotFound(_) => Some(404),
            ErrorKind::SalesforceApi { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ErrorKind {
    /// A non-2xx status without a Salesforce error body.
    #[error("HTTP error: {status} {message}")]
    Http { status: u16, message: String },

    #[error("Rate limited{}", retry_after.map(|d| format!(", retry after {:?}", d)).unwrap_or_default())]
    RateLimited { retry_after: Option<Duration> },

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Authorization error: {0}")]
    Authorization(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("JSON error: {0}")]
    Json(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Configuration error: {0}")]
    Config(String),

    /// The first entry of a Salesforce `[{errorCode, message, fields}]` body.
    #[error("Salesforce API error: {error_code} - {message}")]
    SalesforceApi {
        status: u16,
        error_code: String,
        message: String,
        fields: Vec<String>,
    },

    #[error("All {attempts} retry attempts exhausted")]
    RetriesExhausted { attempts: u32 },

    /// The cancellation token fired before or during the call.
    #[error("Operation cancelled")]
    Cancelled,

    /// The token source could not supply a bearer token.
    #[error("Token error: {0}")]
    Token(String),

    #[error("{0}")]
    Other(String),
}

impl ErrorKind {
    pub fn is_retryable(&self) -> bool {
        match self {
            ErrorKind::RateLimited { .. } | ErrorKind::Timeout | ErrorKind::Connection(_) => true,
            ErrorKind::Http { status, .. } => matches!(status, 429 | 500 | 502 | 503 | 504),
            ErrorKind::SalesforceApi { error_code, .. } => {
                TRANSIENT_CODES.contains(&error_code.as_str())
            }
            _ => false,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            ErrorKind::Timeout
        } else if err.is_connect() {
            ErrorKind::Connection(err.to_string())
        } else if let Some(status) = err.status() {
            ErrorKind::Http {
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else {
            ErrorKind::Other(err.to_string())
        };

        Error::with_source(kind, err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::with_source(ErrorKind::Json(err.to_string()), err)
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Error::with_source(ErrorKind::InvalidUrl(err.to_string()), err)
    }
}
