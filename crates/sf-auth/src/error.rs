//! Errors raised while obtaining or storing tokens.
//!
//! No variant carries a credential value. OAuth failures keep the server's
//! error code so callers can tell a revoked grant from a bad request.

use std::path::Path;

pub type Result<T> = std::result::Result<T, Error>;

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

    /// A token cache file could not be read, written or removed.
    pub(crate) fn cache(
        path: &Path,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        let message = format!("{}: {source}", path.display());
        Self::with_source(ErrorKind::Cache(message), source)
    }

    /// The OAuth `error` code, e.g. `invalid_grant`.
    pub fn oauth_code(&self) -> Option<&str> {
        match &self.kind {
            ErrorKind::OAuth { error, .. } => Some(error),
            _ => None,
        }
    }

    /// The grant was refused: wrong password, revoked refresh token or an
    /// unapproved JWT user. Asking again with the same input will not help.
    pub fn is_invalid_grant(&self) -> bool {
        self.oauth_code() == Some("invalid_grant")
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ErrorKind {
    /// The token endpoint answered with an OAuth error body.
    #[error("OAuth error: {error} - {description}")]
    OAuth { error: String, description: String },

    #[error("JWT error: {0}")]
    Jwt(String),

    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    /// The token endpoint could not be reached.
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Token cache error: {0}")]
    Cache(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("JSON error: {0}")]
    Json(String),

    #[error("Environment variable not set: {0}")]
    EnvVar(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        // Token endpoint URLs may carry credentials in the query.
        let message = if err.url().is_some_and(|url| url.query().is_some()) {
            "token request failed (URL redacted)".to_string()
        } else {
            err.to_string()
        };
        Error::with_source(ErrorKind::Http(message), err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::with_source(ErrorKind::Json(err.to_string()), err)
    }
}

impl From<serde_urlencoded::ser::Error> for Error {
    fn from(err: serde_urlencoded::ser::Error) -> Self {
        Error::with_source(ErrorKind::Other(err.to_string()), err)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::with_source(ErrorKind::Io(err.to_string()), err)
    }
}

impl From<jsonwebtoken::errors::Error> for Error {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        Error::with_source(ErrorKind::Jwt(err.to_string()), err)
    }
}

/// Token failures reach API callers through the transport.
impl From<Error> for sfkit_client::Error {
    fn from(err: Error) -> Self {
        sfkit_client::Error::with_source(sfkit_client::ErrorKind::Token(err.to_string()), err)
    }
}
