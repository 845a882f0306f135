//! Error types for sfkit-rest.

pub type Result<T> = std::result::Result<T, Error>;

/// Error returned by REST operations.
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

    /// The transport error behind a [`ErrorKind::Client`] failure.
    pub fn client_error(&self) -> Option<&sfkit_client::Error> {
        match self.kind {
            ErrorKind::Client(_) => self.source.as_deref()?.downcast_ref(),
            _ => None,
        }
    }

    /// HTTP status of the failed call, when the server answered.
    pub fn status(&self) -> Option<u16> {
        self.client_error()?.status()
    }

    /// True when the call was stopped by its cancellation token.
    pub fn is_cancelled(&self) -> bool {
        self.client_error().is_some_and(|err| err.is_cancelled())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ErrorKind {
    #[error("Client error: {0}")]
    Client(String),

    /// A collection operation was called with no records or ids.
    #[error("must have at least 1 record")]
    ZeroRecords,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The batch logger asked to stop.
    #[error("Batch logger error: {0}")]
    Hook(String),

    #[error("Expected {expected} results for batch, received {actual}")]
    ResultMismatch { expected: usize, actual: usize },

    #[error("JSON error: {0}")]
    Json(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

impl From<sfkit_client::Error> for Error {
    fn from(err: sfkit_client::Error) -> Self {
        Error::with_source(ErrorKind::Client(err.to_string()), err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::with_source(ErrorKind::Json(err.to_string()), err)
    }
}
