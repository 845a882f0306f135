//! Bulk job errors.

use std::time::Duration;

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

    /// The transport error underneath, if this came from a call.
    pub fn client_error(&self) -> Option<&sfkit_client::Error> {
        self.source.as_deref()?.downcast_ref()
    }

    pub fn is_cancelled(&self) -> bool {
        self.client_error().is_some_and(sfkit_client::Error::is_cancelled)
    }

    /// The job this error is about, when one was already created.
    pub fn job_id(&self) -> Option<&str> {
        match &self.kind {
            ErrorKind::Upload { job_id } | ErrorKind::Timeout { job_id, .. } => Some(job_id),
            _ => None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ErrorKind {
    #[error("Client error: {0}")]
    Client(String),

    /// Rejected before any request: bad operation, object name, field or id.
    #[error("Invalid job: {0}")]
    InvalidJob(String),

    #[error("CSV error: {0}")]
    Csv(String),

    /// The job was created but its data could not be uploaded.
    #[error("Upload to job {job_id} failed")]
    Upload { job_id: String },

    /// The job was still running when the wait gave up. It keeps running
    /// server side.
    #[error("Job {job_id} did not finish within {waited:?}")]
    Timeout { job_id: String, waited: Duration },
}

impl From<sfkit_client::Error> for Error {
    fn from(err: sfkit_client::Error) -> Self {
        Error::with_source(ErrorKind::Client(err.to_string()), err)
    }
}

impl From<csv::Error> for Error {
    fn from(err: csv::Error) -> Self {
        Error::with_source(ErrorKind::Csv(err.to_string()), err)
    }
}
