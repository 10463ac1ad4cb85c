use thiserror::Error;

/// Failure of the remote collaborator itself (network, timeout, HTTP status).
///
/// Carried through the coordinator untouched so callers can still inspect the
/// status code, e.g. to treat a 404 as "available".
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("transport error{}: {message}", .status.map(|s| format!(" ({s})")).unwrap_or_default())]
pub struct TransportError {
    pub status: Option<u16>,
    pub message: String,
}

impl TransportError {
    pub fn new(status: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn status(&self) -> Option<u16> {
        self.status
    }

    pub fn is_not_found(&self) -> bool {
        self.status == Some(404)
    }
}

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error(transparent)]
    TransportError(#[from] TransportError),
    #[error("{0}")]
    MalformedResponse(String),
    #[error("Remote rejected request: {0}")]
    Rejected(String),
    #[error("Rollback invariant violated: {0}")]
    RollbackInvariant(String),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Background task failed: {0}")]
    TaskFailed(#[from] tokio::task::JoinError),
}

impl CacheError {
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedResponse(message.into())
    }

    /// The transport failure behind this error, if any.
    pub fn transport(&self) -> Option<&TransportError> {
        match self {
            Self::TransportError(e) => Some(e),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, CacheError>;
