use thiserror::Error;

use crate::storage::StorageError;

pub type ServiceResult<T> = core::result::Result<T, ServiceError>;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    FromString(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("Jira returned HTTP {status}: {message}")]
    Api { status: u16, message: String },
    #[error("Jira rejected the credentials for {0}")]
    InvalidCredentials(String),
    #[error("Jira is not configured: missing {0}")]
    MissingJiraSetting(&'static str),
    #[error("invalid epic key '{0}'")]
    InvalidEpicKey(String),
    #[error("quarter must be between 1 and 4, got {0}")]
    InvalidQuarter(u8),
    #[error("no roadmap configuration; run `init` first")]
    NotInitialized,
    #[error("{0}")]
    IoError(#[from] std::io::Error),
    #[error("{0}")]
    SerdeJsonError(#[from] serde_json::Error),
    #[error("{0}")]
    Storage(#[from] StorageError),
    #[error("prompt failed: {0}")]
    Prompt(#[from] dialoguer::Error),
}

impl ServiceError {
    /// True for HTTP 4xx responses, which the epic lookup treats as "try the fallback query".
    pub fn is_client_error(&self) -> bool {
        matches!(self, ServiceError::Api { status, .. } if (400..500).contains(status))
    }
}
