use thiserror::Error;

/// Failures below the service contract: the request never produced a usable body.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    Transport(String),
    #[error("Failed to parse response from backend: {0}")]
    MalformedResponse(String),
    #[error("{0}")]
    Rejected(String),
}

impl From<reqwest::Error> for ServiceError {
    fn from(err: reqwest::Error) -> Self {
        ServiceError::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(err: serde_json::Error) -> Self {
        ServiceError::MalformedResponse(err.to_string())
    }
}
