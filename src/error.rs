use std::time::Duration;
use thiserror::Error;

/// Why a one-shot position request produced no coordinate.
#[derive(Error, Debug)]
pub enum LocationError {
    #[error("location permission denied")]
    PermissionDenied,
    #[error("position unavailable: {0}")]
    Unavailable(String),
    #[error("timed out after {}ms", .0.as_millis())]
    Timeout(Duration),
}

#[derive(Error, Debug)]
pub enum GuardianError {
    #[error(transparent)]
    Location(#[from] LocationError),
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned {status}: {body}")]
    Server { status: u16, body: String },
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),
    #[error("invalid input: {0}")]
    Validation(String),
    #[error("{0} not found")]
    NotFound(String),
}

impl GuardianError {
    /// Reads a non-2xx response into a [`GuardianError::Server`].
    pub async fn from_response(resp: reqwest::Response) -> Self {
        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        Self::Server { status, body }
    }
}
