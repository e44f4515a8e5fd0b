//! Upload failure taxonomy. None of these reach the user; they are logged and counted.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum UploadError {
    /// Curl reported an error (connection refused, timeout, DNS, ...).
    #[error("transport: {0}")]
    Transport(#[from] curl::Error),
    /// The archive answered with something other than 200.
    #[error("archive returned HTTP {0}")]
    Status(u32),
    /// Status 200 but the body is not JSON. Keeps the raw text for diagnosis.
    #[error("JSON decoding failed: {source}")]
    Decode {
        raw: String,
        #[source]
        source: serde_json::Error,
    },
    /// The archive answered `{"error": ...}`.
    #[error("archive rejected upload: {0}")]
    Rejected(serde_json::Value),
    /// Valid JSON, but not an object.
    #[error("unexpected response shape: expected a JSON object")]
    UnexpectedShape { raw: String },
    /// The blocking upload task panicked or was cancelled.
    #[error("upload task failed: {0}")]
    Task(String),
}

impl UploadError {
    /// Raw response text when the failure happened after a response arrived.
    pub fn raw_response(&self) -> Option<&str> {
        match self {
            UploadError::Decode { raw, .. } | UploadError::UnexpectedShape { raw } => Some(raw),
            _ => None,
        }
    }
}
