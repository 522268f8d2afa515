use reqwest::StatusCode;
use thiserror::Error;

/// Errors from the remote search/upload boundary.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Transport failure before a response could be read.
    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),

    /// The service answered with something that is not the JSON we asked
    /// for. Keeps the status line and the head of the raw body so the
    /// failure can be diagnosed from the rendered message alone.
    #[error("{status}: {detail}")]
    Parse { status: StatusCode, detail: String },

    /// The service reported an upload failure; the message is whatever the
    /// response body carried.
    #[error("upload failed: {0}")]
    Upload(String),

    /// The request was superseded. Not a reported error; callers treat this
    /// outcome as a no-op.
    #[error("request cancelled")]
    Cancelled,
}

impl ApiError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ApiError::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_message_carries_status() {
        let err = ApiError::Parse {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            detail: "expected JSON, got text/html: <html>".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("500"), "message should carry the status: {}", msg);
        assert!(msg.contains("text/html"));
    }

    #[test]
    fn test_cancelled_is_distinguished() {
        assert!(ApiError::Cancelled.is_cancelled());
        assert!(!ApiError::Upload("boom".into()).is_cancelled());
    }
}
