use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PageSyncError {
    #[error("durable store is unavailable")]
    StoreUnavailable,
    #[error("failed to read `{key}` from durable store: {message}")]
    StoreRead { key: String, message: String },
    #[error("failed to write `{key}` to durable store: {message}")]
    StoreWrite { key: String, message: String },
    #[error("dom operation failed: {0}")]
    Dom(String),
    #[error("clipboard write failed: {0}")]
    Clipboard(String),
    #[error("download failed: {0}")]
    Download(String),
    #[error("push transport failed: {0}")]
    Transport(String),
    #[error("malformed `{event}` payload: {message}")]
    Payload { event: String, message: String },
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl PageSyncError {
    pub fn dom(message: impl Into<String>) -> Self {
        Self::Dom(message.into())
    }

    pub fn payload(event: &str, error: impl std::fmt::Display) -> Self {
        Self::Payload {
            event: event.to_string(),
            message: error.to_string(),
        }
    }
}

pub type Result<T, E = PageSyncError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_error_names_event() {
        let error = PageSyncError::payload("phx:download", "missing field `filename`");
        assert_eq!(
            error.to_string(),
            "malformed `phx:download` payload: missing field `filename`"
        );
    }

    #[test]
    fn store_errors_name_key() {
        let error = PageSyncError::StoreWrite {
            key: "theme".to_string(),
            message: "QuotaExceededError".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "failed to write `theme` to durable store: QuotaExceededError"
        );
    }
}
