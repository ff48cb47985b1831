use thiserror::Error;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Render error: {0}")]
    RenderError(String),

    #[error("Transfer error: {0}")]
    TransferError(String),

    #[error("Encode error: {0}")]
    EncodeError(String),

    #[error("Invalid control message: {0}")]
    InvalidControl(String),

    #[error("Connection error [{client_id}]: {reason}")]
    ConnectionError { client_id: String, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AppError {
    /// Whether the peer went away, as opposed to a failure on our side
    pub fn is_disconnect(&self) -> bool {
        matches!(self, AppError::ConnectionError { .. })
    }

    pub(crate) fn connection(client_id: &str, reason: impl std::fmt::Display) -> Self {
        AppError::ConnectionError {
            client_id: client_id.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disconnect_classification() {
        assert!(AppError::connection("abc", "broken pipe").is_disconnect());
        assert!(!AppError::EncodeError("bad frame".into()).is_disconnect());
        assert!(!AppError::Internal("encode task failed".into()).is_disconnect());
        assert!(!AppError::RenderError("nan pose".into()).is_disconnect());
    }

    #[test]
    fn test_connection_error_display() {
        let err = AppError::connection("client-1", "broken pipe");
        assert_eq!(
            err.to_string(),
            "Connection error [client-1]: broken pipe"
        );
    }
}
