//! Error types for the orchestration layer.

use confab_core::error::ConfabError;

/// Errors surfaced by orchestrator workflows.
///
/// Gateway failures during send-message never appear here: they are absorbed
/// into a visible assistant message. Local-storage failures always do, since
/// silent loss of durability is worse than a visible failure.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    /// No API configuration has been saved yet; the caller should redirect
    /// to the configuration step.
    #[error("no API configuration saved")]
    ConfigRequired,
    #[error("invalid API configuration: {0}")]
    InvalidConfig(String),
    #[error("storage error: {0}")]
    Storage(String),
    #[error("gateway error: {0}")]
    Gateway(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ConfabError> for ChatError {
    fn from(err: ConfabError) -> Self {
        match err {
            ConfabError::Storage(msg) => ChatError::Storage(msg),
            ConfabError::Config(msg) => ChatError::InvalidConfig(msg),
            ConfabError::Io(e) => ChatError::Io(e),
            other => ChatError::Gateway(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_error_display() {
        assert_eq!(
            ChatError::ConfigRequired.to_string(),
            "no API configuration saved"
        );
        assert_eq!(
            ChatError::InvalidConfig("empty host".to_string()).to_string(),
            "invalid API configuration: empty host"
        );
        assert_eq!(
            ChatError::Storage("disk full".to_string()).to_string(),
            "storage error: disk full"
        );
    }

    #[test]
    fn test_storage_error_maps_to_storage() {
        let err: ChatError = ConfabError::Storage("locked".to_string()).into();
        assert!(matches!(err, ChatError::Storage(_)));
        assert!(err.to_string().contains("locked"));
    }

    #[test]
    fn test_gateway_errors_map_to_gateway() {
        let err: ChatError = ConfabError::Transport("refused".to_string()).into();
        assert!(matches!(err, ChatError::Gateway(_)));

        let err: ChatError = ConfabError::RequestFailed {
            status: "500 Internal Server Error".to_string(),
            body: "oops".to_string(),
        }
        .into();
        assert!(matches!(err, ChatError::Gateway(_)));
        assert!(err.to_string().contains("500"));
    }

    #[test]
    fn test_io_error_passes_through() {
        let err: ChatError =
            ConfabError::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "gone")).into();
        assert!(matches!(err, ChatError::Io(_)));
    }
}
