use thiserror::Error;

/// Top-level error type for the Confab system.
///
/// Subsystem crates either use this type directly or define their own error
/// types with `From<ConfabError>` impls so that the `?` operator works
/// seamlessly across crate boundaries.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfabError {
    #[error("Configuration error: {0}")]
    Config(String),

    /// Underlying persistence operation rejected. Never retried here;
    /// retry policy, if any, lives in the caller.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Network unreachable, DNS failure, connection reset.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Non-2xx HTTP response. Carries the status text and response body.
    #[error("Request failed with status {status}: {body}")]
    RequestFailed { status: String, body: String },

    /// A 2xx response that matches none of the known API dialects.
    #[error("Unexpected response format: {0}")]
    UnexpectedFormat(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for ConfabError {
    fn from(err: serde_json::Error) -> Self {
        ConfabError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for ConfabError {
    fn from(err: toml::de::Error) -> Self {
        ConfabError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for ConfabError {
    fn from(err: toml::ser::Error) -> Self {
        ConfabError::Config(err.to_string())
    }
}

impl From<base64::DecodeError> for ConfabError {
    fn from(err: base64::DecodeError) -> Self {
        ConfabError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for Confab operations.
pub type Result<T> = std::result::Result<T, ConfabError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ConfabError::Config("missing model".to_string());
        assert_eq!(err.to_string(), "Configuration error: missing model");

        let err = ConfabError::Storage("disk full".to_string());
        assert_eq!(err.to_string(), "Storage error: disk full");

        let err = ConfabError::Transport("connection refused".to_string());
        assert_eq!(err.to_string(), "Transport error: connection refused");
    }

    #[test]
    fn test_request_failed_carries_status_and_body() {
        let err = ConfabError::RequestFailed {
            status: "404 Not Found".to_string(),
            body: "model missing".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("404 Not Found"));
        assert!(msg.contains("model missing"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: ConfabError = io_err.into();
        assert!(matches!(err, ConfabError::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_serde_json_error_conversion() {
        let bad: std::result::Result<serde_json::Value, _> = serde_json::from_str("{ nope }");
        let err: ConfabError = bad.unwrap_err().into();
        assert!(matches!(err, ConfabError::Serialization(_)));
    }

    #[test]
    fn test_toml_error_conversion() {
        let bad: std::result::Result<toml::Value, _> = toml::from_str("invalid = [[[");
        let err: ConfabError = bad.unwrap_err().into();
        assert!(matches!(err, ConfabError::Config(_)));
    }

    #[test]
    fn test_result_type_with_question_mark() {
        fn inner() -> Result<i32> {
            let value: std::result::Result<i32, std::io::Error> = Ok(7);
            Ok(value?)
        }
        assert_eq!(inner().unwrap(), 7);
    }
}
