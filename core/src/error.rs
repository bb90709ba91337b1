//! Error types for the fetch-please client.
//!
//! # Design
//! Three kinds are raised synchronously by `FetchPlease::request` before any
//! transport handle exists: `TransportUnavailable`,
//! `AsyncPrimitiveUnavailable` and `UnknownMethod`. `InvalidData` is also
//! synchronous but happens after the handle is opened; the handle is dropped
//! without being registered. Everything else settles a `ResponseFuture` and
//! passes through the configured error stage.

use thiserror::Error;

/// Errors produced while issuing or settling a request.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// No transport factory was configured on the client.
    #[error("Transport constructor not found")]
    TransportUnavailable,

    /// `request` was called outside a Tokio runtime context.
    #[error("Async runtime not found")]
    AsyncPrimitiveUnavailable,

    /// The method is not one of GET, PUT, POST or DELETE.
    #[error("Unknown HTTP method: {0}")]
    UnknownMethod(String),

    /// The request body could not be serialized to JSON.
    #[error("Invalid data for sending: {0}")]
    InvalidData(String),

    /// The response status was outside 200..=299.
    #[error("Unacceptable HTTP code: {0}")]
    UnacceptableHttpCode(u16),

    /// The response claimed to be JSON but did not parse.
    #[error("Invalid JSON: {0}")]
    JsonParseError(String),

    #[error("Connection timeout")]
    ConnectionTimeout,

    #[error("Resource has been aborted")]
    Aborted,

    #[error("Resource failed to load")]
    TransportFailed,
}

impl FetchError {
    /// Status code carried by `UnacceptableHttpCode`, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::UnacceptableHttpCode(status) => Some(*status),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unacceptable_http_code_display_carries_status() {
        let err = FetchError::UnacceptableHttpCode(404);
        assert_eq!(err.to_string(), "Unacceptable HTTP code: 404");
        assert_eq!(err.status(), Some(404));
    }

    #[test]
    fn lifecycle_errors_display() {
        assert_eq!(FetchError::ConnectionTimeout.to_string(), "Connection timeout");
        assert_eq!(FetchError::Aborted.to_string(), "Resource has been aborted");
        assert_eq!(FetchError::TransportFailed.to_string(), "Resource failed to load");
        assert_eq!(FetchError::Aborted.status(), None);
    }

    #[test]
    fn unknown_method_display() {
        let err = FetchError::UnknownMethod("FETCH".to_string());
        assert_eq!(err.to_string(), "Unknown HTTP method: FETCH");
    }

    #[test]
    fn json_error_converts_into_parse_error_message() {
        let parse: Result<serde_json::Value, _> = serde_json::from_str("{blah}");
        let err = FetchError::JsonParseError(parse.unwrap_err().to_string());
        assert!(err.to_string().starts_with("Invalid JSON: "));
    }
}
