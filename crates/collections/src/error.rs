//! Error types for collection operations.
//!
//! Every failure a collection can hit is one of the variants of
//! [`CollectionError`]. The strict (`try_*`) client operations return them
//! directly; the legacy operations forward them to the diagnostics sink and
//! degrade to a safe default value.

// Error enum variant fields are self-documenting via their #[error(...)] messages
#![allow(missing_docs)]

use thiserror::Error;

/// The primary error type for all collection operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CollectionError {
    /// The connection configuration is missing or empty.
    #[error("invalid connection config: {message}")]
    ConfigInvalid { message: String },

    /// The collection declares no index name or document type.
    #[error("invalid collection schema for {collection}: {message}")]
    SchemaInvalid { collection: String, message: String },

    /// No connection handle exists, or the engine did not answer a ping.
    #[error("search engine unavailable: {message}")]
    EngineUnavailable { message: String },

    /// The engine call failed (network, malformed query, engine-side rejection).
    #[error("{operation} request failed: {message}")]
    RequestFailed { operation: String, message: String },

    /// A condition or order spec handed to the builder is malformed.
    #[error("invalid input for {field}: {message}")]
    InvalidInput { field: String, message: String },
}

impl CollectionError {
    pub(crate) fn request_failed(operation: &str, error: impl std::fmt::Display) -> Self {
        Self::RequestFailed {
            operation: operation.to_string(),
            message: error.to_string(),
        }
    }

    pub(crate) fn invalid_input(field: &str, message: impl Into<String>) -> Self {
        Self::InvalidInput {
            field: field.to_string(),
            message: message.into(),
        }
    }

    /// Returns the short name of the error category.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ConfigInvalid { .. } => "ConfigInvalid",
            Self::SchemaInvalid { .. } => "SchemaInvalid",
            Self::EngineUnavailable { .. } => "EngineUnavailable",
            Self::RequestFailed { .. } => "RequestFailed",
            Self::InvalidInput { .. } => "InvalidInput",
        }
    }
}

/// Errors raised by a [`SearchGateway`](crate::gateway::SearchGateway) call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// The request never produced a response (connection refused, timeout, TLS).
    #[error("transport error: {0}")]
    Transport(String),

    /// The engine answered with a non-success status.
    #[error("engine rejected request (status {status}): {body}")]
    Rejected { status: u16, body: String },

    /// The response body could not be decoded.
    #[error("failed to decode response: {0}")]
    Decode(String),
}

/// Result type for collection operations.
pub type CollectionResult<T> = Result<T, CollectionError>;

/// Result type for gateway calls.
pub type GatewayResult<T> = Result<T, GatewayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CollectionError::InvalidInput {
            field: "age".to_string(),
            message: "BETWEEN expects two bounds".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "invalid input for age: BETWEEN expects two bounds"
        );

        let err = CollectionError::request_failed(
            "search",
            GatewayError::Rejected {
                status: 400,
                body: "parsing_exception".to_string(),
            },
        );
        assert_eq!(
            err.to_string(),
            "search request failed: engine rejected request (status 400): parsing_exception"
        );
    }

    #[test]
    fn test_error_kind() {
        let err = CollectionError::EngineUnavailable {
            message: "ping failed".to_string(),
        };
        assert_eq!(err.kind(), "EngineUnavailable");
        assert_eq!(
            CollectionError::invalid_input("tags", "IN expects an array").kind(),
            "InvalidInput"
        );
    }
}
