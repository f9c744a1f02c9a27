//! Error types for the Label Studio MCP Server
//!
//! This module defines the error hierarchy for all operations in the server.

use thiserror::Error;

/// Main error type for the Label Studio MCP Server
#[derive(Error, Debug)]
pub enum LabelStudioMcpError {
    /// Label Studio API errors
    #[error("Label Studio API error: {0}")]
    Api(#[from] LabelStudioApiError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Value serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] SerializationError),

    /// MCP protocol errors
    #[error("MCP protocol error: {0}")]
    Mcp(#[from] McpError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP client errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl LabelStudioMcpError {
    /// Short, stable name of the failure, reported to tool callers as `[<kind>]`
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Api(e) => e.kind(),
            Self::Config(_) => "ConfigError",
            Self::Serialization(e) => e.kind(),
            Self::Mcp(e) => e.kind(),
            Self::Io(_) => "IoError",
            Self::Json(_) => "JsonError",
            Self::Http(e) if e.is_timeout() => "Timeout",
            Self::Http(e) if e.is_connect() => "ConnectionError",
            Self::Http(_) => "HttpError",
        }
    }
}

/// Label Studio API errors
#[derive(Error, Debug)]
pub enum LabelStudioApiError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: i64 },

    #[error("API request failed ({status}): {message}")]
    RequestFailed { status: u16, message: String },

    #[error("{entity} object (id: {id}) does not provide {attribute}")]
    MissingAttribute {
        entity: &'static str,
        attribute: &'static str,
        id: i64,
    },

    #[error("Unexpected response shape from {endpoint}: {message}")]
    UnexpectedResponse { endpoint: String, message: String },
}

impl LabelStudioApiError {
    fn kind(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "NotFound",
            Self::RequestFailed { .. } => "RequestFailed",
            Self::MissingAttribute { .. } => "MissingAttribute",
            Self::UnexpectedResponse { .. } => "UnexpectedResponse",
        }
    }
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {var}")]
    MissingEnvVar { var: String },

    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },
}

/// Value serialization errors
#[derive(Error, Debug)]
pub enum SerializationError {
    /// A value reached the datetime encoder that is not a datetime
    #[error("Object of type {type_name} is not JSON serializable")]
    UnsupportedType { type_name: &'static str },
}

impl SerializationError {
    fn kind(&self) -> &'static str {
        match self {
            Self::UnsupportedType { .. } => "TypeError",
        }
    }
}

/// MCP protocol errors
#[derive(Error, Debug)]
pub enum McpError {
    #[error("Unknown tool: {name}")]
    UnknownTool { name: String },

    #[error("Invalid tool arguments: {message}")]
    InvalidArguments { message: String },
}

impl McpError {
    fn kind(&self) -> &'static str {
        match self {
            Self::UnknownTool { .. } => "UnknownTool",
            Self::InvalidArguments { .. } => "InvalidArguments",
        }
    }
}

/// Result type alias for Label Studio MCP operations
pub type Result<T> = std::result::Result<T, LabelStudioMcpError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = LabelStudioApiError::NotFound {
            entity: "Project",
            id: 42,
        };
        assert_eq!(err.to_string(), "Project not found: 42");
    }

    #[test]
    fn test_error_conversion() {
        let api_err = LabelStudioApiError::RequestFailed {
            status: 500,
            message: "boom".to_string(),
        };
        let err: LabelStudioMcpError = api_err.into();
        assert!(matches!(err, LabelStudioMcpError::Api(_)));
        assert_eq!(err.kind(), "RequestFailed");
    }

    #[test]
    fn test_kind_names() {
        let err: LabelStudioMcpError = SerializationError::UnsupportedType { type_name: "u8" }.into();
        assert_eq!(err.kind(), "TypeError");
        assert!(err.to_string().contains("u8 is not JSON serializable"));

        let err: LabelStudioMcpError =
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "nope").into();
        assert_eq!(err.kind(), "IoError");

        let err: LabelStudioMcpError = LabelStudioApiError::MissingAttribute {
            entity: "Task",
            attribute: "annotations",
            id: 7,
        }
        .into();
        assert_eq!(err.kind(), "MissingAttribute");
    }
}
