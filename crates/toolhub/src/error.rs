//! Error types for the tool hub.

use thiserror::Error;

/// Main error type for the hub (startup, configuration and upstream server access).
#[derive(Error, Debug)]
pub enum HubError {
    /// Configuration errors (invalid YAML/JSON, missing fields, conflicts)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Startup errors (server failed to launch or initialize)
    #[error("Startup error: {0}")]
    Startup(String),

    /// Upstream errors (tools/list or tools/call against a server failed)
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Result type alias for hub operations.
pub type Result<T> = std::result::Result<T, HubError>;

/// Reasons a validation call ends in the failure shape.
///
/// The `Display` output is the `error` string callers see, so the first four messages are part of
/// the public contract.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid Request Payload")]
    InvalidRequest,

    #[error("Invalid Server")]
    UnknownServer(String),

    #[error("Invalid Client")]
    UnknownClient(String),

    #[error("Invalid Server Credentials")]
    MissingCredentials { server: String, field: String },

    #[error("server '{server}' failed to list tools: {message}")]
    Upstream { server: String, message: String },

    #[error("server '{server}' timed out listing tools after {timeout_ms}ms")]
    ListToolsTimeout { server: String, timeout_ms: u128 },

    #[error("Request timed out")]
    Timeout,

    #[error("Request cancelled")]
    Cancelled,
}

/// Reasons a direct tool invocation is refused or fails.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvokeError {
    #[error("unknown server '{0}'")]
    UnknownServer(String),

    #[error("arguments must be an object containing 'server_credentials'")]
    MissingCredentials,

    #[error("{0}")]
    Upstream(String),
}
