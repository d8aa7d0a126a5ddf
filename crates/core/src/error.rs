//! Unified error types for mcp-lanhu.
//!
//! The Display prefix of every variant is a stable code that tool callers can
//! match on; `From<Error> for McpError` maps the same codes to JSON-RPC codes.

use rmcp::model::{ErrorCode, ErrorData as McpError};
use tokio_rusqlite::rusqlite;

/// Unified error types for the mcp-lanhu server.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input parameters (e.g., unknown message type).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// Document URL could not be parsed or lacks required parameters.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),

    /// Remote API answered with a non-success envelope.
    #[error("REMOTE_API_ERROR: {0}")]
    RemoteApi(String),

    /// HTTP error response or network failure.
    #[error("HTTP_ERROR: {0}")]
    HttpError(String),

    /// Fetch timeout.
    #[error("FETCH_TIMEOUT: {0}")]
    FetchTimeout(String),

    /// Local cache storage failed (directory creation, metadata write).
    #[error("CACHE_ERROR: {0}")]
    Cache(String),

    /// Render mode is disabled.
    #[error("RENDER_DISABLED")]
    RenderDisabled,

    /// Render failed.
    #[error("RENDER_FAILED: {0}")]
    RenderFailed(String),

    /// Requested record does not exist.
    #[error("NOT_FOUND: {0}")]
    NotFound(String),

    /// Database operation failed.
    #[error("BOARD_ERROR: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("BOARD_ERROR: migration failed: {0}")]
    MigrationFailed(String),

    /// Webhook delivery failed.
    #[error("NOTIFY_FAILED: {0}")]
    NotifyFailed(String),
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Database(tokio_rusqlite::Error::Close(c)),
            _ => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(tokio_rusqlite::Error::Error(err))
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Cache(err.to_string())
    }
}

impl From<Error> for McpError {
    fn from(err: Error) -> Self {
        let (code, message) = match &err {
            Error::InvalidInput(msg) => (-32602, msg.clone()),
            Error::InvalidUrl(msg) => (-32003, msg.clone()),
            Error::RemoteApi(msg) => (-32013, msg.clone()),
            Error::HttpError(msg) => (-32008, msg.clone()),
            Error::FetchTimeout(msg) => (-32006, msg.clone()),
            Error::Cache(msg) => (-32002, msg.clone()),
            Error::RenderDisabled => (-32011, "Render mode is disabled".to_string()),
            Error::RenderFailed(msg) => (-32012, msg.clone()),
            Error::NotFound(msg) => (-32001, msg.clone()),
            Error::Database(e) => (-32014, e.to_string()),
            Error::MigrationFailed(msg) => (-32014, msg.clone()),
            Error::NotifyFailed(msg) => (-32015, msg.clone()),
        };

        McpError { code: ErrorCode(code), message: message.into(), data: None }
    }
}
