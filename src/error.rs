use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum ExplorerError {
    #[error("invalid endpoint: {0} (expected graphdb or virtuoso)")]
    InvalidEndpoint(String),

    #[error("invalid items per page: {0} (expected one of 5, 10, 20, 50)")]
    InvalidItemsPerPage(usize),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("endpoint request failed: {0}")]
    EndpointHttp(String),

    #[error("endpoint returned status {status}: {message}")]
    EndpointStatus { status: u16, message: String },

    #[error("header has {found} columns, expected {expected}")]
    HeaderMismatch { expected: usize, found: usize },

    #[error("line {line}: expected {expected} fields, found {found}")]
    RowShape {
        line: u64,
        expected: usize,
        found: usize,
    },

    #[error("line {line}: {field} is not an integer: {value:?}")]
    InvalidRange {
        line: u64,
        field: &'static str,
        value: String,
    },

    #[error("malformed query results: {0}")]
    ResultsParse(String),

    #[error("response contains no count")]
    MissingCount,

    #[error("filesystem error: {0}")]
    Filesystem(String),
}

impl ExplorerError {
    /// HTTP status of a failed endpoint call, when the endpoint answered.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ExplorerError::EndpointStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            ExplorerError::EndpointHttp(_) | ExplorerError::EndpointStatus { .. }
        )
    }
}
