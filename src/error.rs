//! Error types for qchain.

use thiserror::Error;

/// The main error type for qchain operations.
#[derive(Debug, Error)]
pub enum QchainError {
    /// The node chain breaks a construction invariant (missing root,
    /// extra table binding, ...). Only reachable through the low-level
    /// node constructors.
    #[error("Malformed chain: {0}")]
    MalformedChain(String),

    /// No columns were selected and the render policy rejects `SELECT *`.
    #[error("No columns selected for table '{table}'")]
    EmptySelect { table: String },

    /// Failed to parse a textual chain.
    #[error("Parse error at position {position}: {message}")]
    Parse { position: usize, message: String },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl QchainError {
    /// Create a parse error at the given position.
    pub fn parse(position: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            position,
            message: message.into(),
        }
    }

    /// Create a malformed chain error.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedChain(message.into())
    }
}

/// Result type alias for qchain operations.
pub type QueryResult<T> = Result<T, QchainError>;
