//! Error types
//!
//! All library operations return [`QueryError`]. Provider errors keep the
//! provider's error code as a plain string so callers can classify them by
//! value (see [`QueryError::is_ignorable`]).

use thiserror::Error;

/// Crate-wide result alias
pub type Result<T> = std::result::Result<T, QueryError>;

#[derive(Debug, Error)]
pub enum QueryError {
    /// The provider answered with a non-success status
    #[error("{service} API error ({status}): {code}: {message}")]
    Api {
        service: String,
        status: u16,
        code: String,
        message: String,
    },

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("failed to decode {what}: {reason}")]
    Decode { what: String, reason: String },

    #[error("credentials unavailable: {0}")]
    Credentials(String),

    /// Resolving the caller's own account identity failed
    #[error("unable to resolve caller identity: {0}")]
    Identity(String),

    #[error("unknown table: {0}")]
    UnknownTable(String),

    #[error("table {table} has no column named {column}")]
    UnknownColumn { table: String, column: String },

    #[error("table {table} requires a '{column} =' qualifier")]
    MissingKeyColumn { table: String, column: String },

    #[error("invalid table definition: {0}")]
    Schema(String),

    #[error("failed to write output: {0}")]
    Output(#[from] std::io::Error),
}

impl QueryError {
    pub fn decode(what: &str, reason: impl ToString) -> Self {
        Self::Decode {
            what: what.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Provider error code, when the error came back from the API
    pub fn api_code(&self) -> Option<&str> {
        match self {
            Self::Api { code, .. } => Some(code),
            _ => None,
        }
    }

    /// HTTP status, when the error came back from the API
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the provider error code is one of `codes`
    pub fn is_ignorable(&self, codes: &[String]) -> bool {
        self.api_code()
            .map(|code| codes.iter().any(|c| c == code))
            .unwrap_or(false)
    }
}
