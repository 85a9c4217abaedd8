use bincode::ErrorKind;
use thiserror::Error;

/// Custom Result type for ramdb operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for ramdb
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Unexpected or missing token while parsing a statement
    #[error("syntax error near '{token}' at position {position}: {message}")]
    Syntax {
        message: String,
        token: String,
        position: usize,
    },
    /// Unknown or duplicate table/column, arity or type mismatch
    #[error("schema error: {0}")]
    Schema(String),
    /// NOT NULL, autoincrement or primary key violation
    #[error("constraint violation: {0}")]
    Constraint(String),
    /// Placeholders and supplied arguments disagree
    #[error("parameter error: {0}")]
    Parameter(String),
    /// Internal error (encoding, configuration, etc.)
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    pub(crate) fn syntax(
        message: impl Into<String>,
        token: impl Into<String>,
        position: usize,
    ) -> Self {
        Error::Syntax {
            message: message.into(),
            token: token.into(),
            position,
        }
    }
}

impl From<std::num::ParseIntError> for Error {
    fn from(value: std::num::ParseIntError) -> Self {
        Error::Schema(value.to_string())
    }
}

impl From<std::num::ParseFloatError> for Error {
    fn from(value: std::num::ParseFloatError) -> Self {
        Error::Schema(value.to_string())
    }
}

impl From<Box<ErrorKind>> for Error {
    fn from(value: Box<ErrorKind>) -> Self {
        Error::Internal(value.to_string())
    }
}

impl From<serde_urlencoded::de::Error> for Error {
    fn from(value: serde_urlencoded::de::Error) -> Self {
        Error::Internal(format!("invalid data source options: {}", value))
    }
}
