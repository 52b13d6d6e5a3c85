//! Error types for uusql.

use thiserror::Error;

/// The main error type for uusql operations.
#[derive(Debug, Error)]
pub enum UuSqlError {
    /// A required argument to a SQL builder was empty.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A data model declaration cannot produce valid DDL.
    #[error("Invalid schema: {0}")]
    InvalidSchema(String),

    /// Failed to parse a schema file or column type declaration.
    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    /// A row did not hold the value a data model expected.
    #[error("Invalid value for column '{column}': {message}")]
    InvalidValue { column: String, message: String },

    /// Error reported by the SQLite driver.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl UuSqlError {
    /// Create a parse error at the given line.
    pub fn parse(line: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            line,
            message: message.into(),
        }
    }

    pub fn invalid_value(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            column: column.into(),
            message: message.into(),
        }
    }

    /// True when the database rejected a write because of a UNIQUE or
    /// PRIMARY KEY constraint.
    pub fn is_unique_violation(&self) -> bool {
        match self {
            Self::Database(sqlx::Error::Database(db)) => db.is_unique_violation(),
            _ => false,
        }
    }
}

/// Result type alias for uusql operations.
pub type UuSqlResult<T> = Result<T, UuSqlError>;
