use crate::model::Statement;
use thiserror::Error;

/// Everything that can abort a parse. All three variants are fatal to the
/// current parse call: there is no partial statement and no retry.
#[derive(Debug, Error)]
pub enum Error {
    /// A row did not match the expected shape, no known header matched, or a
    /// second account id appeared. `row` is 1-based.
    #[error("parse error at row {row}: {message}")]
    Parse { row: usize, message: String },

    /// The fully-assembled statement violates a global invariant. Carries the
    /// statement so the caller can report what was actually built.
    #[error("validation error: {message}")]
    Validation {
        message: String,
        statement: Box<Statement>,
    },

    /// Required per-run configuration is missing. Raised before any row is
    /// read.
    #[error("configuration error: {message}")]
    Config { message: String },
}

impl Error {
    pub fn parse(row: usize, message: impl Into<String>) -> Self {
        Error::Parse {
            row,
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>, statement: Statement) -> Self {
        Error::Validation {
            message: message.into(),
            statement: Box::new(statement),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
