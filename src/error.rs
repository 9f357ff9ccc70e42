//! Error types for repeating date fields.

use thiserror::Error;

/// Problems with the values an author submitted.
///
/// These are shown next to the field and never reach storage.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("The start date specified in '{label}' is invalid.")]
    InvalidStart { label: String },

    #[error("The end date specified in '{label}' is invalid.")]
    InvalidEnd { label: String },

    #[error("The number of repeats specified in '{label}' must be greater or equal to 1.")]
    InvalidUnits { label: String, units: i64 },

    /// A recurrence built outside any field asked for zero units.
    #[error("The number of repeats must be greater or equal to 1.")]
    ZeroUnits,
}

/// Errors that can occur while expanding, storing or rendering a recurrence.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("unknown repeat mode '{0}'")]
    UnknownMode(String),

    #[error("recurrence produces more than {limit} occurrences")]
    TooLarge { limit: usize },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("render error: {0}")]
    Render(String),

    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
