// Error types - one enum for store, CSV and service failures
// Errors pass through `?` unchanged up to the web layer, which picks the status.

use thiserror::Error;

/// Errors raised by the record store, CSV interchange and inventory service.
#[derive(Debug, Error)]
pub enum InventoryError {
    /// No record with this id exists in the collection.
    #[error("{collection} #{id} not found")]
    NotFound { collection: &'static str, id: i64 },

    /// A CSV row is missing a required column or has a non-numeric value.
    #[error("malformed CSV row at line {line}: {message}")]
    MalformedRow { line: u64, message: String },

    /// A form or record field failed validation.
    #[error("invalid value for '{field}': {message}")]
    Validation { field: String, message: String },

    /// The database cannot be opened or written.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    /// Filesystem error while staging uploads or writing exports.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV writer error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl InventoryError {
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        InventoryError::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }

    pub fn malformed(line: u64, message: impl Into<String>) -> Self {
        InventoryError::MalformedRow {
            line,
            message: message.into(),
        }
    }
}

impl From<rusqlite::Error> for InventoryError {
    fn from(err: rusqlite::Error) -> Self {
        InventoryError::StorageUnavailable(err.to_string())
    }
}

/// Result type for inventory operations.
pub type Result<T> = std::result::Result<T, InventoryError>;
