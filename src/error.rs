use thiserror::Error;

/// Failures while reading a book or shaping its records.
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Failed to open session for {path}: {source}")]
    SessionOpen {
        path: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Session already ended")]
    SessionClosed,

    #[error("Unknown commodity {namespace}:{mnemonic}")]
    UnknownCommodity { namespace: String, mnemonic: String },

    #[error("Unknown account type: {0}")]
    UnknownAccountType(String),

    #[error("No price for {commodity} in {currency} on or before {date}")]
    MissingPrice {
        commodity: String,
        currency: String,
        date: chrono::NaiveDate,
    },

    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("Invalid date range: start {start} is after end {end}")]
    InvalidDateRange {
        start: chrono::NaiveDate,
        end: chrono::NaiveDate,
    },

    #[error("Rolling window must be at least 1")]
    InvalidWindow,

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, LedgerError>;
