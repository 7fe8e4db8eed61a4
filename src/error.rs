//! Error types for the tabula agent.

use thiserror::Error;

/// Main error type for tabula operations.
#[derive(Error, Debug)]
pub enum TabulaError {
    #[error("Dataset error: {0}")]
    Dataset(#[from] DatasetError),

    #[error("Table error: {0}")]
    Table(#[from] TableError),

    #[error("Insight error: {0}")]
    Insight(#[from] InsightError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors raised while locating, downloading, or parsing the dataset.
///
/// These occur at startup and are fatal: the session never starts without
/// a loaded table.
#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("Dataset not found. Tried: {attempted}. Provide --data-path or --from-url or set DATA_PATH.")]
    NotFound { attempted: String },

    #[error("Could not parse Google Drive file id from URL: {0}")]
    DriveUrl(String),

    #[error("Download failed: {0}")]
    Download(#[from] reqwest::Error),

    #[error("Unsupported dataset format: {0}")]
    UnsupportedFormat(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Excel error: {0}")]
    Excel(String),

    #[error("Parquet error: {0}")]
    Parquet(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by table construction and table operations.
///
/// Per-question operation errors are recoverable: the session loop turns
/// them into a printed diagnostic and keeps accepting questions.
#[derive(Error, Debug)]
pub enum TableError {
    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    #[error("Duplicate column name: {0}")]
    DuplicateColumn(String),

    #[error("Column '{column}' has {got} rows, expected {expected}")]
    LengthMismatch {
        column: String,
        expected: usize,
        got: usize,
    },

    #[error("Ordering comparison against non-numeric column '{column}'")]
    NonNumericComparison { column: String },
}

/// Errors from the optional insight providers.
///
/// Never fatal: insight failures are logged and skipped, the core answer
/// is already printed.
#[derive(Error, Debug)]
pub enum InsightError {
    #[error("No provider credentials configured")]
    MissingCredentials,

    #[error("Provider API error: {0}")]
    Api(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result type alias for tabula operations.
pub type Result<T> = std::result::Result<T, TabulaError>;
