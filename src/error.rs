// ❗ Error types for the ledger library
// Derivation never fails (bad numbers coerce to zero); these cover the
// store lookups and the file-facing edges: batch loads, exports, config.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Edit or delete targeted an id that is not in the ledger
    #[error("entry not found: {0}")]
    EntryNotFound(String),
}

pub type Result<T> = std::result::Result<T, LedgerError>;
