// Capital Ledger - Core Library
// Exposes the ledger, derivation, aggregation and export modules for the CLI,
// the TUI, and tests

pub mod entry;    // Form coercion + net income / capital remaining derivation
pub mod summary;  // Daily / monthly grouping, totals, expense breakdown
pub mod ledger;   // In-memory record store
pub mod export;   // CSV + spreadsheet markup writers
pub mod batch;    // Form rows from CSV
pub mod config;
pub mod error;

// Re-export commonly used types
pub use entry::{
    derive, parse_amount, parse_date,
    Derived, EntryForm, EntryInput, FormField, IncomeBasis, LedgerEntry,
};
pub use summary::{
    expense_breakdown, summarize, totals,
    ExpenseSlice, GroupMode, SummaryRow, Totals,
};
pub use ledger::{Ledger, LedgerEvent};
pub use export::{
    export_file_name, export_to_dir, export_to_path, format_money, write_csv, write_spreadsheet,
    ExportFormat, CSV_HEADERS,
};
pub use batch::{load_form_rows, read_form_rows, read_inputs, seed_ledger};
pub use config::{Branding, ChartKind, Config};
pub use error::{LedgerError, Result};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
