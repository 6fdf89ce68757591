//! Ingestion pipeline: remote CSV export → parser → visit store.

pub mod date;
pub mod header;
pub mod orchestrator;
pub mod parser;
pub mod source;
pub mod tokenize;

pub use date::*;
pub use header::*;
pub use orchestrator::*;
pub use parser::*;
pub use source::*;
pub use tokenize::*;

use thiserror::Error;

use crate::db::DatabaseError;

/// Errors that abort a sync. Malformed rows are not errors: they are
/// dropped and only show up as a lower final count.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("HTTP Error {0}")]
    HttpStatus(u16),

    #[error("Format error: {0}")]
    Format(String),

    #[error("Storage error: {0}")]
    Storage(#[from] DatabaseError),
}
