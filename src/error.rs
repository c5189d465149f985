//! Tipos de error del crate.
//!
//! Los lectores de libros y el almacén devuelven `FlotilaError`; el planificador
//! nunca falla (devuelve `Option`).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FlotilaError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not read workbook: {0}")]
    Workbook(#[from] calamine::Error),

    #[error("workbook '{0}' has no sheets")]
    EmptyWorkbook(String),

    #[error("data directory not found: {0}")]
    MissingDirectory(String),

    #[error("column '{0}' not found in header")]
    MissingColumn(String),

    #[error("document store error: {0}")]
    Store(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("document store lock poisoned")]
    LockPoisoned,
}

pub type Result<T> = std::result::Result<T, FlotilaError>;
