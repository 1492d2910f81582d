//! Error types for runsheet-engine operations.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RunsheetError {
    #[error("Invalid duration: {0}")]
    InvalidDuration(String),

    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),

    #[error("Invalid datetime: {0}")]
    InvalidDatetime(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Column name collision: {0}")]
    ColumnNameCollision(String),

    #[error("Encoding error: {0}")]
    Encoding(String),

    #[error("Invalid document: {0}")]
    InvalidDocument(String),
}

impl From<csv::Error> for RunsheetError {
    fn from(err: csv::Error) -> Self {
        RunsheetError::Encoding(format!("csv: {err}"))
    }
}

impl From<quick_xml::Error> for RunsheetError {
    fn from(err: quick_xml::Error) -> Self {
        RunsheetError::Encoding(format!("xml: {err}"))
    }
}

impl From<std::io::Error> for RunsheetError {
    fn from(err: std::io::Error) -> Self {
        RunsheetError::Encoding(format!("io: {err}"))
    }
}

pub type Result<T> = std::result::Result<T, RunsheetError>;
