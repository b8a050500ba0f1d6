//! Error types for embedded workbook editing.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while reading or rewriting an embedded workbook.
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to read workbook bytes.
    #[error("Failed to read workbook: {0}")]
    IoError(#[from] std::io::Error),

    /// A cell or range reference could not be parsed.
    #[error("Invalid cell reference: {0}")]
    InvalidReference(String),

    /// The referenced sheet does not exist in the workbook.
    #[error("Unknown sheet: {0}")]
    UnknownSheet(String),

    /// A required part is missing from the package.
    #[error("Missing workbook part: {0}")]
    MissingPart(String),

    /// ZIP archive error.
    #[error("ZIP error: {0}")]
    ZipError(String),

    /// XML parsing error.
    #[error("XML parsing error: {0}")]
    XmlError(String),
}
