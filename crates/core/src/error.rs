//! Error types for the presentation model.

use crate::engine::EngineError;
use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised at the model boundary.
///
/// Per-field failures while extracting from or applying to a live document
/// never surface here; they are recorded in an [`crate::ApplyReport`] instead.
#[derive(Error, Debug)]
pub enum Error {
    /// A model value is malformed or out of range.
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// The JSON payload could not be parsed or does not match the schema.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// The document engine refused a structural operation.
    #[error("Document engine error: {0}")]
    EngineError(#[from] EngineError),

    /// The embedded chart workbook could not be read or written.
    #[error("Workbook error: {0}")]
    WorkbookError(#[from] deck_xlsx::Error),
}

impl Error {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError(message.into())
    }
}
