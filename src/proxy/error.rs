//! Error types for listing parsing

use thiserror::Error;

/// The listing document could not be interpreted at all
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Listing document is empty")]
    EmptyDocument,

    #[error("No element with id '{table_id}' in listing document")]
    TableNotFound { table_id: String },

    #[error("Invalid listing selector '{selector}': {reason}")]
    Selector { selector: String, reason: String },
}
