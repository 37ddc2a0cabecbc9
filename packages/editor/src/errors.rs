//! Error types for the editor

use thiserror::Error;

/// Failure to apply an operation to the content model.
///
/// The document is left unchanged whenever one of these is returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("Block not found: {0}")]
    UnknownBlock(String),

    #[error("Block key already exists: {0}")]
    DuplicateKey(String),

    #[error("Offset out of range in block {block}: {value} (block length {len})")]
    OutOfRange {
        block: String,
        value: i64,
        len: usize,
    },

    #[error("Invalid content: {0}")]
    InvalidContent(String),
}

#[derive(Error, Debug)]
pub enum EditorError {
    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    #[error("Document is read-only")]
    ReadOnly,
}
