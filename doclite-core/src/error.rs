// src/error.rs
use thiserror::Error;

use crate::document::DocumentId;

#[derive(Error, Debug)]
pub enum DocLiteError {
    #[error("Duplicate key: _id {0} already exists")]
    DuplicateKey(DocumentId),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Type mismatch on field '{field}': expected {expected}, found {found}")]
    TypeMismatch {
        field: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("Field '{0}' not found")]
    FieldNotFound(String),

    #[error("Index '{0}' not found")]
    IndexNotFound(String),

    #[error("Client has been closed")]
    ClientClosed,

    #[error("Deserialization error: {0}")]
    Deserialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, DocLiteError>;

impl DocLiteError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        DocLiteError::InvalidOperation(msg.into())
    }
}
