use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AssayerError {
    #[error("Duplicate key: '{0}' already recorded")]
    DuplicateKey(String),
    #[error("Invalid segment name: {0}")]
    InvalidSegmentName(String),
    #[error("Type mismatch: {0}")]
    TypeMismatch(String),
    #[error("Key not found: '{0}'")]
    KeyNotFound(String),
    #[error("Empty paths are not allowed")]
    EmptyPath,
    #[error("Invalid path type: {0}")]
    InvalidPathType(String),
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("Validation error: {0}")]
    ValidationError(String),
}
