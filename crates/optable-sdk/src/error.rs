//! Error types for the Optable SDK.
//!
//! Edge operation failures carry a human-readable message and are keyed by
//! the operation that produced them. Passport values are never included in
//! error messages.

use crate::edge::Operation;

/// SDK error types covering configuration, storage and edge operations.
#[derive(Debug, thiserror::Error)]
pub enum OptableError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Invalid file format: {0}")]
    InvalidFileFormat(String),

    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("init failed: {0}")]
    Init(String),

    #[error("identify failed: {0}")]
    Identify(String),

    #[error("profile failed: {0}")]
    Profile(String),

    #[error("targeting failed: {0}")]
    Targeting(String),

    #[error("witness failed: {0}")]
    Witness(String),
}

impl OptableError {
    /// Build the operation-specific error variant for `op`.
    pub fn edge(op: Operation, message: impl Into<String>) -> Self {
        let message = message.into();
        match op {
            Operation::Init => Self::Init(message),
            Operation::Identify => Self::Identify(message),
            Operation::Profile => Self::Profile(message),
            Operation::Targeting => Self::Targeting(message),
            Operation::Witness => Self::Witness(message),
        }
    }

    /// The edge operation this error came from, if any.
    pub fn operation(&self) -> Option<Operation> {
        match self {
            Self::Init(_) => Some(Operation::Init),
            Self::Identify(_) => Some(Operation::Identify),
            Self::Profile(_) => Some(Operation::Profile),
            Self::Targeting(_) => Some(Operation::Targeting),
            Self::Witness(_) => Some(Operation::Witness),
            _ => None,
        }
    }
}

/// Convenience Result alias.
pub type Result<T> = std::result::Result<T, OptableError>;
