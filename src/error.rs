use std::path::PathBuf;

use thiserror::Error;

use crate::core::FileKind;

/// Main error type for docstamp operations
#[derive(Error, Debug)]
pub enum DocstampError {
    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    #[error("Documentation injection corrupted {kind} source: {reason}")]
    InjectionCorruption { kind: FileKind, reason: String },

    #[error("Generation failed: {0}")]
    Generation(#[from] GenerationError),

    #[error("{} changed on disk while it was being documented", path.display())]
    ConcurrentModification { path: PathBuf },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Parser error: {0}")]
    Parser(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Template error: {0}")]
    Template(#[from] tera::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("File system error: {0}")]
    FileSystem(String),
}

/// Failure of a single call to the documentation generator.
///
/// The orchestrator treats every variant the same way: the item is skipped
/// and its siblings are still processed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    #[error("API rate limit exceeded: {0}")]
    RateLimited(String),

    #[error("Failed to connect to the generation service: {0}")]
    ConnectionFailed(String),

    #[error("Generation service error: {0}")]
    ServiceError(String),
}

pub type Result<T> = std::result::Result<T, DocstampError>;
