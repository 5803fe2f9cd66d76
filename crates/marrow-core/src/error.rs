//! Error types for Marrow

use thiserror::Error;

/// The main error type for Marrow operations
#[derive(Debug, Error)]
pub enum MarrowError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid magic number: expected '{expected}', got '{actual}'")]
    InvalidMagic { expected: String, actual: String },

    #[error("Unsupported asset version: {0}")]
    UnsupportedVersion(u32),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("An animation named '{0}' already exists")]
    DuplicateAnimation(String),

    #[error("Animation not found: {0}")]
    AnimationNotFound(String),

    #[error("Invalid animation track: {0}")]
    InvalidTrack(String),

    #[error("Degenerate triangle {index} in collision mesh: {detail}")]
    DegenerateTriangle { index: usize, detail: String },
}

/// Result type alias for Marrow operations
pub type Result<T> = std::result::Result<T, MarrowError>;
