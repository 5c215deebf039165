//! Error types for descriptions built by the embedding application.

use thiserror::Error;

/// Errors raised while validating backend-agnostic descriptions.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// More color attachments than a render pass can hold
    #[error("Too many color attachments: {0} (maximum is {max})", max = crate::constants::MAX_COLOR_ATTACHMENTS)]
    TooManyColorAttachments(usize),

    /// A texture dimension was zero
    #[error("Invalid texture extent: {0}")]
    InvalidExtent(String),

    /// Invalid data error
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Out of bounds access
    #[error("Out of bounds: {0}")]
    OutOfBounds(String),
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
