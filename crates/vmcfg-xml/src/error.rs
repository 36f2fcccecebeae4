//! Error types for XML serialization.

use thiserror::Error;

/// Result type alias for vmcfg-xml operations.
pub type Result<T> = std::result::Result<T, XmlError>;

/// Errors that can occur while serializing a tree.
#[derive(Debug, Error)]
pub enum XmlError {
    /// The underlying writer failed.
    #[error("XML write error: {0}")]
    Io(#[from] std::io::Error),

    /// The serialized bytes were not valid UTF-8.
    ///
    /// Unreachable for trees built from Rust strings; kept so the writer can
    /// surface it instead of panicking if that ever changes.
    #[error("serialized XML is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}
