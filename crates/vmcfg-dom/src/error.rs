//! Error types for domain document composition.
//!
//! Every failure here is a caller programming error raised at the point of
//! violation; nothing is retryable and nothing is recovered internally.

use thiserror::Error;

/// Result type alias for vmcfg-dom operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building a domain document.
#[derive(Debug, Error)]
pub enum Error {
    /// A unique element type was attached a second time.
    #[error("element is unique and already attached: {element}")]
    DuplicateElement { element: String },

    /// Detach was called with a record that is not attached to this domain.
    #[error("record is not attached to this domain")]
    RecordNotFound,

    /// Two disks claimed the same target device path.
    #[error("disk target '{dev}' is already attached")]
    TargetConflict { dev: String },

    /// More than one member of a mutually exclusive field group was set.
    #[error("fields are mutually exclusive: {}", fields.join(", "))]
    MutuallyExclusive { fields: Vec<&'static str> },

    /// A dependent field was set without the field it requires.
    #[error("{dependent} requires {requires} to be set")]
    RequiresField {
        dependent: &'static str,
        requires: &'static str,
    },

    /// Invalid combination of clock offset fields.
    #[error("invalid clock configuration: {field}: {reason}")]
    ClockConfig {
        field: &'static str,
        reason: &'static str,
    },

    /// A grouping feature was constructed with no sub-features at all.
    #[error("no feature bits set for {group}")]
    NoFeaturesSet { group: &'static str },

    /// A single field failed its own value check.
    #[error("invalid value for {field}: {reason}")]
    InvalidValue {
        field: &'static str,
        reason: String,
    },

    /// A device-letter ordinal outside the valid range.
    #[error("ordinal must be positive, got {value}")]
    Range { value: u32 },

    /// A required profile input was not supplied.
    #[error("required field '{field}' is missing")]
    MissingRequiredField { field: &'static str },

    /// Serialization failure from the XML layer.
    #[error(transparent)]
    Xml(#[from] vmcfg_xml::XmlError),
}
