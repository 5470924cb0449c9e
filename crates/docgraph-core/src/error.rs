//! Core error types.

use thiserror::Error;

use crate::client::ClientErrorKind;

/// Planning, validation and execution errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed element id or id part.
    #[error("{0}")]
    InvalidId(String),

    /// An explicit collection disagrees with the element label.
    #[error("Mismatching label: [{label}] and collection: [{collection}]")]
    LabelMismatch { label: String, collection: String },

    /// A property key collides with a reserved document field.
    #[error("property key '{0}' is reserved")]
    ReservedField(String),

    /// A predicate operator with no mapping.
    #[error("unsupported predicate operator: {0}")]
    UnsupportedOperation(String),

    /// A predicate whose operand cannot be used with its operator.
    #[error("invalid predicate: {0}")]
    InvalidPredicate(String),

    /// Graph configuration failed validation.
    #[error("invalid graph configuration: {0}")]
    InvalidConfig(String),

    /// A collection not declared in the graph configuration.
    #[error("collection '{0}' is not part of the graph")]
    UnknownCollection(String),

    /// A graph variable key or value that cannot be stored.
    #[error("invalid graph variable: {0}")]
    InvalidVariable(String),

    /// The stored graph was last opened by a newer library.
    #[error("Existing graph has more recent version [{stored}] than library version [{library}].")]
    IncompatibleVersion { stored: String, library: String },

    /// A stored version string without a `major.minor.patch` prefix.
    #[error("Invalid version: {0}")]
    InvalidVersion(String),

    /// A property value with no value mapping.
    #[error(transparent)]
    UnsupportedValue(#[from] docgraph_proto::ValueError),

    /// Insert of an element whose id is taken.
    #[error("Document with id already exists: {0}")]
    ElementExists(String),

    /// A scan was assembled with nothing to scan.
    #[error("cannot assemble a scan over zero collections")]
    NoCollections,

    /// A result row that could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),

    /// Failure reported by the store client.
    #[error("execution error ({kind}): {message}")]
    Execution {
        kind: ClientErrorKind,
        message: String,
    },

    /// Configuration file could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file is not valid JSON.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Whether the error is a planning-time validation failure.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Error::InvalidId(_)
                | Error::LabelMismatch { .. }
                | Error::ReservedField(_)
                | Error::UnsupportedOperation(_)
                | Error::InvalidPredicate(_)
                | Error::InvalidConfig(_)
                | Error::UnknownCollection(_)
                | Error::InvalidVariable(_)
        )
    }
}
