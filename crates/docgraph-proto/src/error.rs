//! Value and decoding error types.

use thiserror::Error;

/// Errors raised while classifying or converting values.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValueError {
    /// The runtime type has no value mapping.
    #[error("Property value {value} of type {type_name} is not supported")]
    UnsupportedType {
        /// Debug rendering of the offending value.
        value: String,
        /// Host type name of the offending value.
        type_name: &'static str,
    },

    /// A JSON number outside the signed 64-bit and double ranges.
    #[error("number {0} cannot be represented")]
    UnrepresentableNumber(String),
}

impl ValueError {
    /// Create an unsupported type error.
    pub fn unsupported(value: impl std::fmt::Debug, type_name: &'static str) -> Self {
        ValueError::UnsupportedType {
            value: format!("{:?}", value),
            type_name,
        }
    }
}
