// SPDX-License-Identifier: PMPL-1.0-or-later
//! Model and fetch error types.

use thiserror::Error;

use crate::value::EnumKind;
use crate::{ObjectKind, Property};

/// Errors raised by the object model itself.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("unknown object kind: {0}")]
    UnknownObjectKind(String),

    #[error("unknown property: {0}")]
    UnknownProperty(String),

    #[error("unknown {kind} name: {name}")]
    UnknownEnumName { kind: EnumKind, name: String },

    #[error("unknown {kind} code: {code}")]
    UnknownEnumCode { kind: EnumKind, code: i64 },

    #[error("property {property} is not carried by {kind} objects")]
    PropertyNotApplicable { property: Property, kind: ObjectKind },

    #[error("type mismatch on {property}: expected {expected}, found {found}")]
    TypeMismatch {
        property: Property,
        expected: String,
        found: String,
    },

    #[error("cannot serialize {value} using the {rule} rule")]
    Serialization { rule: String, value: String },
}

/// Errors surfaced by a record source while performing a fetch.
///
/// The query engine never retries these; they are propagated unchanged.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FetchError {
    /// The request never reached the server or the connection dropped.
    #[error("network error: {0}")]
    Network(String),

    /// The request exceeded the source's timeout.
    #[error("timeout after {0}ms")]
    Timeout(u64),

    /// The server answered with an error status.
    #[error("server error ({status}): {message}")]
    Server {
        /// HTTP-like status code.
        status: u16,
        /// Message from the response body.
        message: String,
    },

    /// The response could not be decoded into records.
    #[error("decode error: {0}")]
    Decode(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_applicable_display() {
        let err = ModelError::PropertyNotApplicable {
            property: Property::Host,
            kind: ObjectKind::Sensor,
        };
        assert_eq!(err.to_string(), "property Host is not carried by sensor objects");
    }

    #[test]
    fn test_unknown_enum_display() {
        let err = ModelError::UnknownEnumName {
            kind: EnumKind::Status,
            name: "Sideways".to_string(),
        };
        assert!(err.to_string().contains("Sideways"));
        assert!(err.to_string().contains("status"));
    }

    #[test]
    fn test_fetch_error_display() {
        assert_eq!(FetchError::Timeout(1500).to_string(), "timeout after 1500ms");
        let err = FetchError::Server {
            status: 503,
            message: "probe offline".to_string(),
        };
        assert!(err.to_string().contains("503"));
        assert!(err.to_string().contains("probe offline"));
    }
}
