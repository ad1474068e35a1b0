// SPDX-License-Identifier: PMPL-1.0-or-later
//! moniq model
//!
//! The object model the query engine compiles against: object kinds,
//! properties and their declared types, literal values, records with their
//! identity keys, and the static capability table describing what the remote
//! source can filter natively.

pub mod capability;
pub mod error;
pub mod operator;
pub mod property;
pub mod record;
pub mod value;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub use capability::{
    Capability, CapabilityEntry, CapabilityTable, Fidelity, PropertyCapabilities,
    SerializationRule,
};
pub use error::{FetchError, ModelError};
pub use operator::FilterOperator;
pub use property::{Property, PropertyInfo};
pub use record::{Record, RecordKey};
pub use value::{EnumKind, EnumValue, Value, ValueType};

/// The kinds of monitoring object that can be retrieved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
    Sensor,
    Device,
    Group,
    Probe,
    Log,
}

impl ObjectKind {
    /// All object kinds in canonical order.
    pub const ALL: [ObjectKind; 5] = [
        ObjectKind::Sensor,
        ObjectKind::Device,
        ObjectKind::Group,
        ObjectKind::Probe,
        ObjectKind::Log,
    ];

    /// Whether records of this kind are log entries rather than tree objects.
    ///
    /// Log entries reuse the id of the object they describe, so their
    /// identity key also includes the timestamp and message.
    pub fn is_log(self) -> bool {
        matches!(self, ObjectKind::Log)
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectKind::Sensor => write!(f, "sensor"),
            ObjectKind::Device => write!(f, "device"),
            ObjectKind::Group => write!(f, "group"),
            ObjectKind::Probe => write!(f, "probe"),
            ObjectKind::Log => write!(f, "log"),
        }
    }
}

impl FromStr for ObjectKind {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sensor" => Ok(ObjectKind::Sensor),
            "device" => Ok(ObjectKind::Device),
            "group" => Ok(ObjectKind::Group),
            "probe" => Ok(ObjectKind::Probe),
            "log" => Ok(ObjectKind::Log),
            _ => Err(ModelError::UnknownObjectKind(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_kind_display_roundtrip() {
        for kind in ObjectKind::ALL {
            let s = kind.to_string();
            let parsed: ObjectKind = s.parse().unwrap();
            assert_eq!(kind, parsed);
        }
    }

    #[test]
    fn test_object_kind_case_insensitive_parse() {
        assert_eq!("SENSOR".parse::<ObjectKind>().unwrap(), ObjectKind::Sensor);
        assert_eq!("Log".parse::<ObjectKind>().unwrap(), ObjectKind::Log);
    }

    #[test]
    fn test_unknown_object_kind_error() {
        let err = "channel".parse::<ObjectKind>().unwrap_err();
        assert!(matches!(err, ModelError::UnknownObjectKind(ref s) if s == "channel"));
    }

    #[test]
    fn test_object_kind_serde_roundtrip() {
        for kind in ObjectKind::ALL {
            let json = serde_json::to_string(&kind).unwrap();
            let parsed: ObjectKind = serde_json::from_str(&json).unwrap();
            assert_eq!(kind, parsed);
        }
    }

    #[test]
    fn test_only_logs_are_logs() {
        assert!(ObjectKind::Log.is_log());
        assert!(!ObjectKind::Sensor.is_log());
        assert!(!ObjectKind::Probe.is_log());
    }
}
