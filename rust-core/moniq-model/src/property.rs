// SPDX-License-Identifier: PMPL-1.0-or-later
//! Object properties and their declared types.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::value::{EnumKind, ValueType};
use crate::ObjectKind;

use crate::ObjectKind::{Device, Group, Log, Probe, Sensor};

const TREE: &[ObjectKind] = &[Sensor, Device, Group, Probe];
const EVERY: &[ObjectKind] = &[Sensor, Device, Group, Probe, Log];
const BELOW_PROBE: &[ObjectKind] = &[Sensor, Device, Group, Log];
const BELOW_GROUP: &[ObjectKind] = &[Sensor, Device, Log];
const BELOW_DEVICE: &[ObjectKind] = &[Sensor, Log];
const SENSORS: &[ObjectKind] = &[Sensor];
const DEVICES: &[ObjectKind] = &[Device];
const LOGS: &[ObjectKind] = &[Log];

/// A property of a monitoring object that a predicate can reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Property {
    Id,
    Name,
    ParentId,
    Probe,
    Group,
    Device,
    Status,
    Message,
    Priority,
    Tags,
    Active,
    Interval,
    LastUp,
    Comments,
    Url,
    Host,
    Position,
    /// Timestamp of a log entry.
    DateTime,
}

/// Static description of a property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertyInfo {
    /// Declared type of the property's values.
    pub value_type: ValueType,
    /// Whether the property may be absent on a record.
    pub optional: bool,
    /// Object kinds that carry the property.
    pub kinds: &'static [ObjectKind],
}

impl Property {
    pub const ALL: [Property; 18] = [
        Property::Id,
        Property::Name,
        Property::ParentId,
        Property::Probe,
        Property::Group,
        Property::Device,
        Property::Status,
        Property::Message,
        Property::Priority,
        Property::Tags,
        Property::Active,
        Property::Interval,
        Property::LastUp,
        Property::Comments,
        Property::Url,
        Property::Host,
        Property::Position,
        Property::DateTime,
    ];

    pub fn info(self) -> PropertyInfo {
        let (value_type, optional, kinds) = match self {
            Property::Id => (ValueType::Int, false, EVERY),
            Property::Name => (ValueType::String, false, EVERY),
            Property::ParentId => (ValueType::Int, false, TREE),
            Property::Probe => (ValueType::String, false, BELOW_PROBE),
            Property::Group => (ValueType::String, false, BELOW_GROUP),
            Property::Device => (ValueType::String, false, BELOW_DEVICE),
            Property::Status => (ValueType::Enum(EnumKind::Status), false, EVERY),
            Property::Message => (ValueType::String, true, EVERY),
            Property::Priority => (ValueType::Enum(EnumKind::Priority), false, TREE),
            Property::Tags => (ValueType::StringList, false, TREE),
            Property::Active => (ValueType::Bool, false, TREE),
            Property::Interval => (ValueType::Duration, false, TREE),
            Property::LastUp => (ValueType::DateTime, true, SENSORS),
            Property::Comments => (ValueType::String, true, TREE),
            Property::Url => (ValueType::String, false, TREE),
            Property::Host => (ValueType::String, false, DEVICES),
            Property::Position => (ValueType::Int, false, TREE),
            Property::DateTime => (ValueType::DateTime, false, LOGS),
        };
        PropertyInfo {
            value_type,
            optional,
            kinds,
        }
    }

    pub fn value_type(self) -> ValueType {
        self.info().value_type
    }

    /// Whether the property may be absent, making member chains rooted at it nullable.
    pub fn is_optional(self) -> bool {
        self.info().optional
    }

    pub fn applies_to(self, kind: ObjectKind) -> bool {
        self.info().kinds.contains(&kind)
    }

    /// All properties carried by `kind`, in canonical order.
    pub fn for_kind(kind: ObjectKind) -> impl Iterator<Item = Property> {
        Property::ALL.into_iter().filter(move |p| p.applies_to(kind))
    }

    pub fn name(self) -> &'static str {
        match self {
            Property::Id => "Id",
            Property::Name => "Name",
            Property::ParentId => "ParentId",
            Property::Probe => "Probe",
            Property::Group => "Group",
            Property::Device => "Device",
            Property::Status => "Status",
            Property::Message => "Message",
            Property::Priority => "Priority",
            Property::Tags => "Tags",
            Property::Active => "Active",
            Property::Interval => "Interval",
            Property::LastUp => "LastUp",
            Property::Comments => "Comments",
            Property::Url => "Url",
            Property::Host => "Host",
            Property::Position => "Position",
            Property::DateTime => "DateTime",
        }
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Property {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Property::ALL
            .into_iter()
            .find(|p| p.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| ModelError::UnknownProperty(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_property_display_roundtrip() {
        for p in Property::ALL {
            let parsed: Property = p.to_string().parse().unwrap();
            assert_eq!(p, parsed);
        }
    }

    #[test]
    fn test_property_parse_ignores_case() {
        assert_eq!("lastup".parse::<Property>().unwrap(), Property::LastUp);
        assert!("Voltage".parse::<Property>().is_err());
    }

    #[test]
    fn test_applicability() {
        assert!(Property::Host.applies_to(ObjectKind::Device));
        assert!(!Property::Host.applies_to(ObjectKind::Sensor));
        assert!(Property::DateTime.applies_to(ObjectKind::Log));
        assert!(!Property::DateTime.applies_to(ObjectKind::Sensor));
        assert!(Property::Id.applies_to(ObjectKind::Log));
    }

    #[test]
    fn test_optional_properties() {
        assert!(Property::Message.is_optional());
        assert!(Property::LastUp.is_optional());
        assert!(!Property::Name.is_optional());
    }

    #[test]
    fn test_for_kind_lists_log_properties() {
        let props: Vec<Property> = Property::for_kind(ObjectKind::Log).collect();
        assert!(props.contains(&Property::DateTime));
        assert!(props.contains(&Property::Message));
        assert!(!props.contains(&Property::Tags));
    }
}
