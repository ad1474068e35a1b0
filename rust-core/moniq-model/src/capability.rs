// SPDX-License-Identifier: PMPL-1.0-or-later
//! Remote filter capability table.
//!
//! Declares, per `(Property, FilterOperator)`, whether the remote source can
//! apply the comparison itself, and how values of each property are written
//! into a request. The table is plain data: the classifier only looks entries
//! up, it never inspects types at runtime.
//!
//! Capabilities:
//! - `Supported(Exact)`: the remote applies exactly the local semantics.
//! - `Supported(Approximate)`: the remote returns a superset (string matching
//!   is case-insensitive server side), so the atom is pushed and re-checked.
//! - `ResidualOnly`: valid locally, never sent remotely.
//! - `Unsupported`: the comparison is rejected outright.

use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::operator::FilterOperator;
use crate::property::Property;
use crate::value::Value;

/// Date layout used by the remote source for timestamps.
pub const DATE_FORMAT: &str = "%Y-%m-%d-%H-%M-%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Fidelity {
    Exact,
    Approximate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    Supported(Fidelity),
    ResidualOnly,
    Unsupported,
}

/// How a property's values are written into a remote request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SerializationRule {
    Text,
    Number,
    /// `-1` for true, `0` for false.
    Boolean,
    /// Lowercase variant name.
    EnumName,
    /// Underlying numeric code.
    EnumCode,
    TotalSeconds,
    /// Formatted with [`DATE_FORMAT`].
    DateFormat,
}

impl SerializationRule {
    pub fn serialize(self, value: &Value) -> Result<String, ModelError> {
        let out = match (self, value) {
            (SerializationRule::Text, Value::Str(s)) => Some(s.clone()),
            (SerializationRule::Number, Value::Int(i)) => Some(i.to_string()),
            (SerializationRule::Number, Value::Float(f)) => Some(f.to_string()),
            (SerializationRule::Boolean, Value::Bool(b)) => {
                Some(if *b { "-1" } else { "0" }.to_string())
            }
            (SerializationRule::EnumName, Value::Enum(e)) => e.name().map(str::to_lowercase),
            (SerializationRule::EnumCode, Value::Enum(e)) => Some(e.code.to_string()),
            (SerializationRule::EnumCode, Value::Int(i)) => Some(i.to_string()),
            (SerializationRule::TotalSeconds, Value::Duration(secs)) => Some(secs.to_string()),
            (SerializationRule::DateFormat, Value::DateTime(dt)) => {
                Some(dt.format(DATE_FORMAT).to_string())
            }
            _ => None,
        };
        out.ok_or_else(|| ModelError::Serialization {
            rule: self.to_string(),
            value: value.to_string(),
        })
    }
}

impl fmt::Display for SerializationRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SerializationRule::Text => "text",
            SerializationRule::Number => "number",
            SerializationRule::Boolean => "boolean",
            SerializationRule::EnumName => "enum-name",
            SerializationRule::EnumCode => "enum-code",
            SerializationRule::TotalSeconds => "total-seconds",
            SerializationRule::DateFormat => "date",
        };
        f.write_str(name)
    }
}

/// Result of looking up one `(Property, FilterOperator)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapabilityEntry {
    pub capability: Capability,
    pub rule: SerializationRule,
}

/// Capabilities of a single property, one slot per operator in
/// [`FilterOperator::ALL`] order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertyCapabilities {
    pub property: Property,
    pub rule: SerializationRule,
    pub operators: [Capability; 5],
    /// Display-only properties cannot appear in a predicate at all.
    pub filterable: bool,
    /// The remote only accepts bounded ranges: no point equality, and a
    /// lower and an upper bound may be pushed together.
    pub range_only: bool,
}

impl PropertyCapabilities {
    pub const fn new(
        property: Property,
        rule: SerializationRule,
        operators: [Capability; 5],
    ) -> Self {
        Self {
            property,
            rule,
            operators,
            filterable: true,
            range_only: false,
        }
    }

    pub const fn display_only(self) -> Self {
        Self {
            filterable: false,
            ..self
        }
    }

    pub const fn range_only(self) -> Self {
        Self {
            range_only: true,
            ..self
        }
    }
}

const S: Capability = Capability::Supported(Fidelity::Exact);
const A: Capability = Capability::Supported(Fidelity::Approximate);
const R: Capability = Capability::ResidualOnly;
const U: Capability = Capability::Unsupported;

use Property as P;
use SerializationRule as Rule;

#[rustfmt::skip]
const STANDARD: &[PropertyCapabilities] = &[
    //                         property       rule                ==  !=  >   <   contains
    PropertyCapabilities::new(P::Id,         Rule::Number,       [S, S, S, S, U]),
    PropertyCapabilities::new(P::Name,       Rule::Text,         [A, R, U, U, A]),
    PropertyCapabilities::new(P::ParentId,   Rule::Number,       [S, S, S, S, U]),
    PropertyCapabilities::new(P::Probe,      Rule::Text,         [A, R, U, U, A]),
    PropertyCapabilities::new(P::Group,      Rule::Text,         [A, R, U, U, A]),
    PropertyCapabilities::new(P::Device,     Rule::Text,         [A, R, U, U, A]),
    PropertyCapabilities::new(P::Status,     Rule::EnumName,     [S, S, R, R, U]),
    PropertyCapabilities::new(P::Message,    Rule::Text,         [A, R, U, U, A]),
    PropertyCapabilities::new(P::Priority,   Rule::EnumCode,     [S, S, S, S, U]),
    PropertyCapabilities::new(P::Tags,       Rule::Text,         [U, U, U, U, A]),
    PropertyCapabilities::new(P::Active,     Rule::Boolean,      [S, S, U, U, U]),
    PropertyCapabilities::new(P::Interval,   Rule::TotalSeconds, [S, S, R, R, U]),
    PropertyCapabilities::new(P::LastUp,     Rule::DateFormat,   [R, R, R, R, U]),
    PropertyCapabilities::new(P::Comments,   Rule::Text,         [R, R, U, U, R]),
    PropertyCapabilities::new(P::Url,        Rule::Text,         [U, U, U, U, U]).display_only(),
    PropertyCapabilities::new(P::Host,       Rule::Text,         [A, R, U, U, A]),
    PropertyCapabilities::new(P::Position,   Rule::Number,       [S, S, S, S, U]),
    PropertyCapabilities::new(P::DateTime,   Rule::DateFormat,   [U, U, S, S, U]).range_only(),
];

/// Read-only mapping from `(Property, FilterOperator)` to capability.
#[derive(Debug, Clone, Default)]
pub struct CapabilityTable {
    rows: HashMap<Property, PropertyCapabilities>,
}

impl CapabilityTable {
    /// An empty table; every lookup is `Unsupported` until rows are defined.
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide table describing the standard remote source.
    pub fn standard() -> &'static CapabilityTable {
        static TABLE: OnceLock<CapabilityTable> = OnceLock::new();
        TABLE.get_or_init(|| {
            let mut table = CapabilityTable::new();
            for row in STANDARD {
                table.define(*row);
            }
            table
        })
    }

    /// Add or replace the row for a property.
    pub fn define(&mut self, row: PropertyCapabilities) -> &mut Self {
        self.rows.insert(row.property, row);
        self
    }

    pub fn row(&self, property: Property) -> Option<&PropertyCapabilities> {
        self.rows.get(&property)
    }

    pub fn entry(&self, property: Property, operator: FilterOperator) -> CapabilityEntry {
        match self.rows.get(&property) {
            Some(row) => CapabilityEntry {
                capability: row.operators[operator.index()],
                rule: row.rule,
            },
            None => CapabilityEntry {
                capability: Capability::Unsupported,
                rule: SerializationRule::Text,
            },
        }
    }

    /// Whether the property may appear in a predicate at all.
    pub fn is_filterable(&self, property: Property) -> bool {
        self.rows.get(&property).is_some_and(|row| row.filterable)
    }

    pub fn is_range_only(&self, property: Property) -> bool {
        self.rows.get(&property).is_some_and(|row| row.range_only)
    }

    /// Write a value using the property's serialization rule.
    pub fn serialize(&self, property: Property, value: &Value) -> Result<String, ModelError> {
        let rule = self
            .rows
            .get(&property)
            .map(|row| row.rule)
            .unwrap_or(SerializationRule::Text);
        rule.serialize(value)
    }
}
