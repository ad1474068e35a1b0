// SPDX-License-Identifier: PMPL-1.0-or-later
//! Records returned by a record source.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::property::Property;
use crate::value::Value;
use crate::ObjectKind;

static NULL: Value = Value::Null;

/// Identity of a record, used to merge the results of several branches.
///
/// Tree objects are identified by id alone. Log entries share the id of the
/// object they describe, so their key adds the timestamp and message.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RecordKey {
    Object(i64),
    Log {
        id: i64,
        at: Option<DateTime<Utc>>,
        message: Option<String>,
    },
}

/// One monitoring object with its property values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    kind: ObjectKind,
    id: i64,
    properties: BTreeMap<Property, Value>,
}

impl Record {
    pub fn new(kind: ObjectKind, id: i64) -> Self {
        let mut properties = BTreeMap::new();
        properties.insert(Property::Id, Value::Int(id));
        Self {
            kind,
            id,
            properties,
        }
    }

    /// Builder-style setter.
    pub fn with(mut self, property: Property, value: impl Into<Value>) -> Self {
        self.set(property, value);
        self
    }

    pub fn set(&mut self, property: Property, value: impl Into<Value>) {
        let value = value.into();
        if property == Property::Id {
            if let Some(id) = value.as_int() {
                self.id = id;
            }
        }
        self.properties.insert(property, value);
    }

    pub fn kind(&self) -> ObjectKind {
        self.kind
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    /// The stored value, or `Null` when the property is absent.
    pub fn get(&self, property: Property) -> &Value {
        self.properties.get(&property).unwrap_or(&NULL)
    }

    pub fn properties(&self) -> &BTreeMap<Property, Value> {
        &self.properties
    }

    pub fn key(&self) -> RecordKey {
        if self.kind.is_log() {
            let at = match self.get(Property::DateTime) {
                Value::DateTime(dt) => Some(*dt),
                _ => None,
            };
            RecordKey::Log {
                id: self.id,
                at,
                message: self.get(Property::Message).as_str().map(str::to_string),
            }
        } else {
            RecordKey::Object(self.id)
        }
    }

    /// The record as an object value keyed by property name.
    pub fn to_value(&self) -> Value {
        Value::Object(
            self.properties
                .iter()
                .map(|(p, v)| (p.name().to_string(), v.clone()))
                .collect(),
        )
    }

    /// Check every stored value against the property's kind and declared type.
    pub fn validate(&self) -> Result<(), ModelError> {
        for (property, value) in &self.properties {
            if !property.applies_to(self.kind) {
                return Err(ModelError::PropertyNotApplicable {
                    property: *property,
                    kind: self.kind,
                });
            }
            let ty = property.value_type();
            let null_ok = !value.is_null() || property.is_optional();
            if !null_ok || !ty.accepts(value) {
                return Err(ModelError::TypeMismatch {
                    property: *property,
                    expected: ty.to_string(),
                    found: value.type_name().to_string(),
                });
            }
        }
        Ok(())
    }
}
