// SPDX-License-Identifier: PMPL-1.0-or-later
//! Literal values.
//!
//! A [`Value`] is what an atom compares against, what a record stores per
//! property, and what the partial evaluator folds constant subtrees into.
//! Comparisons follow the local evaluation rules: numbers compare across
//! integer/float, enums compare by code (and against plain integers), strings
//! compare ordinally, and an absent value only ever equals another absent value.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// Enumerations whose values travel as named constants with numeric codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnumKind {
    Status,
    Priority,
}

impl EnumKind {
    /// `(code, name)` pairs in ascending code order.
    pub fn variants(self) -> &'static [(i64, &'static str)] {
        match self {
            EnumKind::Status => &[
                (1, "Unknown"),
                (3, "Up"),
                (4, "Warning"),
                (5, "Down"),
                (6, "NoProbe"),
                (7, "PausedByUser"),
                (10, "Unusual"),
            ],
            EnumKind::Priority => &[
                (1, "One"),
                (2, "Two"),
                (3, "Three"),
                (4, "Four"),
                (5, "Five"),
            ],
        }
    }

    pub fn name_of(self, code: i64) -> Option<&'static str> {
        self.variants()
            .iter()
            .find(|(c, _)| *c == code)
            .map(|(_, name)| *name)
    }

    /// Look up a code by name, ignoring ASCII case.
    pub fn code_of(self, name: &str) -> Option<i64> {
        self.variants()
            .iter()
            .find(|(_, n)| n.eq_ignore_ascii_case(name))
            .map(|(code, _)| *code)
    }

    /// Build an enum value from a numeric code, rejecting undefined codes.
    pub fn from_code(self, code: i64) -> Result<EnumValue, ModelError> {
        match self.name_of(code) {
            Some(_) => Ok(EnumValue { kind: self, code }),
            None => Err(ModelError::UnknownEnumCode { kind: self, code }),
        }
    }

    /// Build an enum value from a name, ignoring ASCII case.
    pub fn from_name(self, name: &str) -> Result<EnumValue, ModelError> {
        self.code_of(name)
            .map(|code| EnumValue { kind: self, code })
            .ok_or_else(|| ModelError::UnknownEnumName {
                kind: self,
                name: name.to_string(),
            })
    }
}

impl fmt::Display for EnumKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnumKind::Status => write!(f, "status"),
            EnumKind::Priority => write!(f, "priority"),
        }
    }
}

/// A value of one of the [`EnumKind`] enumerations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EnumValue {
    pub kind: EnumKind,
    pub code: i64,
}

impl EnumValue {
    /// The variant name, if the code is defined.
    pub fn name(&self) -> Option<&'static str> {
        self.kind.name_of(self.code)
    }
}

/// Declared type of a property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    Int,
    Float,
    Bool,
    String,
    StringList,
    Enum(EnumKind),
    DateTime,
    Duration,
}

impl ValueType {
    /// Whether values of this type are whole numbers, so that `x >= n` can
    /// be rewritten as `x > n - 1`.
    pub fn is_integral(self) -> bool {
        matches!(self, ValueType::Int | ValueType::Enum(_))
    }

    /// Coerce a constant into this type for comparison against a property.
    ///
    /// For [`ValueType::StringList`] the result is a list element, since the
    /// only comparison against a list property is membership. Returns `None`
    /// when the constant has no faithful representation in this type.
    pub fn coerce(self, value: &Value) -> Option<Value> {
        match (self, value) {
            (ValueType::Int, Value::Int(_)) => Some(value.clone()),
            (ValueType::Int, Value::Float(f))
                if f.fract() == 0.0 && *f >= i64::MIN as f64 && *f <= i64::MAX as f64 =>
            {
                Some(Value::Int(*f as i64))
            }
            (ValueType::Float, Value::Float(_)) => Some(value.clone()),
            (ValueType::Float, Value::Int(i)) => Some(Value::Float(*i as f64)),
            (ValueType::Bool, Value::Bool(_)) => Some(value.clone()),
            (ValueType::String, Value::Str(_)) => Some(value.clone()),
            (ValueType::StringList, Value::Str(_)) => Some(value.clone()),
            (ValueType::Enum(kind), Value::Enum(e)) if e.kind == kind => Some(value.clone()),
            (ValueType::Enum(kind), Value::Int(code)) => {
                kind.from_code(*code).ok().map(Value::Enum)
            }
            (ValueType::Enum(kind), Value::Str(name)) => {
                kind.from_name(name).ok().map(Value::Enum)
            }
            (ValueType::DateTime, Value::DateTime(_)) => Some(value.clone()),
            (ValueType::DateTime, Value::Str(s)) => DateTime::parse_from_rfc3339(s)
                .ok()
                .map(|dt| Value::DateTime(dt.with_timezone(&Utc))),
            (ValueType::Duration, Value::Duration(_)) => Some(value.clone()),
            _ => None,
        }
    }

    /// Whether a stored value conforms to this type. `Null` is checked
    /// separately against the property's `optional` flag.
    pub fn accepts(self, value: &Value) -> bool {
        match (self, value) {
            (_, Value::Null) => true,
            (ValueType::Int, Value::Int(_))
            | (ValueType::Float, Value::Float(_))
            | (ValueType::Float, Value::Int(_))
            | (ValueType::Bool, Value::Bool(_))
            | (ValueType::String, Value::Str(_))
            | (ValueType::DateTime, Value::DateTime(_))
            | (ValueType::Duration, Value::Duration(_)) => true,
            (ValueType::StringList, Value::List(items)) => {
                items.iter().all(|v| matches!(v, Value::Str(_)))
            }
            (ValueType::Enum(kind), Value::Enum(e)) => e.kind == kind,
            _ => false,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::Int => write!(f, "int"),
            ValueType::Float => write!(f, "float"),
            ValueType::Bool => write!(f, "bool"),
            ValueType::String => write!(f, "string"),
            ValueType::StringList => write!(f, "string[]"),
            ValueType::Enum(kind) => write!(f, "{kind}"),
            ValueType::DateTime => write!(f, "datetime"),
            ValueType::Duration => write!(f, "duration"),
        }
    }
}

/// A normalized, serializable literal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    /// An absent value.
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Enum(EnumValue),
    DateTime(DateTime<Utc>),
    /// A duration in whole seconds.
    Duration(i64),
    List(Vec<Value>),
    /// An anonymous object built by a projection.
    Object(BTreeMap<String, Value>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Enum(e) => Some(e.code),
            _ => None,
        }
    }

    /// Short type label used in diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::Enum(_) => "enum",
            Value::DateTime(_) => "datetime",
            Value::Duration(_) => "duration",
            Value::List(_) => "list",
            Value::Object(_) => "object",
        }
    }

    /// Local equality semantics.
    pub fn equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Null, _) | (_, Value::Null) => false,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Enum(e), Value::Str(s)) | (Value::Str(s), Value::Enum(e)) => {
                e.name().is_some_and(|name| name.eq_ignore_ascii_case(s))
            }
            (Value::List(a), Value::List(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.equals(y))
            }
            (Value::Object(a), Value::Object(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .zip(b)
                        .all(|((ka, va), (kb, vb))| ka == kb && va.equals(vb))
            }
            _ => self.compare(other) == Some(Ordering::Equal),
        }
    }

    /// Local ordering semantics. `None` when the values are not comparable.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (Value::Int(a), Value::Float(b)) => (*a as f64).partial_cmp(b),
            (Value::Float(a), Value::Int(b)) => a.partial_cmp(&(*b as f64)),
            (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
            (Value::Enum(a), Value::Enum(b)) if a.kind == b.kind => Some(a.code.cmp(&b.code)),
            (Value::Enum(a), Value::Int(b)) => Some(a.code.cmp(b)),
            (Value::Int(a), Value::Enum(b)) => Some(a.cmp(&b.code)),
            (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
            (Value::DateTime(a), Value::DateTime(b)) => Some(a.cmp(b)),
            (Value::Duration(a), Value::Duration(b)) => Some(a.cmp(b)),
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(v) => write!(f, "{v:?}"),
            Value::Str(s) => write!(f, "{s:?}"),
            Value::Enum(e) => match e.name() {
                Some(name) => write!(f, "{}.{}", e.kind, name),
                None => write!(f, "{}({})", e.kind, e.code),
            },
            Value::DateTime(dt) => write!(f, "{}", dt.to_rfc3339()),
            Value::Duration(secs) => write!(f, "{secs}s"),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Value::Object(fields) => {
                write!(f, "{{ ")?;
                for (i, (name, value)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{name} = {value}")?;
                }
                write!(f, " }}")
            }
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<EnumValue> for Value {
    fn from(e: EnumValue) -> Self {
        Value::Enum(e)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(dt: DateTime<Utc>) -> Self {
        Value::DateTime(dt)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl From<Vec<&str>> for Value {
    fn from(items: Vec<&str>) -> Self {
        Value::List(items.into_iter().map(Value::from).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}
