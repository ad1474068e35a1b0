// SPDX-License-Identifier: PMPL-1.0-or-later
//! Capability-aware classification of DNF branches.
//!
//! Each conjunction is split into the filters sent to the remote source and
//! the literals checked locally after retrieval. Literals shaped like a
//! single property compared against a constant become [`Atom`]s and are
//! looked up in the [`CapabilityTable`]; everything else is residual.
//!
//! Atom recognition, with `p` a property of the query parameter:
//!
//! | Literal                    | Atom                          |
//! |----------------------------|-------------------------------|
//! | `p op c`, `c op p`         | `p op c` (operands flipped)   |
//! | `(int)p == c`              | `p == c` (cast peeled)        |
//! | `p.Contains(c)`            | `p contains c`                |
//! | `p` / `!p` (boolean `p`)   | `p == true` / `p == false`    |
//! | `!(p == c)`                | `p != c`                      |
//! | `p >= n` (integral `p`)    | `p > n - 1`                   |
//! | `p <= n` (integral `p`)    | `p < n + 1`                   |
//!
//! A constant that is null or cannot be coerced to the property's type keeps
//! the literal residual.

use tracing::trace;

use moniq_model::{
    Capability, CapabilityTable, EnumValue, Fidelity, FilterOperator, ObjectKind, Property,
    Value, ValueType,
};

use crate::error::QueryError;
use crate::expr::{BinaryOp, CastType, Expr, Member, Method, UnaryOp};
use crate::normalize::Dnf;
use crate::plan::{Atom, Branch, FilterSet, RemoteFilter};

/// Splits branches against a capability table for one object kind.
pub struct Classifier<'a> {
    table: &'a CapabilityTable,
    kind: ObjectKind,
    parameter: &'a str,
    strict: bool,
}

impl<'a> Classifier<'a> {
    pub fn new(table: &'a CapabilityTable, kind: ObjectKind, parameter: &'a str) -> Self {
        Self {
            table,
            kind,
            parameter,
            strict: false,
        }
    }

    /// Fail on literals that can only be checked locally.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Classify every conjunction, in order, and collapse identical branches.
    pub fn classify(&self, dnf: Dnf) -> Result<Vec<Branch>, QueryError> {
        let mut branches: Vec<Branch> = Vec::with_capacity(dnf.len());
        for conjunction in dnf {
            let branch = self.classify_branch(branches.len(), conjunction)?;
            if branches.iter().any(|b| same_branch(b, &branch)) {
                trace!(branch = %branch.source_predicate(), "collapsed duplicate branch");
                continue;
            }
            branches.push(branch);
        }
        Ok(branches)
    }

    fn classify_branch(&self, index: usize, literals: Vec<Expr>) -> Result<Branch, QueryError> {
        let mut remote = FilterSet::new();
        let mut residual = Vec::new();

        for literal in &literals {
            match extract_atom(literal, self.parameter) {
                Some(atom) => {
                    let placement = self.place(&atom, &remote)?;
                    trace!(atom = %atom, placement = ?placement, "classified atom");
                    match placement {
                        Placement::Remote(filter) => {
                            let approximate = filter.fidelity == Fidelity::Approximate;
                            remote.push(filter);
                            if approximate {
                                residual.push(literal.clone());
                            }
                        }
                        Placement::Demoted => residual.push(literal.clone()),
                        Placement::ResidualOnly => {
                            if self.strict {
                                return Err(QueryError::StrictModeViolation {
                                    expression: literal.to_string(),
                                });
                            }
                            residual.push(literal.clone());
                        }
                    }
                }
                None => {
                    for property in literal.properties() {
                        self.check_filterable(property)?;
                    }
                    if self.strict {
                        return Err(QueryError::StrictModeViolation {
                            expression: literal.to_string(),
                        });
                    }
                    trace!(literal = %literal, "residual literal");
                    residual.push(literal.clone());
                }
            }
        }

        Ok(Branch {
            index,
            remote,
            residual,
            source: literals,
        })
    }

    fn check_filterable(&self, property: Property) -> Result<(), QueryError> {
        if property.applies_to(self.kind) && self.table.is_filterable(property) {
            Ok(())
        } else {
            Err(QueryError::UnsupportedFilterProperty {
                property,
                kind: self.kind,
            })
        }
    }

    fn place(&self, atom: &Atom, remote: &FilterSet) -> Result<Placement, QueryError> {
        let property = atom.property;
        self.check_filterable(property)?;

        let range_only = self.table.is_range_only(property);
        if range_only && !atom.operator.is_bound() {
            return Err(QueryError::AmbiguousRange { property });
        }

        let entry = self.table.entry(property, atom.operator);
        let fidelity = match entry.capability {
            Capability::Unsupported => {
                return Err(QueryError::UnsupportedFilterOperator {
                    property,
                    operator: atom.operator,
                })
            }
            Capability::ResidualOnly => return Ok(Placement::ResidualOnly),
            Capability::Supported(fidelity) => fidelity,
        };

        // One remote atom per property; a range may carry one bound of each side.
        let taken = if range_only {
            remote.on(property).any(|f| f.atom.operator == atom.operator)
        } else {
            remote.on(property).next().is_some()
        };
        if taken {
            return Ok(Placement::Demoted);
        }

        match entry.rule.serialize(&atom.value) {
            Ok(serialized) => Ok(Placement::Remote(RemoteFilter {
                atom: atom.clone(),
                serialized,
                fidelity,
            })),
            Err(err) => {
                trace!(atom = %atom, error = %err, "value cannot be sent remotely");
                Ok(Placement::ResidualOnly)
            }
        }
    }
}

#[derive(Debug)]
enum Placement {
    Remote(RemoteFilter),
    /// Pushable, but the property already has a remote atom in this branch.
    Demoted,
    ResidualOnly,
}

fn same_branch(a: &Branch, b: &Branch) -> bool {
    let same_set = |x: &[Expr], y: &[Expr]| x.len() == y.len() && x.iter().all(|e| y.contains(e));
    a.remote.len() == b.remote.len()
        && a.remote.iter().all(|f| b.remote.iter().any(|g| g == f))
        && same_set(&a.residual, &b.residual)
}

/// Recognize a literal as a single property/operator/constant comparison.
pub fn extract_atom(literal: &Expr, parameter: &str) -> Option<Atom> {
    match literal {
        Expr::Binary { op, left, right } if op.is_comparison() => {
            let (property, op, constant) =
                match (property_of(left, parameter), right.as_constant()) {
                    (Some(p), Some(c)) => (p, *op, c),
                    _ => match (left.as_constant(), property_of(right, parameter)) {
                        (Some(c), Some(p)) => (p, op.flip(), c),
                        _ => return None,
                    },
                };
            comparison_atom(property, op, constant)
        }
        Expr::Call {
            receiver: Some(receiver),
            method: Method::Contains,
            args,
        } => {
            let property = property_of(receiver, parameter)?;
            let [arg] = args.as_slice() else {
                return None;
            };
            let value = coerce(property, arg.as_constant()?)?;
            Some(Atom::new(property, FilterOperator::Contains, value))
        }
        Expr::Unary {
            op: UnaryOp::Not,
            operand,
        } => {
            if let Some(property) = property_of(operand, parameter) {
                return bool_atom(property, false);
            }
            let atom = extract_atom(operand, parameter)?;
            let negated = atom.operator.negate()?;
            Some(Atom::new(atom.property, negated, atom.value))
        }
        other => bool_atom(property_of(other, parameter)?, true),
    }
}

fn bool_atom(property: Property, value: bool) -> Option<Atom> {
    (property.value_type() == ValueType::Bool)
        .then(|| Atom::new(property, FilterOperator::Equals, value))
}

fn comparison_atom(property: Property, op: BinaryOp, constant: &Value) -> Option<Atom> {
    let value = coerce(property, constant)?;
    let (operator, value) = match op {
        BinaryOp::Equal => (FilterOperator::Equals, value),
        BinaryOp::NotEqual => (FilterOperator::NotEquals, value),
        BinaryOp::GreaterThan => (FilterOperator::GreaterThan, value),
        BinaryOp::LessThan => (FilterOperator::LessThan, value),
        BinaryOp::GreaterThanOrEqual => (FilterOperator::GreaterThan, step(property, value, -1)?),
        BinaryOp::LessThanOrEqual => (FilterOperator::LessThan, step(property, value, 1)?),
        _ => return None,
    };
    Some(Atom::new(property, operator, value))
}

fn coerce(property: Property, constant: &Value) -> Option<Value> {
    if constant.is_null() {
        return None;
    }
    property.value_type().coerce(constant)
}

/// Shift an integral bound by one so that a non-strict comparison becomes strict.
fn step(property: Property, value: Value, delta: i64) -> Option<Value> {
    if !property.value_type().is_integral() {
        return None;
    }
    match value {
        Value::Int(i) => i.checked_add(delta).map(Value::Int),
        Value::Enum(e) => e.code.checked_add(delta).map(|code| {
            Value::Enum(EnumValue {
                kind: e.kind,
                code,
            })
        }),
        _ => None,
    }
}

/// The property read by `expr`, looking through casts that keep its value.
fn property_of(expr: &Expr, parameter: &str) -> Option<Property> {
    match expr {
        Expr::Member {
            target,
            member: Member::Property(p),
        } => match target.as_ref() {
            Expr::Parameter(name) if name == parameter => Some(*p),
            _ => None,
        },
        Expr::Cast { expr, to } if is_transparent(to) => property_of(expr, parameter),
        _ => None,
    }
}

fn is_transparent(to: &CastType) -> bool {
    match to {
        CastType::Int | CastType::Float | CastType::Enum(_) | CastType::Object => true,
        CastType::Nullable(inner) => is_transparent(inner),
        CastType::Bool | CastType::Str => false,
    }
}
