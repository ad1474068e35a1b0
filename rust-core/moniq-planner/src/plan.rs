// SPDX-License-Identifier: PMPL-1.0-or-later
//! Query plan types.

use std::fmt;

use serde::{Deserialize, Serialize};

use moniq_model::{Fidelity, FilterOperator, ObjectKind, Property, Record, Value};

use crate::error::QueryError;
use crate::expr::Expr;
use crate::interp::{self, Captures, Scope};

/// One comparison of a property against a literal, with the literal
/// already coerced to the property's type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Atom {
    pub property: Property,
    pub operator: FilterOperator,
    pub value: Value,
}

impl Atom {
    pub fn new(property: Property, operator: FilterOperator, value: impl Into<Value>) -> Self {
        Self {
            property,
            operator,
            value: value.into(),
        }
    }

    /// Local semantics of the atom.
    pub fn holds(&self, record: &Record) -> bool {
        let actual = record.get(self.property);
        match self.operator {
            FilterOperator::Equals => actual.equals(&self.value),
            FilterOperator::NotEquals => !actual.equals(&self.value),
            FilterOperator::GreaterThan => {
                actual.compare(&self.value) == Some(std::cmp::Ordering::Greater)
            }
            FilterOperator::LessThan => {
                actual.compare(&self.value) == Some(std::cmp::Ordering::Less)
            }
            FilterOperator::Contains => match (actual, &self.value) {
                (Value::Str(s), Value::Str(needle)) => s.contains(needle.as_str()),
                (Value::List(items), v) => items.iter().any(|i| i.equals(v)),
                _ => false,
            },
        }
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.property, self.operator, self.value)
    }
}

/// An atom the remote source applies, with its request-ready value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteFilter {
    pub atom: Atom,
    /// The value written with the property's serialization rule.
    pub serialized: String,
    pub fidelity: Fidelity,
}

impl fmt::Display for RemoteFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "filter_{}{}{}",
            self.atom.property.name().to_lowercase(),
            match self.atom.operator {
                FilterOperator::Equals | FilterOperator::Contains => "=",
                FilterOperator::NotEquals => "=@neq(",
                FilterOperator::GreaterThan => "=@above(",
                FilterOperator::LessThan => "=@below(",
            },
            self.serialized
        )?;
        if matches!(
            self.atom.operator,
            FilterOperator::NotEquals | FilterOperator::GreaterThan | FilterOperator::LessThan
        ) {
            write!(f, ")")?;
        }
        if self.fidelity == Fidelity::Approximate {
            write!(f, " (approximate)")?;
        }
        Ok(())
    }
}

/// The filters sent with one remote request; all of them must hold.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterSet {
    filters: Vec<RemoteFilter>,
}

impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, filter: RemoteFilter) {
        self.filters.push(filter);
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RemoteFilter> {
        self.filters.iter()
    }

    pub fn on(&self, property: Property) -> impl Iterator<Item = &RemoteFilter> {
        self.filters
            .iter()
            .filter(move |f| f.atom.property == property)
    }
}

impl<'a> IntoIterator for &'a FilterSet {
    type Item = &'a RemoteFilter;
    type IntoIter = std::slice::Iter<'a, RemoteFilter>;

    fn into_iter(self) -> Self::IntoIter {
        self.filters.iter()
    }
}

/// Paging requested by the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PagingHints {
    pub skip: usize,
    pub limit: Option<usize>,
}

impl PagingHints {
    pub fn is_unbounded(&self) -> bool {
        self.skip == 0 && self.limit.is_none()
    }

    /// Apply the hints to an already ordered result.
    pub fn apply<T>(&self, items: Vec<T>) -> Vec<T> {
        let taken = items.into_iter().skip(self.skip);
        match self.limit {
            Some(n) => taken.take(n).collect(),
            None => taken.collect(),
        }
    }
}

/// How a branch is retrieved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BranchStrategy {
    /// Every literal is applied remotely.
    Remote,
    /// Filtered remotely, then checked locally.
    RemoteThenFilter,
    /// Nothing can be pushed: fetch everything and filter locally.
    FetchAllThenFilter,
}

impl fmt::Display for BranchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BranchStrategy::Remote => write!(f, "remote"),
            BranchStrategy::RemoteThenFilter => write!(f, "remote then filter"),
            BranchStrategy::FetchAllThenFilter => write!(f, "fetch all then filter"),
        }
    }
}

/// One conjunction of the plan: a remote request plus local re-checks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Branch {
    /// Position among the plan's branches; results merge in this order.
    pub index: usize,
    pub remote: FilterSet,
    /// Literals checked after retrieval.
    pub residual: Vec<Expr>,
    /// The literals of the conjunction this branch was built from.
    pub source: Vec<Expr>,
}

impl Branch {
    pub fn strategy(&self) -> BranchStrategy {
        match (self.remote.is_empty(), self.residual.is_empty()) {
            (true, _) => BranchStrategy::FetchAllThenFilter,
            (false, true) => BranchStrategy::Remote,
            (false, false) => BranchStrategy::RemoteThenFilter,
        }
    }

    /// The full conjunction this branch stands for.
    pub fn source_predicate(&self) -> Expr {
        Expr::conjunction(self.source.iter().cloned())
    }

    /// Whether a retrieved record passes the residual literals.
    pub fn accepts(&self, parameter: &str, record: &Record) -> Result<bool, QueryError> {
        let captures = Captures::new();
        let scope = Scope::new(parameter, &captures).with_record(record);
        for literal in &self.residual {
            if !interp::matches(literal, &scope)? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

/// A compiled query: a disjunction of branches for one object kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryPlan {
    pub kind: ObjectKind,
    pub parameter: String,
    /// The folded predicate, used for re-validation.
    pub predicate: Expr,
    /// Empty when the predicate can never hold.
    pub branches: Vec<Branch>,
    pub paging: PagingHints,
    /// Whether `paging` is sent with the request instead of applied after merge.
    pub paging_pushed: bool,
}

impl QueryPlan {
    pub fn is_unsatisfiable(&self) -> bool {
        self.branches.is_empty()
    }

    /// Number of remote requests executing the plan issues.
    pub fn request_count(&self) -> usize {
        self.branches.len()
    }

    /// Paging to send with a branch's request.
    pub fn remote_paging(&self) -> PagingHints {
        if self.paging_pushed {
            self.paging
        } else {
            PagingHints::default()
        }
    }

    /// Evaluate the full predicate against a record.
    pub fn matches(&self, record: &Record) -> Result<bool, QueryError> {
        let captures = Captures::new();
        let scope = Scope::new(&self.parameter, &captures).with_record(record);
        interp::matches(&self.predicate, &scope)
    }

    pub fn to_json(&self) -> Result<String, QueryError> {
        serde_json::to_string_pretty(self).map_err(|e| QueryError::InvalidPredicate(e.to_string()))
    }

    /// Render the plan as a human-readable EXPLAIN text block.
    pub fn explain(&self) -> String {
        let mut out = String::new();

        out.push_str("=== moniq EXPLAIN ===\n\n");
        out.push_str(&format!("Kind: {}\n", self.kind));
        out.push_str(&format!("Predicate: {} => {}\n", self.parameter, self.predicate));
        if self.is_unsatisfiable() {
            out.push_str("Branches: none (predicate is never true; no request is issued)\n");
            return out;
        }
        out.push_str(&format!("Branches: {}\n", self.branches.len()));
        if !self.paging.is_unbounded() {
            out.push_str(&format!(
                "Paging: skip {}, limit {} ({})\n",
                self.paging.skip,
                self.paging
                    .limit
                    .map(|n| n.to_string())
                    .unwrap_or_else(|| "none".to_string()),
                if self.paging_pushed {
                    "sent with request"
                } else {
                    "applied after merge"
                }
            ));
        }

        for branch in &self.branches {
            out.push_str(&format!(
                "\n--- Branch {}: {} ---\n",
                branch.index + 1,
                branch.strategy()
            ));
            if branch.remote.is_empty() {
                out.push_str("  remote: (unfiltered)\n");
            }
            for filter in &branch.remote {
                out.push_str(&format!("  remote: {}  [{}]\n", filter.atom, filter));
            }
            for literal in &branch.residual {
                out.push_str(&format!("  residual: {}\n", literal));
            }
        }

        out
    }
}

impl fmt::Display for QueryPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "QueryPlan(kind={}, branches={}, paging_pushed={})",
            self.kind,
            self.branches.len(),
            self.paging_pushed
        )
    }
}
