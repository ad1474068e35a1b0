// SPDX-License-Identifier: PMPL-1.0-or-later
//! Comparison operators understood by the remote filter dialect.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOperator {
    Equals,
    NotEquals,
    GreaterThan,
    LessThan,
    Contains,
}

impl FilterOperator {
    pub const ALL: [FilterOperator; 5] = [
        FilterOperator::Equals,
        FilterOperator::NotEquals,
        FilterOperator::GreaterThan,
        FilterOperator::LessThan,
        FilterOperator::Contains,
    ];

    /// Position in [`FilterOperator::ALL`]; capability rows are indexed by it.
    pub fn index(self) -> usize {
        match self {
            FilterOperator::Equals => 0,
            FilterOperator::NotEquals => 1,
            FilterOperator::GreaterThan => 2,
            FilterOperator::LessThan => 3,
            FilterOperator::Contains => 4,
        }
    }

    /// The operator to use when the operands are swapped (`5 < x` is `x > 5`).
    ///
    /// `Contains` is not symmetric and is returned unchanged; callers never
    /// swap its operands.
    pub fn flip(self) -> Self {
        match self {
            FilterOperator::GreaterThan => FilterOperator::LessThan,
            FilterOperator::LessThan => FilterOperator::GreaterThan,
            other => other,
        }
    }

    /// The exact logical negation, if it is itself a single operator.
    ///
    /// Only equality negates cleanly: `!(x > 5)` also holds when `x` is absent,
    /// which `x < 6` does not.
    pub fn negate(self) -> Option<Self> {
        match self {
            FilterOperator::Equals => Some(FilterOperator::NotEquals),
            FilterOperator::NotEquals => Some(FilterOperator::Equals),
            _ => None,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            FilterOperator::Equals => "==",
            FilterOperator::NotEquals => "!=",
            FilterOperator::GreaterThan => ">",
            FilterOperator::LessThan => "<",
            FilterOperator::Contains => "contains",
        }
    }

    /// Whether the operator bounds a range.
    pub fn is_bound(self) -> bool {
        matches!(self, FilterOperator::GreaterThan | FilterOperator::LessThan)
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}
