// SPDX-License-Identifier: PMPL-1.0-or-later
//! Query error types.
//!
//! Every classification and analysis error is raised while the plan is being
//! built, before any request reaches the remote source. Fetch errors are
//! carried through unchanged.

use thiserror::Error;

use moniq_model::{FetchError, FilterOperator, ModelError, ObjectKind, Property};

/// Errors that can occur while planning or executing a query.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueryError {
    #[error("property {property} cannot be used to filter {kind} objects")]
    UnsupportedFilterProperty { property: Property, kind: ObjectKind },

    #[error("operator '{operator}' is not supported when filtering on {property}")]
    UnsupportedFilterOperator {
        property: Property,
        operator: FilterOperator,
    },

    #[error("ambiguous filter on {property}: at least one end of a valid range must be specified")]
    AmbiguousRange { property: Property },

    #[error(
        "'{member}' is accessed on '{chain}', which may be null, in '{expression}'; \
         guard the access with a conditional such as '{chain} != null ? ... : ...'"
    )]
    NullSafetyViolation {
        /// The method or member dereferencing the nullable chain.
        member: String,
        /// The nullable receiver.
        chain: String,
        /// The enclosing expression.
        expression: String,
    },

    #[error("failed to evaluate '{expression}': {message}")]
    Evaluation { expression: String, message: String },

    #[error("captured variable '{0}' is not bound")]
    UnboundVariable(String),

    #[error("parameter '{0}' is not the query's parameter")]
    UnboundParameter(String),

    #[error("predicate '{0}' does not produce a boolean")]
    NotBoolean(String),

    #[error("'{expression}' cannot be filtered remotely and strict mode is enabled")]
    StrictModeViolation { expression: String },

    #[error("predicate expands to {branches} branches, more than the limit of {limit}")]
    PlanTooLarge { branches: usize, limit: usize },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid predicate: {0}")]
    InvalidPredicate(String),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("remote fetch failed: {0}")]
    RemoteFetch(#[from] FetchError),

    #[error("query cancelled")]
    Cancelled,
}

impl QueryError {
    pub(crate) fn evaluation(expression: impl ToString, message: impl ToString) -> Self {
        QueryError::Evaluation {
            expression: expression.to_string(),
            message: message.to_string(),
        }
    }

    /// Whether the error was raised while building the plan, before any fetch.
    pub fn is_plan_error(&self) -> bool {
        !matches!(self, QueryError::RemoteFetch(_) | QueryError::Cancelled)
    }
}
