// SPDX-License-Identifier: PMPL-1.0-or-later
//! moniq planner
//!
//! Compiles a boolean predicate over monitoring objects into a [`QueryPlan`]
//! for a remote source that can only AND single-property filters together.
//! The pipeline is partial evaluation, null-safety analysis, boolean
//! normalization into DNF, and capability-aware splitting of each branch
//! into remote filters and residual literals.

pub mod classify;
pub mod config;
pub mod error;
pub mod eval;
pub mod expr;
pub mod interp;
pub mod normalize;
pub mod null_safety;
pub mod plan;
pub mod planner;

pub use classify::{extract_atom, Classifier};
pub use config::PlannerConfig;
pub use error::QueryError;
pub use eval::PartialEvaluator;
pub use expr::{BinaryOp, CastType, Expr, Member, Method, Predicate, UnaryOp};
pub use interp::{Captures, Scope};
pub use normalize::{normalize, to_dnf, Dnf};
pub use plan::{
    Atom, Branch, BranchStrategy, FilterSet, PagingHints, QueryPlan, RemoteFilter,
};
pub use planner::Planner;
