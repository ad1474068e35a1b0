// SPDX-License-Identifier: PMPL-1.0-or-later
//! moniq execution
//!
//! Runs compiled [`QueryPlan`](moniq_planner::QueryPlan)s against a
//! [`RecordSource`]: one fetch per branch, concurrently, followed by
//! residual filtering, ordered merging and optional re-validation.
//! [`Query`] is the lazy front end tying planning and execution together.

pub mod cancel;
pub mod executor;
pub mod memory;
pub mod metrics;
pub mod query;
pub mod source;

pub use cancel::CancelSignal;
pub use executor::Executor;
pub use memory::InMemorySource;
pub use metrics::{IssuedFetch, MetricsSource, SourceStats};
pub use query::Query;
pub use source::RecordSource;
