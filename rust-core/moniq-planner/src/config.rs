// SPDX-License-Identifier: PMPL-1.0-or-later
//! Planner configuration.
//!
//! Defaults:
//! - strict: false (residual filtering is allowed)
//! - max_branches: 64
//! - revalidate: true
//! - max_concurrency: 4

use serde::{Deserialize, Serialize};

use crate::error::QueryError;

/// Configuration for planning and executing a query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Reject any literal that cannot be filtered remotely instead of
    /// checking it after retrieval.
    pub strict: bool,
    /// Upper bound on the number of branches the DNF expansion may produce.
    pub max_branches: usize,
    /// Re-evaluate the full predicate against merged records.
    pub revalidate: bool,
    /// Maximum number of branch fetches in flight at once.
    pub max_concurrency: usize,
}

impl PlannerConfig {
    pub fn validate(&self) -> Result<(), QueryError> {
        if self.max_branches == 0 {
            return Err(QueryError::InvalidConfig(
                "max_branches must be at least 1".to_string(),
            ));
        }
        if self.max_concurrency == 0 {
            return Err(QueryError::InvalidConfig(
                "max_concurrency must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Parse and validate a configuration from JSON. Missing fields take
    /// their default values.
    pub fn from_json(json: &str) -> Result<Self, QueryError> {
        let config: PlannerConfig =
            serde_json::from_str(json).map_err(|e| QueryError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn revalidate(mut self, revalidate: bool) -> Self {
        self.revalidate = revalidate;
        self
    }
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            strict: false,
            max_branches: 64,
            revalidate: true,
            max_concurrency: 4,
        }
    }
}
