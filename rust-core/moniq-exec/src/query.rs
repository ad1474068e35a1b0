// SPDX-License-Identifier: PMPL-1.0-or-later
//
// The lazy query builder.
//
// A `Query` only records what was asked for. Nothing is planned until
// `plan()` or a terminal (`execute`, `select`, `first`, `count`) runs, and
// every terminal re-plans from scratch.

use std::sync::Arc;

use tracing::instrument;

use moniq_model::{ObjectKind, Record, Value};
use moniq_planner::interp::{self, Captures, Scope};
use moniq_planner::{Expr, PagingHints, Planner, PlannerConfig, Predicate, QueryError, QueryPlan};

use crate::cancel::CancelSignal;
use crate::executor::Executor;
use crate::source::RecordSource;

/// Parameter name used when no predicate was given.
const DEFAULT_PARAMETER: &str = "o";

/// A predicate-based retrieval of one object kind from a record source.
#[derive(Debug)]
pub struct Query<S: RecordSource + ?Sized> {
    source: Arc<S>,
    kind: ObjectKind,
    predicate: Option<Predicate>,
    captures: Captures,
    paging: PagingHints,
    config: PlannerConfig,
    cancel: Option<CancelSignal>,
}

impl<S: RecordSource + ?Sized> Clone for Query<S> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
            kind: self.kind,
            predicate: self.predicate.clone(),
            captures: self.captures.clone(),
            paging: self.paging,
            config: self.config.clone(),
            cancel: self.cancel.clone(),
        }
    }
}

impl<S: RecordSource + ?Sized> Query<S> {
    /// Retrieve every object of `kind`.
    pub fn new(source: Arc<S>, kind: ObjectKind) -> Self {
        Self {
            source,
            kind,
            predicate: None,
            captures: Captures::new(),
            paging: PagingHints::default(),
            config: PlannerConfig::default(),
            cancel: None,
        }
    }

    /// Replace the predicate.
    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.predicate = Some(predicate);
        self
    }

    /// AND a further predicate onto the current one.
    pub fn refine(mut self, predicate: Predicate) -> Self {
        self.predicate = Some(match self.predicate.take() {
            Some(current) => current.and(predicate),
            None => predicate,
        });
        self
    }

    /// Supply the value of a captured variable.
    pub fn bind(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.captures.bind(name, value);
        self
    }

    /// Keep at most `n` of the remaining results.
    pub fn take(mut self, n: usize) -> Self {
        self.paging.limit = Some(self.paging.limit.map_or(n, |limit| limit.min(n)));
        self
    }

    /// Drop the first `n` of the remaining results.
    pub fn skip(mut self, n: usize) -> Self {
        self.paging.skip += n;
        if let Some(limit) = self.paging.limit.as_mut() {
            *limit = limit.saturating_sub(n);
        }
        self
    }

    pub fn with_config(mut self, config: PlannerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_cancel(mut self, signal: CancelSignal) -> Self {
        self.cancel = Some(signal);
        self
    }

    pub fn kind(&self) -> ObjectKind {
        self.kind
    }

    pub fn paging(&self) -> PagingHints {
        self.paging
    }

    pub fn predicate(&self) -> Option<&Predicate> {
        self.predicate.as_ref()
    }

    /// Compile the query without running it.
    pub fn plan(&self) -> Result<QueryPlan, QueryError> {
        let everything;
        let predicate = match &self.predicate {
            Some(p) => p,
            None => {
                everything = Predicate::new(DEFAULT_PARAMETER, Expr::lit(true));
                &everything
            }
        };
        Planner::new(self.config.clone()).plan(self.kind, predicate, &self.captures, self.paging)
    }

    /// Plan and run the query.
    #[instrument(skip_all, fields(kind = %self.kind))]
    pub async fn execute(&self) -> Result<Vec<Record>, QueryError> {
        let plan = self.plan()?;
        let mut executor = Executor::new(self.config.clone());
        if let Some(signal) = &self.cancel {
            executor = executor.with_cancel(signal.clone());
        }
        executor.execute(self.source.as_ref(), &plan).await
    }

    /// Run the query and evaluate `projection` against each result, with
    /// `parameter` bound to the record.
    pub async fn select(&self, parameter: &str, projection: &Expr) -> Result<Vec<Value>, QueryError> {
        let records = self.execute().await?;
        records
            .iter()
            .map(|record| {
                let scope = Scope::new(parameter, &self.captures).with_record(record);
                interp::evaluate(projection, &scope)
            })
            .collect()
    }

    /// The first result, if any.
    pub async fn first(&self) -> Result<Option<Record>, QueryError> {
        let records = self.clone().take(1).execute().await?;
        Ok(records.into_iter().next())
    }

    pub async fn count(&self) -> Result<usize, QueryError> {
        Ok(self.execute().await?.len())
    }
}
