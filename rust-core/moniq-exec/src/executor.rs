// SPDX-License-Identifier: PMPL-1.0-or-later
//
// Plan execution and result merging.
//
// Each branch of a plan becomes one remote fetch. Fetches run concurrently,
// bounded by `PlannerConfig::max_concurrency`; the first failure drops the
// rest. Survivors of each branch's residual check are then concatenated in
// branch order and deduplicated by identity key.

use std::collections::HashSet;

use futures::{stream, StreamExt, TryStreamExt};
use tracing::{debug, info, instrument, trace, warn};

use moniq_model::Record;
use moniq_planner::{Branch, PagingHints, PlannerConfig, QueryError, QueryPlan};

use crate::cancel::CancelSignal;
use crate::source::RecordSource;

/// Runs compiled plans against a record source.
#[derive(Debug, Clone, Default)]
pub struct Executor {
    config: PlannerConfig,
    cancel: Option<CancelSignal>,
}

impl Executor {
    pub fn new(config: PlannerConfig) -> Self {
        Self {
            config,
            cancel: None,
        }
    }

    /// Abort execution, without partial results, when `signal` fires.
    pub fn with_cancel(mut self, signal: CancelSignal) -> Self {
        self.cancel = Some(signal);
        self
    }

    /// Fetch, filter and merge the results of `plan`.
    ///
    /// Records come back in branch order, and in source order within a
    /// branch. A record matched by several branches appears once, at the
    /// position of its first match.
    #[instrument(skip_all, fields(kind = %plan.kind, branches = plan.branches.len(), source = source.name()))]
    pub async fn execute<S>(&self, source: &S, plan: &QueryPlan) -> Result<Vec<Record>, QueryError>
    where
        S: RecordSource + ?Sized,
    {
        self.config.validate()?;
        if self.cancel.as_ref().is_some_and(CancelSignal::is_cancelled) {
            return Err(QueryError::Cancelled);
        }
        if plan.is_unsatisfiable() {
            debug!("predicate is never true, no request issued");
            return Ok(Vec::new());
        }

        let per_branch = match &self.cancel {
            Some(signal) => tokio::select! {
                biased;
                _ = signal.cancelled() => {
                    warn!("query cancelled with fetches in flight");
                    return Err(QueryError::Cancelled);
                }
                result = self.fetch_branches(source, plan) => result?,
            },
            None => self.fetch_branches(source, plan).await?,
        };

        let mut records = merge(per_branch);
        if self.config.revalidate {
            records = revalidate(plan, records)?;
        }
        if !plan.paging_pushed {
            records = plan.paging.apply(records);
        }

        info!(returned = records.len(), paging_pushed = plan.paging_pushed, "query executed");
        Ok(records)
    }

    async fn fetch_branches<S>(
        &self,
        source: &S,
        plan: &QueryPlan,
    ) -> Result<Vec<(usize, Vec<Record>)>, QueryError>
    where
        S: RecordSource + ?Sized,
    {
        let paging = plan.remote_paging();
        let mut results: Vec<(usize, Vec<Record>)> = stream::iter(&plan.branches)
            .map(|branch| async move {
                let kept = fetch_branch(source, plan, branch, paging).await?;
                Ok::<_, QueryError>((branch.index, kept))
            })
            .buffer_unordered(self.config.max_concurrency)
            .try_collect()
            .await?;
        // Completion order is arbitrary; output order is declaration order.
        results.sort_by_key(|(index, _)| *index);
        Ok(results)
    }
}

async fn fetch_branch<S>(
    source: &S,
    plan: &QueryPlan,
    branch: &Branch,
    paging: PagingHints,
) -> Result<Vec<Record>, QueryError>
where
    S: RecordSource + ?Sized,
{
    debug!(
        branch = branch.index,
        strategy = %branch.strategy(),
        filters = branch.remote.len(),
        "fetching branch"
    );
    let records = source.fetch(plan.kind, &branch.remote, &paging).await?;
    let fetched = records.len();

    let mut kept = Vec::with_capacity(fetched);
    for record in records {
        if branch.accepts(&plan.parameter, &record)? {
            kept.push(record);
        }
    }
    trace!(branch = branch.index, fetched, kept = kept.len(), "branch filtered");
    Ok(kept)
}

/// Concatenate branch results, keeping the first record per identity key.
fn merge(per_branch: Vec<(usize, Vec<Record>)>) -> Vec<Record> {
    let mut seen = HashSet::new();
    per_branch
        .into_iter()
        .flat_map(|(_, records)| records)
        .filter(|record| seen.insert(record.key()))
        .collect()
}

fn revalidate(plan: &QueryPlan, records: Vec<Record>) -> Result<Vec<Record>, QueryError> {
    let before = records.len();
    let mut kept = Vec::with_capacity(before);
    for record in records {
        if plan.matches(&record)? {
            kept.push(record);
        }
    }
    if kept.len() < before {
        warn!(
            dropped = before - kept.len(),
            "re-validation removed records that fail the full predicate"
        );
    }
    Ok(kept)
}
