// SPDX-License-Identifier: PMPL-1.0-or-later
//
// Metrics-collecting wrapper for record sources.
//
// Wraps any `RecordSource` and records every request issued through it: the
// filter set, the paging sent along, the number of records returned and the
// wall-clock latency. Tests use it to assert how many remote round trips a
// plan costs; it also tracks peak in-flight requests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tokio::sync::RwLock;

use moniq_model::{FetchError, ObjectKind, Record};
use moniq_planner::{FilterSet, PagingHints};

use crate::source::RecordSource;

/// One request as seen by the wrapped source.
#[derive(Debug, Clone, PartialEq)]
pub struct IssuedFetch {
    pub kind: ObjectKind,
    pub filters: FilterSet,
    pub paging: PagingHints,
}

/// Accumulated statistics for a record source.
///
/// All counters are monotonically increasing until [`MetricsSource::reset_stats`].
#[derive(Debug, Clone, Default)]
pub struct SourceStats {
    /// Number of `fetch` calls that returned.
    pub fetch_count: u64,
    /// Number of `fetch` calls that returned an error.
    pub error_count: u64,
    /// Total records returned across all successful fetches.
    pub records_returned: u64,
    /// Cumulative wall-clock latency of all fetches, in milliseconds.
    pub latency_sum_ms: f64,
    /// Highest number of fetches observed running at once.
    pub max_in_flight: usize,
    /// Every request, in the order it was issued.
    pub issued: Vec<IssuedFetch>,
}

/// A record source wrapper that records every fetch.
pub struct MetricsSource<S: RecordSource> {
    inner: S,
    stats: Arc<RwLock<SourceStats>>,
    in_flight: AtomicUsize,
}

impl<S: RecordSource> MetricsSource<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            stats: Arc::new(RwLock::new(SourceStats::default())),
            in_flight: AtomicUsize::new(0),
        }
    }

    /// Return a snapshot of the current statistics.
    pub async fn stats(&self) -> SourceStats {
        self.stats.read().await.clone()
    }

    /// Number of requests issued so far, including ones still running.
    pub async fn request_count(&self) -> usize {
        self.stats.read().await.issued.len()
    }

    pub async fn reset_stats(&self) {
        let mut s = self.stats.write().await;
        *s = SourceStats::default();
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait]
impl<S: RecordSource> RecordSource for MetricsSource<S> {
    async fn fetch(
        &self,
        kind: ObjectKind,
        filters: &FilterSet,
        paging: &PagingHints,
    ) -> Result<Vec<Record>, FetchError> {
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        {
            let mut s = self.stats.write().await;
            s.max_in_flight = s.max_in_flight.max(running);
            s.issued.push(IssuedFetch {
                kind,
                filters: filters.clone(),
                paging: *paging,
            });
        }

        let start = Instant::now();
        let result = self.inner.fetch(kind, filters, paging).await;
        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let mut s = self.stats.write().await;
        s.fetch_count += 1;
        s.latency_sum_ms += elapsed_ms;
        match &result {
            Ok(records) => s.records_returned += records.len() as u64,
            Err(_) => s.error_count += 1,
        }

        result
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}
