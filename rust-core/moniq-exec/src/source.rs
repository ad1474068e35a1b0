// SPDX-License-Identifier: PMPL-1.0-or-later
//
// The record source trait.
//
// A `RecordSource` is the remote side of a query: it accepts one AND-ed set
// of single-property filters per request and returns the matching records.
// Transport, authentication and decoding live behind this trait.

use std::sync::Arc;

use async_trait::async_trait;

use moniq_model::{FetchError, ObjectKind, Record};
use moniq_planner::{FilterSet, PagingHints};

/// A source of monitoring records with limited native filtering.
///
/// Implementations must be safe to share across threads and tokio tasks;
/// the executor issues one `fetch` per plan branch, possibly concurrently.
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Retrieve every record of `kind` that satisfies all of `filters`.
    ///
    /// An empty filter set means an unfiltered request. Records are returned
    /// in the source's own order, after applying `paging`. A source may
    /// return a superset for filters marked approximate, but never a subset.
    async fn fetch(
        &self,
        kind: ObjectKind,
        filters: &FilterSet,
        paging: &PagingHints,
    ) -> Result<Vec<Record>, FetchError>;

    /// A human-readable name for this source, used in logging.
    fn name(&self) -> &str;
}

#[async_trait]
impl<S: RecordSource + ?Sized> RecordSource for Arc<S> {
    async fn fetch(
        &self,
        kind: ObjectKind,
        filters: &FilterSet,
        paging: &PagingHints,
    ) -> Result<Vec<Record>, FetchError> {
        (**self).fetch(kind, filters, paging).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
