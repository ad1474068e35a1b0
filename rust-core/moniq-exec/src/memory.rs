// SPDX-License-Identifier: PMPL-1.0-or-later
//
// In-memory record source.
//
// Holds records in insertion order behind a tokio `RwLock` and answers
// fetches the way the remote filter dialect does: text equality and
// substring matching are case-insensitive, tag filters match any tag
// containing the needle, and numeric, enum, boolean and date comparisons are
// exact. Intended for tests, development and offline snapshots.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::trace;

use moniq_model::{FetchError, FilterOperator, ObjectKind, Record, Value};
use moniq_planner::{FilterSet, PagingHints, RemoteFilter};

use crate::source::RecordSource;

/// A record source backed by a vector in process memory.
///
/// Cloning is cheap and clones share the same records.
#[derive(Debug, Clone)]
pub struct InMemorySource {
    name: String,
    records: Arc<RwLock<Vec<Record>>>,
}

impl InMemorySource {
    /// Create a new, empty source.
    pub fn new() -> Self {
        Self::with_records(Vec::new())
    }

    /// Create a source holding `records`, in that order.
    pub fn with_records(records: impl IntoIterator<Item = Record>) -> Self {
        Self {
            name: "memory".to_string(),
            records: Arc::new(RwLock::new(records.into_iter().collect())),
        }
    }

    /// Rename the source, as reported by [`RecordSource::name`].
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub async fn insert(&self, record: Record) {
        self.records.write().await.push(record);
    }

    pub async fn extend(&self, records: impl IntoIterator<Item = Record>) {
        self.records.write().await.extend(records);
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    /// Every stored record of `kind`, unfiltered, in insertion order.
    pub async fn snapshot(&self, kind: ObjectKind) -> Vec<Record> {
        self.records
            .read()
            .await
            .iter()
            .filter(|r| r.kind() == kind)
            .cloned()
            .collect()
    }
}

impl Default for InMemorySource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RecordSource for InMemorySource {
    async fn fetch(
        &self,
        kind: ObjectKind,
        filters: &FilterSet,
        paging: &PagingHints,
    ) -> Result<Vec<Record>, FetchError> {
        trace!(source = %self.name, kind = %kind, request = %request_line(filters), "fetch");
        let records = self.records.read().await;
        let matched: Vec<Record> = records
            .iter()
            .filter(|r| r.kind() == kind && filters.iter().all(|f| remote_accepts(f, r)))
            .cloned()
            .collect();
        Ok(paging.apply(matched))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// How the remote applies one filter.
fn remote_accepts(filter: &RemoteFilter, record: &Record) -> bool {
    let atom = &filter.atom;
    match (atom.operator, record.get(atom.property), &atom.value) {
        (FilterOperator::Equals, Value::Str(actual), Value::Str(wanted)) => {
            fold_case(actual) == fold_case(wanted)
        }
        (FilterOperator::Contains, Value::Str(actual), Value::Str(needle)) => {
            fold_case(actual).contains(&fold_case(needle))
        }
        (FilterOperator::Contains, Value::List(items), Value::Str(needle)) => {
            let needle = fold_case(needle);
            items
                .iter()
                .any(|item| item.as_str().is_some_and(|t| fold_case(t).contains(&needle)))
        }
        _ => atom.holds(record),
    }
}

fn fold_case(s: &str) -> String {
    s.to_lowercase()
}

/// The filters as they would appear in a request query string.
fn request_line(filters: &FilterSet) -> String {
    if filters.is_empty() {
        return "(unfiltered)".to_string();
    }
    filters
        .iter()
        .map(|f| f.to_string().replace(" (approximate)", ""))
        .collect::<Vec<_>>()
        .join("&")
}
