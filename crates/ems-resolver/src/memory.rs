//! In-process resolver
//!
//! Ordered record store with the same contract as the HTTP adapter. Used by
//! tests and offline demos; supports failure injection and per-query latency
//! so overlapping searches can be made to complete out of issue order.

use crate::error::ResolverError;
use crate::resolver::RemoteResolver;
use crate::types::{
    ExportArtifact, ExportFilter, Mutation, NotificationRequest, Record, RecordId, SearchPage,
    SearchParams,
};
use async_trait::async_trait;
use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

/// Default page size
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// In-memory resolver for one resource
#[derive(Debug)]
pub struct InMemoryResolver {
    resource: String,
    page_size: usize,
    records: RwLock<IndexMap<RecordId, Record>>,
    latencies: RwLock<HashMap<Option<String>, Duration>>,
    failing_searches: AtomicUsize,
    fail_mutations: AtomicBool,
    search_calls: AtomicUsize,
    exports: Mutex<Vec<ExportFilter>>,
    notifications: Mutex<Vec<NotificationRequest>>,
}

impl InMemoryResolver {
    /// Create empty resolver
    #[must_use]
    pub fn new(resource: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            page_size: DEFAULT_PAGE_SIZE,
            records: RwLock::new(IndexMap::new()),
            latencies: RwLock::new(HashMap::new()),
            failing_searches: AtomicUsize::new(0),
            fail_mutations: AtomicBool::new(false),
            search_calls: AtomicUsize::new(0),
            exports: Mutex::new(Vec::new()),
            notifications: Mutex::new(Vec::new()),
        }
    }

    /// With page size used when the request sets none
    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// With initial records (insertion order is listing order)
    #[must_use]
    pub fn with_records(self, records: impl IntoIterator<Item = Record>) -> Self {
        {
            let mut store = self.records.write();
            for record in records {
                store.insert(record.id.clone(), record);
            }
        }
        self
    }

    /// Delay searches for `q` (`None` = unfiltered search)
    pub fn set_latency(&self, q: Option<&str>, delay: Duration) {
        self.latencies
            .write()
            .insert(q.map(str::to_string), delay);
    }

    /// Make the next `n` searches fail
    pub fn fail_next_searches(&self, n: usize) {
        self.failing_searches.store(n, Ordering::SeqCst);
    }

    /// Make every mutation, export and notification fail until reset
    pub fn fail_mutations(&self, fail: bool) {
        self.fail_mutations.store(fail, Ordering::SeqCst);
    }

    /// Number of search calls received
    #[must_use]
    pub fn search_calls(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }

    /// Export filters received, oldest first
    #[must_use]
    pub fn exports(&self) -> Vec<ExportFilter> {
        self.exports.lock().clone()
    }

    /// Notifications received, oldest first
    #[must_use]
    pub fn notifications(&self) -> Vec<NotificationRequest> {
        self.notifications.lock().clone()
    }

    /// Look up a stored record
    #[must_use]
    pub fn get(&self, id: &RecordId) -> Option<Record> {
        self.records.read().get(id).cloned()
    }

    /// Number of stored records
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Check if store is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    fn take_search_failure(&self) -> bool {
        self.failing_searches
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    fn latency_for(&self, params: &SearchParams) -> Option<Duration> {
        let key = if params.is_unfiltered() {
            None
        } else {
            params.q.clone()
        };
        self.latencies.read().get(&key).copied()
    }
}

/// Case-insensitive substring match over the id and every string field
fn matches_query(record: &Record, needle: &str) -> bool {
    if record.id.as_str().to_lowercase().contains(needle) {
        return true;
    }
    record.fields.values().any(|value| match value {
        Value::String(text) => text.to_lowercase().contains(needle),
        _ => false,
    })
}

#[async_trait]
impl RemoteResolver for InMemoryResolver {
    fn resource(&self) -> &str {
        &self.resource
    }

    async fn search(&self, params: SearchParams) -> Result<SearchPage, ResolverError> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.latency_for(&params) {
            tokio::time::sleep(delay).await;
        }
        if self.take_search_failure() {
            return Err(ResolverError::Transport("injected search failure".to_string()));
        }

        let needle = params
            .q
            .as_deref()
            .map(|q| q.trim().to_lowercase())
            .filter(|q| !q.is_empty());
        let per_page = params
            .per_page
            .map_or(self.page_size, |n| usize::try_from(n).unwrap_or(usize::MAX).max(1));
        let page = params.page.unwrap_or(1).max(1);
        let skip = usize::try_from(page - 1)
            .unwrap_or(usize::MAX)
            .saturating_mul(per_page);

        let store = self.records.read();
        let matching: Vec<&Record> = store
            .values()
            .filter(|record| needle.as_deref().map_or(true, |n| matches_query(record, n)))
            .collect();
        let total = matching.len() as u64;
        let data = matching
            .into_iter()
            .skip(skip)
            .take(per_page)
            .cloned()
            .collect();

        Ok(SearchPage {
            data,
            total: Some(total),
        })
    }

    async fn mutate(&self, mutation: Mutation) -> Result<Option<Record>, ResolverError> {
        if self.fail_mutations.load(Ordering::SeqCst) {
            return Err(ResolverError::Rejected("injected mutation failure".to_string()));
        }

        let mut store = self.records.write();
        match mutation {
            Mutation::Create(mut record) => {
                if record.id.is_empty() {
                    record.id = RecordId::new(uuid::Uuid::new_v4().to_string());
                }
                if store.contains_key(&record.id) {
                    return Err(ResolverError::Rejected(format!(
                        "record {} already exists",
                        record.id
                    )));
                }
                store.insert(record.id.clone(), record.clone());
                Ok(Some(record))
            }
            Mutation::Update(record) => match store.get_mut(&record.id) {
                Some(slot) => {
                    *slot = record.clone();
                    Ok(Some(record))
                }
                None => Err(ResolverError::NotFound(record.id)),
            },
            Mutation::Delete(id) => match store.shift_remove(&id) {
                Some(_) => Ok(None),
                None => Err(ResolverError::NotFound(id)),
            },
        }
    }

    async fn export(&self, filter: &ExportFilter) -> Result<ExportArtifact, ResolverError> {
        if self.fail_mutations.load(Ordering::SeqCst) {
            return Err(ResolverError::Rejected("injected export failure".to_string()));
        }
        self.exports.lock().push(filter.clone());

        let rows: Vec<Value> = self
            .records
            .read()
            .values()
            .filter(|record| filter.contains(&record.id))
            .map(Record::to_value)
            .collect();
        let bytes = serde_json::to_vec(&rows)?;

        Ok(ExportArtifact {
            file_name: format!("{}.json", self.resource),
            content_type: "application/json".to_string(),
            bytes,
        })
    }

    async fn send_notification(&self, request: &NotificationRequest) -> Result<(), ResolverError> {
        if self.fail_mutations.load(Ordering::SeqCst) {
            return Err(ResolverError::Rejected("injected notification failure".to_string()));
        }
        self.notifications.lock().push(request.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn areas() -> InMemoryResolver {
        InMemoryResolver::new("areas")
            .with_page_size(2)
            .with_records([
                Record::new("1").with_field("name", "Harbor District"),
                Record::new("2").with_field("name", "Hill Ward"),
                Record::new("3").with_field("name", "Old Harbor"),
            ])
    }

    fn ids(page: &SearchPage) -> Vec<&str> {
        page.data.iter().map(|r| r.id.as_str()).collect()
    }

    #[tokio::test]
    async fn search_pages_and_filters() {
        let resolver = areas();

        let first = resolver.search(SearchParams::first_page()).await.unwrap();
        assert_eq!(ids(&first), vec!["1", "2"]);
        assert_eq!(first.total, Some(3));

        let second = resolver
            .search(SearchParams::first_page().with_page(2))
            .await
            .unwrap();
        assert_eq!(ids(&second), vec!["3"]);

        let harbor = resolver.search(SearchParams::query("HARBOR")).await.unwrap();
        assert_eq!(ids(&harbor), vec!["1", "3"]);
        assert_eq!(resolver.search_calls(), 3);
    }

    #[tokio::test]
    async fn injected_search_failures_are_consumed() {
        let resolver = areas();
        resolver.fail_next_searches(1);

        assert!(resolver.search(SearchParams::first_page()).await.is_err());
        assert!(resolver.search(SearchParams::first_page()).await.is_ok());
    }

    #[tokio::test]
    async fn mutations_round_trip() {
        let resolver = areas();

        let created = resolver
            .mutate(Mutation::Create(Record::new("").with_field("name", "Delta")))
            .await
            .unwrap()
            .unwrap();
        assert!(!created.id.is_empty());
        assert_eq!(resolver.len(), 4);

        resolver
            .mutate(Mutation::Update(Record::new("2").with_field("name", "Hilltop")))
            .await
            .unwrap();
        assert_eq!(
            resolver.get(&"2".into()).unwrap().field_text("name").as_deref(),
            Some("Hilltop")
        );

        assert_eq!(resolver.mutate(Mutation::Delete("1".into())).await, Ok(None));
        assert_eq!(
            resolver.mutate(Mutation::Delete("1".into())).await,
            Err(ResolverError::NotFound("1".into()))
        );
    }

    #[tokio::test]
    async fn export_includes_only_filtered_records() {
        let resolver = areas();
        let artifact = resolver
            .export(&ExportFilter::by_ids(vec!["3".into()]))
            .await
            .unwrap();

        let rows: Vec<Value> = serde_json::from_slice(&artifact.bytes).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["id"], "3");
        assert_eq!(resolver.exports().len(), 1);
    }

    #[tokio::test]
    async fn failing_export_records_nothing() {
        let resolver = areas();
        resolver.fail_mutations(true);

        let err = resolver
            .export(&ExportFilter::by_ids(vec!["3".into()]))
            .await
            .unwrap_err();

        assert!(matches!(err, ResolverError::Rejected(_)));
        assert!(resolver.exports().is_empty());
    }
}
