//! Long-lived option store supplied by a parent view
//!
//! A field widget may be unmounted and remounted (a modal closed and
//! reopened) while its parent lives on. Pushing the currently selected
//! options here lets the next instance label its value before any search.

use crate::option::ReferenceOption;
use ems_resolver::RecordId;
use moka::future::Cache;
use std::time::Duration;

/// Default capacity of a shared store
pub const DEFAULT_STORE_CAPACITY: u64 = 10_000;

/// Concurrent identifier → option store, bounded by capacity
#[derive(Debug, Clone)]
pub struct SharedOptionStore {
    inner: Cache<RecordId, ReferenceOption>,
}

impl SharedOptionStore {
    /// Create store with max capacity
    #[inline]
    #[must_use]
    pub fn new(max_capacity: u64) -> Self {
        Self {
            inner: Cache::new(max_capacity),
        }
    }

    /// Create store whose entries expire
    #[inline]
    #[must_use]
    pub fn with_ttl(max_capacity: u64, ttl: Duration) -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(max_capacity)
                .time_to_live(ttl)
                .build(),
        }
    }

    /// Record options, replacing earlier entries with the same identifier
    pub async fn push(&self, options: impl IntoIterator<Item = ReferenceOption>) {
        for option in options {
            self.inner.insert(option.id.clone(), option).await;
        }
    }

    /// Look up one option
    #[must_use]
    pub async fn get(&self, id: &RecordId) -> Option<ReferenceOption> {
        self.inner.get(id).await
    }

    /// Every stored option, ordered by identifier
    #[must_use]
    pub fn snapshot(&self) -> Vec<ReferenceOption> {
        let mut options: Vec<ReferenceOption> =
            self.inner.iter().map(|(_, option)| option).collect();
        options.sort_by(|a, b| a.id.cmp(&b.id));
        options
    }

    /// Forget one identifier
    #[inline]
    pub async fn invalidate(&self, id: &RecordId) {
        self.inner.invalidate(id).await;
    }
}

impl Default for SharedOptionStore {
    /// Create store with default capacity (10,000 entries)
    fn default() -> Self {
        Self::new(DEFAULT_STORE_CAPACITY)
    }
}
