//! Reference cache backing one async "pick related entity" field
//!
//! The field's candidate universe is too large to load eagerly, so the cache
//! starts from the seed, grows with every successful search, and is topped
//! up from the parent's [`SharedOptionStore`]. Growth is union-only: a value
//! the user picked keeps its label however the search text changes.
//!
//! Remote calls never block the caller's state. The handle may be dropped
//! while a spawned search is outstanding; the late result is then discarded.

use crate::config::{RacePolicy, ReferenceConfig};
use crate::merge::{merge_options, OptionsCache};
use crate::option::{LabelSource, OptionOrigin, ReferenceOption, Seed};
use crate::shared::SharedOptionStore;
use ems_resolver::{RecordId, RemoteResolver, ResolverError, SearchPage, SearchParams};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Loading state shown next to the field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FieldStatus {
    /// No search issued yet
    #[default]
    Idle,
    /// A search is outstanding
    Loading,
    /// Last applied search returned results
    Ready,
    /// Last applied search failed or returned nothing
    NotFound,
}

/// What happened to one search
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    /// Response merged into the cache and shown as the current matches
    Merged {
        /// Records in the response
        received: usize,
        /// Identifiers new to the cache
        added: usize,
    },
    /// Response merged into the cache but superseded by a newer search
    Stale {
        /// Identifiers new to the cache
        added: usize,
    },
    /// Open-time search not needed, cache already populated
    Skipped,
    /// Search failed; cache untouched
    Failed(ResolverError),
    /// Field was torn down before the response arrived
    Detached,
}

#[derive(Debug, Default)]
struct FieldState {
    options: OptionsCache,
    selected: Vec<RecordId>,
    matches: Vec<RecordId>,
    last_applied: u64,
    status: FieldStatus,
}

struct Shared {
    resolver: Arc<dyn RemoteResolver>,
    label: LabelSource,
    config: ReferenceConfig,
    external: Option<SharedOptionStore>,
    state: Mutex<FieldState>,
    issued: AtomicU64,
    value: watch::Sender<Vec<RecordId>>,
}

impl Shared {
    /// Tag a new search and flag the field as loading
    fn begin(&self) -> u64 {
        let seq = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.lock().status = FieldStatus::Loading;
        seq
    }

    fn apply(&self, seq: u64, result: Result<SearchPage, ResolverError>) -> SearchOutcome {
        let mut state = self.state.lock();
        let superseded =
            self.config.race_policy == RacePolicy::RejectStale && seq < state.last_applied;

        let page = match result {
            Ok(page) => page,
            Err(err) => {
                tracing::warn!("{} search #{} failed: {}", self.resolver.resource(), seq, err);
                if !superseded {
                    state.status = FieldStatus::NotFound;
                }
                return SearchOutcome::Failed(err);
            }
        };

        let received = page.data.len();
        let incoming: Vec<ReferenceOption> =
            page.data.iter().map(|r| self.label.option_for(r)).collect();
        let ids: Vec<RecordId> = incoming.iter().map(|o| o.id.clone()).collect();
        let added = merge_options(&mut state.options, incoming, OptionOrigin::Search);

        if let Some(cap) = self.config.max_options {
            let shown = if superseded { &state.matches } else { &ids };
            let keep: HashSet<RecordId> =
                state.selected.iter().chain(shown).cloned().collect();
            let evicted = state.options.evict_to(cap, &keep);
            if evicted > 0 {
                tracing::debug!("{} evicted {} cached options", self.resolver.resource(), evicted);
            }
        }

        if superseded {
            tracing::debug!(
                "{} search #{} superseded by #{}, {} new options kept",
                self.resolver.resource(),
                seq,
                state.last_applied,
                added
            );
            return SearchOutcome::Stale { added };
        }

        state.matches = ids;
        state.last_applied = seq;
        state.status = if received == 0 {
            FieldStatus::NotFound
        } else {
            FieldStatus::Ready
        };
        tracing::debug!(
            "{} search #{} merged {} of {} options ({} cached)",
            self.resolver.resource(),
            seq,
            added,
            received,
            state.options.len()
        );
        SearchOutcome::Merged { received, added }
    }

    fn params(&self, query: Option<String>) -> SearchParams {
        let params = match query {
            Some(text) => SearchParams::query(text),
            None => SearchParams::first_page(),
        };
        match self.config.per_page {
            Some(n) => params.with_per_page(n),
            None => params,
        }
    }
}

/// Run one search without keeping the field alive across the await
async fn run_search(field: Weak<Shared>, seq: u64, params: SearchParams) -> SearchOutcome {
    let resolver = match field.upgrade() {
        Some(shared) => Arc::clone(&shared.resolver),
        None => return SearchOutcome::Detached,
    };

    let result = resolver.search(params).await;

    match field.upgrade() {
        Some(shared) => shared.apply(seq, result),
        None => {
            tracing::debug!("{} search #{} arrived after teardown", resolver.resource(), seq);
            SearchOutcome::Detached
        }
    }
}

/// Options cache for one reference field
pub struct ReferenceCache {
    shared: Arc<Shared>,
}

impl ReferenceCache {
    /// Start building a cache over `resolver`
    #[must_use]
    pub fn builder(resolver: Arc<dyn RemoteResolver>) -> ReferenceCacheBuilder {
        ReferenceCacheBuilder {
            resolver,
            label: LabelSource::default(),
            config: ReferenceConfig::default(),
            external: None,
        }
    }

    /// Reset the cache to `seed` plus the parent's stored options
    ///
    /// Seed entries come first and win on conflict. The seed becomes the
    /// field's current value.
    pub fn initialize(&self, seed: impl Into<Seed>) {
        let seed = seed.into().into_vec();
        let stored = self
            .shared
            .external
            .as_ref()
            .map(SharedOptionStore::snapshot)
            .unwrap_or_default();

        let mut options = OptionsCache::new();
        let selected: Vec<RecordId> = seed.iter().map(|o| o.id.clone()).collect();
        merge_options(&mut options, seed, OptionOrigin::Seed);
        merge_options(&mut options, stored, OptionOrigin::External);

        tracing::debug!(
            "{} field initialized with {} options",
            self.shared.resolver.resource(),
            options.len()
        );
        {
            let mut state = self.shared.state.lock();
            *state = FieldState {
                options,
                selected: selected.clone(),
                ..FieldState::default()
            };
        }
        self.shared.value.send_replace(selected);
    }

    /// Field opened: fetch the first page if the cache is sparse
    pub async fn on_open(&self) -> SearchOutcome {
        match self.begin_open() {
            Some((seq, params)) => run_search(Arc::downgrade(&self.shared), seq, params).await,
            None => SearchOutcome::Skipped,
        }
    }

    /// Search text changed: fetch matches and accumulate them
    pub async fn on_query_change(&self, text: impl Into<String>) -> SearchOutcome {
        let seq = self.shared.begin();
        let params = self.shared.params(Some(text.into()));
        run_search(Arc::downgrade(&self.shared), seq, params).await
    }

    /// Like [`on_open`](Self::on_open), on the runtime
    ///
    /// The task holds only a weak reference; dropping the cache before the
    /// response arrives yields [`SearchOutcome::Detached`].
    pub fn spawn_open(&self) -> JoinHandle<SearchOutcome> {
        let field = Arc::downgrade(&self.shared);
        match self.begin_open() {
            Some((seq, params)) => tokio::spawn(run_search(field, seq, params)),
            None => tokio::spawn(async { SearchOutcome::Skipped }),
        }
    }

    /// Like [`on_query_change`](Self::on_query_change), on the runtime
    ///
    /// The sequence number is taken before spawning, so issue order is the
    /// call order.
    pub fn spawn_query_change(&self, text: impl Into<String>) -> JoinHandle<SearchOutcome> {
        let seq = self.shared.begin();
        let params = self.shared.params(Some(text.into()));
        tokio::spawn(run_search(Arc::downgrade(&self.shared), seq, params))
    }

    fn begin_open(&self) -> Option<(u64, SearchParams)> {
        let cached = self.shared.state.lock().options.len();
        if cached >= self.shared.config.open_threshold {
            tracing::trace!("{} open skipped, {} cached", self.shared.resolver.resource(), cached);
            return None;
        }
        Some((self.shared.begin(), self.shared.params(None)))
    }

    /// Field value changed
    ///
    /// Pushes the labeled options for `ids` to the parent's store (when one
    /// was supplied) and publishes `ids` as the new value.
    pub async fn on_selection_change(&self, ids: Vec<RecordId>) -> Vec<RecordId> {
        let chosen = {
            let mut state = self.shared.state.lock();
            state.selected = ids.clone();
            state.options.subset(&ids)
        };

        if let Some(store) = &self.shared.external {
            tracing::debug!("storing {} selected options", chosen.len());
            store.push(chosen).await;
        }

        self.shared.value.send_replace(ids.clone());
        ids
    }

    /// `(identifier, label)` pairs for every cached option
    #[must_use]
    pub fn render(&self) -> Vec<(RecordId, String)> {
        self.shared
            .state
            .lock()
            .options
            .options()
            .map(|o| (o.id.clone(), o.label.clone()))
            .collect()
    }

    /// `(identifier, label)` pairs of the last applied search, labeled from the cache
    #[must_use]
    pub fn matches(&self) -> Vec<(RecordId, String)> {
        let state = self.shared.state.lock();
        state
            .matches
            .iter()
            .filter_map(|id| state.options.get(id))
            .map(|o| (o.id.clone(), o.label.clone()))
            .collect()
    }

    /// Labeled options for the current value
    #[must_use]
    pub fn selected_options(&self) -> Vec<ReferenceOption> {
        let state = self.shared.state.lock();
        state.options.subset(&state.selected)
    }

    /// Current value
    #[must_use]
    pub fn value(&self) -> Vec<RecordId> {
        self.shared.value.borrow().clone()
    }

    /// Watch the field's value
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Vec<RecordId>> {
        self.shared.value.subscribe()
    }

    /// Current loading state
    #[must_use]
    pub fn status(&self) -> FieldStatus {
        self.shared.state.lock().status
    }

    /// Copy of the options cache
    #[must_use]
    pub fn snapshot(&self) -> OptionsCache {
        self.shared.state.lock().options.clone()
    }

    /// Number of cached options
    #[must_use]
    pub fn len(&self) -> usize {
        self.shared.state.lock().options.len()
    }

    /// Check if nothing is cached
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Resource this field searches
    #[must_use]
    pub fn resource(&self) -> &str {
        self.shared.resolver.resource()
    }

    /// Tear the field down; outstanding spawned searches are discarded
    pub fn detach(self) {
        tracing::debug!("{} field detached", self.resource());
    }
}

impl std::fmt::Debug for ReferenceCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReferenceCache")
            .field("resource", &self.resource())
            .field("label", &self.shared.label)
            .field("options", &self.len())
            .finish()
    }
}

/// Builder for [`ReferenceCache`]
pub struct ReferenceCacheBuilder {
    resolver: Arc<dyn RemoteResolver>,
    label: LabelSource,
    config: ReferenceConfig,
    external: Option<SharedOptionStore>,
}

impl ReferenceCacheBuilder {
    /// With label source (default: `name` field)
    #[must_use]
    pub fn label(mut self, label: LabelSource) -> Self {
        self.label = label;
        self
    }

    /// With configuration
    #[must_use]
    pub fn config(mut self, config: ReferenceConfig) -> Self {
        self.config = config;
        self
    }

    /// With the parent's long-lived store
    #[must_use]
    pub fn shared_store(mut self, store: SharedOptionStore) -> Self {
        self.external = Some(store);
        self
    }

    /// Build an empty, idle cache; call [`ReferenceCache::initialize`] next
    #[must_use]
    pub fn build(self) -> ReferenceCache {
        let (value, _) = watch::channel(Vec::new());
        ReferenceCache {
            shared: Arc::new(Shared {
                resolver: self.resolver,
                label: self.label,
                config: self.config,
                external: self.external,
                state: Mutex::new(FieldState::default()),
                issued: AtomicU64::new(0),
                value,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ems_resolver::{InMemoryResolver, Record};
    use pretty_assertions::assert_eq;

    fn resolver(n: usize) -> Arc<InMemoryResolver> {
        Arc::new(
            InMemoryResolver::new("areas")
                .with_page_size(20)
                .with_records((0..n).map(|i| Record::new(i as u64).with_field("name", format!("Area {i}")))),
        )
    }

    fn seed(n: usize) -> Vec<ReferenceOption> {
        (0..n)
            .map(|i| ReferenceOption::new(format!("s{i}"), format!("Seed {i}")))
            .collect()
    }

    #[tokio::test]
    async fn open_searches_only_when_sparse() {
        let remote = resolver(3);
        let field = ReferenceCache::builder(remote.clone()).build();

        field.initialize(seed(9));
        assert_eq!(field.on_open().await, SearchOutcome::Skipped);
        assert_eq!(remote.search_calls(), 0);

        field.initialize(seed(8));
        assert_eq!(
            field.on_open().await,
            SearchOutcome::Merged { received: 3, added: 3 }
        );
        assert_eq!(remote.search_calls(), 1);
        assert_eq!(field.len(), 11);
        assert_eq!(field.status(), FieldStatus::Ready);
    }

    #[tokio::test]
    async fn initialize_sets_value_and_resets_status() {
        let field = ReferenceCache::builder(resolver(0)).build();
        field.initialize(Seed::One(ReferenceOption::new("a", "A")));

        assert_eq!(field.value(), vec![RecordId::from("a")]);
        assert_eq!(field.status(), FieldStatus::Idle);
        assert_eq!(field.selected_options()[0].label, "A");
    }

    #[tokio::test]
    async fn empty_result_is_not_found() {
        let field = ReferenceCache::builder(resolver(2)).build();
        field.initialize(Seed::None);

        assert_eq!(
            field.on_query_change("zzz").await,
            SearchOutcome::Merged { received: 0, added: 0 }
        );
        assert_eq!(field.status(), FieldStatus::NotFound);
        assert!(field.matches().is_empty());
    }

    #[tokio::test]
    async fn per_page_is_forwarded() {
        let remote = resolver(10);
        let field = ReferenceCache::builder(remote)
            .config(ReferenceConfig::new().with_per_page(4))
            .build();
        field.initialize(Seed::None);

        field.on_open().await;
        assert_eq!(field.len(), 4);
    }

    #[tokio::test]
    async fn value_is_published() {
        let field = ReferenceCache::builder(resolver(2)).build();
        field.initialize(Seed::None);
        let mut rx = field.subscribe();

        field.on_selection_change(vec!["1".into()]).await;

        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), vec![RecordId::from("1")]);
    }
}
