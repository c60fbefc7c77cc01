//! List screen controller
//!
//! One per resource screen. Owns the cross-page selection, the current page,
//! the screen's lazy reference filters and its bulk action dispatcher. Row and
//! toolbar events are forwarded to those components.

use ems_dispatch::{
    ActionOutcome, BulkActionDispatcher, Confirm, DispatchError, NotifyDraft, RecordTemplate,
    ShareTarget,
};
use ems_reference::{ReferenceCache, SearchOutcome};
use ems_resolver::{
    ExportArtifact, Identified, NotificationRequest, Record, RecordId, RemoteResolver,
    ResolverError, SearchParams,
};
use ems_selection::{PageNumber, SelectionStore};
use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;

/// Currently displayed page
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    /// 1-based page number
    pub number: PageNumber,
    /// Rows on the page
    pub items: Vec<T>,
    /// Total rows across pages, if reported
    pub total: Option<u64>,
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Self {
            number: 1,
            items: Vec::new(),
            total: None,
        }
    }
}

/// Selection state of the current page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageSummary {
    /// Page number
    pub page: PageNumber,
    /// Selected rows on this page
    pub selected_on_page: usize,
    /// Rows on this page
    pub page_len: usize,
    /// Selected rows across all pages
    pub total_selected: usize,
    /// Select-all flag for this page
    pub fully_selected: bool,
}

impl fmt::Display for PageSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} of {} selected", self.selected_on_page, self.page_len)?;
        if self.total_selected > self.selected_on_page {
            write!(f, " ({} across pages)", self.total_selected)?;
        }
        if self.fully_selected {
            f.write_str(" [all]")?;
        }
        Ok(())
    }
}

/// Controller for one list screen
pub struct ListView<T = Record> {
    resolver: Arc<dyn RemoteResolver>,
    selection: SelectionStore<T>,
    page: Page<T>,
    query: Option<String>,
    per_page: Option<u32>,
    filters: IndexMap<String, ReferenceCache>,
    dispatcher: BulkActionDispatcher,
}

impl<T: Identified + Clone> fmt::Debug for ListView<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListView")
            .field("resource", &self.resolver.resource())
            .field("page", &self.page.number)
            .field("selected", &self.selection.len())
            .field("filters", &self.filters.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl<T> ListView<T>
where
    T: Identified + Clone + From<Record>,
{
    /// Create view with an empty selection
    #[must_use]
    pub fn new(resolver: Arc<dyn RemoteResolver>, dispatcher: BulkActionDispatcher) -> Self {
        Self {
            resolver,
            selection: SelectionStore::new(),
            page: Page::default(),
            query: None,
            per_page: None,
            filters: IndexMap::new(),
            dispatcher,
        }
    }

    /// Set page size sent with searches
    #[inline]
    #[must_use]
    pub fn with_per_page(mut self, per_page: u32) -> Self {
        self.per_page = Some(per_page);
        self
    }

    /// Set initial query text
    #[inline]
    #[must_use]
    pub fn with_query(mut self, text: Option<String>) -> Self {
        self.query = text.filter(|q| !q.is_empty());
        self
    }

    /// Register a lazy reference filter
    #[must_use]
    pub fn with_filter(mut self, name: impl Into<String>, field: ReferenceCache) -> Self {
        self.filters.insert(name.into(), field);
        self
    }

    /// Named filter
    #[must_use]
    pub fn filter(&self, name: &str) -> Option<&ReferenceCache> {
        self.filters.get(name)
    }

    /// Current value of every filter
    #[must_use]
    pub fn filter_values(&self) -> IndexMap<String, Vec<RecordId>> {
        self.filters
            .iter()
            .map(|(name, field)| (name.clone(), field.value()))
            .collect()
    }

    /// Open every filter concurrently
    pub async fn open_filters(&self) -> Vec<SearchOutcome> {
        futures::future::join_all(self.filters.values().map(|field| field.on_open())).await
    }

    /// Remove a filter, discarding any search still in flight
    pub fn remove_filter(&mut self, name: &str) -> bool {
        match self.filters.shift_remove(name) {
            Some(field) => {
                field.detach();
                true
            }
            None => false,
        }
    }

    /// Fetch page `number` for the current query
    ///
    /// # Errors
    /// Returns the resolver error; the displayed page is left unchanged.
    pub async fn load_page(&mut self, number: PageNumber) -> Result<&Page<T>, ResolverError> {
        let mut params = self
            .query
            .clone()
            .map_or_else(SearchParams::first_page, SearchParams::query)
            .with_page(number);
        if let Some(per_page) = self.per_page {
            params = params.with_per_page(per_page);
        }

        let result = self.resolver.search(params).await.map_err(|err| {
            tracing::warn!("Loading page {} of {} failed: {}", number, self.resolver.resource(), err);
            err
        })?;
        tracing::info!(
            "Loaded page {} of {} ({} rows)",
            number,
            self.resolver.resource(),
            result.data.len()
        );

        self.page = Page {
            number,
            items: result.data.into_iter().map(T::from).collect(),
            total: result.total,
        };
        Ok(&self.page)
    }

    /// Reload the displayed page
    ///
    /// # Errors
    /// Returns the resolver error; the displayed page is left unchanged.
    pub async fn refresh(&mut self) -> Result<&Page<T>, ResolverError> {
        self.load_page(self.page.number).await
    }

    /// Change the query text and go back to page 1
    ///
    /// The selection is kept.
    ///
    /// # Errors
    /// Returns the resolver error.
    pub async fn set_query(&mut self, text: Option<String>) -> Result<&Page<T>, ResolverError> {
        self.query = text.filter(|q| !q.is_empty());
        self.load_page(1).await
    }

    /// Displayed page
    #[inline]
    #[must_use]
    pub fn page(&self) -> &Page<T> {
        &self.page
    }

    /// Cross-page selection
    #[inline]
    #[must_use]
    pub fn selection(&self) -> &SelectionStore<T> {
        &self.selection
    }

    /// Dispatcher used by toolbar actions
    #[inline]
    #[must_use]
    pub fn dispatcher(&self) -> &BulkActionDispatcher {
        &self.dispatcher
    }

    /// Row checkbox
    pub fn toggle_row(&mut self, item: &T) {
        if self.selection.is_selected(item.id()) {
            self.selection.deselect_item(item);
        } else {
            self.selection.select_item(item.clone());
        }
    }

    /// Header checkbox
    pub fn toggle_page(&mut self) {
        let Page { number, items, .. } = &self.page;
        if self.selection.is_page_fully_selected(*number) {
            self.selection.deselect_all_on_page(items, *number);
        } else {
            self.selection.select_all_on_page(items, *number);
        }
    }

    /// "N of M selected" for the displayed page
    #[must_use]
    pub fn page_summary(&self) -> PageSummary {
        PageSummary {
            page: self.page.number,
            selected_on_page: self.selection.selected_count_for_page(&self.page.items),
            page_len: self.page.items.len(),
            total_selected: self.selection.len(),
            fully_selected: self.selection.is_page_fully_selected(self.page.number),
        }
    }

    /// Export every selected record
    pub async fn export_selected(&self) -> ActionOutcome<ExportArtifact> {
        self.dispatcher.export(self.selection.selected_ids()).await
    }

    /// Share every selected record
    pub async fn share_selected(
        &self,
        template: &dyn RecordTemplate<T>,
        draft: NotifyDraft,
    ) -> ActionOutcome<NotificationRequest> {
        let items: Vec<T> = self.selection.selected().cloned().collect();
        self.dispatcher
            .notify(ShareTarget::Many(items), template, draft)
            .await
    }

    /// Share one row
    pub async fn share_row(
        &self,
        item: T,
        template: &dyn RecordTemplate<T>,
        draft: NotifyDraft,
    ) -> ActionOutcome<NotificationRequest> {
        self.dispatcher
            .notify(ShareTarget::One(item), template, draft)
            .await
    }

    /// Archive one row, then refresh
    pub async fn archive_row(&mut self, item: T, confirm: &dyn Confirm) -> ActionOutcome<Vec<RecordId>> {
        let outcome = self.dispatcher.archive(ShareTarget::One(item), confirm).await;
        self.after_archive(&outcome).await;
        outcome
    }

    /// Archive every selected record, then refresh
    pub async fn archive_selected(&mut self, confirm: &dyn Confirm) -> ActionOutcome<Vec<RecordId>> {
        let ids = self.selection.selected_ids();
        let outcome = self.dispatcher.archive(ShareTarget::Many(ids), confirm).await;
        self.after_archive(&outcome).await;
        outcome
    }

    async fn after_archive(&mut self, outcome: &ActionOutcome<Vec<RecordId>>) {
        let archived = match outcome {
            ActionOutcome::Succeeded(ids) => ids.as_slice(),
            ActionOutcome::Failed(DispatchError::Archive { archived, .. }) => {
                archived.as_slice()
            }
            ActionOutcome::Failed(_) | ActionOutcome::Cancelled => return,
        };
        for id in archived {
            self.selection.deselect_item(id);
        }
        if let Err(err) = self.refresh().await {
            tracing::warn!("Refresh after archive failed: {}", err);
        }
    }
}
