//! Selection store for one list view
//!
//! Provides [`SelectionStore`], the cross-page selection that survives
//! server-side pagination and filtering.

use ems_resolver::{Identified, RecordId};
use indexmap::IndexMap;
use std::collections::BTreeSet;

/// 1-based list page number
pub type PageNumber = u32;

/// Cross-page selection with per-page "select all" flags
///
/// Two independent pieces of state:
/// - the Selection Set, keyed by identifier, in selection order
/// - SelectedPages, the pages the user explicitly selected in full
///
/// SelectedPages is a trusted flag set. It is only touched by
/// [`select_all_on_page`](Self::select_all_on_page) and
/// [`deselect_all_on_page`](Self::deselect_all_on_page) and is never
/// recomputed from membership, so deselecting one row of a fully selected
/// page leaves the page flagged.
#[derive(Debug, Clone)]
pub struct SelectionStore<T> {
    selected: IndexMap<RecordId, T>,
    selected_pages: BTreeSet<PageNumber>,
}

impl<T> Default for SelectionStore<T> {
    fn default() -> Self {
        Self {
            selected: IndexMap::new(),
            selected_pages: BTreeSet::new(),
        }
    }
}

impl<T: Identified + Clone> SelectionStore<T> {
    /// Create empty store (list view mounted)
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one item
    ///
    /// Re-selecting an already selected identifier keeps the existing entry.
    pub fn select_item(&mut self, item: T) {
        let id = item.id().clone();
        if self.selected.contains_key(&id) {
            return;
        }
        tracing::trace!("select {}", id);
        self.selected.insert(id, item);
    }

    /// Remove the entry with the same identifier as `item`
    pub fn deselect_item<I: Identified + ?Sized>(&mut self, item: &I) {
        if self.selected.shift_remove(item.id()).is_some() {
            tracing::trace!("deselect {}", item.id());
        }
    }

    /// Union the page's items into the selection and flag the page
    pub fn select_all_on_page(&mut self, page_items: &[T], page: PageNumber) {
        for item in page_items {
            self.selected
                .entry(item.id().clone())
                .or_insert_with(|| item.clone());
        }
        self.selected_pages.insert(page);
        tracing::debug!(
            "selected all {} items on page {} ({} total)",
            page_items.len(),
            page,
            self.selected.len()
        );
    }

    /// Remove every identifier on the page and unflag the page
    ///
    /// Entries are removed however they were selected, individually or by
    /// an earlier select-all on any page.
    pub fn deselect_all_on_page(&mut self, page_items: &[T], page: PageNumber) {
        for item in page_items {
            self.selected.shift_remove(item.id());
        }
        self.selected_pages.remove(&page);
        tracing::debug!(
            "deselected all items on page {} ({} remain)",
            page,
            self.selected.len()
        );
    }

    /// Number of the page's items currently selected
    #[must_use]
    pub fn selected_count_for_page(&self, page_items: &[T]) -> usize {
        let on_page: BTreeSet<&RecordId> = page_items.iter().map(Identified::id).collect();
        on_page
            .into_iter()
            .filter(|id| self.selected.contains_key(*id))
            .count()
    }

    /// Whether the page was flagged by a select-all
    ///
    /// Reads the flag only; the page's current contents are not consulted.
    #[inline]
    #[must_use]
    pub fn is_page_fully_selected(&self, page: PageNumber) -> bool {
        self.selected_pages.contains(&page)
    }

    /// Check a single identifier
    #[inline]
    #[must_use]
    pub fn is_selected(&self, id: &RecordId) -> bool {
        self.selected.contains_key(id)
    }

    /// Selected items in selection order
    pub fn selected(&self) -> impl Iterator<Item = &T> {
        self.selected.values()
    }

    /// Selected identifiers in selection order
    #[must_use]
    pub fn selected_ids(&self) -> Vec<RecordId> {
        self.selected.keys().cloned().collect()
    }

    /// Flagged pages, ascending
    #[must_use]
    pub fn selected_pages(&self) -> Vec<PageNumber> {
        self.selected_pages.iter().copied().collect()
    }

    /// Selection Set size
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.selected.len()
    }

    /// Check if nothing is selected
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }
}
