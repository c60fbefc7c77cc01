//! Options cache and the accumulate-only merge
//!
//! Seed, external store and search results all flow through
//! [`merge_options`]. The first entry seen for an identifier keeps its data;
//! later arrivals can only add identifiers, never replace them.

use crate::option::{OptionOrigin, ReferenceOption};
use ems_resolver::RecordId;
use indexmap::IndexMap;
use std::collections::HashSet;

/// One cached option with its provenance
#[derive(Debug, Clone, PartialEq)]
pub struct CachedOption {
    /// The option
    pub option: ReferenceOption,
    /// Strongest source that supplied it
    pub origin: OptionOrigin,
}

/// Identifier-keyed pool of resolved options, in arrival order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OptionsCache {
    entries: IndexMap<RecordId, CachedOption>,
}

impl OptionsCache {
    /// Create empty cache
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if cache is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Check for an identifier
    #[inline]
    #[must_use]
    pub fn contains(&self, id: &RecordId) -> bool {
        self.entries.contains_key(id)
    }

    /// Look up an option
    #[must_use]
    pub fn get(&self, id: &RecordId) -> Option<&ReferenceOption> {
        self.entries.get(id).map(|entry| &entry.option)
    }

    /// Origin of a cached entry
    #[must_use]
    pub fn origin(&self, id: &RecordId) -> Option<OptionOrigin> {
        self.entries.get(id).map(|entry| entry.origin)
    }

    /// Options in arrival order
    pub fn options(&self) -> impl Iterator<Item = &ReferenceOption> {
        self.entries.values().map(|entry| &entry.option)
    }

    /// Cached options for `ids`, in the order given; unknown ids are skipped
    #[must_use]
    pub fn subset(&self, ids: &[RecordId]) -> Vec<ReferenceOption> {
        ids.iter()
            .filter_map(|id| self.get(id).cloned())
            .collect()
    }

    /// Evict oldest unpinned entries until at most `cap` remain
    ///
    /// Entries whose identifier is in `keep` (the current value) are never
    /// evicted, so the cache can stay above `cap`. Returns the number evicted.
    pub fn evict_to(&mut self, cap: usize, keep: &HashSet<RecordId>) -> usize {
        let before = self.entries.len();
        let mut excess = before.saturating_sub(cap);
        if excess == 0 {
            return 0;
        }
        self.entries.retain(|id, entry| {
            if excess == 0 || entry.origin.is_pinned() || keep.contains(id) {
                return true;
            }
            excess -= 1;
            false
        });
        before - self.entries.len()
    }
}

/// Union `incoming` into `cache`, keeping the first-seen entry per identifier
///
/// An existing entry keeps its label and payload; its origin is upgraded if
/// the newcomer comes from a stronger source. Returns the number of new
/// identifiers added.
pub fn merge_options(
    cache: &mut OptionsCache,
    incoming: impl IntoIterator<Item = ReferenceOption>,
    origin: OptionOrigin,
) -> usize {
    let mut added = 0;
    for option in incoming {
        match cache.entries.get_mut(&option.id) {
            Some(existing) => {
                if origin < existing.origin {
                    existing.origin = origin;
                }
            }
            None => {
                cache
                    .entries
                    .insert(option.id.clone(), CachedOption { option, origin });
                added += 1;
            }
        }
    }
    added
}
