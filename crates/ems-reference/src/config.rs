//! Reference field configuration

use serde::{Deserialize, Serialize};

/// Entries below which opening a field triggers a first-page search
pub const DEFAULT_OPEN_THRESHOLD: usize = 9;

/// Default bound on a field's options cache
pub const DEFAULT_MAX_OPTIONS: usize = 500;

/// How overlapping search responses are applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RacePolicy {
    /// Apply responses in arrival order; a slow earlier response can replace
    /// the matches of a faster later one
    #[default]
    ArrivalOrder,
    /// Sequence-number every search; older responses still grow the cache
    /// but never replace the matches of a newer one
    RejectStale,
}

/// Per-field cache behavior
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReferenceConfig {
    /// Open-time search runs when the cache holds fewer entries than this
    pub open_threshold: usize,
    /// Cache bound; `None` grows without limit
    pub max_options: Option<usize>,
    /// Overlapping response handling
    pub race_policy: RacePolicy,
    /// Page size sent with searches (server default when unset)
    pub per_page: Option<u32>,
}

impl ReferenceConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With open-time search threshold
    #[inline]
    #[must_use]
    pub fn with_open_threshold(mut self, threshold: usize) -> Self {
        self.open_threshold = threshold;
        self
    }

    /// With cache bound
    #[inline]
    #[must_use]
    pub fn with_max_options(mut self, max: Option<usize>) -> Self {
        self.max_options = max;
        self
    }

    /// With race policy
    #[inline]
    #[must_use]
    pub fn with_race_policy(mut self, policy: RacePolicy) -> Self {
        self.race_policy = policy;
        self
    }

    /// With search page size
    #[inline]
    #[must_use]
    pub fn with_per_page(mut self, per_page: u32) -> Self {
        self.per_page = Some(per_page);
        self
    }
}

impl Default for ReferenceConfig {
    fn default() -> Self {
        Self {
            open_threshold: DEFAULT_OPEN_THRESHOLD,
            max_options: Some(DEFAULT_MAX_OPTIONS),
            race_policy: RacePolicy::default(),
            per_page: None,
        }
    }
}
