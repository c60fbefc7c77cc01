//! Error types for bulk actions

use ems_resolver::{RecordId, ResolverError};

/// Bulk action failure, already reported to the user when returned
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    /// Action needs at least one record
    #[error("no records selected")]
    EmptySelection,

    /// Notification needs at least one channel
    #[error("no delivery channel selected")]
    NoChannels,

    /// Remote call failed
    #[error(transparent)]
    Remote(#[from] ResolverError),

    /// Some deletes of a bulk archive failed
    #[error("archived {} of {} records: {source}", .archived.len(), .archived.len() + .failed.len())]
    Archive {
        /// Records archived before or after the failures
        archived: Vec<RecordId>,
        /// Records that could not be archived
        failed: Vec<RecordId>,
        /// First failure
        source: ResolverError,
    },
}

impl DispatchError {
    /// Check if repeating the action may succeed
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Remote(err) | Self::Archive { source: err, .. } => err.is_transient(),
            Self::EmptySelection | Self::NoChannels => false,
        }
    }
}
