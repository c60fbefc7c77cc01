//! Remote resolver contract
//!
//! Abstraction over one resource's paged search endpoint, its
//! create/update/delete endpoint, and the shared export and notification
//! endpoints. Implementations hold no selection or cache state.

use crate::error::ResolverError;
use crate::types::{ExportArtifact, ExportFilter, Mutation, NotificationRequest, Record, SearchPage, SearchParams};
use async_trait::async_trait;
use std::sync::Arc;

/// Search/mutate/export/notify endpoints for one resource
#[async_trait]
pub trait RemoteResolver: Send + Sync {
    /// Resource path this resolver is bound to (e.g. `areas`)
    fn resource(&self) -> &str;

    /// Paged, filtered search
    ///
    /// # Errors
    /// Any transport, status or decode failure
    async fn search(&self, params: SearchParams) -> Result<SearchPage, ResolverError>;

    /// Create, update or delete one record
    ///
    /// Returns the stored record for create/update and `None` for delete.
    ///
    /// # Errors
    /// Any transport, status or decode failure, or `NotFound` for a missing target
    async fn mutate(&self, mutation: Mutation) -> Result<Option<Record>, ResolverError>;

    /// Export the records matched by `filter`
    ///
    /// # Errors
    /// Any transport or status failure
    async fn export(&self, filter: &ExportFilter) -> Result<ExportArtifact, ResolverError>;

    /// Send a notification
    ///
    /// # Errors
    /// Any transport or status failure
    async fn send_notification(&self, request: &NotificationRequest) -> Result<(), ResolverError>;
}

#[async_trait]
impl<R: RemoteResolver + ?Sized> RemoteResolver for Arc<R> {
    fn resource(&self) -> &str {
        (**self).resource()
    }

    async fn search(&self, params: SearchParams) -> Result<SearchPage, ResolverError> {
        (**self).search(params).await
    }

    async fn mutate(&self, mutation: Mutation) -> Result<Option<Record>, ResolverError> {
        (**self).mutate(mutation).await
    }

    async fn export(&self, filter: &ExportFilter) -> Result<ExportArtifact, ResolverError> {
        (**self).export(filter).await
    }

    async fn send_notification(&self, request: &NotificationRequest) -> Result<(), ResolverError> {
        (**self).send_notification(request).await
    }
}

/// Run a mutation and report through paired callbacks
///
/// Exactly one of `on_success` / `on_failure` runs.
pub async fn mutate_with<R, S, F>(resolver: &R, mutation: Mutation, on_success: S, on_failure: F)
where
    R: RemoteResolver + ?Sized,
    S: FnOnce(Option<Record>),
    F: FnOnce(ResolverError),
{
    let kind = mutation.kind();
    let target = mutation.target().clone();

    match resolver.mutate(mutation).await {
        Ok(record) => {
            tracing::debug!("{} {} on {} succeeded", kind, target, resolver.resource());
            on_success(record);
        }
        Err(err) => {
            tracing::warn!("{} {} on {} failed: {}", kind, target, resolver.resource(), err);
            on_failure(err);
        }
    }
}
