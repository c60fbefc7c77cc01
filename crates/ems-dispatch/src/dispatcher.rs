//! Bulk action dispatcher
//!
//! Turns a selection, or a single record, into one outbound effect:
//! - Export: `{ id: { in: [...] } }` filter handed to the export endpoint
//! - Notify: recipient criteria plus a composed body and a channel set
//! - Archive: confirm, delete by id, report
//!
//! Every remote failure is caught here and shown as a toast. Callers get an
//! [`ActionOutcome`] describing what already happened.

use crate::config::DispatchConfig;
use crate::error::DispatchError;
use crate::feedback::{Confirm, Toast, Toaster};
use crate::target::{compose_message, RecordTemplate, ShareTarget};
use ems_resolver::{
    Channel, ExportArtifact, ExportFilter, Identified, Mutation, NotificationRequest,
    RecipientCriteria, RecordId, RemoteResolver,
};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Result of a dispatched action, reported to the user before it is returned
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub enum ActionOutcome<T> {
    /// Remote call succeeded
    Succeeded(T),
    /// Action was rejected locally or remotely
    Failed(DispatchError),
    /// User declined the confirmation
    Cancelled,
}

impl<T> ActionOutcome<T> {
    /// Check if the action went through
    #[inline]
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded(_))
    }

    /// Success value, if any
    #[must_use]
    pub fn succeeded(self) -> Option<T> {
        match self {
            Self::Succeeded(value) => Some(value),
            Self::Failed(_) | Self::Cancelled => None,
        }
    }

    /// Failure, if any
    #[must_use]
    pub fn failure(&self) -> Option<&DispatchError> {
        match self {
            Self::Failed(err) => Some(err),
            Self::Succeeded(_) | Self::Cancelled => None,
        }
    }
}

/// Notification being prepared by the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifyDraft {
    /// Recipients
    pub criteria: RecipientCriteria,
    /// Subject line
    pub subject: String,
    /// Delivery channels
    pub channels: BTreeSet<Channel>,
}

impl NotifyDraft {
    /// Draft with no recipients and no channels
    #[must_use]
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            criteria: RecipientCriteria::new(),
            subject: subject.into(),
            channels: BTreeSet::new(),
        }
    }

    /// Set recipients
    #[inline]
    #[must_use]
    pub fn with_criteria(mut self, criteria: RecipientCriteria) -> Self {
        self.criteria = criteria;
        self
    }

    /// Replace channels
    #[inline]
    #[must_use]
    pub fn with_channels(mut self, channels: impl IntoIterator<Item = Channel>) -> Self {
        self.channels = channels.into_iter().collect();
        self
    }

    /// Toggle one channel
    pub fn toggle_channel(&mut self, channel: Channel) {
        if !self.channels.remove(&channel) {
            self.channels.insert(channel);
        }
    }
}

/// Dispatches export, notify and archive actions for one resource
pub struct BulkActionDispatcher {
    resolver: Arc<dyn RemoteResolver>,
    toaster: Arc<dyn Toaster>,
    config: DispatchConfig,
}

impl std::fmt::Debug for BulkActionDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BulkActionDispatcher")
            .field("resource", &self.resolver.resource())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl BulkActionDispatcher {
    /// Create dispatcher with default config
    #[must_use]
    pub fn new(resolver: Arc<dyn RemoteResolver>, toaster: Arc<dyn Toaster>) -> Self {
        Self {
            resolver,
            toaster,
            config: DispatchConfig::default(),
        }
    }

    /// Set config
    #[inline]
    #[must_use]
    pub fn with_config(mut self, config: DispatchConfig) -> Self {
        self.config = config;
        self
    }

    /// Active config
    #[inline]
    #[must_use]
    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Fresh draft using the configured default channels
    #[must_use]
    pub fn draft(&self, subject: impl Into<String>) -> NotifyDraft {
        NotifyDraft::new(subject)
            .with_criteria(RecipientCriteria::new().with_id_field(&self.config.identifier_field))
            .with_channels(self.config.default_channels.iter().copied())
    }

    /// Export filter for `ids`
    #[must_use]
    pub fn export_filter(&self, ids: Vec<RecordId>) -> ExportFilter {
        ExportFilter::by_ids(ids).with_field(&self.config.identifier_field)
    }

    /// Export the given records
    pub async fn export(&self, ids: Vec<RecordId>) -> ActionOutcome<ExportArtifact> {
        if ids.is_empty() {
            return self.reject(DispatchError::EmptySelection, "Export");
        }

        let count = ids.len();
        let filter = self.export_filter(ids);
        tracing::info!("Exporting {} {} records", count, self.resolver.resource());

        match self.resolver.export(&filter).await {
            Ok(artifact) => {
                self.toaster.show(Toast::success(format!(
                    "Exported {count} records to {}",
                    artifact.file_name
                )));
                ActionOutcome::Succeeded(artifact)
            }
            Err(err) => self.reject(err.into(), "Export"),
        }
    }

    /// Message body for `target`
    pub fn compose<T>(&self, target: ShareTarget<T>, template: &dyn RecordTemplate<T>) -> String {
        compose_message(target, template, &self.config.message_separator)
    }

    /// Share records through the notification endpoint
    pub async fn notify<T>(
        &self,
        target: ShareTarget<T>,
        template: &dyn RecordTemplate<T>,
        draft: NotifyDraft,
    ) -> ActionOutcome<NotificationRequest> {
        if draft.channels.is_empty() {
            return self.reject(DispatchError::NoChannels, "Notification");
        }
        let items = target.into_many();
        if items.is_empty() {
            return self.reject(DispatchError::EmptySelection, "Notification");
        }

        let request = NotificationRequest {
            criteria: draft.criteria,
            subject: draft.subject,
            message: self.compose(ShareTarget::Many(items), template),
            channels: draft.channels,
        };
        tracing::info!(
            "Sending notification '{}' over {} channels",
            request.subject,
            request.channels.len()
        );

        match self.resolver.send_notification(&request).await {
            Ok(()) => {
                self.toaster.show(Toast::success("Notification sent"));
                ActionOutcome::Succeeded(request)
            }
            Err(err) => self.reject(err.into(), "Notification"),
        }
    }

    /// Confirm, then delete each target record
    ///
    /// Nothing is removed locally; callers refresh after success.
    pub async fn archive<T: Identified>(
        &self,
        target: ShareTarget<T>,
        confirm: &dyn Confirm,
    ) -> ActionOutcome<Vec<RecordId>> {
        let ids: Vec<RecordId> = target
            .into_many()
            .iter()
            .map(|item| item.id().clone())
            .collect();
        let prompt = match ids.as_slice() {
            [] => return self.reject(DispatchError::EmptySelection, "Archive"),
            [only] => format!("Archive record {only}?"),
            many => format!("Archive {} records?", many.len()),
        };

        if !confirm.confirm(&prompt).await {
            tracing::debug!("Archive declined");
            return ActionOutcome::Cancelled;
        }

        let mut archived = Vec::with_capacity(ids.len());
        let mut failed = Vec::new();
        let mut first_error = None;
        for id in ids {
            match self.resolver.mutate(Mutation::Delete(id.clone())).await {
                Ok(_) => archived.push(id),
                Err(err) => {
                    tracing::warn!("Failed to archive {}: {}", id, err);
                    first_error.get_or_insert(err);
                    failed.push(id);
                }
            }
        }

        match first_error {
            None => {
                let message = match archived.as_slice() {
                    [only] => format!("Archived record {only}"),
                    many => format!("Archived {} records", many.len()),
                };
                self.toaster.show(Toast::success(message));
                ActionOutcome::Succeeded(archived)
            }
            Some(source) if archived.is_empty() && failed.len() == 1 => {
                self.reject(source.into(), "Archive")
            }
            Some(source) => self.reject(
                DispatchError::Archive {
                    archived,
                    failed,
                    source,
                },
                "Archive",
            ),
        }
    }

    fn reject<T>(&self, err: DispatchError, action: &str) -> ActionOutcome<T> {
        tracing::warn!("{} failed: {}", action, err);
        let hint = if err.is_transient() { " (try again)" } else { "" };
        self.toaster
            .show(Toast::error(format!("{action} failed: {err}{hint}")));
        ActionOutcome::Failed(err)
    }
}
