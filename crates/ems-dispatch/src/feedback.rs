//! User feedback seams: transient notifications and confirmation prompts

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;

/// Severity of a toast
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastLevel {
    /// Action completed
    Success,
    /// Neutral information
    Info,
    /// Action failed
    Error,
}

/// Transient user-visible notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Toast {
    /// Severity
    pub level: ToastLevel,
    /// Text shown to the user
    pub message: String,
    /// When it was raised
    pub at: DateTime<Utc>,
}

impl Toast {
    /// Create toast stamped now
    #[must_use]
    pub fn new(level: ToastLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            at: Utc::now(),
        }
    }

    /// Success toast
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self::new(ToastLevel::Success, message)
    }

    /// Error toast
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(ToastLevel::Error, message)
    }
}

/// Displays toasts
pub trait Toaster: Send + Sync {
    /// Show one toast
    fn show(&self, toast: Toast);
}

/// Toaster that queues toasts for a front end to drain
#[derive(Debug, Default)]
pub struct ToastQueue {
    pending: Mutex<Vec<Toast>>,
}

impl ToastQueue {
    /// Create empty queue
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Take every queued toast, oldest first
    pub fn drain(&self) -> Vec<Toast> {
        std::mem::take(&mut *self.pending.lock())
    }

    /// Number of queued toasts
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.lock().len()
    }

    /// Check if nothing is queued
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.lock().is_empty()
    }
}

impl Toaster for ToastQueue {
    fn show(&self, toast: Toast) {
        self.pending.lock().push(toast);
    }
}

/// Asks the user to confirm a destructive action
#[async_trait]
pub trait Confirm: Send + Sync {
    /// `true` to proceed
    async fn confirm(&self, prompt: &str) -> bool;
}

/// Confirmation with a fixed answer (`--yes`, scripted runs)
#[derive(Debug, Clone, Copy)]
pub struct AutoConfirm(pub bool);

#[async_trait]
impl Confirm for AutoConfirm {
    async fn confirm(&self, prompt: &str) -> bool {
        tracing::debug!("auto-answering '{}' with {}", prompt, self.0);
        self.0
    }
}
