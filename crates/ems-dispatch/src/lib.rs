//! EMS Dispatch - bulk actions over selected records
//!
//! Consumes a selection (or one record) and produces:
//! - Export requests for a downloadable artifact
//! - Notifications composed from templated record text
//! - Confirmed archive (delete) calls
//!
//! Outcomes are reported through a [`Toaster`] at the call site.

#![warn(unreachable_pub)]

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod feedback;
pub mod target;

pub use config::DispatchConfig;
pub use dispatcher::{ActionOutcome, BulkActionDispatcher, NotifyDraft};
pub use error::DispatchError;
pub use feedback::{AutoConfirm, Confirm, Toast, ToastLevel, ToastQueue, Toaster};
pub use target::{compose_message, FieldTemplate, RecordTemplate, ShareTarget, MESSAGE_SEPARATOR};
