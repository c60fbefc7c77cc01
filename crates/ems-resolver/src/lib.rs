//! EMS Resolver - remote data contract
//!
//! Every console screen talks to the server through one abstraction:
//! - Paged, filtered search
//! - Create/update/delete
//! - Export by identifier filter
//! - Notification dispatch
//!
//! Adapters: [`HttpResolver`] (REST, behind the `http` feature) and
//! [`InMemoryResolver`] (in-process store).

#![warn(unreachable_pub)]

pub mod error;
#[cfg(feature = "http")]
pub mod http;
pub mod memory;
pub mod resolver;
pub mod types;

pub use error::ResolverError;
#[cfg(feature = "http")]
pub use http::HttpResolver;
pub use memory::InMemoryResolver;
pub use resolver::{mutate_with, RemoteResolver};
pub use types::{
    parse_channels, Channel, ExportArtifact, ExportFilter, Identified, Mutation, MutationKind,
    NotificationRequest, RecipientCriteria, Record, RecordId, SearchPage, SearchParams,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
