//! EMS Reference - lazy reference-data caching
//!
//! Backs "pick an area", "pick an agency" and similar fields whose candidate
//! set is only reachable through a remote search:
//! - Seeded from the record being edited
//! - Grown by every successful search, never replaced
//! - Topped up from a parent-supplied store across remounts
//!
//! # Example
//!
//! ```rust,ignore
//! use ems_reference::{LabelSource, ReferenceCache, Seed};
//!
//! let field = ReferenceCache::builder(resolver)
//!     .label(LabelSource::with_detail("name", "type"))
//!     .build();
//! field.initialize(Seed::None);
//! field.on_open().await;
//! field.on_query_change("harb").await;
//! let value = field.on_selection_change(vec!["12".into()]).await;
//! ```

#![warn(unreachable_pub)]

pub mod cache;
pub mod config;
pub mod merge;
pub mod option;
pub mod shared;

pub use cache::{FieldStatus, ReferenceCache, ReferenceCacheBuilder, SearchOutcome};
pub use config::{RacePolicy, ReferenceConfig, DEFAULT_MAX_OPTIONS, DEFAULT_OPEN_THRESHOLD};
pub use merge::{merge_options, CachedOption, OptionsCache};
pub use option::{LabelSource, OptionOrigin, ReferenceOption, Seed};
pub use shared::SharedOptionStore;
