//! Reference options and how they are labeled

use ems_resolver::{Identified, Record, RecordId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Resolved candidate for a "pick entity" field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceOption {
    /// Identifier of the referenced record
    pub id: RecordId,
    /// Human-readable label
    pub label: String,
    /// Record as received
    pub raw: Value,
}

impl ReferenceOption {
    /// Create option with an explicit label
    #[must_use]
    pub fn new(id: impl Into<RecordId>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            raw: Value::Null,
        }
    }

    /// With raw record payload
    #[must_use]
    pub fn with_raw(mut self, raw: Value) -> Self {
        self.raw = raw;
        self
    }
}

impl Identified for ReferenceOption {
    fn id(&self) -> &RecordId {
        &self.id
    }
}

/// Where a cached option came from
///
/// Seed and external entries are pinned: search results never replace or
/// evict them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OptionOrigin {
    /// Value already referenced by the record being edited
    Seed,
    /// Value restored from the parent-supplied long-lived store
    External,
    /// Value returned by a remote search
    Search,
}

impl OptionOrigin {
    /// Check whether the entry is exempt from eviction
    #[inline]
    #[must_use]
    pub fn is_pinned(self) -> bool {
        matches!(self, Self::Seed | Self::External)
    }
}

type LabelFn = dyn Fn(&Record) -> String + Send + Sync;

/// How a search result becomes a label
#[derive(Clone)]
pub enum LabelSource {
    /// Text of one field; falls back to the identifier
    Field(String),
    /// Caller-supplied function, e.g. `"name (type)"`
    Custom(Arc<LabelFn>),
}

impl LabelSource {
    /// Label from one field
    #[must_use]
    pub fn field(name: impl Into<String>) -> Self {
        Self::Field(name.into())
    }

    /// Label from a function
    #[must_use]
    pub fn custom(f: impl Fn(&Record) -> String + Send + Sync + 'static) -> Self {
        Self::Custom(Arc::new(f))
    }

    /// `"<primary> (<detail>)"`, or just the primary text when detail is missing
    #[must_use]
    pub fn with_detail(primary: impl Into<String>, detail: impl Into<String>) -> Self {
        let primary = primary.into();
        let detail = detail.into();
        Self::custom(move |record| {
            let head = record
                .field_text(&primary)
                .unwrap_or_else(|| record.id.to_string());
            match record.field_text(&detail) {
                Some(extra) if !extra.is_empty() => format!("{head} ({extra})"),
                _ => head,
            }
        })
    }

    /// Label for one record
    #[must_use]
    pub fn label_for(&self, record: &Record) -> String {
        match self {
            Self::Field(name) => record
                .field_text(name)
                .unwrap_or_else(|| record.id.to_string()),
            Self::Custom(f) => f(record),
        }
    }

    /// Convert a search result into an option
    #[must_use]
    pub fn option_for(&self, record: &Record) -> ReferenceOption {
        ReferenceOption {
            id: record.id.clone(),
            label: self.label_for(record),
            raw: record.to_value(),
        }
    }
}

impl Default for LabelSource {
    fn default() -> Self {
        Self::field("name")
    }
}

impl fmt::Debug for LabelSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Field(name) => f.debug_tuple("Field").field(name).finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Initial contents of a field's cache
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Seed {
    /// Nothing referenced yet
    #[default]
    None,
    /// Single-select field with a value
    One(ReferenceOption),
    /// Multi-select field values, in order
    Many(Vec<ReferenceOption>),
}

impl Seed {
    /// Seed entries in order
    #[must_use]
    pub fn into_vec(self) -> Vec<ReferenceOption> {
        match self {
            Self::None => Vec::new(),
            Self::One(option) => vec![option],
            Self::Many(options) => options,
        }
    }
}

impl From<Option<ReferenceOption>> for Seed {
    fn from(value: Option<ReferenceOption>) -> Self {
        value.map_or(Self::None, Self::One)
    }
}

impl From<Vec<ReferenceOption>> for Seed {
    fn from(value: Vec<ReferenceOption>) -> Self {
        Self::Many(value)
    }
}
