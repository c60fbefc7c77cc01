//! Dispatcher configuration

use crate::target::MESSAGE_SEPARATOR;
use ems_resolver::Channel;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Bulk action settings shared by every resource screen
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Identifier field used in export filters and recipient criteria
    pub identifier_field: String,
    /// Channels a fresh notification draft starts with
    pub default_channels: BTreeSet<Channel>,
    /// Text placed between rendered records
    pub message_separator: String,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            identifier_field: "id".to_string(),
            default_channels: BTreeSet::from([Channel::Email]),
            message_separator: MESSAGE_SEPARATOR.to_string(),
        }
    }
}

impl DispatchConfig {
    /// Create default config
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set identifier field
    #[inline]
    #[must_use]
    pub fn with_identifier_field(mut self, field: impl Into<String>) -> Self {
        self.identifier_field = field.into();
        self
    }

    /// Set default channels
    #[inline]
    #[must_use]
    pub fn with_default_channels(mut self, channels: impl IntoIterator<Item = Channel>) -> Self {
        self.default_channels = channels.into_iter().collect();
        self
    }

    /// Set message separator
    #[inline]
    #[must_use]
    pub fn with_message_separator(mut self, separator: impl Into<String>) -> Self {
        self.message_separator = separator.into();
        self
    }
}
