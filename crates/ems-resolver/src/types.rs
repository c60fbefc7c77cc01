//! Wire types shared by every console resource
//!
//! Defines the record identity model and the request/response shapes of
//! the search, mutate, export and notification endpoints.

use serde::de::Deserializer;
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::fmt;

/// Stable, unique record key
///
/// All selection, deduplication and caching equality is by this value only.
/// Servers may send numeric keys; they are normalized to their decimal text.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    /// Create identifier from any string-like value
    #[inline]
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Borrow identifier text
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check for the empty identifier
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for RecordId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<u64> for RecordId {
    fn from(value: u64) -> Self {
        Self(value.to_string())
    }
}

impl<'de> Deserialize<'de> for RecordId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Text(String),
            Number(serde_json::Number),
        }

        match RawId::deserialize(deserializer)? {
            RawId::Text(text) => Ok(Self(text)),
            RawId::Number(number) => Ok(Self(number.to_string())),
        }
    }
}

/// Anything that carries a [`RecordId`]
///
/// Callers guarantee the identifier exists; a record without one is a
/// programming error, not a runtime condition.
pub trait Identified {
    /// Identifier used for equality in sets and caches
    fn id(&self) -> &RecordId;
}

impl Identified for RecordId {
    fn id(&self) -> &RecordId {
        self
    }
}

/// Opaque record with arbitrary display fields
///
/// Serialized flat: `{"id": "...", "name": "...", ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Record identifier
    pub id: RecordId,
    /// Every other field, untouched
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Record {
    /// Create record with no display fields
    #[must_use]
    pub fn new(id: impl Into<RecordId>) -> Self {
        Self {
            id: id.into(),
            fields: Map::new(),
        }
    }

    /// With one display field
    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Get a field value
    #[inline]
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Render a field as plain text
    ///
    /// Strings render without quotes, `null` and missing fields render as `None`,
    /// everything else uses its JSON text.
    #[must_use]
    pub fn field_text(&self, name: &str) -> Option<String> {
        if name == "id" {
            return Some(self.id.to_string());
        }
        match self.fields.get(name)? {
            Value::Null => None,
            Value::String(text) => Some(text.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Record as a JSON value (flat form)
    #[must_use]
    pub fn to_value(&self) -> Value {
        let mut object = self.fields.clone();
        object.insert("id".to_string(), Value::String(self.id.to_string()));
        Value::Object(object)
    }
}

impl Identified for Record {
    fn id(&self) -> &RecordId {
        &self.id
    }
}

/// Search request parameters
///
/// An absent `q` means "default first page, unfiltered".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchParams {
    /// Free-text query
    pub q: Option<String>,
    /// 1-based page number
    pub page: Option<u32>,
    /// Page size
    pub per_page: Option<u32>,
}

impl SearchParams {
    /// Unparameterized first-page search
    #[inline]
    #[must_use]
    pub fn first_page() -> Self {
        Self::default()
    }

    /// Search filtered by free text
    #[must_use]
    pub fn query(text: impl Into<String>) -> Self {
        Self {
            q: Some(text.into()),
            ..Self::default()
        }
    }

    /// With page number
    #[inline]
    #[must_use]
    pub fn with_page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    /// With page size
    #[inline]
    #[must_use]
    pub fn with_per_page(mut self, per_page: u32) -> Self {
        self.per_page = Some(per_page);
        self
    }

    /// Check whether no free-text filter applies
    #[must_use]
    pub fn is_unfiltered(&self) -> bool {
        self.q.as_deref().map_or(true, |q| q.trim().is_empty())
    }
}

/// One page of search results
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchPage {
    /// Records on this page
    pub data: Vec<Record>,
    /// Total matching records across all pages, when the server reports it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
}

impl SearchPage {
    /// Page with records and no total
    #[must_use]
    pub fn new(data: Vec<Record>) -> Self {
        Self { data, total: None }
    }
}

/// Mutation kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MutationKind {
    /// Create a record
    Create,
    /// Replace a record
    Update,
    /// Delete (archive) a record
    Delete,
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create => f.write_str("create"),
            Self::Update => f.write_str("update"),
            Self::Delete => f.write_str("delete"),
        }
    }
}

/// Create/update/delete request
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    /// Create a record; an empty id lets the server assign one
    Create(Record),
    /// Replace the record with the same id
    Update(Record),
    /// Delete the record with this id
    Delete(RecordId),
}

impl Mutation {
    /// Kind of this mutation
    #[must_use]
    pub fn kind(&self) -> MutationKind {
        match self {
            Self::Create(_) => MutationKind::Create,
            Self::Update(_) => MutationKind::Update,
            Self::Delete(_) => MutationKind::Delete,
        }
    }

    /// Identifier the mutation targets
    #[must_use]
    pub fn target(&self) -> &RecordId {
        match self {
            Self::Create(record) | Self::Update(record) => &record.id,
            Self::Delete(id) => id,
        }
    }
}

/// `{ "<field>": { "in": [...] } }` clause body
#[derive(Serialize)]
struct InClause<'a, T> {
    #[serde(rename = "in")]
    values: &'a [T],
}

/// Export filter selecting records by identifier
///
/// Serializes to `{ "<identifier field>": { "in": [ids...] } }`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportFilter {
    /// Name of the identifier field on the server
    pub field: String,
    /// Identifiers to export
    pub ids: Vec<RecordId>,
}

impl ExportFilter {
    /// Filter over the default `id` field
    #[must_use]
    pub fn by_ids(ids: Vec<RecordId>) -> Self {
        Self {
            field: "id".to_string(),
            ids,
        }
    }

    /// With identifier field name
    #[must_use]
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = field.into();
        self
    }

    /// Check whether an identifier is covered
    #[must_use]
    pub fn contains(&self, id: &RecordId) -> bool {
        self.ids.contains(id)
    }
}

impl Serialize for ExportFilter {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(&self.field, &InClause { values: &self.ids })?;
        map.end()
    }
}

/// Downloadable export result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportArtifact {
    /// Suggested file name
    pub file_name: String,
    /// MIME type reported by the endpoint
    pub content_type: String,
    /// File body
    pub bytes: Vec<u8>,
}

/// Delivery channel for notifications
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Channel {
    /// Text message
    Sms,
    /// Electronic mail
    Email,
    /// Mobile push notification
    Push,
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sms => f.write_str("SMS"),
            Self::Email => f.write_str("EMAIL"),
            Self::Push => f.write_str("PUSH"),
        }
    }
}

impl std::str::FromStr for Channel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "SMS" => Ok(Self::Sms),
            "EMAIL" => Ok(Self::Email),
            "PUSH" => Ok(Self::Push),
            other => Err(format!("unknown channel: '{other}'")),
        }
    }
}

/// Recipient selection for a notification
///
/// Any combination of explicit ids, groups, roles and areas. Serializes to
/// `{ "id": {"in": [...]}, "group": {"in": [...]}, ... }`, absent keys omitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipientCriteria {
    /// Name of the identifier field on the server
    pub id_field: String,
    /// Explicit recipient ids
    pub ids: Option<Vec<RecordId>>,
    /// Recipient groups
    pub group: Option<Vec<String>>,
    /// Recipient roles
    pub role: Option<Vec<String>>,
    /// Recipient areas
    pub area: Option<Vec<String>>,
}

impl Default for RecipientCriteria {
    fn default() -> Self {
        Self {
            id_field: "id".to_string(),
            ids: None,
            group: None,
            role: None,
            area: None,
        }
    }
}

impl RecipientCriteria {
    /// Empty criteria
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With explicit ids
    #[must_use]
    pub fn with_ids(mut self, ids: Vec<RecordId>) -> Self {
        self.ids = Some(ids);
        self
    }

    /// With groups
    #[must_use]
    pub fn with_groups(mut self, groups: Vec<String>) -> Self {
        self.group = Some(groups);
        self
    }

    /// With roles
    #[must_use]
    pub fn with_roles(mut self, roles: Vec<String>) -> Self {
        self.role = Some(roles);
        self
    }

    /// With areas
    #[must_use]
    pub fn with_areas(mut self, areas: Vec<String>) -> Self {
        self.area = Some(areas);
        self
    }

    /// With identifier field name
    #[must_use]
    pub fn with_id_field(mut self, field: impl Into<String>) -> Self {
        self.id_field = field.into();
        self
    }

    /// Check whether no criterion is set
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_none() && self.group.is_none() && self.role.is_none() && self.area.is_none()
    }
}

impl Serialize for RecipientCriteria {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        if let Some(ids) = &self.ids {
            map.serialize_entry(&self.id_field, &InClause { values: ids })?;
        }
        if let Some(group) = &self.group {
            map.serialize_entry("group", &InClause { values: group })?;
        }
        if let Some(role) = &self.role {
            map.serialize_entry("role", &InClause { values: role })?;
        }
        if let Some(area) = &self.area {
            map.serialize_entry("area", &InClause { values: area })?;
        }
        map.end()
    }
}

/// Notification endpoint request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationRequest {
    /// Who receives it
    pub criteria: RecipientCriteria,
    /// Subject line
    pub subject: String,
    /// Body text
    pub message: String,
    /// Delivery channels
    pub channels: BTreeSet<Channel>,
}

/// Reject a channel list that cannot be parsed
///
/// Used by front ends that accept channels as text.
pub fn parse_channels<'a>(
    values: impl IntoIterator<Item = &'a str>,
) -> Result<BTreeSet<Channel>, String> {
    values
        .into_iter()
        .map(str::parse::<Channel>)
        .collect::<Result<BTreeSet<_>, _>>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn record_id_accepts_numbers_and_strings() {
        let from_text: RecordId = serde_json::from_value(json!("a-1")).unwrap();
        let from_number: RecordId = serde_json::from_value(json!(42)).unwrap();

        assert_eq!(from_text.as_str(), "a-1");
        assert_eq!(from_number.as_str(), "42");
    }

    #[test]
    fn record_round_trips_flat() {
        let value = json!({"id": 7, "name": "Harbor", "type": "district"});
        let record: Record = serde_json::from_value(value).unwrap();

        assert_eq!(record.id, RecordId::from("7"));
        assert_eq!(record.field_text("name").as_deref(), Some("Harbor"));
        assert_eq!(record.to_value()["id"], json!("7"));
    }

    #[test]
    fn field_text_renders_non_strings() {
        let record = Record::new("1")
            .with_field("count", 3)
            .with_field("gone", Value::Null);

        assert_eq!(record.field_text("count").as_deref(), Some("3"));
        assert_eq!(record.field_text("gone"), None);
        assert_eq!(record.field_text("missing"), None);
        assert_eq!(record.field_text("id").as_deref(), Some("1"));
    }

    #[test]
    fn export_filter_shape() {
        let filter = ExportFilter::by_ids(vec!["1".into(), "2".into()]);
        assert_eq!(
            serde_json::to_value(&filter).unwrap(),
            json!({"id": {"in": ["1", "2"]}})
        );

        let custom = filter.with_field("uuid");
        assert_eq!(
            serde_json::to_value(&custom).unwrap(),
            json!({"uuid": {"in": ["1", "2"]}})
        );
    }

    #[test]
    fn criteria_omits_absent_keys() {
        let criteria = RecipientCriteria::new()
            .with_ids(vec!["9".into()])
            .with_areas(vec!["north".to_string()]);

        assert_eq!(
            serde_json::to_value(&criteria).unwrap(),
            json!({"id": {"in": ["9"]}, "area": {"in": ["north"]}})
        );
        assert!(RecipientCriteria::new().is_empty());
    }

    #[test]
    fn notification_request_shape() {
        let request = NotificationRequest {
            criteria: RecipientCriteria::new().with_roles(vec!["responder".to_string()]),
            subject: "Flood".to_string(),
            message: "Evacuate".to_string(),
            channels: [Channel::Sms, Channel::Push].into_iter().collect(),
        };

        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "criteria": {"role": {"in": ["responder"]}},
                "subject": "Flood",
                "message": "Evacuate",
                "channels": ["SMS", "PUSH"]
            })
        );
    }

    #[test]
    fn channels_parse_case_insensitively() {
        let channels = parse_channels(["sms", "Email"]).unwrap();
        assert!(channels.contains(&Channel::Sms));
        assert!(channels.contains(&Channel::Email));
        assert!(parse_channels(["fax"]).is_err());
    }

    #[test]
    fn unfiltered_params() {
        assert!(SearchParams::first_page().is_unfiltered());
        assert!(SearchParams::query("  ").is_unfiltered());
        assert!(!SearchParams::query("x").with_page(2).is_unfiltered());
    }
}
