//! Share targets and message templates
//!
//! A share action receives either one record or many. The input is
//! normalized to a sequence at the boundary, so message assembly has one path.

use ems_resolver::Record;

/// Default separator between rendered records
pub const MESSAGE_SEPARATOR: &str = "\n\n";

/// One record or a sequence of records
#[derive(Debug, Clone, PartialEq)]
pub enum ShareTarget<T> {
    /// Row action on a single record
    One(T),
    /// Toolbar action on a selection
    Many(Vec<T>),
}

impl<T> ShareTarget<T> {
    /// Normalize to a sequence
    #[must_use]
    pub fn into_many(self) -> Vec<T> {
        match self {
            Self::One(item) => vec![item],
            Self::Many(items) => items,
        }
    }
}

impl<T> From<Vec<T>> for ShareTarget<T> {
    fn from(items: Vec<T>) -> Self {
        Self::Many(items)
    }
}

/// Renders one record as message text
pub trait RecordTemplate<T>: Send + Sync {
    /// Text for `item`
    fn render(&self, item: &T) -> String;
}

impl<T, F> RecordTemplate<T> for F
where
    F: Fn(&T) -> String + Send + Sync,
{
    fn render(&self, item: &T) -> String {
        self(item)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Text(String),
    Field(String),
}

/// `{field}` placeholder template over [`Record`]
///
/// Unknown or null fields render as empty text. An unmatched `{` is literal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldTemplate {
    segments: Vec<Segment>,
}

impl FieldTemplate {
    /// Parse a template
    #[must_use]
    pub fn parse(source: &str) -> Self {
        let mut segments = Vec::new();
        let mut rest = source;

        while let Some(open) = rest.find('{') {
            let Some(close) = rest[open..].find('}') else {
                break;
            };
            if open > 0 {
                segments.push(Segment::Text(rest[..open].to_string()));
            }
            let name = rest[open + 1..open + close].trim();
            segments.push(Segment::Field(name.to_string()));
            rest = &rest[open + close + 1..];
        }
        if !rest.is_empty() {
            segments.push(Segment::Text(rest.to_string()));
        }

        Self { segments }
    }
}

impl RecordTemplate<Record> for FieldTemplate {
    fn render(&self, item: &Record) -> String {
        self.segments
            .iter()
            .map(|segment| match segment {
                Segment::Text(text) => text.clone(),
                Segment::Field(name) => item.field_text(name).unwrap_or_default(),
            })
            .collect()
    }
}

/// Join each record's rendered text with `separator`
pub fn compose_message<T>(
    target: ShareTarget<T>,
    template: &dyn RecordTemplate<T>,
    separator: &str,
) -> String {
    target
        .into_many()
        .iter()
        .map(|item| template.render(item))
        .collect::<Vec<_>>()
        .join(separator)
}
