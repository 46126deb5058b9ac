//! Data models for Formulary
//!
//! Defines the persisted document: an ordered list of units, each holding an
//! ordered list of formula entries. The JSON shape matches the format the
//! library has always written (camelCase keys, `type` tag per entry).
//!
//! Entries are normalized once while deserializing. Older documents may carry
//! a legacy `linkedWith` pairing instead of a `group` entry; both are folded
//! into [`Composition`] so callers never inspect the raw fields again.

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::document::DocumentError;

/// Id of the read-only view spanning every unit
pub const GENERAL_VIEW_ID: &str = "general";

/// Id of the unit seeded into a fresh document
pub const DEFAULT_UNIT_ID: &str = "u-default";

/// Name of the unit seeded into a fresh document
pub const DEFAULT_UNIT_NAME: &str = "General";

/// Schema version written into new documents
pub const SCHEMA_VERSION: &str = "1.0";

/// Title given to entries saved without one
pub const UNTITLED: &str = "Untitled";

/// Current time, truncated to the millisecond precision we persist
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// The root persisted object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// Schema version tag
    #[serde(default = "default_version")]
    pub version: String,
    /// Refreshed every time the document is persisted
    #[serde(default = "now", with = "timestamp")]
    pub last_updated: DateTime<Utc>,
    /// Units in display order
    pub units: Vec<Unit>,
    /// Fields written by other versions, kept verbatim
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_version() -> String {
    SCHEMA_VERSION.to_string()
}

impl Default for Document {
    fn default() -> Self {
        Self {
            version: default_version(),
            last_updated: now(),
            units: vec![Unit::with_id(DEFAULT_UNIT_ID, DEFAULT_UNIT_NAME)],
            extra: Map::new(),
        }
    }
}

/// A named collection of entries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Unit {
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// Entries in display and navigation order
    #[serde(default)]
    pub entries: Vec<Entry>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Unit {
    /// Create an empty unit with a specific ID
    pub fn with_id(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            entries: Vec::new(),
            extra: Map::new(),
        }
    }

    /// Position of an entry within this unit
    pub fn position(&self, entry_id: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.id == entry_id)
    }

    pub fn entry(&self, entry_id: &str) -> Option<&Entry> {
        self.entries.iter().find(|e| e.id == entry_id)
    }

    pub fn entry_mut(&mut self, entry_id: &str) -> Option<&mut Entry> {
        self.entries.iter_mut().find(|e| e.id == entry_id)
    }
}

/// What an entry renders as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    /// LaTeX source in `raw`
    Latex,
    /// An embedded Desmos graph referenced by `desmos_id`
    Desmos,
    /// Two child snapshots shown side by side
    Group,
}

impl EntryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKind::Latex => "latex",
            EntryKind::Desmos => "desmos",
            EntryKind::Group => "group",
        }
    }
}

impl std::fmt::Display for EntryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EntryKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "latex" => Ok(EntryKind::Latex),
            "desmos" => Ok(EntryKind::Desmos),
            "group" => Ok(EntryKind::Group),
            other => Err(format!("unknown entry type '{}'", other)),
        }
    }
}

/// How an entry relates to other entries
#[derive(Debug, Clone, PartialEq)]
pub enum Composition {
    /// A standalone formula or graph
    Single,
    /// Legacy pairing with another entry by id, shown side by side
    Linked { partner: String },
    /// Composite entry owning copies of two former entries
    Group { children: Box<[Entry; 2]> },
}

/// One formula or graph record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "EntryRecord", into = "EntryRecord")]
pub struct Entry {
    pub id: String,
    pub title: String,
    pub kind: EntryKind,
    /// LaTeX source; empty for graphs and groups
    pub raw: String,
    /// Desmos graph id or calculator URL
    pub desmos_id: Option<String>,
    pub composition: Composition,
    pub created_at: DateTime<Utc>,
    pub extra: Map<String, Value>,
}

impl Entry {
    /// Build an entry from user input
    ///
    /// The type is `desmos` when a graph id is given, `latex` otherwise, and
    /// an empty title becomes "Untitled".
    pub fn new(id: impl Into<String>, draft: NewEntry) -> Self {
        let desmos_id = draft.desmos_id.filter(|d| !d.trim().is_empty());
        let kind = if desmos_id.is_some() {
            EntryKind::Desmos
        } else {
            EntryKind::Latex
        };
        let title = if draft.title.trim().is_empty() {
            UNTITLED.to_string()
        } else {
            draft.title
        };

        let mut extra = Map::new();
        if draft.legacy_tikz {
            extra.insert("isTikZ".to_string(), Value::Bool(true));
        }

        Self {
            id: id.into(),
            title,
            kind,
            raw: draft.raw,
            desmos_id,
            composition: Composition::Single,
            created_at: now(),
            extra,
        }
    }

    /// Build a composite entry holding copies of two entries
    pub fn group(id: impl Into<String>, first: &Entry, second: &Entry) -> Self {
        Self {
            id: id.into(),
            title: format!("{} & {}", first.title, second.title),
            kind: EntryKind::Group,
            raw: String::new(),
            desmos_id: None,
            composition: Composition::Group {
                children: Box::new([first.clone(), second.clone()]),
            },
            created_at: now(),
            extra: Map::new(),
        }
    }

    pub fn is_group(&self) -> bool {
        matches!(self.composition, Composition::Group { .. })
    }

    /// Child snapshots when this is a group
    pub fn children(&self) -> Option<&[Entry; 2]> {
        match &self.composition {
            Composition::Group { children } => Some(children),
            _ => None,
        }
    }

    /// Legacy partner id when this entry is linked
    pub fn linked_with(&self) -> Option<&str> {
        match &self.composition {
            Composition::Linked { partner } => Some(partner),
            _ => None,
        }
    }

    /// Draft that recreates this entry's content as a standalone entry
    pub fn to_draft(&self) -> NewEntry {
        NewEntry {
            title: self.title.clone(),
            raw: self.raw.clone(),
            desmos_id: self.desmos_id.clone(),
            legacy_tikz: false,
        }
    }

    /// Fresh standalone entry carrying a group child's content
    ///
    /// Type and graph id are copied as stored rather than re-inferred. A
    /// child that is itself a group keeps its children.
    pub fn restored_from(id: impl Into<String>, child: &Entry) -> Self {
        let mut entry = Self::new(id, child.to_draft());
        entry.kind = child.kind;
        entry.desmos_id = child.desmos_id.clone();
        if child.is_group() {
            entry.composition = child.composition.clone();
        }
        entry
    }
}

/// User input for a new entry
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewEntry {
    pub title: String,
    pub raw: String,
    pub desmos_id: Option<String>,
    /// Marks entries written by the old TikZ editor
    pub legacy_tikz: bool,
}

impl NewEntry {
    pub fn latex(title: impl Into<String>, raw: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            raw: raw.into(),
            ..Self::default()
        }
    }

    pub fn desmos(title: impl Into<String>, desmos_id: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            desmos_id: Some(desmos_id.into()),
            ..Self::default()
        }
    }
}

/// Partial update for an entry
///
/// Each present field overwrites the entry's value; absent fields are left
/// alone. Nothing is inferred: switching `kind` must be requested explicitly
/// even when `desmos_id` changes too.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntryPatch {
    pub title: Option<String>,
    pub kind: Option<EntryKind>,
    pub raw: Option<String>,
    /// `Some(None)` clears the graph id
    pub desmos_id: Option<Option<String>>,
    /// `Some(None)` removes a legacy link
    pub linked_with: Option<Option<String>>,
}

impl EntryPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn kind(mut self, kind: EntryKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn raw(mut self, raw: impl Into<String>) -> Self {
        self.raw = Some(raw.into());
        self
    }

    pub fn desmos_id(mut self, desmos_id: Option<String>) -> Self {
        self.desmos_id = Some(desmos_id);
        self
    }

    pub fn linked_with(mut self, partner: Option<String>) -> Self {
        self.linked_with = Some(partner);
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Whether the patch can be applied without breaking the group invariant
    ///
    /// A group keeps its type and cannot be linked; a plain entry cannot be
    /// turned into a group because it has no children to show.
    pub fn is_applicable_to(&self, entry: &Entry) -> bool {
        let kind_ok = match self.kind {
            Some(EntryKind::Group) => entry.is_group(),
            Some(_) => !entry.is_group(),
            None => true,
        };
        let link_ok = !(entry.is_group() && matches!(self.linked_with, Some(Some(_))));
        kind_ok && link_ok
    }

    /// Merge the present fields into `entry`
    ///
    /// Returns false, leaving the entry untouched, when the patch is not
    /// applicable.
    pub fn apply(&self, entry: &mut Entry) -> bool {
        if !self.is_applicable_to(entry) {
            return false;
        }
        if let Some(ref title) = self.title {
            entry.title = title.clone();
        }
        if let Some(kind) = self.kind {
            entry.kind = kind;
        }
        if let Some(ref raw) = self.raw {
            entry.raw = raw.clone();
        }
        if let Some(ref desmos_id) = self.desmos_id {
            entry.desmos_id = desmos_id.clone();
        }
        // Groups have no link to remove
        if let (Some(partner), false) = (&self.linked_with, entry.is_group()) {
            entry.composition = match partner {
                Some(id) => Composition::Linked {
                    partner: id.clone(),
                },
                None => Composition::Single,
            };
        }
        true
    }
}

/// Which entries the user is looking at
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum View {
    /// Every unit's entries, read-only
    General,
    /// A single unit
    Unit(String),
}

impl View {
    /// Interpret a unit id, mapping the reserved id to the general view
    pub fn from_id(id: &str) -> Self {
        if id == GENERAL_VIEW_ID {
            View::General
        } else {
            View::Unit(id.to_string())
        }
    }

    pub fn id(&self) -> &str {
        match self {
            View::General => GENERAL_VIEW_ID,
            View::Unit(id) => id,
        }
    }
}

/// Flat wire shape of an entry
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EntryRecord {
    id: String,
    #[serde(default)]
    title: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    kind: Option<EntryKind>,
    #[serde(default)]
    raw: Option<String>,
    #[serde(default)]
    desmos_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    children: Option<Vec<Entry>>,
    #[serde(default, with = "timestamp::option")]
    created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    linked_with: Option<String>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl TryFrom<EntryRecord> for Entry {
    type Error = DocumentError;

    fn try_from(record: EntryRecord) -> Result<Self, Self::Error> {
        let kind = record.kind.unwrap_or_else(|| {
            match record.desmos_id.as_deref().map(str::trim) {
                Some(id) if !id.is_empty() => EntryKind::Desmos,
                _ => EntryKind::Latex,
            }
        });

        let composition = match (kind, record.children) {
            (EntryKind::Group, Some(children)) => {
                let children: [Entry; 2] =
                    children
                        .try_into()
                        .map_err(|c: Vec<Entry>| DocumentError::MalformedEntry {
                            id: record.id.clone(),
                            details: format!("group has {} children, expected 2", c.len()),
                        })?;
                Composition::Group {
                    children: Box::new(children),
                }
            }
            (EntryKind::Group, None) => {
                return Err(DocumentError::MalformedEntry {
                    id: record.id,
                    details: "group without children".to_string(),
                });
            }
            (_, Some(_)) => {
                return Err(DocumentError::MalformedEntry {
                    id: record.id,
                    details: format!("children on a {} entry", kind),
                });
            }
            (_, None) => match record.linked_with {
                Some(partner) => Composition::Linked { partner },
                None => Composition::Single,
            },
        };

        Ok(Self {
            id: record.id,
            title: record.title,
            kind,
            raw: record.raw.unwrap_or_default(),
            desmos_id: record.desmos_id,
            composition,
            created_at: record.created_at.unwrap_or_else(now),
            extra: record.extra,
        })
    }
}

impl From<Entry> for EntryRecord {
    fn from(entry: Entry) -> Self {
        let (children, linked_with) = match entry.composition {
            Composition::Single => (None, None),
            Composition::Linked { partner } => (None, Some(partner)),
            Composition::Group { children } => {
                let [first, second] = *children;
                (Some(vec![first, second]), None)
            }
        };

        Self {
            id: entry.id,
            title: entry.title,
            kind: Some(entry.kind),
            raw: Some(entry.raw),
            desmos_id: entry.desmos_id,
            children,
            created_at: Some(entry.created_at),
            linked_with,
            extra: entry.extra,
        }
    }
}

/// ISO-8601 timestamps with millisecond precision (`2024-05-01T12:00:00.000Z`)
pub mod timestamp {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn format(value: &DateTime<Utc>) -> String {
        value.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    pub fn parse(value: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
        DateTime::parse_from_rfc3339(value).map(|dt| dt.with_timezone(&Utc))
    }

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let s = String::deserialize(deserializer)?;
        parse(&s).map_err(de::Error::custom)
    }

    pub mod option {
        use super::{format, parse};
        use chrono::{DateTime, Utc};
        use serde::{de, Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(
            value: &Option<DateTime<Utc>>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match value {
                Some(dt) => serializer.serialize_str(&format(dt)),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<DateTime<Utc>>, D::Error> {
            match Option::<String>::deserialize(deserializer)? {
                Some(s) => parse(&s).map(Some).map_err(de::Error::custom),
                None => Ok(None),
            }
        }
    }
}
