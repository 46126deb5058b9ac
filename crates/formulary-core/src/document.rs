//! Document handling
//!
//! Parsing and validation of whole documents (both the persisted file and
//! user imports), lookups across units, and the ordered-sequence helpers the
//! store builds its reorder operations on.

use chrono::{DateTime, Utc};
use serde_json::Value;
use thiserror::Error;

use crate::models::{Document, Entry, Unit, GENERAL_VIEW_ID};

/// Errors that can occur while reading a document
#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Not valid UTF-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid field type for {0}")]
    InvalidType(String),

    #[error("Unit id '{0}' is reserved for the general view")]
    ReservedUnitId(String),

    #[error("Malformed entry '{id}': {details}")]
    MalformedEntry { id: String, details: String },
}

impl Document {
    /// Parse and validate a document from JSON text
    ///
    /// The only structural requirement beyond well-formed entries is a
    /// `units` array; unknown fields are accepted and preserved.
    pub fn from_json(text: &str) -> Result<Self, DocumentError> {
        let value: Value = serde_json::from_str(text)?;

        match value.get("units") {
            None => return Err(DocumentError::MissingField("units".to_string())),
            Some(units) if !units.is_array() => {
                return Err(DocumentError::InvalidType("units".to_string()))
            }
            Some(_) => {}
        }

        let doc: Document = serde_json::from_value(value)?;
        doc.validate()?;
        Ok(doc)
    }

    /// Serialize compactly, as stored on disk
    pub fn to_json(&self) -> Result<String, DocumentError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Serialize for humans, as exported
    pub fn to_json_pretty(&self) -> Result<String, DocumentError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    fn validate(&self) -> Result<(), DocumentError> {
        if let Some(unit) = self.units.iter().find(|u| u.id == GENERAL_VIEW_ID) {
            return Err(DocumentError::ReservedUnitId(unit.id.clone()));
        }
        Ok(())
    }

    /// Stamp the document as modified
    pub fn touch(&mut self, at: DateTime<Utc>) {
        self.last_updated = at;
    }

    /// Look up a stored unit; the general view is never a stored unit
    pub fn unit(&self, id: &str) -> Option<&Unit> {
        if id == GENERAL_VIEW_ID {
            return None;
        }
        self.units.iter().find(|u| u.id == id)
    }

    pub fn unit_mut(&mut self, id: &str) -> Option<&mut Unit> {
        if id == GENERAL_VIEW_ID {
            return None;
        }
        self.units.iter_mut().find(|u| u.id == id)
    }

    pub fn unit_index(&self, id: &str) -> Option<usize> {
        self.units.iter().position(|u| u.id == id)
    }

    /// Every entry, in unit order then entry order
    pub fn all_entries(&self) -> impl Iterator<Item = &Entry> {
        self.units.iter().flat_map(|u| u.entries.iter())
    }

    /// Find an entry anywhere, together with the unit that owns it
    pub fn find_entry(&self, entry_id: &str) -> Option<(&Unit, &Entry)> {
        self.units
            .iter()
            .find_map(|u| u.entry(entry_id).map(|e| (u, e)))
    }

    /// Id of the unit owning an entry
    pub fn owner_of(&self, entry_id: &str) -> Option<String> {
        self.find_entry(entry_id).map(|(u, _)| u.id.clone())
    }

    pub fn contains_id(&self, id: &str) -> bool {
        self.units.iter().any(|u| u.id == id) || self.all_entries().any(|e| e.id == id)
    }

    pub fn entry_count(&self) -> usize {
        self.units.iter().map(|u| u.entries.len()).sum()
    }
}

/// Move the element at `from` so it ends up at index `to`
///
/// Remove-then-insert: elements between the two positions shift by one.
/// Returns false, leaving the sequence untouched, when either index is out
/// of range.
pub fn move_item<T>(items: &mut Vec<T>, from: usize, to: usize) -> bool {
    if from >= items.len() || to >= items.len() {
        return false;
    }
    let item = items.remove(from);
    items.insert(to, item);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EntryKind, NewEntry};

    const EXPORTED: &str = r#"{
        "version": "1.0",
        "lastUpdated": "2024-05-01T12:00:00.000Z",
        "units": [
            {"id": "u-default", "name": "General", "entries": [
                {"id": "f-1", "title": "Area", "type": "latex", "raw": "\\pi r^2",
                 "desmosId": null, "createdAt": "2024-05-01T11:00:00.000Z"}
            ]},
            {"id": "u-2", "name": "Graphs", "entries": [
                {"id": "f-2", "title": "Sine", "type": "desmos", "raw": "",
                 "desmosId": "abc", "createdAt": "2024-05-01T11:30:00.000Z"}
            ], "color": "blue"}
        ],
        "theme": "dark"
    }"#;

    #[test]
    fn test_from_json() {
        let doc = Document::from_json(EXPORTED).unwrap();
        assert_eq!(doc.units.len(), 2);
        assert_eq!(doc.entry_count(), 2);
        assert_eq!(doc.units[1].entries[0].kind, EntryKind::Desmos);
        assert_eq!(doc.extra.get("theme"), Some(&Value::from("dark")));
        assert_eq!(doc.units[1].extra.get("color"), Some(&Value::from("blue")));
    }

    #[test]
    fn test_pretty_json_roundtrip() {
        let doc = Document::from_json(EXPORTED).unwrap();
        let text = doc.to_json_pretty().unwrap();
        let reparsed = Document::from_json(&text).unwrap();
        assert_eq!(doc, reparsed);
        assert_eq!(text, reparsed.to_json_pretty().unwrap());
    }

    #[test]
    fn test_missing_units() {
        let err = Document::from_json(r#"{"foo":1}"#).unwrap_err();
        assert!(matches!(err, DocumentError::MissingField(ref f) if f == "units"));

        let err = Document::from_json("[1, 2]").unwrap_err();
        assert!(matches!(err, DocumentError::MissingField(_)));
    }

    #[test]
    fn test_units_must_be_array() {
        let err = Document::from_json(r#"{"units": {}}"#).unwrap_err();
        assert!(matches!(err, DocumentError::InvalidType(_)));
    }

    #[test]
    fn test_invalid_json() {
        let err = Document::from_json("{not json").unwrap_err();
        assert!(matches!(err, DocumentError::Json(_)));
    }

    #[test]
    fn test_reserved_unit_id() {
        let err = Document::from_json(r#"{"units": [{"id": "general", "name": "All"}]}"#)
            .unwrap_err();
        assert!(matches!(err, DocumentError::ReservedUnitId(_)));
    }

    #[test]
    fn test_minimal_document_gets_defaults() {
        let doc = Document::from_json(r#"{"units": []}"#).unwrap();
        assert_eq!(doc.version, "1.0");
        assert!(doc.units.is_empty());
    }

    #[test]
    fn test_lookups() {
        let doc = Document::from_json(EXPORTED).unwrap();
        assert!(doc.unit("u-2").is_some());
        assert!(doc.unit("general").is_none());
        assert_eq!(doc.unit_index("u-2"), Some(1));

        let (unit, entry) = doc.find_entry("f-2").unwrap();
        assert_eq!(unit.id, "u-2");
        assert_eq!(entry.title, "Sine");
        assert_eq!(doc.owner_of("f-1").as_deref(), Some("u-default"));
        assert!(doc.find_entry("f-404").is_none());

        assert!(doc.contains_id("u-2"));
        assert!(doc.contains_id("f-1"));
        assert!(!doc.contains_id("f-3"));
    }

    #[test]
    fn test_all_entries_order() {
        let mut doc = Document::default();
        doc.units.push(Unit::with_id("u-2", "Second"));
        doc.units[1]
            .entries
            .push(Entry::new("f-b", NewEntry::latex("B", "b")));
        doc.units[0]
            .entries
            .push(Entry::new("f-a", NewEntry::latex("A", "a")));

        let ids: Vec<_> = doc.all_entries().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["f-a", "f-b"]);
    }

    #[test]
    fn test_move_item_forward_and_back() {
        let mut items = vec!['A', 'B', 'C'];
        assert!(move_item(&mut items, 0, 2));
        assert_eq!(items, vec!['B', 'C', 'A']);

        assert!(move_item(&mut items, 2, 0));
        assert_eq!(items, vec!['A', 'B', 'C']);

        assert!(move_item(&mut items, 1, 1));
        assert_eq!(items, vec!['A', 'B', 'C']);
    }

    #[test]
    fn test_move_item_out_of_range() {
        let mut items = vec![1, 2, 3];
        assert!(!move_item(&mut items, 3, 0));
        assert!(!move_item(&mut items, 0, 3));
        assert_eq!(items, vec![1, 2, 3]);

        let mut empty: Vec<i32> = Vec::new();
        assert!(!move_item(&mut empty, 0, 0));
    }

    #[test]
    fn test_move_item_preserves_elements() {
        for len in 1..6 {
            for from in 0..len {
                for to in 0..len {
                    let mut items: Vec<usize> = (0..len).collect();
                    assert!(move_item(&mut items, from, to));
                    assert_eq!(items.len(), len);
                    assert_eq!(items[to], from);
                    let mut sorted = items.clone();
                    sorted.sort_unstable();
                    assert_eq!(sorted, (0..len).collect::<Vec<_>>());
                }
            }
        }
    }
}
