//! Unified storage interface
//!
//! The `Store` owns the library document. Every read and write goes through
//! it, and every successful mutation is persisted before the call returns, so
//! the file on disk always reflects the last completed operation.
//!
//! ## Failure reporting
//!
//! Unknown ids and out-of-range indices are ordinary outcomes: mutations
//! report them as `Ok(false)` or `Ok(None)` and leave the document untouched.
//! `Err` is reserved for persistence failures and rejected imports. When
//! persisting fails the in-memory document is rolled back.
//!
//! ## Usage
//!
//! ```ignore
//! let mut store = Store::open()?;  // Creates or loads existing
//!
//! let unit = store.create_unit("Algebra")?;
//! store.add_entry(&unit.id, NewEntry::latex("Quadratic", "x^2+1"))?;
//!
//! let hits = store.search(&View::General, "quad");
//! ```

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::document::move_item;
use crate::ids::{IdGenerator, ENTRY_PREFIX, UNIT_PREFIX};
use crate::models::{Document, Entry, EntryPatch, NewEntry, Unit, View};
use crate::storage::{JsonPersistence, StorageStats};

/// Unified storage interface for Formulary
pub struct Store {
    /// The library document
    doc: Document,
    /// File persistence handler
    persistence: JsonPersistence,
    /// Source of fresh unit and entry ids
    ids: IdGenerator,
}

impl Store {
    /// Open the store, creating a new library if none exists
    ///
    /// A library file that cannot be parsed is set aside and replaced by a
    /// fresh document holding a single "General" unit.
    pub fn open() -> Result<Self> {
        let config = Config::load().context("Failed to load configuration")?;
        Self::open_with_config(config)
    }

    /// Open the store with a specific configuration
    pub fn open_with_config(config: Config) -> Result<Self> {
        let persistence = JsonPersistence::new(config);
        let doc = persistence
            .load_or_create()
            .context("Failed to load or create library")?;

        Ok(Self {
            doc,
            persistence,
            ids: IdGenerator::new(),
        })
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        self.persistence.config()
    }

    /// Get the whole document
    pub fn document(&self) -> &Document {
        &self.doc
    }

    /// Sizes of the files backing the library
    pub fn storage_stats(&self) -> StorageStats {
        self.persistence.stats()
    }

    pub fn unit_count(&self) -> usize {
        self.doc.units.len()
    }

    pub fn entry_count(&self) -> usize {
        self.doc.entry_count()
    }

    // ==================== Unit Operations ====================

    /// Units in display order
    pub fn get_units(&self) -> &[Unit] {
        &self.doc.units
    }

    /// Get a unit by ID
    ///
    /// The general view is not a unit and always yields `None`.
    pub fn get_unit(&self, id: &str) -> Option<&Unit> {
        self.doc.unit(id)
    }

    /// Create an empty unit at the end of the list
    ///
    /// Callers validate the name; the store takes it as given.
    pub fn create_unit(&mut self, name: &str) -> Result<Unit> {
        let unit = Unit::with_id(self.next_id(UNIT_PREFIX), name);

        let snapshot = self.doc.clone();
        self.doc.units.push(unit.clone());
        self.commit(snapshot, "create_unit")?;

        info!(unit = %unit.id, name, "Unit created");
        Ok(unit)
    }

    /// Rename a unit in place
    pub fn rename_unit(&mut self, id: &str, name: &str) -> Result<bool> {
        let snapshot = self.doc.clone();
        let Some(unit) = self.doc.unit_mut(id) else {
            return Ok(false);
        };
        unit.name = name.to_string();
        self.commit(snapshot, "rename_unit")?;
        Ok(true)
    }

    /// Delete a unit together with all of its entries
    ///
    /// Deleting an unknown unit is a no-op returning false.
    pub fn delete_unit(&mut self, id: &str) -> Result<bool> {
        if self.doc.unit(id).is_none() {
            return Ok(false);
        }
        let snapshot = self.doc.clone();
        self.doc.units.retain(|u| u.id != id);
        self.commit(snapshot, "delete_unit")?;
        Ok(true)
    }

    /// Move the unit at `from` to position `to`
    pub fn reorder_units(&mut self, from: usize, to: usize) -> Result<bool> {
        let snapshot = self.doc.clone();
        if !move_item(&mut self.doc.units, from, to) {
            debug!(from, to, len = self.doc.units.len(), "Unit reorder out of range");
            return Ok(false);
        }
        self.commit(snapshot, "reorder_units")?;
        Ok(true)
    }

    // ==================== Entry Operations ====================

    /// Every entry, in unit order then entry order
    pub fn get_all_entries(&self) -> Vec<&Entry> {
        self.doc.all_entries().collect()
    }

    /// Find an entry anywhere, with the unit that owns it
    pub fn find_entry(&self, entry_id: &str) -> Option<(&Unit, &Entry)> {
        self.doc.find_entry(entry_id)
    }

    /// Append a new entry to a unit
    ///
    /// Returns `None` when the unit doesn't exist.
    pub fn add_entry(&mut self, unit_id: &str, draft: NewEntry) -> Result<Option<Entry>> {
        if self.doc.unit(unit_id).is_none() {
            return Ok(None);
        }
        let entry = Entry::new(self.next_id(ENTRY_PREFIX), draft);

        let snapshot = self.doc.clone();
        let Some(unit) = self.doc.unit_mut(unit_id) else {
            return Ok(None);
        };
        unit.entries.push(entry.clone());
        self.commit(snapshot, "add_entry")?;

        debug!(unit = unit_id, entry = %entry.id, kind = %entry.kind, "Entry added");
        Ok(Some(entry))
    }

    /// Merge the fields present in `patch` into an entry
    ///
    /// Returns false when the unit or entry is missing, or when the patch
    /// would turn a plain entry into a group (or a group into anything else).
    pub fn update_entry(&mut self, unit_id: &str, entry_id: &str, patch: &EntryPatch) -> Result<bool> {
        let snapshot = self.doc.clone();
        let Some(entry) = self
            .doc
            .unit_mut(unit_id)
            .and_then(|u| u.entry_mut(entry_id))
        else {
            return Ok(false);
        };
        if !patch.apply(entry) {
            debug!(unit = unit_id, entry = entry_id, "Patch not applicable");
            return Ok(false);
        }
        self.commit(snapshot, "update_entry")?;
        Ok(true)
    }

    /// Remove an entry from a unit
    ///
    /// Deleting an entry that isn't there is a no-op returning false.
    pub fn delete_entry(&mut self, unit_id: &str, entry_id: &str) -> Result<bool> {
        Ok(self.delete_entries(unit_id, &[entry_id])? > 0)
    }

    /// Remove a selection of entries from one unit, returning how many went
    pub fn delete_entries(&mut self, unit_id: &str, entry_ids: &[impl AsRef<str>]) -> Result<usize> {
        let snapshot = self.doc.clone();
        let Some(unit) = self.doc.unit_mut(unit_id) else {
            return Ok(0);
        };
        let before = unit.entries.len();
        unit.entries
            .retain(|e| !entry_ids.iter().any(|id| id.as_ref() == e.id));
        let removed = before - unit.entries.len();

        if removed > 0 {
            self.commit(snapshot, "delete_entries")?;
        }
        Ok(removed)
    }

    /// Move the entry at `from` to position `to` within a unit
    pub fn reorder_entries(&mut self, unit_id: &str, from: usize, to: usize) -> Result<bool> {
        let snapshot = self.doc.clone();
        let Some(unit) = self.doc.unit_mut(unit_id) else {
            return Ok(false);
        };
        if !move_item(&mut unit.entries, from, to) {
            debug!(unit = unit_id, from, to, "Entry reorder out of range");
            return Ok(false);
        }
        self.commit(snapshot, "reorder_entries")?;
        Ok(true)
    }

    /// Move an entry to the end of another unit
    pub fn move_entry_to_unit(&mut self, entry_id: &str, source_id: &str, target_id: &str) -> Result<bool> {
        if self.doc.unit(target_id).is_none() {
            return Ok(false);
        }

        let snapshot = self.doc.clone();
        let Some(source) = self.doc.unit_mut(source_id) else {
            return Ok(false);
        };
        let Some(index) = source.position(entry_id) else {
            return Ok(false);
        };
        let entry = source.entries.remove(index);

        match self.doc.unit_mut(target_id) {
            Some(target) => target.entries.push(entry),
            None => {
                self.doc = snapshot;
                return Ok(false);
            }
        }
        self.commit(snapshot, "move_entry_to_unit")?;
        Ok(true)
    }

    // ==================== Views & Search ====================

    /// Entries visible in a view
    ///
    /// Returns `None` when the view names a unit that no longer exists.
    pub fn entries_in_view(&self, view: &View) -> Option<Vec<&Entry>> {
        match view {
            View::General => Some(self.get_all_entries()),
            View::Unit(id) => self.doc.unit(id).map(|u| u.entries.iter().collect()),
        }
    }

    /// Entries in a view whose title contains `query`, ignoring case
    pub fn search(&self, view: &View, query: &str) -> Vec<&Entry> {
        let entries = self.entries_in_view(view).unwrap_or_default();
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return entries;
        }
        entries
            .into_iter()
            .filter(|e| e.title.to_lowercase().contains(&needle))
            .collect()
    }

    /// Resolve the partner of a legacy linked entry
    ///
    /// Looks in the given unit first, then anywhere in the library.
    pub fn linked_partner(&self, unit_id: &str, entry: &Entry) -> Option<&Entry> {
        let partner = entry.linked_with()?;
        self.doc
            .unit(unit_id)
            .and_then(|u| u.entry(partner))
            .or_else(|| self.doc.all_entries().find(|e| e.id == partner))
    }

    // ==================== Groups ====================

    /// Combine two entries into one group entry
    ///
    /// The group holds copies of both entries and is appended to the unit in
    /// view (the first unit when viewing everything). The originals are then
    /// removed from whichever units own them. Returns `None` when either
    /// entry is missing, both ids are the same, or either is already a group.
    pub fn merge_entries(&mut self, view: &View, first_id: &str, second_id: &str) -> Result<Option<Entry>> {
        if first_id == second_id {
            return Ok(None);
        }
        let (first, second) = match (self.doc.find_entry(first_id), self.doc.find_entry(second_id)) {
            (Some((_, a)), Some((_, b))) if !a.is_group() && !b.is_group() => (a.clone(), b.clone()),
            _ => return Ok(None),
        };
        let target_id = match view {
            View::General => match self.doc.units.first() {
                Some(unit) => unit.id.clone(),
                None => return Ok(None),
            },
            View::Unit(id) if self.doc.unit(id).is_some() => id.clone(),
            View::Unit(_) => return Ok(None),
        };

        let group = Entry::group(self.next_id(ENTRY_PREFIX), &first, &second);

        let snapshot = self.doc.clone();
        for id in [first_id, second_id] {
            if let Some(owner) = self.doc.owner_of(id) {
                if let Some(unit) = self.doc.unit_mut(&owner) {
                    unit.entries.retain(|e| e.id != id);
                }
            }
        }
        match self.doc.unit_mut(&target_id) {
            Some(unit) => unit.entries.push(group.clone()),
            None => {
                self.doc = snapshot;
                return Ok(None);
            }
        }
        self.commit(snapshot, "merge_entries")?;

        info!(group = %group.id, first = first_id, second = second_id, "Entries merged");
        Ok(Some(group))
    }

    /// Break a group entry back into two standalone entries
    ///
    /// The restored entries get fresh ids and are appended to `unit_id`,
    /// wherever the group itself lived; the group is deleted. Returns `None`
    /// when the unit or group is missing or the entry isn't a group.
    pub fn split_group(&mut self, unit_id: &str, group_id: &str) -> Result<Option<[Entry; 2]>> {
        if self.doc.unit(unit_id).is_none() {
            return Ok(None);
        }
        let (owner_id, children) = match self.doc.find_entry(group_id) {
            Some((owner, group)) => match group.children() {
                Some(children) => (owner.id.clone(), children.clone()),
                None => return Ok(None),
            },
            None => return Ok(None),
        };

        let [first_child, second_child] = children;
        let restored = [
            Entry::restored_from(self.next_id(ENTRY_PREFIX), &first_child),
            Entry::restored_from(self.next_id(ENTRY_PREFIX), &second_child),
        ];

        let snapshot = self.doc.clone();
        if let Some(owner) = self.doc.unit_mut(&owner_id) {
            owner.entries.retain(|e| e.id != group_id);
        }
        match self.doc.unit_mut(unit_id) {
            Some(unit) => unit.entries.extend(restored.iter().cloned()),
            None => {
                self.doc = snapshot;
                return Ok(None);
            }
        }
        self.commit(snapshot, "split_group")?;

        info!(group = group_id, unit = unit_id, "Group split");
        Ok(Some(restored))
    }

    // ==================== Import / Export ====================

    /// The whole document as pretty-printed JSON
    pub fn export_to_json(&self) -> Result<String> {
        self.doc.to_json_pretty().context("Failed to export library")
    }

    /// Replace the whole document with one parsed from JSON
    ///
    /// On failure the current document is left untouched and the error
    /// carries a [`crate::DocumentError`] describing what was wrong.
    pub fn import_from_json(&mut self, text: &str) -> Result<()> {
        let doc = match Document::from_json(text) {
            Ok(doc) => doc,
            Err(err) => {
                warn!(error = %err, "Import rejected");
                return Err(anyhow::Error::new(err).context("Invalid library format"));
            }
        };

        let snapshot = std::mem::replace(&mut self.doc, doc);
        self.commit(snapshot, "import")?;

        info!(
            units = self.doc.units.len(),
            entries = self.doc.entry_count(),
            "Library imported"
        );
        Ok(())
    }

    // ==================== Internals ====================

    fn next_id(&mut self, prefix: &str) -> String {
        let doc = &self.doc;
        self.ids.next(prefix, |id| doc.contains_id(id))
    }

    /// Persist the current document, restoring `snapshot` if that fails
    fn commit(&mut self, snapshot: Document, op: &str) -> Result<()> {
        if let Err(err) = self.persistence.save(&mut self.doc) {
            self.doc = snapshot;
            return Err(err.context(format!("Failed to persist {}", op)));
        }
        debug!(op, "Library persisted");
        Ok(())
    }
}
