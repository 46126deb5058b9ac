//! Entry command handlers
//!
//! Entries are formulas (LaTeX) or graphs (Desmos) kept inside a unit.

use anyhow::{anyhow, bail, Context, Result};

use formulary_core::present::present_linked;
use formulary_core::{desmos_graph_id, present, Entry, EntryKind, EntryPatch, NewEntry, Store};

use super::{parse_position, resolve_entry, resolve_unit, resolve_view, validate_name};
use crate::editor::{confirm, edit_latex};
use crate::output::{Located, Output};

/// What the new entry holds
pub enum Content {
    Latex(String),
    Desmos(String),
    /// Write LaTeX in the editor
    Editor,
}

/// List entries, either in one unit or everywhere
pub fn list(store: &Store, unit: Option<String>, output: &Output) -> Result<()> {
    let view = resolve_view(store, unit.as_deref())?;
    let entries = store
        .entries_in_view(&view)
        .ok_or_else(|| anyhow!("Unit not found: {}", view.id()))?;

    output.print_entries(&locate(store, entries))
}

/// Show one entry and how it is displayed
pub fn show(store: &Store, id: String, output: &Output) -> Result<()> {
    let entry_id = resolve_entry(store, &id)?;
    let (unit, entry) = store
        .find_entry(&entry_id)
        .ok_or_else(|| anyhow!("Entry not found: {}", id))?;

    let presentation = match store.linked_partner(&unit.id, entry) {
        Some(partner) => present_linked(entry, partner),
        None => present(entry),
    };

    output.print_entry(&Located { unit, entry }, &presentation)
}

/// Add a formula or graph to a unit
pub fn add(
    store: &mut Store,
    unit: String,
    title: Option<String>,
    content: Content,
    output: &Output,
) -> Result<()> {
    let unit_id = resolve_unit(store, &unit)?;
    let title = title.unwrap_or_default();

    let draft = match content {
        Content::Latex(source) => NewEntry::latex(title, source),
        Content::Desmos(input) => {
            let graph = desmos_graph_id(&input);
            if graph.is_empty() {
                bail!("Desmos graph ID cannot be empty");
            }
            NewEntry::desmos(title, graph)
        }
        Content::Editor => {
            let unit_name = store
                .get_unit(&unit_id)
                .map(|u| u.name.clone())
                .unwrap_or_default();
            let hints = [
                format!("New formula in: {}", unit_name),
                "Write LaTeX below. Lines starting with %% are ignored.".to_string(),
            ];
            let source = edit_latex(&hints, "")?;
            if source.is_empty() {
                bail!("Formula cannot be empty");
            }
            NewEntry::latex(title, source)
        }
    };

    let entry = store
        .add_entry(&unit_id, draft)
        .context("Failed to add entry")?
        .ok_or_else(|| anyhow!("Unit not found: {}", unit))?;

    output.created(
        &entry.id,
        &format!("Added {} entry: {} ({})", entry.kind, entry.title, entry.id),
    );
    Ok(())
}

/// Change an entry's title or content
///
/// With no flags, a LaTeX entry opens in the editor. `--desmos ""` turns a
/// graph back into a formula.
pub fn edit(
    store: &mut Store,
    unit: String,
    id: String,
    title: Option<String>,
    latex: Option<String>,
    desmos: Option<String>,
    output: &Output,
) -> Result<()> {
    let unit_id = resolve_unit(store, &unit)?;
    let entry_id = resolve_entry(store, &id)?;
    let entry = entry_in_unit(store, &unit_id, &entry_id)?.clone();

    if entry.is_group() && (latex.is_some() || desmos.is_some()) {
        bail!("Group entries can only be renamed. Split the group to edit its parts.");
    }

    let mut patch = EntryPatch::new();
    if let Some(title) = title {
        patch = patch.title(validate_name(&title, "Entry")?);
    }
    // Type and content always change together
    let graph = desmos.map(|input| desmos_graph_id(&input));
    match (latex, graph) {
        (Some(_), Some(graph)) if !graph.is_empty() => {
            bail!("An entry can't hold both --latex and --desmos content");
        }
        (Some(source), _) => {
            patch = patch
                .kind(EntryKind::Latex)
                .raw(source)
                .desmos_id(None);
        }
        (None, Some(graph)) if graph.is_empty() => {
            patch = patch.kind(EntryKind::Latex).desmos_id(None);
        }
        (None, Some(graph)) => {
            patch = patch
                .kind(EntryKind::Desmos)
                .raw("")
                .desmos_id(Some(graph));
        }
        (None, None) => {}
    }

    if patch.is_empty() {
        if entry.kind != EntryKind::Latex {
            bail!("Nothing to change. Use --title, --latex or --desmos.");
        }
        let hints = [format!("Editing: {}", entry.title)];
        let source = edit_latex(&hints, &entry.raw)?;
        if source == entry.raw {
            output.message("No changes.");
            return Ok(());
        }
        patch = patch.raw(source);
    }

    if !store
        .update_entry(&unit_id, &entry_id, &patch)
        .context("Failed to update entry")?
    {
        bail!("Could not update entry: {}", entry_id);
    }

    output.success(&format!("Updated entry: {}", entry_id));
    Ok(())
}

/// Delete one or more entries from a unit
pub fn delete(
    store: &mut Store,
    unit: String,
    ids: Vec<String>,
    yes: bool,
    output: &Output,
) -> Result<()> {
    let unit_id = resolve_unit(store, &unit)?;

    let mut targets = Vec::with_capacity(ids.len());
    for id in &ids {
        let entry_id = resolve_entry(store, id)?;
        let entry = entry_in_unit(store, &unit_id, &entry_id)?;
        targets.push((entry.id.clone(), entry.title.clone()));
    }

    if output.should_prompt() && !yes {
        for (id, title) in &targets {
            println!("Delete entry: {} - {}", id, title);
        }
        if !confirm("Are you sure?")? {
            println!("Cancelled.");
            return Ok(());
        }
    }

    let target_ids: Vec<&str> = targets.iter().map(|(id, _)| id.as_str()).collect();
    let removed = store
        .delete_entries(&unit_id, &target_ids)
        .context("Failed to delete entries")?;

    output.success(&format!(
        "Deleted {} entr{}",
        removed,
        if removed == 1 { "y" } else { "ies" }
    ));
    Ok(())
}

/// Move an entry to the end of another unit
pub fn move_to(
    store: &mut Store,
    id: String,
    from: String,
    to: String,
    output: &Output,
) -> Result<()> {
    let entry_id = resolve_entry(store, &id)?;
    let source = resolve_unit(store, &from)?;
    let target = resolve_unit(store, &to)?;

    if !store
        .move_entry_to_unit(&entry_id, &source, &target)
        .context("Failed to move entry")?
    {
        bail!("Entry {} is not in unit {}", entry_id, source);
    }

    output.success(&format!("Moved entry {} to unit {}", entry_id, target));
    Ok(())
}

/// Change an entry's position within its unit
pub fn reorder(
    store: &mut Store,
    unit: String,
    from: usize,
    to: usize,
    output: &Output,
) -> Result<()> {
    let unit_id = resolve_unit(store, &unit)?;
    let count = store.get_unit(&unit_id).map_or(0, |u| u.entries.len());

    if !store
        .reorder_entries(&unit_id, parse_position(from)?, parse_position(to)?)
        .context("Failed to reorder entries")?
    {
        bail!("Positions must be between 1 and {}", count);
    }

    output.success(&format!("Moved entry from position {} to {}", from, to));
    Ok(())
}

/// Search entry titles
pub fn search(store: &Store, query: String, unit: Option<String>, output: &Output) -> Result<()> {
    let view = resolve_view(store, unit.as_deref())?;
    let hits = store.search(&view, &query);
    output.print_entries(&locate(store, hits))
}

fn entry_in_unit<'a>(store: &'a Store, unit_id: &str, entry_id: &str) -> Result<&'a Entry> {
    store
        .get_unit(unit_id)
        .and_then(|u| u.entry(entry_id))
        .ok_or_else(|| anyhow!("Entry {} is not in unit {}", entry_id, unit_id))
}

/// Pair entries with the units holding them
fn locate<'a>(store: &'a Store, entries: Vec<&'a Entry>) -> Vec<Located<'a>> {
    entries
        .into_iter()
        .filter_map(|e| store.find_entry(&e.id))
        .map(|(unit, entry)| Located { unit, entry })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::open_store;
    use crate::output::OutputFormat;
    use formulary_core::models::DEFAULT_UNIT_ID;
    use formulary_core::Presentation;
    use tempfile::TempDir;

    fn quiet() -> Output {
        Output::new(OutputFormat::Quiet)
    }

    #[test]
    fn test_add_latex_and_desmos() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = open_store(&temp_dir);

        add(
            &mut store,
            "General".to_string(),
            Some("Area".to_string()),
            Content::Latex("\\pi r^2".to_string()),
            &quiet(),
        )
        .unwrap();
        add(
            &mut store,
            "General".to_string(),
            None,
            Content::Desmos(" abc123 ".to_string()),
            &quiet(),
        )
        .unwrap();

        let entries = &store.get_units()[0].entries;
        assert_eq!(entries[0].title, "Area");
        assert_eq!(entries[1].kind, EntryKind::Desmos);
        assert_eq!(entries[1].title, "Untitled");
        assert_eq!(entries[1].desmos_id.as_deref(), Some("abc123"));

        assert!(add(
            &mut store,
            "General".to_string(),
            None,
            Content::Desmos("  ".to_string()),
            &quiet()
        )
        .is_err());
    }

    #[test]
    fn test_edit_switches_kind() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = open_store(&temp_dir);
        let entry = store
            .add_entry(DEFAULT_UNIT_ID, NewEntry::desmos("Graph", "abc"))
            .unwrap()
            .unwrap();

        edit(
            &mut store,
            DEFAULT_UNIT_ID.to_string(),
            entry.id.clone(),
            None,
            Some("x^2".to_string()),
            Some(String::new()),
            &quiet(),
        )
        .unwrap();

        let (_, updated) = store.find_entry(&entry.id).unwrap();
        assert_eq!(updated.kind, EntryKind::Latex);
        assert_eq!(updated.raw, "x^2");
        assert!(updated.desmos_id.is_none());
        assert_eq!(updated.title, "Graph");
    }

    #[test]
    fn test_edit_latex_turns_graph_into_formula() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = open_store(&temp_dir);
        let entry = store
            .add_entry(DEFAULT_UNIT_ID, NewEntry::desmos("Graph", "abc"))
            .unwrap()
            .unwrap();

        edit(
            &mut store,
            DEFAULT_UNIT_ID.to_string(),
            entry.id.clone(),
            None,
            Some("e^{i\\pi}".to_string()),
            None,
            &quiet(),
        )
        .unwrap();

        let (_, updated) = store.find_entry(&entry.id).unwrap();
        assert_eq!(updated.kind, EntryKind::Latex);
        assert_eq!(updated.raw, "e^{i\\pi}");
        assert!(updated.desmos_id.is_none());
        assert!(matches!(present(updated), Presentation::Math { .. }));
    }

    #[test]
    fn test_edit_desmos_clears_latex_source() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = open_store(&temp_dir);
        let entry = store
            .add_entry(DEFAULT_UNIT_ID, NewEntry::latex("Formula", "x^2"))
            .unwrap()
            .unwrap();

        edit(
            &mut store,
            DEFAULT_UNIT_ID.to_string(),
            entry.id.clone(),
            None,
            None,
            Some("https://www.desmos.com/calculator/q1w2e3".to_string()),
            &quiet(),
        )
        .unwrap();

        let (_, updated) = store.find_entry(&entry.id).unwrap();
        assert_eq!(updated.kind, EntryKind::Desmos);
        assert_eq!(updated.raw, "");
        assert_eq!(updated.desmos_id.as_deref(), Some("q1w2e3"));
    }

    #[test]
    fn test_edit_rejects_both_contents() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = open_store(&temp_dir);
        let entry = store
            .add_entry(DEFAULT_UNIT_ID, NewEntry::latex("Formula", "x^2"))
            .unwrap()
            .unwrap();

        let result = edit(
            &mut store,
            DEFAULT_UNIT_ID.to_string(),
            entry.id.clone(),
            None,
            Some("y".to_string()),
            Some("abc".to_string()),
            &quiet(),
        );
        assert!(result.is_err());
        assert_eq!(store.find_entry(&entry.id).unwrap().1.raw, "x^2");
    }

    #[test]
    fn test_edit_requires_matching_unit() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = open_store(&temp_dir);
        let other = store.create_unit("Other").unwrap();
        let entry = store
            .add_entry(DEFAULT_UNIT_ID, NewEntry::latex("A", "a"))
            .unwrap()
            .unwrap();

        let result = edit(
            &mut store,
            other.id,
            entry.id,
            Some("B".to_string()),
            None,
            None,
            &quiet(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_delete_many() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = open_store(&temp_dir);
        let a = store.add_entry(DEFAULT_UNIT_ID, NewEntry::latex("A", "a")).unwrap().unwrap();
        let b = store.add_entry(DEFAULT_UNIT_ID, NewEntry::latex("B", "b")).unwrap().unwrap();
        store.add_entry(DEFAULT_UNIT_ID, NewEntry::latex("C", "c")).unwrap();

        delete(
            &mut store,
            DEFAULT_UNIT_ID.to_string(),
            vec![a.id, b.id],
            false,
            &quiet(),
        )
        .unwrap();
        assert_eq!(store.entry_count(), 1);

        assert!(delete(
            &mut store,
            DEFAULT_UNIT_ID.to_string(),
            vec!["f-0".to_string()],
            true,
            &quiet()
        )
        .is_err());
    }

    #[test]
    fn test_move_and_reorder() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = open_store(&temp_dir);
        let other = store.create_unit("Other").unwrap();
        let a = store.add_entry(DEFAULT_UNIT_ID, NewEntry::latex("A", "a")).unwrap().unwrap();
        store.add_entry(&other.id, NewEntry::latex("B", "b")).unwrap();

        move_to(
            &mut store,
            a.id.clone(),
            "General".to_string(),
            "Other".to_string(),
            &quiet(),
        )
        .unwrap();
        assert_eq!(store.get_unit(&other.id).unwrap().entries[1].id, a.id);

        reorder(&mut store, "Other".to_string(), 2, 1, &quiet()).unwrap();
        assert_eq!(store.get_unit(&other.id).unwrap().entries[0].id, a.id);

        assert!(reorder(&mut store, "Other".to_string(), 1, 5, &quiet()).is_err());
        assert!(move_to(
            &mut store,
            a.id,
            "General".to_string(),
            "Other".to_string(),
            &quiet()
        )
        .is_err());
    }

    #[test]
    fn test_locate_pairs_units() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = open_store(&temp_dir);
        let other = store.create_unit("Other").unwrap();
        store.add_entry(DEFAULT_UNIT_ID, NewEntry::latex("A", "a")).unwrap();
        store.add_entry(&other.id, NewEntry::latex("B", "b")).unwrap();

        let located = locate(&store, store.get_all_entries());
        let units: Vec<_> = located.iter().map(|l| l.unit.name.as_str()).collect();
        assert_eq!(units, vec!["General", "Other"]);
    }
}
