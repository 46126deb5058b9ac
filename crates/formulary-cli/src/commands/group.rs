//! Group command handlers
//!
//! A group shows two entries side by side. Merging copies both into a new
//! group entry; splitting turns the copies back into standalone entries.

use anyhow::{anyhow, bail, Context, Result};

use formulary_core::Store;

use super::{resolve_entry, resolve_unit, resolve_view};
use crate::output::Output;

/// Merge two entries into a group
pub fn merge(
    store: &mut Store,
    first: String,
    second: String,
    unit: Option<String>,
    output: &Output,
) -> Result<()> {
    let view = resolve_view(store, unit.as_deref())?;
    let first_id = resolve_entry(store, &first)?;
    let second_id = resolve_entry(store, &second)?;

    if first_id == second_id {
        bail!("Cannot merge an entry with itself");
    }
    for id in [&first_id, &second_id] {
        if let Some((_, entry)) = store.find_entry(id) {
            if entry.is_group() {
                bail!("{} is already a group. Split it first.", id);
            }
        }
    }

    let group = store
        .merge_entries(&view, &first_id, &second_id)
        .context("Failed to merge entries")?
        .ok_or_else(|| anyhow!("Could not merge {} and {}", first_id, second_id))?;

    output.created(&group.id, &format!("Created group: {} ({})", group.title, group.id));
    Ok(())
}

/// Split a group back into its two entries
pub fn split(store: &mut Store, group: String, unit: String, output: &Output) -> Result<()> {
    let group_id = resolve_entry(store, &group)?;
    let unit_id = resolve_unit(store, &unit)?;

    let restored = store
        .split_group(&unit_id, &group_id)
        .context("Failed to split group")?
        .ok_or_else(|| anyhow!("{} is not a group", group_id))?;

    if output.is_quiet() {
        for entry in &restored {
            println!("{}", entry.id);
        }
    } else {
        output.success(&format!(
            "Split group into {} and {}",
            restored[0].id, restored[1].id
        ));
    }
    Ok(())
}
