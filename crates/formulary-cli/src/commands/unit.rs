//! Unit command handlers

use anyhow::{bail, Context, Result};

use formulary_core::Store;

use super::{parse_position, resolve_unit, validate_name};
use crate::editor::confirm;
use crate::output::Output;

/// List all units in order
pub fn list(store: &Store, output: &Output) -> Result<()> {
    output.print_units(store.get_units())
}

/// Create a new, empty unit
pub fn create(store: &mut Store, name: String, output: &Output) -> Result<()> {
    let name = validate_name(&name, "Unit")?;
    let unit = store.create_unit(&name).context("Failed to create unit")?;

    output.created(&unit.id, &format!("Created unit: {} ({})", unit.name, unit.id));
    Ok(())
}

/// Rename a unit
pub fn rename(store: &mut Store, id: String, name: String, output: &Output) -> Result<()> {
    let name = validate_name(&name, "Unit")?;
    let unit_id = resolve_unit(store, &id)?;

    if !store
        .rename_unit(&unit_id, &name)
        .context("Failed to rename unit")?
    {
        bail!("Unit not found: {}", id);
    }

    output.success(&format!("Renamed unit {} to {}", unit_id, name));
    Ok(())
}

/// Delete a unit and everything in it
pub fn delete(store: &mut Store, id: String, yes: bool, output: &Output) -> Result<()> {
    let unit_id = resolve_unit(store, &id)?;
    let Some(unit) = store.get_unit(&unit_id) else {
        bail!("Unit not found: {}", id);
    };

    if output.should_prompt() && !yes {
        println!(
            "Delete unit: {} - {} ({} entr{})",
            unit.id,
            unit.name,
            unit.entries.len(),
            if unit.entries.len() == 1 { "y" } else { "ies" }
        );
        if !confirm("Are you sure?")? {
            println!("Cancelled.");
            return Ok(());
        }
    }

    let name = unit.name.clone();
    store
        .delete_unit(&unit_id)
        .context("Failed to delete unit")?;

    output.success(&format!("Deleted unit: {}", name));
    Ok(())
}

/// Move a unit to another position
pub fn reorder(store: &mut Store, from: usize, to: usize, output: &Output) -> Result<()> {
    let count = store.unit_count();
    let moved = store
        .reorder_units(parse_position(from)?, parse_position(to)?)
        .context("Failed to reorder units")?;

    if !moved {
        bail!("Positions must be between 1 and {}", count);
    }

    output.success(&format!("Moved unit from position {} to {}", from, to));
    Ok(())
}
