//! Command handlers
//!
//! Shared helpers for turning what the user typed into store ids.

pub mod config;
pub mod entry;
pub mod group;
pub mod status;
pub mod transfer;
pub mod unit;

use anyhow::{anyhow, bail, Result};

use formulary_core::{Store, Unit, View};

/// Resolve a unit from its id, its name (ignoring case) or an id prefix
///
/// `general` therefore names the seeded "General" unit. The view over every
/// unit is reached by leaving `--unit` out, never by name.
pub fn resolve_unit(store: &Store, query: &str) -> Result<String> {
    let query = query.trim();
    if let Some(unit) = store.get_unit(query) {
        return Ok(unit.id.clone());
    }

    let lowered = query.to_lowercase();
    let by_name: Vec<&Unit> = store
        .get_units()
        .iter()
        .filter(|u| u.name.to_lowercase() == lowered)
        .collect();

    let matches = if by_name.is_empty() {
        store
            .get_units()
            .iter()
            .filter(|u| !query.is_empty() && u.id.starts_with(query))
            .collect()
    } else {
        by_name
    };

    match matches.len() {
        0 => bail!("No unit found matching: {}", query),
        1 => Ok(matches[0].id.clone()),
        _ => {
            eprintln!("Multiple units match '{}':", query);
            for unit in &matches {
                eprintln!("  {} - {}", unit.id, unit.name);
            }
            bail!("Ambiguous unit. Please use the unit ID.");
        }
    }
}

/// Resolve an optional `--unit` flag into a view; no flag means everything
pub fn resolve_view(store: &Store, unit: Option<&str>) -> Result<View> {
    match unit {
        None => Ok(View::General),
        Some(query) => Ok(View::Unit(resolve_unit(store, query)?)),
    }
}

/// Resolve an entry from its id or an id prefix
pub fn resolve_entry(store: &Store, query: &str) -> Result<String> {
    let query = query.trim();
    if let Some((_, entry)) = store.find_entry(query) {
        return Ok(entry.id.clone());
    }

    let matches: Vec<_> = store
        .get_all_entries()
        .into_iter()
        .filter(|e| !query.is_empty() && e.id.starts_with(query))
        .collect();

    match matches.len() {
        0 => bail!("No entry found matching: {}", query),
        1 => Ok(matches[0].id.clone()),
        _ => {
            eprintln!("Multiple entries match '{}':", query);
            for entry in &matches {
                eprintln!("  {} - {}", entry.id, entry.title);
            }
            bail!("Ambiguous ID. Please provide more characters.");
        }
    }
}

/// Convert a position as shown in listings (from 1) to an index
pub fn parse_position(position: usize) -> Result<usize> {
    position
        .checked_sub(1)
        .ok_or_else(|| anyhow!("Positions start at 1"))
}

/// Trimmed, non-empty name
pub fn validate_name(name: &str, what: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        bail!("{} name cannot be empty", what);
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
pub(crate) mod test_support {
    use formulary_core::{Config, Store};
    use tempfile::TempDir;

    pub fn open_store(temp_dir: &TempDir) -> Store {
        let config = Config {
            data_dir: temp_dir.path().to_path_buf(),
            ..Config::default()
        };
        Store::open_with_config(config).unwrap()
    }
}
