//! Status command handler

use anyhow::Result;

use formulary_core::models::timestamp;
use formulary_core::{EntryKind, Store};

use crate::output::{Output, OutputFormat};

/// Entry totals by type
#[derive(Debug, Default, PartialEq, Eq)]
struct Counts {
    latex: usize,
    desmos: usize,
    groups: usize,
}

impl Counts {
    fn of(store: &Store) -> Self {
        store
            .get_all_entries()
            .into_iter()
            .fold(Self::default(), |mut counts, entry| {
                match entry.kind {
                    EntryKind::Latex => counts.latex += 1,
                    EntryKind::Desmos => counts.desmos += 1,
                    EntryKind::Group => counts.groups += 1,
                }
                counts
            })
    }
}

/// Show status information
pub fn show(store: &Store, output: &Output) -> Result<()> {
    let stats = store.storage_stats();
    let config = store.config();
    let counts = Counts::of(store);
    let last_updated = timestamp::format(&store.document().last_updated);

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "version": store.document().version,
                    "last_updated": last_updated,
                    "storage": {
                        "library": config.library_path(),
                        "library_exists": stats.library_exists,
                        "library_size": stats.library_size,
                        "backup_size": stats.backup_size,
                        "total_size": stats.total_size()
                    },
                    "counts": {
                        "units": store.unit_count(),
                        "entries": store.entry_count(),
                        "latex": counts.latex,
                        "desmos": counts.desmos,
                        "groups": counts.groups
                    }
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", config.library_path().display());
        }
        OutputFormat::Human => {
            println!("Formulary Status");
            println!("================");
            println!();
            println!("Library:");
            println!("  Location:     {}", config.library_path().display());
            println!("  Size:         {}", stats.total_size_human());
            println!("  Last updated: {}", last_updated);
            if stats.backup_size > 0 {
                println!("  Corrupt copy: {}", config.backup_path().display());
            }
            println!();
            println!("Contents:");
            println!("  Units:    {}", store.unit_count());
            println!("  Formulas: {}", counts.latex);
            println!("  Graphs:   {}", counts.desmos);
            println!("  Groups:   {}", counts.groups);
        }
    }

    Ok(())
}
