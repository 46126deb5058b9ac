//! Export and import handlers

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};

use formulary_core::Store;

use crate::editor::confirm;
use crate::output::Output;

/// Write the library as pretty JSON to a file, or to stdout
pub fn export(store: &Store, path: Option<PathBuf>, output: &Output) -> Result<()> {
    let json = store.export_to_json()?;

    match path {
        Some(path) => {
            fs::write(&path, &json)
                .with_context(|| format!("Failed to write export to {:?}", path))?;
            output.success(&format!(
                "Exported {} unit(s) and {} entries to {}",
                store.unit_count(),
                store.entry_count(),
                path.display()
            ));
        }
        None => println!("{}", json),
    }

    Ok(())
}

/// Replace the library with the contents of an exported file
pub fn import(store: &mut Store, path: PathBuf, yes: bool, output: &Output) -> Result<()> {
    let text = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read import file {:?}", path))?;

    if output.should_prompt() && !yes {
        println!(
            "Importing replaces the current library ({} unit(s), {} entries).",
            store.unit_count(),
            store.entry_count()
        );
        if !confirm("Are you sure?")? {
            println!("Cancelled.");
            return Ok(());
        }
    }

    store
        .import_from_json(&text)
        .with_context(|| format!("Failed to import {}", path.display()))?;

    output.success(&format!(
        "Imported {} unit(s) and {} entries",
        store.unit_count(),
        store.entry_count()
    ));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::open_store;
    use crate::output::OutputFormat;
    use formulary_core::models::DEFAULT_UNIT_ID;
    use formulary_core::{DocumentError, NewEntry};
    use tempfile::TempDir;

    fn quiet() -> Output {
        Output::new(OutputFormat::Quiet)
    }

    #[test]
    fn test_export_then_import_into_another_library() {
        let source_dir = TempDir::new().unwrap();
        let mut source = open_store(&source_dir);
        source.create_unit("Algebra").unwrap();
        source
            .add_entry(DEFAULT_UNIT_ID, NewEntry::latex("A", "a"))
            .unwrap();

        let file = source_dir.path().join("export.json");
        export(&source, Some(file.clone()), &quiet()).unwrap();

        let target_dir = TempDir::new().unwrap();
        let mut target = open_store(&target_dir);
        import(&mut target, file, false, &quiet()).unwrap();

        assert_eq!(target.document().units, source.document().units);
    }

    #[test]
    fn test_import_rejects_bad_file() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = open_store(&temp_dir);
        let file = temp_dir.path().join("bad.json");
        fs::write(&file, r#"{"foo":1}"#).unwrap();

        let err = import(&mut store, file, true, &quiet()).unwrap_err();
        assert!(err.downcast_ref::<DocumentError>().is_some());
        assert_eq!(store.unit_count(), 1);

        let missing = temp_dir.path().join("missing.json");
        assert!(import(&mut store, missing, true, &quiet()).is_err());
    }
}
