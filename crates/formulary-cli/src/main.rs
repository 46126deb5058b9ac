//! Formulary CLI
//!
//! Command-line interface for Formulary - a library of LaTeX formulas and
//! Desmos graphs organized into units.

use std::fs::OpenOptions;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use formulary_core::{Config, StorageError, Store};

mod commands;
mod editor;
mod output;

use commands::entry::Content;
use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "formulary")]
#[command(about = "Formulary - LaTeX formulas and Desmos graphs, organized by unit")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Use this config file instead of the default
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage units
    Unit {
        #[command(subcommand)]
        command: Option<UnitCommands>,
    },
    /// Manage formulas and graphs
    Entry {
        #[command(subcommand)]
        command: EntryCommands,
    },
    /// Combine entries into groups or split them apart
    Group {
        #[command(subcommand)]
        command: GroupCommands,
    },
    /// Write the whole library as JSON
    Export {
        /// File to write (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Replace the library with an exported JSON file
    Import {
        /// File to read
        file: PathBuf,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
    /// Show library location, size and counts
    Status,
}

#[derive(Subcommand)]
enum UnitCommands {
    /// List units
    #[command(alias = "ls")]
    List,
    /// Create a unit
    #[command(alias = "add")]
    Create {
        /// Unit name
        name: String,
    },
    /// Rename a unit
    Rename {
        /// Unit ID or name
        id: String,
        /// New name
        name: String,
    },
    /// Delete a unit and all of its entries
    #[command(alias = "rm")]
    Delete {
        /// Unit ID or name
        id: String,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Move a unit to another position
    Move {
        /// Current position (from 1)
        from: usize,
        /// New position (from 1)
        to: usize,
    },
}

#[derive(Subcommand)]
enum EntryCommands {
    /// List entries
    #[command(alias = "ls")]
    List {
        /// Only entries in this unit (every unit if omitted)
        #[arg(short, long)]
        unit: Option<String>,
    },
    /// Show an entry and how it is displayed
    Show {
        /// Entry ID (full or prefix)
        id: String,
    },
    /// Add a formula or graph (opens editor if no content is given)
    #[command(alias = "create")]
    Add {
        /// Unit ID or name
        unit: String,
        /// Entry title
        #[arg(short = 'T', long)]
        title: Option<String>,
        /// LaTeX source
        #[arg(short, long, conflicts_with = "desmos")]
        latex: Option<String>,
        /// Desmos graph ID or calculator URL
        #[arg(short, long)]
        desmos: Option<String>,
    },
    /// Edit an entry (opens editor if no change is given)
    Edit {
        /// Unit ID or name
        unit: String,
        /// Entry ID (full or prefix)
        id: String,
        /// New title
        #[arg(short = 'T', long)]
        title: Option<String>,
        /// New LaTeX source
        #[arg(short, long)]
        latex: Option<String>,
        /// New Desmos graph (empty to make it a formula again)
        #[arg(short, long)]
        desmos: Option<String>,
    },
    /// Delete entries from a unit
    #[command(alias = "rm")]
    Delete {
        /// Unit ID or name
        unit: String,
        /// Entry IDs (full or prefix)
        #[arg(required = true)]
        ids: Vec<String>,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Move an entry to another unit
    Move {
        /// Entry ID (full or prefix)
        id: String,
        /// Unit it is in now
        from: String,
        /// Unit to move it to
        to: String,
    },
    /// Change an entry's position within its unit
    Reorder {
        /// Unit ID or name
        unit: String,
        /// Current position (from 1)
        from: usize,
        /// New position (from 1)
        to: usize,
    },
    /// Search entry titles
    Search {
        /// Text to look for (case-insensitive)
        query: String,
        /// Only search this unit (every unit if omitted)
        #[arg(short, long)]
        unit: Option<String>,
    },
}

#[derive(Subcommand)]
enum GroupCommands {
    /// Merge two entries into a group
    Merge {
        /// First entry ID
        first: String,
        /// Second entry ID
        second: String,
        /// Unit that receives the group (first unit if omitted)
        #[arg(short, long)]
        unit: Option<String>,
    },
    /// Split a group back into two entries
    Split {
        /// Group entry ID
        group: String,
        /// Unit that receives the restored entries
        #[arg(short, long)]
        unit: String,
    },
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (data_dir, log_level, log_file)
        key: String,
        /// Configuration value
        value: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));

    // Config commands don't need the store
    if let Commands::Config { command } = &cli.command {
        return handle_config_command(command.clone(), cli.config.as_ref(), &output);
    }

    let config = Config::load_with_cli_override(cli.config.as_ref())
        .context("Failed to load configuration")?;
    init_logging(&config);

    let result = run(cli.command, config, &output);
    if let Err(ref err) = result {
        for hint in storage_hints(err) {
            eprintln!("Hint: {}", hint);
        }
    }
    result
}

fn run(command: Commands, config: Config, output: &Output) -> Result<()> {
    let mut store = Store::open_with_config(config)?;
    debug!(
        units = store.unit_count(),
        entries = store.entry_count(),
        "Store opened"
    );

    match command {
        Commands::Unit { command } => handle_unit_command(command, &mut store, output),
        Commands::Entry { command } => handle_entry_command(command, &mut store, output),
        Commands::Group { command } => handle_group_command(command, &mut store, output),
        Commands::Export { output: path } => commands::transfer::export(&store, path, output),
        Commands::Import { file, yes } => commands::transfer::import(&mut store, file, yes, output),
        Commands::Config { .. } => unreachable!(), // Handled in main
        Commands::Status => commands::status::show(&store, output),
    }
}

/// Advice for a storage failure anywhere in the error chain
fn storage_hints(err: &anyhow::Error) -> Vec<&'static str> {
    let storage = match err.chain().find_map(|cause| cause.downcast_ref::<StorageError>()) {
        Some(storage) => storage,
        None => return Vec::new(),
    };

    let mut hints: Vec<_> = storage.recovery_suggestion().into_iter().collect();
    // Failed writes roll back, so the file on disk is still the last good state
    if storage.is_recoverable() {
        hints.push("The saved library was not changed. Run the command again once fixed.");
    }
    hints
}

fn handle_unit_command(
    command: Option<UnitCommands>,
    store: &mut Store,
    output: &Output,
) -> Result<()> {
    match command {
        Some(UnitCommands::List) | None => commands::unit::list(store, output),
        Some(UnitCommands::Create { name }) => commands::unit::create(store, name, output),
        Some(UnitCommands::Rename { id, name }) => commands::unit::rename(store, id, name, output),
        Some(UnitCommands::Delete { id, yes }) => commands::unit::delete(store, id, yes, output),
        Some(UnitCommands::Move { from, to }) => commands::unit::reorder(store, from, to, output),
    }
}

fn handle_entry_command(command: EntryCommands, store: &mut Store, output: &Output) -> Result<()> {
    match command {
        EntryCommands::List { unit } => commands::entry::list(store, unit, output),
        EntryCommands::Show { id } => commands::entry::show(store, id, output),
        EntryCommands::Add {
            unit,
            title,
            latex,
            desmos,
        } => {
            let content = match (latex, desmos) {
                (_, Some(graph)) => Content::Desmos(graph),
                (Some(source), None) => Content::Latex(source),
                (None, None) => Content::Editor,
            };
            commands::entry::add(store, unit, title, content, output)
        }
        EntryCommands::Edit {
            unit,
            id,
            title,
            latex,
            desmos,
        } => commands::entry::edit(store, unit, id, title, latex, desmos, output),
        EntryCommands::Delete { unit, ids, yes } => {
            commands::entry::delete(store, unit, ids, yes, output)
        }
        EntryCommands::Move { id, from, to } => {
            commands::entry::move_to(store, id, from, to, output)
        }
        EntryCommands::Reorder { unit, from, to } => {
            commands::entry::reorder(store, unit, from, to, output)
        }
        EntryCommands::Search { query, unit } => {
            commands::entry::search(store, query, unit, output)
        }
    }
}

fn handle_group_command(command: GroupCommands, store: &mut Store, output: &Output) -> Result<()> {
    match command {
        GroupCommands::Merge {
            first,
            second,
            unit,
        } => commands::group::merge(store, first, second, unit, output),
        GroupCommands::Split { group, unit } => {
            commands::group::split(store, group, unit, output)
        }
    }
}

fn handle_config_command(
    command: Option<ConfigCommands>,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    match command {
        Some(ConfigCommands::Show) | None => commands::config::show(config_path, output),
        Some(ConfigCommands::Set { key, value }) => {
            commands::config::set(key, value, config_path, output)
        }
    }
}

/// Initialize logging from the configured level
///
/// Logs go to stderr, or are appended to `log_file` when one is configured.
/// A log file that can't be opened falls back to stderr with a warning.
fn init_logging(config: &Config) {
    let level = &config.log_level;
    let filter = || EnvFilter::new(format!("formulary_core={},formulary_cli={}", level, level));

    if let Some(ref path) = config.log_file {
        match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => {
                let _ = tracing_subscriber::fmt()
                    .with_env_filter(filter())
                    .with_target(false)
                    .with_ansi(false)
                    .with_writer(file)
                    .try_init();
                return;
            }
            Err(e) => {
                eprintln!("Warning: Could not open log file {:?}: {}", path, e);
            }
        }
    }

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter())
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();

    if config.log_file.is_some() {
        warn!("Logging to stderr instead of the configured log file");
    }
}
