//! Formulary Core Library
//!
//! This crate provides the core functionality for Formulary, a local
//! library of LaTeX formulas and Desmos graphs organized into units.
//!
//! # Architecture
//!
//! - **JSON document**: The whole library is one document held in memory
//!   and written back atomically after every change.
//!
//! Queries are served directly from the in-memory document.
//!
//! # Quick Start
//!
//! ```text
//! let mut store = Store::open()?;
//!
//! // Add a formula
//! let unit = store.create_unit("Algebra")?;
//! store.add_entry(&unit.id, NewEntry::latex("Quadratic", "x^2+1"))?;
//!
//! // Query entries
//! let hits = store.search(&View::General, "quad");
//! ```
//!
//! # Modules
//!
//! - `store`: Unified storage interface (main entry point)
//! - `models`: Units, entries and the document that holds them
//! - `document`: Parsing, validation and lookups over the document
//! - `ids`: Time-based id generation
//! - `storage`: JSON file persistence
//! - `present`: How entries are displayed
//! - `layout`: Auto-scale geometry for rendered content
//! - `config`: Application configuration

pub mod config;
pub mod document;
pub mod ids;
pub mod layout;
pub mod models;
pub mod present;
pub mod storage;
pub mod store;

pub use config::Config;
pub use document::{move_item, DocumentError};
pub use layout::{fit_scale, ScaleOptions, ScaleOutcome, Size};
pub use models::{Composition, Document, Entry, EntryKind, EntryPatch, NewEntry, Unit, View};
pub use present::{desmos_graph_id, present, Presentation};
pub use storage::{JsonPersistence, StorageError, StorageStats};
pub use store::Store;
