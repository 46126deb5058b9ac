//! Storage layer
//!
//! The whole library is one JSON document, read once at startup and
//! rewritten atomically after every mutation.

pub mod error;
pub mod persistence;

pub use error::{StorageError, StorageResult};
pub use persistence::{JsonPersistence, StorageStats};
