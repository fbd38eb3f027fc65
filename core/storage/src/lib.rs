//! Persistent storage for the LogWayss vault.
//!
//! Entries live in a single SQLite database per vault, in write-ahead-log
//! mode. This crate knows nothing about keys: it stores ciphertext rows,
//! maintains the tag index, answers id queries, and produces and restores
//! whole-database snapshots.

pub mod options;
pub mod provider;
pub mod schema;
pub mod snapshot;
pub mod sqlite;

pub use options::{Durability, StoreOptions};
pub use provider::{EntryRow, PersistentStore};
pub use snapshot::{replace_with_staged, stage_import};
pub use sqlite::SqliteStore;
