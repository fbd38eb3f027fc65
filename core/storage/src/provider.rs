//! Persistent store trait definition.

use std::path::Path;

use logwayss_common::{Pagination, QueryFilter, Result};

/// One encrypted entry as it sits on disk.
///
/// Only the payload is secret; it is held as ciphertext with its IV and
/// authentication tag. Everything else is stored in the clear so it can be
/// indexed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryRow {
    pub id: String,
    pub entry_type: String,
    /// RFC3339, nanosecond precision.
    pub created_at: String,
    pub updated_at: String,
    pub schema_version: u32,
    pub source: Option<String>,
    pub device_id: Option<String>,
    /// JSON-encoded metadata object.
    pub meta_json: Option<String>,
    pub payload: Vec<u8>,
    pub iv: Vec<u8>,
    pub tag: Vec<u8>,
}

/// Durable, transactional storage of encrypted entry rows and their tags.
///
/// Implementations serialize their own transactions, so a store may be
/// shared between threads.
pub trait PersistentStore: Send + Sync {
    /// Insert an entry row together with its tags.
    ///
    /// # Postconditions
    /// - Either the entry and every tag are committed, or nothing is
    ///
    /// # Errors
    /// - Constraint violation (e.g. duplicate id)
    /// - I/O errors
    fn insert_entry(&self, row: &EntryRow, tags: &[String]) -> Result<()>;

    /// Read an entry row by id. `Ok(None)` if no row matches.
    fn fetch_entry(&self, id: &str) -> Result<Option<EntryRow>>;

    /// Tags of an entry, in insertion order.
    fn fetch_tags(&self, id: &str) -> Result<Vec<String>>;

    /// Identifiers matching `filter`, most recent first, windowed by
    /// `pagination`.
    fn select_ids(&self, filter: &QueryFilter, pagination: &Pagination) -> Result<Vec<String>>;

    /// Write a compacted, self-consistent copy of the whole store to `dest`,
    /// including anything still only in the write-ahead log.
    ///
    /// # Errors
    /// - `dest` already exists
    /// - I/O errors
    fn snapshot_into(&self, dest: &Path) -> Result<()>;
}
