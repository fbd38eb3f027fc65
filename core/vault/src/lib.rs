//! Encrypted journal vault engine.
//!
//! This module provides:
//! - Profile lifecycle: create, unlock, lock
//! - Per-entry authenticated encryption bound to record identity
//! - Transactional entry persistence with a tag index, and queries over it
//! - Whole-vault export to a single archive file and restore from one
//!
//! # Architecture
//! A [`Session`] owns the live key and store behind one reader/writer lock.
//! [`ProfileManager`], [`EntryStore`] and [`ArchiveManager`] are borrowed
//! views over a session; each operation checks the lock state under the
//! same hold it uses to do its work.

pub mod archive;
pub mod binding;
pub mod config;
pub mod entry;
pub mod manager;
pub mod operations;
pub mod session;

pub use archive::ArchiveManager;
pub use config::{ProfileFile, DB_FILENAME, PROFILE_FILENAME, PROFILE_MAGIC};
pub use entry::{Entry, NewEntry, MAX_DEVICE_ID_LEN, MAX_SOURCE_LEN, MAX_TAGS, MAX_TAG_LEN};
pub use manager::{ProfileInfo, ProfileManager};
pub use operations::EntryStore;
pub use session::{Session, SessionState};

pub use logwayss_common::{
    EntryId, EntryMeta, EntryType, Error, InvalidEntryKind, Pagination, QueryFilter, Result,
    Sensitivity, Visibility,
};
pub use logwayss_crypto::ScryptParams;
pub use logwayss_storage::{Durability, StoreOptions};
