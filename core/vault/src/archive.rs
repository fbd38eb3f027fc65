//! Whole-vault export and import.
//!
//! An archive is a single self-contained SQLite file holding every entry and
//! tag row, still encrypted. It can only be read back under the key of the
//! profile that wrote it.

use std::fs;
use std::path::Path;
use tracing::{info, warn};

use crate::session::{LiveSession, Session};
use logwayss_common::{Error, Result};
use logwayss_storage::{replace_with_staged, stage_import, PersistentStore, SqliteStore};

/// Archive manager bound to a session.
pub struct ArchiveManager<'a> {
    session: &'a Session,
}

impl<'a> ArchiveManager<'a> {
    /// Create a manager for `session`.
    pub fn new(session: &'a Session) -> Self {
        Self { session }
    }

    /// Write a consistent snapshot of the vault database to `dest`.
    ///
    /// Entry operations wait until the snapshot is complete.
    ///
    /// # Errors
    /// - `Locked`
    /// - `Archive` if `dest` already exists
    /// - Storage failure
    pub fn export_archive(&self, dest: &Path) -> Result<()> {
        let state = self.session.exclusive();
        let live = state.as_ref().ok_or(Error::Locked)?;

        live.store.snapshot_into(dest)?;

        info!(dest = %dest.display(), "Archive exported");
        Ok(())
    }

    /// Replace the vault database with the archive at `source`.
    ///
    /// The archive is copied and checked before the live database is
    /// touched, so a missing or malformed `source` leaves the session
    /// unlocked and the database as it was. If a later step fails, the
    /// session ends up locked.
    ///
    /// # Errors
    /// - `Locked`
    /// - `Archive` if `source` cannot be read, is not an archive, or the
    ///   restored database cannot be put in place and reopened
    pub fn import_archive(&self, source: &Path) -> Result<()> {
        let mut state = self.session.exclusive();
        let db_path = state
            .as_ref()
            .map(|live| live.store.path().to_path_buf())
            .ok_or(Error::Locked)?;

        let staged = stage_import(source, &db_path)?;

        let Some(LiveSession {
            key,
            directory,
            store,
        }) = state.take()
        else {
            return Err(Error::Locked);
        };

        let reopened = store
            .close()
            .and_then(|()| replace_with_staged(&staged, &db_path))
            .and_then(|()| SqliteStore::open(&db_path, self.session.options()));

        match reopened {
            Ok(store) => {
                *state = Some(LiveSession {
                    key,
                    directory,
                    store,
                });
                info!(source = %source.display(), "Archive imported");
                Ok(())
            }
            Err(e) => {
                drop(key);
                let _ = fs::remove_file(&staged);
                warn!(error = %e, "Import failed after closing the store; session locked");
                Err(match e {
                    Error::Archive(_) => e,
                    other => Error::Archive(other.to_string()),
                })
            }
        }
    }
}
