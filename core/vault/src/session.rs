//! Vault session management.
//!
//! A session holds the derived key and the open store in memory. Both are
//! present together or absent together; the key is zeroized when the session
//! is locked or dropped.

use parking_lot::{MappedRwLockReadGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::path::{Path, PathBuf};
use tracing::warn;
use zeroize::Zeroize;

use crate::archive::ArchiveManager;
use crate::manager::ProfileManager;
use crate::operations::EntryStore;
use logwayss_common::{Error, Result};
use logwayss_crypto::SessionKey;
use logwayss_storage::{SqliteStore, StoreOptions};

/// State of the vault session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Key and store are available.
    Unlocked,
    /// No key in memory.
    Locked,
}

/// Everything an unlocked session owns.
pub(crate) struct LiveSession {
    pub(crate) key: SessionKey,
    pub(crate) directory: PathBuf,
    pub(crate) store: SqliteStore,
}

impl LiveSession {
    /// Zeroize the key and close the store.
    pub(crate) fn shutdown(self) {
        let LiveSession {
            mut key,
            directory,
            store,
        } = self;
        key.zeroize();
        if let Err(e) = store.close() {
            warn!(directory = %directory.display(), error = %e, "Store did not close cleanly");
        }
    }
}

/// Shared vault session.
///
/// Entry reads and writes run under a shared hold; unlock, lock and archive
/// operations take the session exclusively, so no entry operation can observe
/// a half-swapped key or store.
pub struct Session {
    state: RwLock<Option<LiveSession>>,
    options: StoreOptions,
}

impl Session {
    /// Create a locked session with default store options.
    pub fn new() -> Self {
        Self::with_options(StoreOptions::default())
    }

    /// Create a locked session that opens stores with `options`.
    pub fn with_options(options: StoreOptions) -> Self {
        Self {
            state: RwLock::new(None),
            options,
        }
    }

    /// Profile lifecycle operations.
    pub fn profiles(&self) -> ProfileManager<'_> {
        ProfileManager::new(self)
    }

    /// Entry operations.
    pub fn entries(&self) -> EntryStore<'_> {
        EntryStore::new(self)
    }

    /// Export and import.
    pub fn archive(&self) -> ArchiveManager<'_> {
        ArchiveManager::new(self)
    }

    /// Get the current session state.
    pub fn state(&self) -> SessionState {
        if self.state.read().is_some() {
            SessionState::Unlocked
        } else {
            SessionState::Locked
        }
    }

    /// Check if the session is unlocked.
    pub fn is_unlocked(&self) -> bool {
        self.state() == SessionState::Unlocked
    }

    /// Directory of the unlocked vault.
    pub fn directory(&self) -> Option<PathBuf> {
        self.state.read().as_ref().map(|live| live.directory.clone())
    }

    /// Store options used when opening a vault database.
    pub fn options(&self) -> &StoreOptions {
        &self.options
    }

    /// Shared access to the live session.
    ///
    /// # Errors
    /// - `Locked` if no profile is unlocked
    pub(crate) fn live(&self) -> Result<MappedRwLockReadGuard<'_, LiveSession>> {
        RwLockReadGuard::try_map(self.state.read(), |state| state.as_ref())
            .map_err(|_| Error::Locked)
    }

    /// Exclusive access to the session state.
    pub(crate) fn exclusive(&self) -> RwLockWriteGuard<'_, Option<LiveSession>> {
        self.state.write()
    }

    /// Lock the session if unlocked. Returns whether it was unlocked.
    ///
    /// # Postconditions
    /// - Key is zeroized and the store is closed
    /// - Session state is Locked
    pub(crate) fn clear(&self) -> bool {
        let previous = self.exclusive().take();
        match previous {
            Some(live) => {
                live.shutdown();
                true
            }
            None => false,
        }
    }

    pub(crate) fn db_path(directory: &Path) -> PathBuf {
        directory.join(crate::config::DB_FILENAME)
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Some(live) = self.state.get_mut().take() {
            live.shutdown();
        }
    }
}
