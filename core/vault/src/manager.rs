//! Profile lifecycle: create, unlock, lock.

use std::path::Path;
use tracing::{debug, info};

use crate::config::ProfileFile;
use crate::session::{LiveSession, Session};
use logwayss_common::{Error, Result};
use logwayss_crypto::ScryptParams;
use logwayss_storage::SqliteStore;

/// Public, password-free view of a profile file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileInfo {
    pub schema_version: u32,
    pub scrypt: ScryptParams,
}

/// Profile manager bound to a session.
pub struct ProfileManager<'a> {
    session: &'a Session,
}

impl<'a> ProfileManager<'a> {
    /// Create a manager for `session`.
    pub fn new(session: &'a Session) -> Self {
        Self { session }
    }

    /// Create a profile in `directory`.
    ///
    /// # Preconditions
    /// - `password` must not be empty
    ///
    /// # Postconditions
    /// - `directory` exists and holds a profile file
    /// - The session is left as it was
    ///
    /// # Errors
    /// - `ProfileExists` if a profile file is already present
    /// - `Crypto` if the password is empty or the KDF parameters are invalid
    /// - Filesystem failure
    pub fn create_profile(
        &self,
        directory: &Path,
        password: &[u8],
        params: &ScryptParams,
    ) -> Result<()> {
        let _exclusive = self.session.exclusive();

        if ProfileFile::exists(directory) {
            return Err(Error::ProfileExists);
        }

        let profile = ProfileFile::seal(password, params)?;
        profile.store_new(directory)?;

        info!(directory = %directory.display(), n = params.n, "Profile created");
        Ok(())
    }

    /// Unlock the profile in `directory`.
    ///
    /// The database file is created if missing. Any session that was already
    /// unlocked is replaced once the new one is ready; if unlocking fails the
    /// previous session stays as it was.
    ///
    /// # Errors
    /// - `InvalidProfile` for a wrong password or a missing or damaged
    ///   profile file
    /// - `Storage` if the database cannot be opened
    pub fn unlock(&self, directory: &Path, password: &[u8]) -> Result<()> {
        let mut state = self.session.exclusive();

        let profile = ProfileFile::load(directory).map_err(|e| {
            debug!(error = %e, "Profile file unreadable");
            Error::InvalidProfile
        })?;
        let key = profile.unseal(password)?;
        let store = SqliteStore::open(Session::db_path(directory), self.session.options())?;

        let previous = state.replace(LiveSession {
            key,
            directory: directory.to_path_buf(),
            store,
        });
        drop(state);

        if let Some(old) = previous {
            debug!(directory = %old.directory.display(), "Replacing unlocked profile");
            old.shutdown();
        }

        info!(directory = %directory.display(), "Profile unlocked");
        Ok(())
    }

    /// Lock the session, zeroizing the key and closing the store.
    ///
    /// Locking a locked session does nothing.
    pub fn lock(&self) {
        if self.session.clear() {
            info!("Profile locked");
        }
    }

    /// Check if a profile is unlocked.
    pub fn is_unlocked(&self) -> bool {
        self.session.is_unlocked()
    }

    /// Check if `directory` holds a profile file.
    pub fn profile_exists(directory: &Path) -> bool {
        ProfileFile::exists(directory)
    }

    /// Read the public header of the profile in `directory`.
    ///
    /// # Errors
    /// - `Io` if the file cannot be read
    /// - `Serialization` if it is not a valid profile
    pub fn profile_info(directory: &Path) -> Result<ProfileInfo> {
        let profile = ProfileFile::load(directory)?;
        Ok(ProfileInfo {
            schema_version: profile.schema_version,
            scrypt: profile.scrypt,
        })
    }
}
