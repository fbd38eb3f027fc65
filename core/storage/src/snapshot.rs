//! Restoring a database file from a snapshot.
//!
//! A restore happens in two steps. [`stage_import`] copies the snapshot next
//! to the live database and checks it looks like SQLite; this touches nothing
//! live. With the store closed, [`replace_with_staged`] removes the live file
//! and its write-ahead/shared-memory side files and renames the staged copy
//! into place. Leaving a `-wal` file behind would let stale log frames be
//! replayed over the restored database.

use std::ffi::OsString;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use logwayss_common::{Error, Result};

const SQLITE_HEADER: &[u8; 16] = b"SQLite format 3\0";

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut s = OsString::from(path.as_os_str());
    s.push(suffix);
    PathBuf::from(s)
}

/// Write-ahead log and shared-memory files that belong to `db_path`.
pub fn side_files(db_path: &Path) -> [PathBuf; 2] {
    [with_suffix(db_path, "-wal"), with_suffix(db_path, "-shm")]
}

fn remove_if_present(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

fn archive_err(context: &str, path: &Path, e: io::Error) -> Error {
    Error::Archive(format!("{} {}: {}", context, path.display(), e))
}

/// Copy `source` beside `db_path` as `<db_path>.import`.
///
/// # Errors
/// - `source` is missing, unreadable, or not a SQLite database file
pub fn stage_import(source: &Path, db_path: &Path) -> Result<PathBuf> {
    let mut header = [0u8; 16];
    fs::File::open(source)
        .and_then(|mut f| f.read_exact(&mut header))
        .map_err(|e| archive_err("Cannot read archive", source, e))?;
    if &header != SQLITE_HEADER {
        return Err(Error::Archive(format!(
            "Not a vault archive: {}",
            source.display()
        )));
    }

    let staged = with_suffix(db_path, ".import");
    fs::copy(source, &staged).map_err(|e| {
        let _ = remove_if_present(&staged);
        archive_err("Cannot stage archive", source, e)
    })?;

    debug!(staged = %staged.display(), "Archive staged");
    Ok(staged)
}

/// Put a staged snapshot in place of the database at `db_path`.
///
/// # Preconditions
/// - No connection to `db_path` is open
pub fn replace_with_staged(staged: &Path, db_path: &Path) -> Result<()> {
    for side in side_files(db_path) {
        remove_if_present(&side).map_err(|e| archive_err("Cannot remove", &side, e))?;
    }
    remove_if_present(db_path).map_err(|e| archive_err("Cannot remove", db_path, e))?;
    fs::rename(staged, db_path).map_err(|e| archive_err("Cannot move archive into", db_path, e))?;

    info!(path = %db_path.display(), "Database replaced from archive");
    Ok(())
}
