//! SQLite-backed persistent store.

use parking_lot::Mutex;
use rusqlite::{params, params_from_iter, types::Value, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::options::StoreOptions;
use crate::provider::{EntryRow, PersistentStore};
use crate::schema::SCHEMA_SQL;
use logwayss_common::{format_timestamp, Error, Pagination, QueryFilter, Result};

pub(crate) fn store_err(e: rusqlite::Error) -> Error {
    Error::Storage(e.to_string())
}

/// Persistent store over one SQLite database file.
///
/// The connection sits behind a mutex: callers holding a shared session
/// lock may use the store concurrently, and each transaction runs alone.
pub struct SqliteStore {
    conn: Mutex<Connection>,
    path: PathBuf,
}

impl SqliteStore {
    /// Open (or create) the database at `path` and apply the schema.
    ///
    /// # Postconditions
    /// - Journal mode is WAL, foreign keys are enforced
    /// - All tables and indexes exist
    ///
    /// # Errors
    /// - File is not a database, or cannot be created
    pub fn open(path: impl AsRef<Path>, options: &StoreOptions) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let conn = Connection::open(&path).map_err(store_err)?;

        let mode: String = conn
            .pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))
            .map_err(store_err)?;
        if !mode.eq_ignore_ascii_case("wal") {
            warn!(journal_mode = %mode, "Store is not in WAL mode");
        }
        conn.pragma_update(None, "synchronous", options.durability.as_pragma())
            .map_err(store_err)?;
        conn.pragma_update(None, "foreign_keys", true)
            .map_err(store_err)?;
        conn.execute_batch(SCHEMA_SQL).map_err(store_err)?;

        info!(path = %path.display(), "Store opened");
        Ok(Self {
            conn: Mutex::new(conn),
            path,
        })
    }

    /// Create an in-memory store (for testing).
    pub fn in_memory() -> Result<Self> {
        Self::open(":memory:", &StoreOptions::default())
    }

    /// Path of the main database file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Close the connection, checkpointing the write-ahead log.
    pub fn close(self) -> Result<()> {
        let path = self.path;
        self.conn
            .into_inner()
            .close()
            .map_err(|(_, e)| store_err(e))?;
        debug!(path = %path.display(), "Store closed");
        Ok(())
    }
}

fn row_to_entry(id: &str, row: &rusqlite::Row<'_>) -> rusqlite::Result<EntryRow> {
    Ok(EntryRow {
        id: id.to_string(),
        entry_type: row.get(0)?,
        created_at: row.get(1)?,
        updated_at: row.get(2)?,
        schema_version: row.get(3)?,
        source: row.get(4)?,
        device_id: row.get(5)?,
        meta_json: row.get(6)?,
        payload: row.get(7)?,
        iv: row.get(8)?,
        tag: row.get(9)?,
    })
}

/// Build the id selection statement for a filter.
fn select_ids_sql(filter: &QueryFilter, pagination: &Pagination) -> (String, Vec<Value>) {
    let mut tags: Vec<&str> = Vec::new();
    for tag in &filter.tags {
        if !tags.contains(&tag.as_str()) {
            tags.push(tag);
        }
    }

    let mut sql = String::from("SELECT e.id FROM entries e");
    let mut clauses = Vec::new();
    let mut args = Vec::new();

    if !tags.is_empty() {
        sql.push_str(" JOIN entry_tags t ON t.entry_id = e.id");
        let placeholders = vec!["?"; tags.len()].join(", ");
        clauses.push(format!("t.tag IN ({})", placeholders));
        args.extend(tags.iter().map(|t| Value::Text(t.to_string())));
    }
    if let Some(entry_type) = filter.entry_type {
        clauses.push("e.type = ?".to_string());
        args.push(Value::Text(entry_type.as_str().to_string()));
    }
    if let Some(from) = &filter.from {
        clauses.push("e.created_at >= ?".to_string());
        args.push(Value::Text(format_timestamp(from)));
    }
    if let Some(to) = &filter.to {
        clauses.push("e.created_at <= ?".to_string());
        args.push(Value::Text(format_timestamp(to)));
    }

    if !clauses.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
    }
    if !tags.is_empty() {
        sql.push_str(" GROUP BY e.id HAVING COUNT(DISTINCT t.tag) = ?");
        args.push(Value::Integer(tags.len() as i64));
    }
    sql.push_str(" ORDER BY e.created_at DESC, e.id DESC");

    if pagination.limit.is_some() || pagination.offset > 0 {
        // SQLite only accepts OFFSET after LIMIT; -1 means no limit.
        sql.push_str(" LIMIT ? OFFSET ?");
        args.push(Value::Integer(pagination.limit.map_or(-1, i64::from)));
        args.push(Value::Integer(i64::from(pagination.offset)));
    }

    (sql, args)
}

impl PersistentStore for SqliteStore {
    fn insert_entry(&self, row: &EntryRow, tags: &[String]) -> Result<()> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction().map_err(store_err)?;

        tx.execute(
            r#"
            INSERT INTO entries
            (id, type, created_at, updated_at, schema_version, source, device_id, meta_json, payload, iv, tag)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
            params![
                row.id,
                row.entry_type,
                row.created_at,
                row.updated_at,
                row.schema_version,
                row.source,
                row.device_id,
                row.meta_json,
                row.payload,
                row.iv,
                row.tag,
            ],
        )
        .map_err(store_err)?;

        {
            let mut stmt = tx
                .prepare("INSERT OR IGNORE INTO entry_tags (entry_id, tag) VALUES (?1, ?2)")
                .map_err(store_err)?;
            for tag in tags {
                stmt.execute(params![row.id, tag]).map_err(store_err)?;
            }
        }

        // Dropping an uncommitted transaction rolls it back.
        tx.commit().map_err(store_err)?;
        debug!(id = %row.id, tags = tags.len(), "Entry row committed");
        Ok(())
    }

    fn fetch_entry(&self, id: &str) -> Result<Option<EntryRow>> {
        let conn = self.conn.lock();
        conn.query_row(
            r#"
            SELECT type, created_at, updated_at, schema_version, source, device_id, meta_json, payload, iv, tag
            FROM entries WHERE id = ?1
            "#,
            [id],
            |row| row_to_entry(id, row),
        )
        .optional()
        .map_err(store_err)
    }

    fn fetch_tags(&self, id: &str) -> Result<Vec<String>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare("SELECT tag FROM entry_tags WHERE entry_id = ?1 ORDER BY rowid")
            .map_err(store_err)?;
        let tags = stmt
            .query_map([id], |row| row.get(0))
            .map_err(store_err)?
            .collect::<rusqlite::Result<Vec<String>>>()
            .map_err(store_err)?;
        Ok(tags)
    }

    fn select_ids(&self, filter: &QueryFilter, pagination: &Pagination) -> Result<Vec<String>> {
        let (sql, args) = select_ids_sql(filter, pagination);
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&sql).map_err(store_err)?;
        let ids = stmt
            .query_map(params_from_iter(args.iter()), |row| row.get(0))
            .map_err(store_err)?
            .collect::<rusqlite::Result<Vec<String>>>()
            .map_err(store_err)?;
        Ok(ids)
    }

    fn snapshot_into(&self, dest: &Path) -> Result<()> {
        if dest.exists() {
            return Err(Error::Archive(format!(
                "Destination already exists: {}",
                dest.display()
            )));
        }
        let dest_str = dest
            .to_str()
            .ok_or_else(|| Error::InvalidInput("Destination path is not valid UTF-8".to_string()))?;

        let conn = self.conn.lock();
        conn.execute("VACUUM INTO ?1", [dest_str])
            .map_err(|e| Error::Archive(format!("Snapshot failed: {}", e)))?;

        info!(dest = %dest.display(), "Store snapshot written");
        Ok(())
    }
}
