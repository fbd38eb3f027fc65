//! Entry operations with encryption/decryption.

use chrono::Utc;
use tracing::{debug, info};

use crate::binding::entry_aad;
use crate::entry::{Entry, NewEntry};
use crate::session::{LiveSession, Session};
use logwayss_common::{
    format_timestamp, parse_timestamp, EntryId, EntryMeta, EntryType, Error, Pagination,
    QueryFilter, Result, SCHEMA_VERSION,
};
use logwayss_crypto::{decrypt, encrypt};
use logwayss_storage::{EntryRow, PersistentStore};

/// Entry store handler.
///
/// Provides encrypted entry operations on an unlocked session.
pub struct EntryStore<'a> {
    session: &'a Session,
}

impl<'a> EntryStore<'a> {
    /// Create a new entry store handler for a session.
    pub fn new(session: &'a Session) -> Self {
        Self { session }
    }

    /// Encrypt and persist a new entry.
    ///
    /// # Preconditions
    /// - Session must be unlocked
    ///
    /// # Postconditions
    /// - The entry row and all of its tag rows are committed together
    /// - `created_at == updated_at`
    /// - The returned entry carries the plaintext payload as given
    ///
    /// # Errors
    /// - `Locked`
    /// - `InvalidEntry` before anything is encrypted or written
    /// - Storage failure, with nothing committed
    pub fn create_entry(&self, new: NewEntry) -> Result<Entry> {
        let live = self.session.live()?;
        new.validate()?;

        let id = EntryId::generate();
        let now = Utc::now();
        let timestamp = format_timestamp(&now);
        let tags = new.unique_tags();
        let meta = new.meta.filter(|m| !m.is_empty());
        let meta_json = meta
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| Error::Serialization(e.to_string()))?;

        let aad = entry_aad(SCHEMA_VERSION, id.as_str(), new.entry_type.as_str());
        let sealed = encrypt(aad.as_bytes(), live.key.as_bytes(), &new.payload)?;

        let row = EntryRow {
            id: id.as_str().to_string(),
            entry_type: new.entry_type.as_str().to_string(),
            created_at: timestamp.clone(),
            updated_at: timestamp,
            schema_version: SCHEMA_VERSION,
            source: new.source.clone(),
            device_id: new.device_id.clone(),
            meta_json,
            payload: sealed.ciphertext,
            iv: sealed.iv.to_vec(),
            tag: sealed.tag.to_vec(),
        };
        live.store.insert_entry(&row, &tags)?;

        info!(id = %id, entry_type = %new.entry_type, tags = tags.len(), "Entry created");
        Ok(Entry {
            id,
            entry_type: new.entry_type,
            created_at: now,
            updated_at: now,
            schema_version: SCHEMA_VERSION,
            tags,
            source: new.source,
            device_id: new.device_id,
            meta,
            payload: new.payload,
        })
    }

    /// Read and decrypt one entry.
    ///
    /// # Errors
    /// - `Locked`
    /// - `NotFound` if no entry has this id
    /// - `Authentication` if the payload does not verify under the session
    ///   key and the entry's own id, type and schema version
    pub fn get_entry(&self, id: &EntryId) -> Result<Entry> {
        let live = self.session.live()?;
        materialize(&live, id.as_str())
    }

    /// List entries matching `filter`, newest first.
    ///
    /// Ties on `created_at` are broken by id, descending.
    ///
    /// # Errors
    /// - `Locked`
    /// - Any error [`EntryStore::get_entry`] can return, for any matched entry
    pub fn query(&self, filter: &QueryFilter, pagination: &Pagination) -> Result<Vec<Entry>> {
        let live = self.session.live()?;
        let ids = live.store.select_ids(filter, pagination)?;
        debug!(matched = ids.len(), "Query resolved");

        ids.iter().map(|id| materialize(&live, id)).collect()
    }
}

fn materialize(live: &LiveSession, id: &str) -> Result<Entry> {
    let row = live
        .store
        .fetch_entry(id)?
        .ok_or_else(|| Error::NotFound(format!("entry {}", id)))?;

    let entry_type: EntryType = row.entry_type.parse().map_err(|_| {
        Error::Storage(format!(
            "Unknown entry type {:?} in row {}",
            row.entry_type, id
        ))
    })?;

    let aad = entry_aad(row.schema_version, &row.id, &row.entry_type);
    let payload = decrypt(
        aad.as_bytes(),
        live.key.as_bytes(),
        &row.iv,
        &row.tag,
        &row.payload,
    )?;

    let meta = match row.meta_json.as_deref() {
        None | Some("null") => None,
        Some(json) => Some(
            serde_json::from_str::<EntryMeta>(json)
                .map_err(|e| Error::Serialization(format!("meta of entry {}: {}", id, e)))?,
        ),
    };
    let tags = live.store.fetch_tags(id)?;

    Ok(Entry {
        id: EntryId::new(row.id)?,
        entry_type,
        created_at: parse_timestamp(&row.created_at)?,
        updated_at: parse_timestamp(&row.updated_at)?,
        schema_version: row.schema_version,
        tags,
        source: row.source,
        device_id: row.device_id,
        meta,
        payload,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DB_FILENAME;
    use logwayss_common::{InvalidEntryKind, Visibility};
    use logwayss_crypto::ScryptParams;
    use logwayss_storage::{SqliteStore, StoreOptions};
    use serde_json::json;
    use tempfile::TempDir;

    fn unlocked() -> (TempDir, Session) {
        let dir = tempfile::tempdir().unwrap();
        let session = Session::new();
        let params = ScryptParams { n: 1 << 10, r: 8, p: 1 };
        session
            .profiles()
            .create_profile(dir.path(), b"password", &params)
            .unwrap();
        session.profiles().unlock(dir.path(), b"password").unwrap();
        (dir, session)
    }

    fn note(text: &str) -> NewEntry {
        NewEntry::json(EntryType::Text, &json!({ "text": text })).unwrap()
    }

    #[test]
    fn test_create_and_get() {
        let (_dir, session) = unlocked();
        let entries = session.entries();

        let created = entries
            .create_entry(
                note("hello")
                    .with_tag("a")
                    .with_tag("b")
                    .with_source("phone")
                    .with_device_id("dev-1"),
            )
            .unwrap();
        assert_eq!(created.created_at, created.updated_at);
        assert_eq!(created.schema_version, SCHEMA_VERSION);

        let fetched = entries.get_entry(&created.id).unwrap();
        assert_eq!(fetched, created);
        assert_eq!(
            fetched.payload_json::<serde_json::Value>().unwrap(),
            json!({"text": "hello"})
        );
    }

    #[test]
    fn test_operations_require_unlock() {
        let session = Session::new();
        let entries = session.entries();

        assert!(matches!(entries.create_entry(note("x")), Err(Error::Locked)));
        assert!(matches!(
            entries.get_entry(&EntryId::generate()),
            Err(Error::Locked)
        ));
        assert!(matches!(
            entries.query(&QueryFilter::all(), &Pagination::unbounded()),
            Err(Error::Locked)
        ));
    }

    #[test]
    fn test_locked_check_precedes_validation() {
        let session = Session::new();
        let bad = NewEntry::new(EntryType::Text, Vec::new());
        assert!(matches!(session.entries().create_entry(bad), Err(Error::Locked)));
    }

    #[test]
    fn test_invalid_entry_writes_nothing() {
        let (_dir, session) = unlocked();
        let entries = session.entries();

        let mut bad = note("x");
        bad.tags = (0..21).map(|i| i.to_string()).collect();
        assert!(matches!(
            entries.create_entry(bad),
            Err(Error::InvalidEntry(InvalidEntryKind::Tags))
        ));
        assert!(entries
            .query(&QueryFilter::all(), &Pagination::unbounded())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_get_missing_entry() {
        let (_dir, session) = unlocked();
        assert!(matches!(
            session.entries().get_entry(&EntryId::generate()),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_meta_round_trip() {
        let (_dir, session) = unlocked();
        let mut meta = EntryMeta {
            confidence: serde_json::Number::from_f64(1.0),
            visibility: Some(Visibility::Friends),
            ..Default::default()
        };
        meta.extra.insert("mood".into(), json!({"score": 3}));

        let created = session
            .entries()
            .create_entry(note("m").with_meta(meta.clone()))
            .unwrap();
        let fetched = session.entries().get_entry(&created.id).unwrap();
        assert_eq!(fetched.meta, Some(meta));

        let bare = session.entries().create_entry(note("n")).unwrap();
        assert_eq!(session.entries().get_entry(&bare.id).unwrap().meta, None);
    }

    #[test]
    fn test_duplicate_tags_collapse() {
        let (_dir, session) = unlocked();
        let created = session
            .entries()
            .create_entry(note("t").with_tag("x").with_tag("y").with_tag("x"))
            .unwrap();
        assert_eq!(created.tags, vec!["x", "y"]);
        assert_eq!(
            session.entries().get_entry(&created.id).unwrap().tags,
            vec!["x", "y"]
        );
    }

    #[test]
    fn test_query_filters_and_order() {
        let (_dir, session) = unlocked();
        let entries = session.entries();

        let first = entries.create_entry(note("1").with_tag("work")).unwrap();
        let second = entries
            .create_entry(NewEntry::json(EntryType::Log, &json!({"line": 2})).unwrap())
            .unwrap();
        let third = entries.create_entry(note("3").with_tag("work")).unwrap();

        let all = entries
            .query(&QueryFilter::all(), &Pagination::unbounded())
            .unwrap();
        let ids: Vec<_> = all.iter().map(|e| e.id.clone()).collect();
        assert_eq!(ids, vec![third.id.clone(), second.id.clone(), first.id.clone()]);

        let texts = entries
            .query(&QueryFilter::of_type(EntryType::Text), &Pagination::unbounded())
            .unwrap();
        assert_eq!(texts.len(), 2);
        assert!(texts.iter().all(|e| e.entry_type == EntryType::Text));

        let work = entries
            .query(&QueryFilter::all().with_tag("work"), &Pagination::first(1))
            .unwrap();
        assert_eq!(work.len(), 1);
        assert_eq!(work[0].id, third.id);

        let page = entries
            .query(&QueryFilter::all(), &Pagination::first(2).with_offset(2))
            .unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].id, first.id);
    }

    #[test]
    fn test_relocated_row_fails_authentication() {
        let (dir, session) = unlocked();
        let created = session.entries().create_entry(note("secret")).unwrap();

        // Copy the sealed row under another id, bypassing the vault.
        let store = SqliteStore::open(dir.path().join(DB_FILENAME), &StoreOptions::default())
            .unwrap();
        let mut row = store.fetch_entry(created.id.as_str()).unwrap().unwrap();
        row.id = format!("{}-copy", created.id);
        store.insert_entry(&row, &[]).unwrap();
        store.close().unwrap();

        let copy = EntryId::new(row.id).unwrap();
        assert!(matches!(
            session.entries().get_entry(&copy),
            Err(Error::Authentication)
        ));
        assert!(session.entries().get_entry(&created.id).is_ok());
    }
}
