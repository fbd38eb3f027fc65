//! Entry values handed to and returned from the vault.

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};

use logwayss_common::{EntryId, EntryMeta, EntryType, Error, InvalidEntryKind, Result};

/// Maximum number of tags on one entry.
pub const MAX_TAGS: usize = 20;

/// Maximum length of one tag, in characters.
pub const MAX_TAG_LEN: usize = 50;

/// Maximum length of the source label, in characters.
pub const MAX_SOURCE_LEN: usize = 50;

/// Maximum length of the device id, in characters.
pub const MAX_DEVICE_ID_LEN: usize = 100;

/// Input for creating an entry.
#[derive(Debug, Clone, PartialEq)]
pub struct NewEntry {
    pub entry_type: EntryType,
    pub tags: Vec<String>,
    pub source: Option<String>,
    pub device_id: Option<String>,
    pub meta: Option<EntryMeta>,
    /// Plaintext payload, usually JSON. Never stored unencrypted.
    pub payload: Vec<u8>,
}

impl NewEntry {
    /// Create an entry with a raw payload and no optional fields.
    pub fn new(entry_type: EntryType, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            entry_type,
            tags: Vec::new(),
            source: None,
            device_id: None,
            meta: None,
            payload: payload.into(),
        }
    }

    /// Create an entry whose payload is `value` serialized as JSON.
    pub fn json<T: Serialize + ?Sized>(entry_type: EntryType, value: &T) -> Result<Self> {
        let payload = serde_json::to_vec(value).map_err(|e| Error::Serialization(e.to_string()))?;
        Ok(Self::new(entry_type, payload))
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_device_id(mut self, device_id: impl Into<String>) -> Self {
        self.device_id = Some(device_id.into());
        self
    }

    pub fn with_meta(mut self, meta: EntryMeta) -> Self {
        self.meta = Some(meta);
        self
    }

    /// Check field limits.
    ///
    /// # Errors
    /// - `InvalidEntry(Tags)` if there are more than [`MAX_TAGS`] tags, or a
    ///   tag is empty or longer than [`MAX_TAG_LEN`]
    /// - `InvalidEntry(Source)` if source exceeds [`MAX_SOURCE_LEN`]
    /// - `InvalidEntry(DeviceId)` if device id exceeds [`MAX_DEVICE_ID_LEN`]
    /// - `InvalidEntry(Meta)` if meta fails its own validation
    /// - `InvalidEntry(Payload)` if the payload is empty
    pub fn validate(&self) -> Result<()> {
        if self.tags.len() > MAX_TAGS
            || self
                .tags
                .iter()
                .any(|t| t.is_empty() || t.chars().count() > MAX_TAG_LEN)
        {
            return Err(Error::invalid_entry(InvalidEntryKind::Tags));
        }
        if exceeds(&self.source, MAX_SOURCE_LEN) {
            return Err(Error::invalid_entry(InvalidEntryKind::Source));
        }
        if exceeds(&self.device_id, MAX_DEVICE_ID_LEN) {
            return Err(Error::invalid_entry(InvalidEntryKind::DeviceId));
        }
        if let Some(meta) = &self.meta {
            meta.validate()?;
        }
        if self.payload.is_empty() {
            return Err(Error::invalid_entry(InvalidEntryKind::Payload));
        }
        Ok(())
    }

    /// Tags with duplicates removed, first occurrence wins.
    pub(crate) fn unique_tags(&self) -> Vec<String> {
        let mut seen = Vec::with_capacity(self.tags.len());
        for tag in &self.tags {
            if !seen.contains(tag) {
                seen.push(tag.clone());
            }
        }
        seen
    }
}

fn exceeds(field: &Option<String>, max: usize) -> bool {
    field.as_ref().is_some_and(|s| s.chars().count() > max)
}

/// A decrypted entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub id: EntryId,
    pub entry_type: EntryType,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub schema_version: u32,
    pub tags: Vec<String>,
    pub source: Option<String>,
    pub device_id: Option<String>,
    pub meta: Option<EntryMeta>,
    pub payload: Vec<u8>,
}

impl Entry {
    /// Parse the payload as JSON.
    pub fn payload_json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.payload).map_err(|e| Error::Serialization(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn text() -> NewEntry {
        NewEntry::new(EntryType::Text, br#"{"text":"hi"}"#.to_vec())
    }

    fn kind(result: Result<()>) -> Option<InvalidEntryKind> {
        match result {
            Err(Error::InvalidEntry(kind)) => Some(kind),
            _ => None,
        }
    }

    #[test]
    fn test_minimal_entry_is_valid() {
        assert!(text().validate().is_ok());
    }

    #[test]
    fn test_tag_limits() {
        let mut entry = text();
        entry.tags = (0..MAX_TAGS).map(|i| format!("t{}", i)).collect();
        assert!(entry.validate().is_ok());

        entry.tags.push("one-too-many".into());
        assert_eq!(kind(entry.validate()), Some(InvalidEntryKind::Tags));

        let mut full = text();
        full.tags = (0..MAX_TAGS)
            .map(|i| format!("{:02}{}", i, "x".repeat(MAX_TAG_LEN - 2)))
            .collect();
        assert!(full.tags.iter().all(|t| t.chars().count() == MAX_TAG_LEN));
        assert!(full.validate().is_ok());

        full.tags.push("y".repeat(MAX_TAG_LEN));
        assert_eq!(kind(full.validate()), Some(InvalidEntryKind::Tags));

        let long = text().with_tag("x".repeat(MAX_TAG_LEN + 1));
        assert_eq!(kind(long.validate()), Some(InvalidEntryKind::Tags));

        let at_limit = text().with_tag("é".repeat(MAX_TAG_LEN));
        assert!(at_limit.validate().is_ok());

        let empty = text().with_tag("");
        assert_eq!(kind(empty.validate()), Some(InvalidEntryKind::Tags));
    }

    #[test]
    fn test_source_and_device_limits() {
        let source = text().with_source("s".repeat(MAX_SOURCE_LEN + 1));
        assert_eq!(kind(source.validate()), Some(InvalidEntryKind::Source));

        let device = text().with_device_id("d".repeat(MAX_DEVICE_ID_LEN + 1));
        assert_eq!(kind(device.validate()), Some(InvalidEntryKind::DeviceId));

        let ok = text()
            .with_source("s".repeat(MAX_SOURCE_LEN))
            .with_device_id("d".repeat(MAX_DEVICE_ID_LEN));
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn test_meta_and_payload() {
        let meta = EntryMeta {
            confidence: serde_json::Number::from_f64(1.5),
            ..Default::default()
        };
        assert_eq!(
            kind(text().with_meta(meta).validate()),
            Some(InvalidEntryKind::Meta)
        );

        let empty = NewEntry::new(EntryType::Log, Vec::new());
        assert_eq!(kind(empty.validate()), Some(InvalidEntryKind::Payload));
    }

    #[test]
    fn test_unique_tags_keeps_first_occurrence() {
        let entry = text().with_tag("b").with_tag("a").with_tag("b").with_tag("c");
        assert_eq!(entry.unique_tags(), vec!["b", "a", "c"]);
    }

    #[test]
    fn test_json_payload() {
        let entry = NewEntry::json(EntryType::Metrics, &json!({"steps": 1200})).unwrap();
        assert_eq!(entry.payload, br#"{"steps":1200}"#);
    }
}
