//! Entry identity, type enumeration and metadata value types.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{Error, InvalidEntryKind, Result};

/// Unique, time-sortable identifier of an entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntryId(String);

impl EntryId {
    /// Wrap an existing identifier string.
    ///
    /// # Errors
    /// - Returns error if id is empty
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id.is_empty() {
            return Err(Error::InvalidInput("EntryId cannot be empty".to_string()));
        }
        Ok(Self(id))
    }

    /// Generate a fresh identifier.
    ///
    /// UUIDv7 strings sort lexicographically by creation time and are
    /// monotonic within this process.
    pub fn generate() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    /// Get the inner string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The closed set of entry kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryType {
    Text,
    Markdown,
    Metrics,
    MediaRef,
    Event,
    Log,
}

impl EntryType {
    /// Every entry type, in declaration order.
    pub const ALL: [EntryType; 6] = [
        EntryType::Text,
        EntryType::Markdown,
        EntryType::Metrics,
        EntryType::MediaRef,
        EntryType::Event,
        EntryType::Log,
    ];

    /// Stable wire name, as stored in the `type` column and bound into
    /// associated data.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Markdown => "markdown",
            Self::Metrics => "metrics",
            Self::MediaRef => "media_ref",
            Self::Event => "event",
            Self::Log => "log",
        }
    }
}

impl FromStr for EntryType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or(Error::InvalidEntry(InvalidEntryKind::Type))
    }
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who may see an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Private,
    Friends,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Private => "private",
            Self::Friends => "friends",
        }
    }
}

impl FromStr for Visibility {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "public" => Ok(Self::Public),
            "private" => Ok(Self::Private),
            "friends" => Ok(Self::Friends),
            _ => Err(Error::InvalidEntry(InvalidEntryKind::Meta)),
        }
    }
}

/// How sensitive an entry's content is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sensitivity {
    Low,
    Medium,
    High,
}

impl Sensitivity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl FromStr for Sensitivity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            _ => Err(Error::InvalidEntry(InvalidEntryKind::Meta)),
        }
    }
}

const CONFIDENCE_KEY: &str = "confidence";
const VISIBILITY_KEY: &str = "visibility";
const SENSITIVITY_KEY: &str = "sensitivity";

/// Entry metadata: three well-known keys plus an open map.
///
/// Converts from and to a flat JSON object. Keys other than `confidence`,
/// `visibility` and `sensitivity` are kept in `extra` without validation, as
/// are `visibility` and `sensitivity` values that are not strings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Map<String, Value>", into = "Map<String, Value>")]
pub struct EntryMeta {
    /// Confidence in the entry's content, within `[0, 1]`. Kept as the
    /// number it was given, so `0` stays an integer.
    pub confidence: Option<Number>,
    pub visibility: Option<Visibility>,
    pub sensitivity: Option<Sensitivity>,
    /// Unrecognized keys, passed through as given.
    pub extra: Map<String, Value>,
}

impl EntryMeta {
    /// Confidence as a float.
    pub fn confidence(&self) -> Option<f64> {
        self.confidence.as_ref().and_then(Number::as_f64)
    }

    /// Check the invariants of the typed fields.
    ///
    /// # Errors
    /// - `InvalidEntry(Meta)` if confidence is outside `[0, 1]`
    pub fn validate(&self) -> Result<()> {
        if let Some(c) = &self.confidence {
            match c.as_f64() {
                Some(c) if c.is_finite() && (0.0..=1.0).contains(&c) => {}
                _ => return Err(Error::InvalidEntry(InvalidEntryKind::Meta)),
            }
        }
        Ok(())
    }

    /// Check whether no key at all is set.
    pub fn is_empty(&self) -> bool {
        self.confidence.is_none()
            && self.visibility.is_none()
            && self.sensitivity.is_none()
            && self.extra.is_empty()
    }
}

/// Take a string-valued key out of `map` and parse it. Values of any other
/// shape stay in the map.
fn take_meta_enum<T: FromStr<Err = Error>>(
    map: &mut Map<String, Value>,
    key: &str,
) -> Result<Option<T>> {
    match map.remove(key) {
        Some(Value::String(s)) => s.parse().map(Some),
        Some(other) => {
            map.insert(key.to_string(), other);
            Ok(None)
        }
        None => Ok(None),
    }
}

impl TryFrom<Map<String, Value>> for EntryMeta {
    type Error = Error;

    fn try_from(mut map: Map<String, Value>) -> Result<Self> {
        let confidence = match map.remove(CONFIDENCE_KEY) {
            Some(Value::Number(n)) => Some(n),
            Some(_) => return Err(Error::InvalidEntry(InvalidEntryKind::Meta)),
            None => None,
        };
        let visibility = take_meta_enum(&mut map, VISIBILITY_KEY)?;
        let sensitivity = take_meta_enum(&mut map, SENSITIVITY_KEY)?;

        let meta = Self {
            confidence,
            visibility,
            sensitivity,
            extra: map,
        };
        meta.validate()?;
        Ok(meta)
    }
}

impl From<EntryMeta> for Map<String, Value> {
    fn from(meta: EntryMeta) -> Self {
        let mut map = meta.extra;
        if let Some(c) = meta.confidence {
            map.insert(CONFIDENCE_KEY.to_string(), Value::Number(c));
        }
        if let Some(v) = meta.visibility {
            map.insert(VISIBILITY_KEY.to_string(), Value::from(v.as_str()));
        }
        if let Some(s) = meta.sensitivity {
            map.insert(SENSITIVITY_KEY.to_string(), Value::from(s.as_str()));
        }
        map
    }
}
