//! Common error types for the vault engine.

use thiserror::Error;

/// Which field of a new entry failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidEntryKind {
    Type,
    Tags,
    Source,
    DeviceId,
    Meta,
    Payload,
}

impl InvalidEntryKind {
    fn describe(&self) -> &'static str {
        match self {
            Self::Type => "invalid entry type",
            Self::Tags => "invalid entry tags",
            Self::Source => "invalid entry source",
            Self::DeviceId => "invalid entry device_id",
            Self::Meta => "invalid entry meta",
            Self::Payload => "invalid entry payload",
        }
    }
}

impl std::fmt::Display for InvalidEntryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.describe())
    }
}

/// Top-level error type for vault operations.
#[derive(Debug, Error)]
pub enum Error {
    /// No live session: the profile is locked.
    #[error("profile is locked")]
    Locked,

    /// A profile file already exists in the target directory.
    #[error("profile already exists")]
    ProfileExists,

    /// Unlock failed. Wrong password and a damaged profile file are
    /// reported identically.
    #[error("invalid profile or password")]
    InvalidProfile,

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A new entry was rejected before anything was encrypted or written.
    #[error("{0}")]
    InvalidEntry(InvalidEntryKind),

    /// Key derivation or cipher setup failed.
    #[error("Cryptographic error: {0}")]
    Crypto(String),

    /// Authenticated decryption failed: tampered data, wrong key or corruption.
    #[error("authentication failed")]
    Authentication,

    /// Persistent store operation failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Archive export or import failed.
    #[error("Archive error: {0}")]
    Archive(String),

    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid input provided.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl Error {
    /// Shorthand for an entry validation failure.
    pub fn invalid_entry(kind: InvalidEntryKind) -> Self {
        Self::InvalidEntry(kind)
    }
}

/// Result type alias using the common Error.
pub type Result<T> = std::result::Result<T, Error>;
