//! Common utilities and types shared across the LogWayss vault crates.
//!
//! This module provides foundational types that are used throughout the codebase,
//! ensuring consistency and type safety.

pub mod entry;
pub mod error;
pub mod query;
pub mod types;

pub use entry::{EntryId, EntryMeta, EntryType, Sensitivity, Visibility};
pub use error::{Error, InvalidEntryKind, Result};
pub use query::{Pagination, QueryFilter};
pub use types::{format_timestamp, parse_timestamp, SensitiveBytes, SCHEMA_VERSION};
