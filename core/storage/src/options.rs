//! Runtime options for opening a store.

/// How hard SQLite works to survive power loss.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Durability {
    /// `synchronous = NORMAL`. Safe against application crashes; the last
    /// transactions may roll back after power loss. Desktop default.
    #[default]
    Normal,
    /// `synchronous = FULL`. Every commit is synced. Preferred on phones,
    /// which lose power without warning.
    Full,
}

impl Durability {
    pub(crate) fn as_pragma(&self) -> &'static str {
        match self {
            Self::Normal => "NORMAL",
            Self::Full => "FULL",
        }
    }
}

/// Options applied every time a store is opened.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreOptions {
    pub durability: Durability,
}

impl StoreOptions {
    /// Options for desktop machines.
    pub fn desktop() -> Self {
        Self {
            durability: Durability::Normal,
        }
    }

    /// Options for mobile devices.
    pub fn mobile() -> Self {
        Self {
            durability: Durability::Full,
        }
    }
}
