//! Typed ID wrappers for type safety across reelsync.
//!
//! The remote media server addresses everything by numeric rating key. These
//! newtype wrappers prevent mixing different kinds of keys (e.g. using a
//! `SectionId` where an `ItemId` is expected).

use serde::{Deserialize, Serialize};

/// Unique identifier for a library item (movie, show, episode, collection, ...)
/// as assigned by the remote media server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(u64);

impl ItemId {
    /// Wrap a raw server rating key.
    #[must_use]
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Get the raw server rating key.
    #[must_use]
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl From<u64> for ItemId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl From<ItemId> for u64 {
    fn from(id: ItemId) -> Self {
        id.0
    }
}

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a library section on the remote media server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SectionId(u64);

impl SectionId {
    /// Wrap a raw server section key.
    #[must_use]
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Get the raw server section key.
    #[must_use]
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl From<u64> for SectionId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl From<SectionId> for u64 {
    fn from(id: SectionId) -> Self {
        id.0
    }
}

impl std::fmt::Display for SectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
