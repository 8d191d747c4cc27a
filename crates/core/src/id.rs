//! Record identifiers.
//!
//! A record created on this device gets a [`LocalId`] immediately. Once the
//! remote store has persisted it, the store-assigned [`RemoteId`] becomes the
//! canonical identifier. [`RecordId`] is whichever of the two a caller holds.

use core::str::FromStr;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

/// Identifier generated locally when a record is created.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocalId(Uuid);

impl LocalId {
    /// Create a new identifier.
    ///
    /// Uses UUIDv7 (time-ordered), so sorting by `LocalId` follows creation order.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for LocalId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for LocalId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl From<Uuid> for LocalId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl FromStr for LocalId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let uuid =
            Uuid::from_str(s).map_err(|e| DomainError::invalid_id(format!("LocalId: {e}")))?;
        Ok(Self(uuid))
    }
}

/// Identifier assigned by the remote document store.
///
/// Opaque to this crate; the store decides the format.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RemoteId(String);

impl RemoteId {
    pub fn new(id: impl Into<String>) -> Result<Self, DomainError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(DomainError::invalid_id("RemoteId: empty"));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for RemoteId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for RemoteId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// Either identifier of a record, as handed out to callers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum RecordId {
    Local(LocalId),
    Remote(RemoteId),
}

impl RecordId {
    pub fn as_local(&self) -> Option<LocalId> {
        match self {
            RecordId::Local(id) => Some(*id),
            RecordId::Remote(_) => None,
        }
    }

    pub fn as_remote(&self) -> Option<&RemoteId> {
        match self {
            RecordId::Local(_) => None,
            RecordId::Remote(id) => Some(id),
        }
    }
}

impl core::fmt::Display for RecordId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            RecordId::Local(id) => core::fmt::Display::fmt(id, f),
            RecordId::Remote(id) => core::fmt::Display::fmt(id, f),
        }
    }
}

impl From<LocalId> for RecordId {
    fn from(value: LocalId) -> Self {
        RecordId::Local(value)
    }
}

impl From<RemoteId> for RecordId {
    fn from(value: RemoteId) -> Self {
        RecordId::Remote(value)
    }
}

impl FromStr for RecordId {
    type Err = DomainError;

    /// Strings that parse as a UUID are taken as local ids; anything else
    /// non-empty is a remote id.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.parse::<LocalId>() {
            Ok(id) => Ok(RecordId::Local(id)),
            Err(_) => Ok(RecordId::Remote(RemoteId::new(s)?)),
        }
    }
}
