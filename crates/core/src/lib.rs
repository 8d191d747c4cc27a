//! `pantry-core`: pantry domain building blocks.
//!
//! This crate contains **pure domain** types (no storage, no network): record
//! identifiers, the inventory and purchase payloads, and the [`SyncPayload`]
//! contract the sync layer works against.

pub mod error;
pub mod id;
pub mod item;
pub mod payload;
pub mod purchase;

pub use error::{DomainError, DomainResult};
pub use id::{LocalId, RecordId, RemoteId};
pub use item::{InventoryItem, InventoryItemPatch, Nutrition, Unit};
pub use payload::SyncPayload;
pub use purchase::{Purchase, PurchaseLine, PurchasePatch, spend_by_month, total_spent};
