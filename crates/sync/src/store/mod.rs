//! Durable local record storage.
//!
//! The reconciler writes every mutation through a [`LocalStore`] and reads the
//! whole collection back at startup. Records are kept untyped
//! ([`StoredRecord`]); typing happens in the reconciler.

pub mod in_memory;
pub mod sqlite;
pub mod r#trait;

pub use in_memory::InMemoryLocalStore;
pub use r#trait::{LocalStore, StoreError};
pub use sqlite::SqliteLocalStore;

pub use crate::types::StoredRecord;
