//! Storage backends for rolodex
//!
//! Persistence goes through the `ContactStore` trait. The primary
//! implementation is `SqliteStore`.

mod sqlite;
mod traits;

pub use sqlite::SqliteStore;
pub use traits::{
    AdminAccount, BackupRow, ContactStore, ImportLogEntry, OpenStore, ReconcileCounts,
    ReconcileRow, StorageError, StorageResult, TrashEntry,
};
