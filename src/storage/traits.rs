//! Storage trait definitions

use crate::contact::{ContactRecord, Field, FieldValue};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Contact not found: {0}")]
    ContactNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Date parsing error: {0}")]
    DateParse(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// One audit-log row describing a completed import.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportLogEntry {
    pub actor: String,
    pub file_name: String,
    pub inserted: u64,
    pub updated: u64,
    pub timestamp: DateTime<Utc>,
}

/// A contact row in the recycle bin, stamped with its deletion time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrashEntry {
    #[serde(flatten)]
    pub record: ContactRecord,
    pub deleted_date: DateTime<Utc>,
}

/// A contact as captured in the backup table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupRow {
    #[serde(flatten)]
    pub record: ContactRecord,
    pub backup_date: DateTime<Utc>,
}

/// One row of a reconciliation batch: the contact key plus the selected
/// column values to apply.
#[derive(Debug, Clone)]
pub struct ReconcileRow {
    pub mobileno: String,
    pub fields: Vec<(Field, FieldValue)>,
}

/// Insert/update counts from a reconciliation batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileCounts {
    pub inserted: u64,
    pub updated: u64,
}

/// Stored admin credentials.
#[derive(Debug, Clone)]
pub struct AdminAccount {
    pub username: String,
    pub password_hash: String,
    pub email: Option<String>,
}

/// Trait for contact persistence backends
///
/// Implementations must be thread-safe (Send + Sync) to support
/// concurrent access from multiple request handlers.
pub trait ContactStore: Send + Sync {
    // === Contact Operations ===

    /// Insert a new contact. Fails if the key already exists.
    fn insert_contact(&self, record: &ContactRecord) -> StorageResult<()>;

    /// Insert or fully replace a contact.
    fn upsert_contact(&self, record: &ContactRecord) -> StorageResult<()>;

    /// Load a contact by key.
    fn get_contact(&self, mobileno: &str) -> StorageResult<Option<ContactRecord>>;

    /// True when a contact with the key exists.
    fn contact_exists(&self, mobileno: &str) -> StorageResult<bool>;

    /// All contacts in canonical order (by key).
    fn list_contacts(&self) -> StorageResult<Vec<ContactRecord>>;

    /// Update ONLY the named fields, stamping `last_updated_date`.
    /// Unnamed columns are left untouched.
    fn update_fields(
        &self,
        mobileno: &str,
        fields: &[(Field, FieldValue)],
        stamped_at: DateTime<Utc>,
    ) -> StorageResult<()>;

    /// Remove a contact row outright. Returns whether a row was removed.
    fn remove_contact(&self, mobileno: &str) -> StorageResult<bool>;

    // === Import Reconciliation ===

    /// Apply a reconciliation batch with no other writer interleaved.
    ///
    /// Each row keys on `mobileno`: an existing contact gets ONLY the
    /// row's fields updated plus a fresh `last_updated_date`; an unknown
    /// key becomes a new row with every other column NULL. Work commits
    /// every `commit_every` rows; on failure the open chunk is rolled
    /// back and earlier chunks stand. The implementation must hold the
    /// batch's transactions exclusively, so a concurrent write can never
    /// join them and be lost to a rollback.
    fn reconcile_batch(
        &self,
        rows: &[ReconcileRow],
        commit_every: usize,
        stamped_at: DateTime<Utc>,
    ) -> StorageResult<ReconcileCounts>;

    // === Backup Table ===

    /// Keys already present in the backup table.
    fn backed_up_keys(&self) -> StorageResult<Vec<String>>;

    /// All backup-table rows, newest snapshot first.
    fn list_backup_rows(&self) -> StorageResult<Vec<BackupRow>>;

    /// Append a row to the backup table.
    fn insert_backup(&self, record: &ContactRecord, backup_date: DateTime<Utc>)
        -> StorageResult<()>;

    /// True when the key is present in the backup table.
    fn backup_contains(&self, mobileno: &str) -> StorageResult<bool>;

    /// Remove a row from the backup table. Returns whether a row was removed.
    fn remove_backup(&self, mobileno: &str) -> StorageResult<bool>;

    // === Recycle Bin ===

    /// Move a live contact into the recycle bin. Returns false when the
    /// contact does not exist.
    fn move_to_trash(&self, mobileno: &str, deleted_date: DateTime<Utc>) -> StorageResult<bool>;

    /// Recycle-bin rows, newest deletion first.
    fn list_trash(&self) -> StorageResult<Vec<TrashEntry>>;

    /// Load one recycle-bin row.
    fn get_trash(&self, mobileno: &str) -> StorageResult<Option<TrashEntry>>;

    /// Move a recycle-bin row back into the live table, atomically.
    /// Returns the restored record, or None when the key is not in the bin.
    fn restore_from_trash(&self, mobileno: &str) -> StorageResult<Option<ContactRecord>>;

    /// Drop a recycle-bin row. Returns whether a row was removed.
    fn remove_trash(&self, mobileno: &str) -> StorageResult<bool>;

    // === Audit Log ===

    /// Append one import summary.
    fn append_import_log(&self, entry: &ImportLogEntry) -> StorageResult<()>;

    /// Import summaries, newest first.
    fn list_import_logs(&self) -> StorageResult<Vec<ImportLogEntry>>;

    // === Admin Accounts ===

    fn insert_admin(&self, account: &AdminAccount) -> StorageResult<()>;
    fn get_admin(&self, username: &str) -> StorageResult<Option<AdminAccount>>;
}

/// Extension trait for opening stores from paths
pub trait OpenStore: ContactStore + Sized {
    /// Open or create a store at the given path
    fn open(path: impl AsRef<Path>) -> StorageResult<Self>;

    /// Create an in-memory store (useful for testing)
    fn open_in_memory() -> StorageResult<Self>;
}
