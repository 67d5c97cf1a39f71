//! Bulk reconciliation import
//!
//! Matches uploaded rows against existing contacts by the `mobileno` key
//! and decides insert vs. update per row. The whole batch is validated
//! before the first write, so a bad file leaves the table untouched; the
//! apply phase batches commits for throughput. At most one import runs per
//! process — a second caller fails fast instead of queueing.

mod workbook;

pub use workbook::decode_workbook;

use crate::contact::{Field, FieldValue};
use crate::storage::{ContactStore, ImportLogEntry, ReconcileRow, StorageError};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, TryLockError};
use thiserror::Error;

/// Commit every this many applied rows.
pub const DEFAULT_COMMIT_EVERY: usize = 10_000;

/// Errors from the bulk import pipeline
#[derive(Debug, Error)]
pub enum ImportError {
    /// Bad headers, empty key, or an otherwise unusable batch. Nothing
    /// was written.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The same key appears twice within the batch (first duplicate).
    #[error("Duplicate key in uploaded file: {0}")]
    DuplicateKey(String),

    /// Storage failure during the apply phase; the open transaction was
    /// rolled back.
    #[error("Storage failure: {0}")]
    Persistence(#[from] StorageError),

    /// Another import already holds the process-wide lock.
    #[error("Another import operation is in progress")]
    ConcurrentImport,
}

/// Outcome counts of a completed import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSummary {
    pub inserted: u64,
    pub updated: u64,
}

/// One uploaded row: its sheet position (for error messages) and the
/// decoded cell values.
#[derive(Debug, Clone, Default)]
pub struct RawRow {
    /// 1-based worksheet row number; the header is row 1.
    pub sheet_row: u32,
    pub values: HashMap<Field, FieldValue>,
}

impl RawRow {
    pub fn new(sheet_row: u32) -> Self {
        Self {
            sheet_row,
            values: HashMap::new(),
        }
    }

    /// Builder-style cell setter, mostly for tests.
    pub fn with(mut self, field: Field, value: FieldValue) -> Self {
        self.values.insert(field, value);
        self
    }

    /// The row's key, when present and non-empty.
    pub fn key(&self) -> Option<&str> {
        match self.values.get(&Field::Mobileno) {
            Some(value) if !value.is_empty() => value.as_text(),
            _ => None,
        }
    }
}

/// Runs reconciliation imports against a contact store.
///
/// Owns the process-wide import lock: the lock is held for the entire
/// operation, not per row, so overlapping batches cannot interleave.
pub struct Importer {
    store: Arc<dyn ContactStore>,
    lock: Mutex<()>,
    commit_every: usize,
}

impl Importer {
    pub fn new(store: Arc<dyn ContactStore>) -> Self {
        Self {
            store,
            lock: Mutex::new(()),
            commit_every: DEFAULT_COMMIT_EVERY,
        }
    }

    /// Override the commit interval (tests use small values).
    pub fn with_commit_every(mut self, commit_every: usize) -> Self {
        self.commit_every = commit_every.max(1);
        self
    }

    /// Import a batch of rows, updating only `selected` fields.
    ///
    /// Processing order is file order. Existing contacts get a selective
    /// update plus a fresh `last_updated_date`; unknown keys become new
    /// rows with unselected columns NULL. On success with any effect, one
    /// audit-log entry is appended.
    pub fn import_batch(
        &self,
        rows: &[RawRow],
        selected: &[Field],
        actor: &str,
        file_name: &str,
    ) -> Result<ImportSummary, ImportError> {
        let _guard = match self.lock.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::WouldBlock) => return Err(ImportError::ConcurrentImport),
            // A panic in an earlier import poisons the lock; the guard
            // itself carries no data, so recovery is always safe.
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
        };

        let selected = normalize_selection(selected)?;
        let keys = validate_batch(rows)?;

        let batch: Vec<ReconcileRow> = rows
            .iter()
            .zip(&keys)
            .map(|(row, key)| ReconcileRow {
                mobileno: key.clone(),
                fields: selected
                    .iter()
                    .map(|field| {
                        let value = row.values.get(field).cloned().unwrap_or(FieldValue::Null);
                        (*field, value)
                    })
                    .collect(),
            })
            .collect();

        let counts = self
            .store
            .reconcile_batch(&batch, self.commit_every, Utc::now())?;
        let summary = ImportSummary {
            inserted: counts.inserted,
            updated: counts.updated,
        };

        if summary.inserted > 0 || summary.updated > 0 {
            self.store.append_import_log(&ImportLogEntry {
                actor: actor.to_string(),
                file_name: file_name.to_string(),
                inserted: summary.inserted,
                updated: summary.updated,
                timestamp: Utc::now(),
            })?;
        }

        tracing::info!(
            file = file_name,
            inserted = summary.inserted,
            updated = summary.updated,
            "import completed"
        );
        Ok(summary)
    }
}

/// Validate and canonicalize the field selection.
///
/// The key and the server-stamped timestamp are never part of the update
/// set: the key is matched on, and `last_updated_date` is always stamped
/// fresh regardless of what the file carries.
fn normalize_selection(selected: &[Field]) -> Result<Vec<Field>, ImportError> {
    let mut seen = HashSet::new();
    let normalized: Vec<Field> = selected
        .iter()
        .copied()
        .filter(|f| *f != Field::Mobileno && *f != Field::LastUpdatedDate)
        .filter(|f| seen.insert(*f))
        .collect();

    if normalized.is_empty() {
        return Err(ImportError::Validation(
            "no importable fields selected".to_string(),
        ));
    }
    Ok(normalized)
}

/// Phase 1: check every row before any write.
///
/// Returns the key of each row, in order. A missing/empty key or an
/// in-batch duplicate fails the whole batch with zero visible effects.
fn validate_batch(rows: &[RawRow]) -> Result<Vec<String>, ImportError> {
    let mut keys = Vec::with_capacity(rows.len());
    let mut seen = HashSet::new();

    for row in rows {
        let key = row.key().ok_or_else(|| {
            ImportError::Validation(format!(
                "row {} has a missing or empty mobile number",
                row.sheet_row
            ))
        })?;
        if !seen.insert(key.to_string()) {
            return Err(ImportError::DuplicateKey(key.to_string()));
        }
        keys.push(key.to_string());
    }

    Ok(keys)
}
