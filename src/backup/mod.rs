//! Backup snapshot and restore
//!
//! A backup writes every contact not yet present in the `contacts_backup`
//! table to a named CSV file and records each row in that table, so the
//! next backup only picks up new contacts. Restore walks a backup file,
//! re-applies rows whose key is still registered in `contacts_backup`,
//! then retires both the table rows and the file.

use crate::contact::{ContactRecord, Field};
use crate::export::field_cell;
use crate::storage::{ContactStore, StorageError};
use chrono::Utc;
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackupError {
    #[error("Storage failure: {0}")]
    Storage(#[from] StorageError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid backup file name: {0}")]
    InvalidFileName(String),

    #[error("Backup file not found: {0}")]
    FileNotFound(String),

    #[error("No matching records found for restore")]
    NoMatchingRecords,
}

/// Result of a backup run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum BackupOutcome {
    /// A file was written and its rows registered in the backup table.
    Written { file_name: String, rows: usize },
    /// Every current contact is already backed up; nothing was written.
    NothingNew,
}

/// Reject names that could escape the backup directory.
fn checked_path(backup_dir: &Path, file_name: &str) -> Result<PathBuf, BackupError> {
    if file_name.is_empty()
        || file_name.contains('/')
        || file_name.contains('\\')
        || file_name.contains("..")
    {
        return Err(BackupError::InvalidFileName(file_name.to_string()));
    }
    Ok(backup_dir.join(file_name))
}

/// Snapshot all contacts not yet backed up into `<backup_dir>/<name>.csv`.
pub fn backup_all(
    store: &dyn ContactStore,
    backup_dir: &Path,
    name: &str,
) -> Result<BackupOutcome, BackupError> {
    let file_name = format!("{}.csv", name);
    let path = checked_path(backup_dir, &file_name)?;

    let contacts = store.list_contacts()?;
    let existing: HashSet<String> = store.backed_up_keys()?.into_iter().collect();
    let fresh: Vec<&ContactRecord> = contacts
        .iter()
        .filter(|c| !existing.contains(&c.mobileno))
        .collect();

    if fresh.is_empty() {
        return Ok(BackupOutcome::NothingNew);
    }

    let backup_date = Utc::now();
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(
        Field::ALL
            .iter()
            .map(|f| f.name())
            .chain(std::iter::once("backup_date")),
    )?;
    for record in &fresh {
        writer.write_record(
            Field::ALL
                .iter()
                .map(|f| field_cell(record, *f))
                .chain(std::iter::once(backup_date.to_rfc3339())),
        )?;
    }
    let bytes = writer.into_inner().map_err(|e| e.into_error())?;

    std::fs::create_dir_all(backup_dir)?;
    std::fs::write(&path, bytes)?;

    for record in &fresh {
        store.insert_backup(record, backup_date)?;
    }

    tracing::info!(file = %file_name, rows = fresh.len(), "backup written");
    Ok(BackupOutcome::Written {
        file_name,
        rows: fresh.len(),
    })
}

/// Re-apply a backup file into the live table.
///
/// Only rows whose key is still present in `contacts_backup` are restored;
/// restored keys are removed from the backup table and the file is deleted
/// afterwards. Returns the number of restored contacts.
pub fn restore_from_file(
    store: &dyn ContactStore,
    backup_dir: &Path,
    file_name: &str,
) -> Result<usize, BackupError> {
    let path = checked_path(backup_dir, file_name)?;
    if !path.exists() {
        return Err(BackupError::FileNotFound(file_name.to_string()));
    }

    let mut reader = csv::Reader::from_path(&path)?;
    let headers = reader.headers()?.clone();
    let columns: Vec<Option<Field>> = headers.iter().map(Field::from_name).collect();
    let key_idx = columns
        .iter()
        .position(|c| *c == Some(Field::Mobileno))
        .ok_or_else(|| BackupError::InvalidFileName(format!("{}: no mobileno column", file_name)))?;

    let mut restored_keys = Vec::new();
    for result in reader.records() {
        let row = result?;
        let key = row.get(key_idx).unwrap_or("").trim();
        if key.is_empty() || !store.backup_contains(key)? {
            continue;
        }

        let mut record = ContactRecord::new(key);
        for (idx, column) in columns.iter().enumerate() {
            let Some(field) = column else { continue };
            if *field == Field::Mobileno {
                continue;
            }
            if let Some(cell) = row.get(idx) {
                record.set(*field, ContactRecord::coerce(*field, cell));
            }
        }

        store.upsert_contact(&record)?;
        restored_keys.push(key.to_string());
    }

    if restored_keys.is_empty() {
        return Err(BackupError::NoMatchingRecords);
    }

    for key in &restored_keys {
        store.remove_backup(key)?;
    }
    std::fs::remove_file(&path)?;

    tracing::info!(file = %file_name, rows = restored_keys.len(), "backup restored");
    Ok(restored_keys.len())
}

/// Names of the backup files currently on disk.
pub fn list_backup_files(backup_dir: &Path) -> Result<Vec<String>, BackupError> {
    if !backup_dir.exists() {
        return Ok(Vec::new());
    }
    let mut names = Vec::new();
    for entry in std::fs::read_dir(backup_dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    names.sort();
    Ok(names)
}

/// Read one backup file for download.
pub fn read_backup_file(backup_dir: &Path, file_name: &str) -> Result<Vec<u8>, BackupError> {
    let path = checked_path(backup_dir, file_name)?;
    if !path.exists() {
        return Err(BackupError::FileNotFound(file_name.to_string()));
    }
    Ok(std::fs::read(path)?)
}

/// Delete one backup file from disk.
pub fn delete_backup_file(backup_dir: &Path, file_name: &str) -> Result<(), BackupError> {
    let path = checked_path(backup_dir, file_name)?;
    if !path.exists() {
        return Err(BackupError::FileNotFound(file_name.to_string()));
    }
    std::fs::remove_file(path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{OpenStore, SqliteStore};
    use chrono::NaiveDate;

    fn setup() -> (SqliteStore, tempfile::TempDir) {
        (
            SqliteStore::open_in_memory().unwrap(),
            tempfile::tempdir().unwrap(),
        )
    }

    fn contact(key: &str) -> ContactRecord {
        let mut record = ContactRecord::new(key);
        record.name = Some(format!("Contact {}", key));
        record.tags = Some(vec!["vip".to_string(), "retail".to_string()]);
        record.create_date = NaiveDate::from_ymd_opt(2024, 1, 15);
        record.age = Some(2);
        record
    }

    #[test]
    fn test_backup_writes_file_and_registers_rows() {
        let (store, dir) = setup();
        store.insert_contact(&contact("111")).unwrap();
        store.insert_contact(&contact("222")).unwrap();

        let outcome = backup_all(&store, dir.path(), "nightly").unwrap();
        assert_eq!(
            outcome,
            BackupOutcome::Written {
                file_name: "nightly.csv".to_string(),
                rows: 2
            }
        );
        assert!(dir.path().join("nightly.csv").exists());
        assert_eq!(store.backed_up_keys().unwrap().len(), 2);
    }

    #[test]
    fn test_second_backup_skips_already_backed_up_rows() {
        let (store, dir) = setup();
        store.insert_contact(&contact("111")).unwrap();
        backup_all(&store, dir.path(), "first").unwrap();

        let outcome = backup_all(&store, dir.path(), "second").unwrap();
        assert_eq!(outcome, BackupOutcome::NothingNew);
        assert!(!dir.path().join("second.csv").exists());

        // A new contact makes the next backup partial
        store.insert_contact(&contact("222")).unwrap();
        let outcome = backup_all(&store, dir.path(), "third").unwrap();
        assert_eq!(
            outcome,
            BackupOutcome::Written {
                file_name: "third.csv".to_string(),
                rows: 1
            }
        );
    }

    #[test]
    fn test_backup_of_empty_table_is_nothing_new() {
        let (store, dir) = setup();
        assert_eq!(
            backup_all(&store, dir.path(), "empty").unwrap(),
            BackupOutcome::NothingNew
        );
    }

    #[test]
    fn test_restore_round_trips_typed_fields() {
        let (store, dir) = setup();
        store.insert_contact(&contact("111")).unwrap();
        backup_all(&store, dir.path(), "snap").unwrap();

        // Simulate loss of the live row
        store.remove_contact("111").unwrap();
        assert!(store.get_contact("111").unwrap().is_none());

        let restored = restore_from_file(&store, dir.path(), "snap.csv").unwrap();
        assert_eq!(restored, 1);

        let loaded = store.get_contact("111").unwrap().unwrap();
        assert_eq!(loaded.name.as_deref(), Some("Contact 111"));
        assert_eq!(
            loaded.tags,
            Some(vec!["vip".to_string(), "retail".to_string()])
        );
        assert_eq!(loaded.create_date, NaiveDate::from_ymd_opt(2024, 1, 15));
        assert_eq!(loaded.age, Some(2));

        // Restore retires both the file and the backup-table rows
        assert!(!dir.path().join("snap.csv").exists());
        assert!(!store.backup_contains("111").unwrap());
    }

    #[test]
    fn test_restore_skips_keys_no_longer_registered() {
        let (store, dir) = setup();
        store.insert_contact(&contact("111")).unwrap();
        store.insert_contact(&contact("222")).unwrap();
        backup_all(&store, dir.path(), "snap").unwrap();

        // 222 was retired from the backup table out of band
        store.remove_backup("222").unwrap();
        store.remove_contact("111").unwrap();
        store.remove_contact("222").unwrap();

        let restored = restore_from_file(&store, dir.path(), "snap.csv").unwrap();
        assert_eq!(restored, 1);
        assert!(store.get_contact("111").unwrap().is_some());
        assert!(store.get_contact("222").unwrap().is_none());
    }

    #[test]
    fn test_restore_missing_file_errors() {
        let (store, dir) = setup();
        let err = restore_from_file(&store, dir.path(), "nope.csv").unwrap_err();
        assert!(matches!(err, BackupError::FileNotFound(_)));
    }

    #[test]
    fn test_restore_with_no_registered_rows_errors() {
        let (store, dir) = setup();
        store.insert_contact(&contact("111")).unwrap();
        backup_all(&store, dir.path(), "snap").unwrap();
        store.remove_backup("111").unwrap();

        let err = restore_from_file(&store, dir.path(), "snap.csv").unwrap_err();
        assert!(matches!(err, BackupError::NoMatchingRecords));
    }

    #[test]
    fn test_file_listing_and_deletion() {
        let (store, dir) = setup();
        store.insert_contact(&contact("111")).unwrap();
        backup_all(&store, dir.path(), "snap").unwrap();

        assert_eq!(list_backup_files(dir.path()).unwrap(), vec!["snap.csv"]);
        assert!(!read_backup_file(dir.path(), "snap.csv").unwrap().is_empty());

        delete_backup_file(dir.path(), "snap.csv").unwrap();
        assert!(list_backup_files(dir.path()).unwrap().is_empty());
        assert!(matches!(
            delete_backup_file(dir.path(), "snap.csv").unwrap_err(),
            BackupError::FileNotFound(_)
        ));
    }

    #[test]
    fn test_path_traversal_names_rejected() {
        let (store, dir) = setup();
        assert!(matches!(
            read_backup_file(dir.path(), "../etc/passwd").unwrap_err(),
            BackupError::InvalidFileName(_)
        ));
        assert!(matches!(
            backup_all(&store, dir.path(), "a/b").unwrap_err(),
            BackupError::InvalidFileName(_)
        ));
    }
}
