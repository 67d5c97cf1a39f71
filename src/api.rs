//! Transport-independent API layer.
//!
//! `ContactApi` is the single entry point for all consumer-facing
//! operations. Transports (REST, CLI, direct embedding) call `ContactApi`
//! methods and never reach into the store, importer, or backup routines
//! directly.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;

use crate::auth::{self, AuthError, Claims, TokenSigner};
use crate::backup::{self, BackupError, BackupOutcome};
use crate::contact::{ContactRecord, Field, FieldValue};
use crate::export::{self, ExportError};
use crate::import::{decode_workbook, ImportError, ImportSummary, Importer};
use crate::storage::{BackupRow, ContactStore, ImportLogEntry, StorageError, TrashEntry};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("Duplicate contact: {0}")]
    DuplicateKey(String),

    #[error("Contact not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Import(#[from] ImportError),

    #[error(transparent)]
    Backup(#[from] BackupError),

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Storage failure: {0}")]
    Storage(#[from] StorageError),
}

/// Single entry point for all consumer-facing operations.
pub struct ContactApi {
    store: Arc<dyn ContactStore>,
    importer: Importer,
    backup_dir: PathBuf,
    signer: TokenSigner,
}

impl ContactApi {
    pub fn new(store: Arc<dyn ContactStore>, backup_dir: PathBuf, signer: TokenSigner) -> Self {
        let importer = Importer::new(store.clone());
        Self {
            store,
            importer,
            backup_dir,
            signer,
        }
    }

    // --- Contacts ---

    pub fn create_contact(&self, record: &ContactRecord) -> Result<(), ApiError> {
        if record.mobileno.trim().is_empty() {
            return Err(ApiError::Validation("mobileno is required".to_string()));
        }
        if self.store.contact_exists(&record.mobileno)? {
            return Err(ApiError::DuplicateKey(record.mobileno.clone()));
        }
        let mut record = record.clone();
        record.last_updated_date = Some(Utc::now());
        self.store.insert_contact(&record)?;
        Ok(())
    }

    pub fn get_contact(&self, mobileno: &str) -> Result<ContactRecord, ApiError> {
        self.store
            .get_contact(mobileno)?
            .ok_or_else(|| ApiError::NotFound(mobileno.to_string()))
    }

    pub fn list_contacts(&self) -> Result<Vec<ContactRecord>, ApiError> {
        Ok(self.store.list_contacts()?)
    }

    pub fn contact_exists(&self, mobileno: &str) -> Result<bool, ApiError> {
        Ok(self.store.contact_exists(mobileno)?)
    }

    /// Update selected fields on one contact, stamping `last_updated_date`.
    pub fn update_contact(
        &self,
        mobileno: &str,
        fields: &[(Field, FieldValue)],
    ) -> Result<ContactRecord, ApiError> {
        if fields.is_empty() {
            return Err(ApiError::Validation("no fields to update".to_string()));
        }
        self.store
            .update_fields(mobileno, fields, Utc::now())
            .map_err(|e| match e {
                StorageError::ContactNotFound(key) => ApiError::NotFound(key),
                other => ApiError::Storage(other),
            })?;
        self.get_contact(mobileno)
    }

    /// Move a contact to the recycle bin.
    pub fn delete_contact(&self, mobileno: &str) -> Result<(), ApiError> {
        if !self.store.move_to_trash(mobileno, Utc::now())? {
            return Err(ApiError::NotFound(mobileno.to_string()));
        }
        Ok(())
    }

    /// Move several contacts to the recycle bin; returns how many existed.
    pub fn delete_contacts(&self, mobilenos: &[String]) -> Result<usize, ApiError> {
        if mobilenos.is_empty() {
            return Err(ApiError::Validation("no contacts to delete".to_string()));
        }
        let stamp = Utc::now();
        let mut deleted = 0;
        for mobileno in mobilenos {
            if self.store.move_to_trash(mobileno, stamp)? {
                deleted += 1;
            }
        }
        Ok(deleted)
    }

    // --- Import / export ---

    /// Decode an uploaded workbook and run the reconciliation import.
    pub fn import_workbook(
        &self,
        bytes: &[u8],
        selected: &[Field],
        actor: &str,
        file_name: &str,
    ) -> Result<ImportSummary, ApiError> {
        let rows = decode_workbook(bytes)?;
        if rows.is_empty() {
            return Err(ApiError::Validation(
                "workbook contains no data rows".to_string(),
            ));
        }
        Ok(self.importer.import_batch(&rows, selected, actor, file_name)?)
    }

    pub fn import_logs(&self) -> Result<Vec<ImportLogEntry>, ApiError> {
        Ok(self.store.list_import_logs()?)
    }

    pub fn export_csv(&self) -> Result<Vec<u8>, ApiError> {
        let contacts = self.store.list_contacts()?;
        Ok(export::write_csv(&contacts)?)
    }

    pub fn export_xlsx(&self) -> Result<Vec<u8>, ApiError> {
        let contacts = self.store.list_contacts()?;
        Ok(export::write_xlsx(&contacts)?)
    }

    // --- Backup ---

    pub fn backup(&self, name: &str) -> Result<BackupOutcome, ApiError> {
        Ok(backup::backup_all(
            self.store.as_ref(),
            &self.backup_dir,
            name,
        )?)
    }

    pub fn restore(&self, file_name: &str) -> Result<usize, ApiError> {
        Ok(backup::restore_from_file(
            self.store.as_ref(),
            &self.backup_dir,
            file_name,
        )?)
    }

    pub fn list_backups(&self) -> Result<Vec<String>, ApiError> {
        Ok(backup::list_backup_files(&self.backup_dir)?)
    }

    pub fn read_backup(&self, file_name: &str) -> Result<Vec<u8>, ApiError> {
        Ok(backup::read_backup_file(&self.backup_dir, file_name)?)
    }

    pub fn delete_backup(&self, file_name: &str) -> Result<(), ApiError> {
        Ok(backup::delete_backup_file(&self.backup_dir, file_name)?)
    }

    /// Snapshot of the backup table itself, newest entries first.
    pub fn backup_rows(&self) -> Result<Vec<BackupRow>, ApiError> {
        Ok(self.store.list_backup_rows()?)
    }

    // --- Recycle bin ---

    pub fn list_trash(&self) -> Result<Vec<TrashEntry>, ApiError> {
        Ok(self.store.list_trash()?)
    }

    /// Put a deleted contact back into the live table.
    pub fn restore_trash(&self, mobileno: &str) -> Result<ContactRecord, ApiError> {
        self.store
            .restore_from_trash(mobileno)?
            .ok_or_else(|| ApiError::NotFound(mobileno.to_string()))
    }

    pub fn purge_trash(&self, mobileno: &str) -> Result<(), ApiError> {
        if !self.store.remove_trash(mobileno)? {
            return Err(ApiError::NotFound(mobileno.to_string()));
        }
        Ok(())
    }

    // --- Admin ---

    pub fn register_admin(
        &self,
        username: &str,
        password: &str,
        email: Option<&str>,
    ) -> Result<(), ApiError> {
        Ok(auth::register_admin(
            self.store.as_ref(),
            username,
            password,
            email,
        )?)
    }

    pub fn login(&self, username: &str, password: &str) -> Result<String, ApiError> {
        Ok(auth::login(self.store.as_ref(), &self.signer, username, password)?)
    }

    pub fn verify_token(&self, token: &str) -> Result<Claims, ApiError> {
        Ok(self.signer.verify(token)?)
    }
}
