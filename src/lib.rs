//! Rolodex: contact directory backend.
//!
//! A SQLite-backed contact store with a reconciliation-style bulk import:
//! uploaded spreadsheets are merged into the live table keyed by mobile
//! number, updating only the columns the caller selects. Around that core
//! sit CSV/xlsx export, incremental backups with restore, a recycle bin
//! for deleted contacts, and a token-authenticated REST transport.
//!
//! # Example
//!
//! ```no_run
//! use rolodex::{ContactApi, OpenStore, SqliteStore, TokenSigner};
//! use std::sync::Arc;
//!
//! let store = Arc::new(SqliteStore::open("contacts.db").unwrap());
//! let api = ContactApi::new(store, "backups".into(), TokenSigner::new("secret"));
//! ```

pub mod api;
pub mod auth;
pub mod backup;
pub mod config;
pub mod contact;
pub mod export;
pub mod http;
pub mod import;
pub mod storage;

pub use api::{ApiError, ContactApi};
pub use auth::{Claims, TokenSigner};
pub use backup::BackupOutcome;
pub use config::Config;
pub use contact::{ContactRecord, Field, FieldKind, FieldValue};
pub use import::{ImportError, ImportSummary, Importer, RawRow};
pub use storage::{
    BackupRow, ContactStore, OpenStore, SqliteStore, StorageError, StorageResult, TrashEntry,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
