//! Shared helpers for integration tests.

use rolodex::{ContactApi, ContactRecord, Field, OpenStore, SqliteStore, TokenSigner};
use rust_xlsxwriter::Workbook;
use std::sync::Arc;

/// An API over a fresh in-memory store and a temp backup directory.
pub fn test_api() -> (ContactApi, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(SqliteStore::open_in_memory().unwrap());
    let api = ContactApi::new(store, dir.path().to_path_buf(), TokenSigner::new("test-secret"));
    (api, dir)
}

pub fn contact(key: &str, name: &str) -> ContactRecord {
    let mut record = ContactRecord::new(key);
    record.name = Some(name.to_string());
    record
}

/// Build a single-sheet workbook from human headers and string cells.
pub fn workbook_bytes(headers: &[Field], rows: &[Vec<&str>]) -> Vec<u8> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    for (col, field) in headers.iter().enumerate() {
        sheet.write_string(0, col as u16, field.header()).unwrap();
    }
    for (r, row) in rows.iter().enumerate() {
        for (col, cell) in row.iter().enumerate() {
            if !cell.is_empty() {
                sheet.write_string((r + 1) as u32, col as u16, *cell).unwrap();
            }
        }
    }
    workbook.save_to_buffer().unwrap()
}
