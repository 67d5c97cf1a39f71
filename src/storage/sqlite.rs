//! SQLite storage backend for rolodex

use super::traits::{
    AdminAccount, BackupRow, ContactStore, ImportLogEntry, OpenStore, ReconcileCounts,
    ReconcileRow, StorageError, StorageResult, TrashEntry,
};
use crate::contact::{ContactRecord, Field, FieldKind, FieldValue};
use chrono::{DateTime, Utc};
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::Mutex;

/// SQLite-backed contact store
///
/// Uses a single SQLite database file with tables for live contacts, the
/// backup snapshot, the recycle bin, the import audit log, and admin
/// accounts. Thread-safe via internal mutex on the connection.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

/// Column DDL shared by the three contact-shaped tables.
fn contact_columns_ddl() -> String {
    Field::ALL
        .iter()
        .map(|field| {
            let sql_type = match field.kind() {
                FieldKind::Int | FieldKind::Bool => "INTEGER",
                _ => "TEXT",
            };
            if *field == Field::Mobileno {
                format!("\"{}\" TEXT NOT NULL PRIMARY KEY", field.name())
            } else {
                format!("\"{}\" {}", field.name(), sql_type)
            }
        })
        .collect::<Vec<_>>()
        .join(",\n                ")
}

/// Quoted, comma-separated column list in canonical order.
fn column_list() -> String {
    Field::ALL
        .iter()
        .map(|field| format!("\"{}\"", field.name()))
        .collect::<Vec<_>>()
        .join(", ")
}

/// `?1, ?2, …` placeholder list for `count` parameters, starting at `from`.
fn placeholders(from: usize, count: usize) -> String {
    (from..from + count)
        .map(|i| format!("?{}", i))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Convert a field value to its SQLite representation.
fn value_to_sql(value: &FieldValue) -> StorageResult<SqlValue> {
    Ok(match value {
        FieldValue::Null => SqlValue::Null,
        FieldValue::Text(s) => SqlValue::Text(s.clone()),
        FieldValue::Int(n) => SqlValue::Integer(*n),
        FieldValue::Bool(b) => SqlValue::Integer(*b as i64),
        FieldValue::List(items) => SqlValue::Text(serde_json::to_string(items)?),
        FieldValue::Date(d) => SqlValue::Text(d.to_string()),
        FieldValue::DateTime(t) => SqlValue::Text(t.to_rfc3339()),
    })
}

/// Convert a SQLite value back into the shape the field expects.
fn sql_to_value(field: Field, sql: SqlValue) -> StorageResult<FieldValue> {
    Ok(match sql {
        SqlValue::Null => FieldValue::Null,
        SqlValue::Integer(n) => match field.kind() {
            FieldKind::Bool => FieldValue::Bool(n != 0),
            _ => FieldValue::Int(n),
        },
        SqlValue::Real(x) => FieldValue::Int(x as i64),
        SqlValue::Text(s) => match field.kind() {
            FieldKind::List => FieldValue::List(serde_json::from_str(&s)?),
            FieldKind::Date => FieldValue::Date(
                s.parse()
                    .map_err(|e| StorageError::DateParse(format!("{}: {}", field, e)))?,
            ),
            FieldKind::DateTime => FieldValue::DateTime(
                DateTime::parse_from_rfc3339(&s)
                    .map_err(|e| StorageError::DateParse(format!("{}: {}", field, e)))?
                    .with_timezone(&Utc),
            ),
            _ => FieldValue::Text(s),
        },
        SqlValue::Blob(_) => FieldValue::Null,
    })
}

fn parse_utc(raw: &str) -> StorageResult<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(raw)
        .map_err(|e| StorageError::DateParse(e.to_string()))?
        .with_timezone(&Utc))
}

/// Serialize a record into SQLite values, in canonical column order.
fn record_to_row(record: &ContactRecord) -> StorageResult<Vec<SqlValue>> {
    Field::ALL
        .iter()
        .map(|field| value_to_sql(&record.get(*field)))
        .collect()
}

/// Deserialize a record from a row selected with [`column_list`].
///
/// The outer `rusqlite::Result` carries driver errors so this can sit in a
/// `query_map` closure; the inner result carries shape errors.
fn row_to_record(row: &Row<'_>) -> rusqlite::Result<StorageResult<ContactRecord>> {
    let mut raw = Vec::with_capacity(Field::ALL.len());
    for (i, _) in Field::ALL.iter().enumerate() {
        raw.push(row.get::<_, SqlValue>(i)?);
    }
    Ok((|| {
        let mut record = ContactRecord::default();
        for (field, sql) in Field::ALL.iter().zip(raw) {
            record.set(*field, sql_to_value(*field, sql)?);
        }
        Ok(record)
    })())
}

impl SqliteStore {
    /// Initialize the database schema
    fn init_schema(conn: &Connection) -> StorageResult<()> {
        let contact_cols = contact_columns_ddl();
        conn.execute_batch(&format!(
            r#"
            -- Live contacts, keyed by mobile number
            CREATE TABLE IF NOT EXISTS contacts (
                {contact_cols}
            );

            -- Snapshot rows already written to a backup file
            CREATE TABLE IF NOT EXISTS contacts_backup (
                {contact_cols},
                backup_date TEXT NOT NULL
            );

            -- Recycle bin for deleted contacts
            CREATE TABLE IF NOT EXISTS contacts_delete (
                {contact_cols},
                deleted_date TEXT NOT NULL
            );

            -- One row per completed import
            CREATE TABLE IF NOT EXISTS import_log (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                actor TEXT NOT NULL,
                file_name TEXT NOT NULL,
                inserted INTEGER NOT NULL,
                updated INTEGER NOT NULL,
                timestamp TEXT NOT NULL
            );

            -- Portal admin accounts
            CREATE TABLE IF NOT EXISTS admins (
                username TEXT NOT NULL PRIMARY KEY,
                password_hash TEXT NOT NULL,
                email TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_trash_deleted_date
                ON contacts_delete(deleted_date);
            CREATE INDEX IF NOT EXISTS idx_import_log_timestamp
                ON import_log(timestamp);

            -- Enable WAL mode for concurrent reads during writes
            PRAGMA journal_mode = WAL;
            "#
        ))?;
        Ok(())
    }

}

/// Single-row lookup shared by the three contact-shaped tables. Takes the
/// connection so transactional callers can reuse it under one guard.
fn get_from_table(
    conn: &Connection,
    table: &str,
    mobileno: &str,
) -> StorageResult<Option<ContactRecord>> {
    let sql = format!(
        "SELECT {} FROM {} WHERE \"mobileno\" = ?1",
        column_list(),
        table
    );
    let row = conn
        .query_row(&sql, params![mobileno], row_to_record)
        .optional()?;
    row.transpose()
}

fn contact_exists_on(conn: &Connection, mobileno: &str) -> StorageResult<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM contacts WHERE \"mobileno\" = ?1",
        params![mobileno],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

fn insert_contact_on(conn: &Connection, record: &ContactRecord) -> StorageResult<()> {
    let sql = format!(
        "INSERT INTO contacts ({}) VALUES ({})",
        column_list(),
        placeholders(1, Field::ALL.len())
    );
    conn.execute(&sql, params_from_iter(record_to_row(record)?))?;
    Ok(())
}

fn upsert_contact_on(conn: &Connection, record: &ContactRecord) -> StorageResult<()> {
    let updates = Field::ALL
        .iter()
        .filter(|f| **f != Field::Mobileno)
        .map(|f| format!("\"{0}\" = excluded.\"{0}\"", f.name()))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        "INSERT INTO contacts ({}) VALUES ({}) ON CONFLICT(\"mobileno\") DO UPDATE SET {}",
        column_list(),
        placeholders(1, Field::ALL.len()),
        updates
    );
    conn.execute(&sql, params_from_iter(record_to_row(record)?))?;
    Ok(())
}

fn update_fields_on(
    conn: &Connection,
    mobileno: &str,
    fields: &[(Field, FieldValue)],
    stamped_at: DateTime<Utc>,
) -> StorageResult<()> {
    let mut sets = Vec::new();
    let mut values: Vec<SqlValue> = Vec::new();
    for (i, (field, value)) in fields.iter().enumerate() {
        sets.push(format!("\"{}\" = ?{}", field.name(), i + 1));
        values.push(value_to_sql(value)?);
    }
    let stamp_idx = fields.len() + 1;
    let key_idx = fields.len() + 2;
    sets.push(format!("\"last_updated_date\" = ?{}", stamp_idx));
    values.push(SqlValue::Text(stamped_at.to_rfc3339()));
    values.push(SqlValue::Text(mobileno.to_string()));

    let sql = format!(
        "UPDATE contacts SET {} WHERE \"mobileno\" = ?{}",
        sets.join(", "),
        key_idx
    );
    let changed = conn.execute(&sql, params_from_iter(values))?;
    if changed == 0 {
        return Err(StorageError::ContactNotFound(mobileno.to_string()));
    }
    Ok(())
}

impl OpenStore for SqliteStore {
    fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        Self::init_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

impl ContactStore for SqliteStore {
    // === Contact Operations ===

    fn insert_contact(&self, record: &ContactRecord) -> StorageResult<()> {
        let conn = self.conn.lock().unwrap();
        insert_contact_on(&conn, record)
    }

    fn upsert_contact(&self, record: &ContactRecord) -> StorageResult<()> {
        let conn = self.conn.lock().unwrap();
        upsert_contact_on(&conn, record)
    }

    fn get_contact(&self, mobileno: &str) -> StorageResult<Option<ContactRecord>> {
        let conn = self.conn.lock().unwrap();
        get_from_table(&conn, "contacts", mobileno)
    }

    fn contact_exists(&self, mobileno: &str) -> StorageResult<bool> {
        let conn = self.conn.lock().unwrap();
        contact_exists_on(&conn, mobileno)
    }

    fn list_contacts(&self) -> StorageResult<Vec<ContactRecord>> {
        let conn = self.conn.lock().unwrap();
        let sql = format!(
            "SELECT {} FROM contacts ORDER BY \"mobileno\"",
            column_list()
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([], row_to_record)?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row??);
        }
        Ok(records)
    }

    fn update_fields(
        &self,
        mobileno: &str,
        fields: &[(Field, FieldValue)],
        stamped_at: DateTime<Utc>,
    ) -> StorageResult<()> {
        let conn = self.conn.lock().unwrap();
        update_fields_on(&conn, mobileno, fields, stamped_at)
    }

    fn remove_contact(&self, mobileno: &str) -> StorageResult<bool> {
        let conn = self.conn.lock().unwrap();
        let rows = conn.execute(
            "DELETE FROM contacts WHERE \"mobileno\" = ?1",
            params![mobileno],
        )?;
        Ok(rows > 0)
    }

    // === Import Reconciliation ===

    fn reconcile_batch(
        &self,
        rows: &[ReconcileRow],
        commit_every: usize,
        stamped_at: DateTime<Utc>,
    ) -> StorageResult<ReconcileCounts> {
        let commit_every = commit_every.max(1);

        // The connection guard is held for the whole batch. The BEGIN and
        // its matching COMMIT/ROLLBACK must stay under one guard: released
        // between statements, another caller's write would join the open
        // transaction and vanish with a rollback.
        let conn = self.conn.lock().unwrap();
        conn.execute_batch("BEGIN")?;

        let result = (|| -> StorageResult<ReconcileCounts> {
            let mut counts = ReconcileCounts::default();
            for row in rows {
                if contact_exists_on(&conn, &row.mobileno)? {
                    update_fields_on(&conn, &row.mobileno, &row.fields, stamped_at)?;
                    counts.updated += 1;
                } else {
                    let mut record = ContactRecord::new(row.mobileno.clone());
                    for (field, value) in &row.fields {
                        record.set(*field, value.clone());
                    }
                    record.last_updated_date = Some(stamped_at);
                    insert_contact_on(&conn, &record)?;
                    counts.inserted += 1;
                }

                let applied = (counts.inserted + counts.updated) as usize;
                if applied % commit_every == 0 {
                    conn.execute_batch("COMMIT; BEGIN")?;
                }
            }
            Ok(counts)
        })();

        match result {
            Ok(counts) => match conn.execute_batch("COMMIT") {
                Ok(()) => Ok(counts),
                Err(e) => {
                    let _ = conn.execute_batch("ROLLBACK");
                    Err(e.into())
                }
            },
            Err(e) => {
                // Drop the open chunk; earlier committed chunks stand.
                let _ = conn.execute_batch("ROLLBACK");
                Err(e)
            }
        }
    }

    // === Backup Table ===

    fn backed_up_keys(&self) -> StorageResult<Vec<String>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT \"mobileno\" FROM contacts_backup")?;
        let keys = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(keys)
    }

    fn insert_backup(
        &self,
        record: &ContactRecord,
        backup_date: DateTime<Utc>,
    ) -> StorageResult<()> {
        let conn = self.conn.lock().unwrap();
        let sql = format!(
            "INSERT INTO contacts_backup ({}, backup_date) VALUES ({})",
            column_list(),
            placeholders(1, Field::ALL.len() + 1)
        );
        let mut values = record_to_row(record)?;
        values.push(SqlValue::Text(backup_date.to_rfc3339()));
        conn.execute(&sql, params_from_iter(values))?;
        Ok(())
    }

    fn list_backup_rows(&self) -> StorageResult<Vec<BackupRow>> {
        let conn = self.conn.lock().unwrap();
        let sql = format!(
            "SELECT {}, backup_date FROM contacts_backup
             ORDER BY backup_date DESC, \"mobileno\"",
            column_list()
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([], |row| {
            let record = row_to_record(row)?;
            let backed_up: String = row.get(Field::ALL.len())?;
            Ok((record, backed_up))
        })?;

        let mut entries = Vec::new();
        for row in rows {
            let (record, backed_up) = row?;
            entries.push(BackupRow {
                record: record?,
                backup_date: parse_utc(&backed_up)?,
            });
        }
        Ok(entries)
    }

    fn backup_contains(&self, mobileno: &str) -> StorageResult<bool> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM contacts_backup WHERE \"mobileno\" = ?1",
            params![mobileno],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn remove_backup(&self, mobileno: &str) -> StorageResult<bool> {
        let conn = self.conn.lock().unwrap();
        let rows = conn.execute(
            "DELETE FROM contacts_backup WHERE \"mobileno\" = ?1",
            params![mobileno],
        )?;
        Ok(rows > 0)
    }

    // === Recycle Bin ===

    fn move_to_trash(&self, mobileno: &str, deleted_date: DateTime<Utc>) -> StorageResult<bool> {
        let mut conn = self.conn.lock().unwrap();
        // Copy-then-delete is atomic: a failure must not leave the contact
        // in both tables.
        let tx = conn.transaction()?;

        let Some(record) = get_from_table(&tx, "contacts", mobileno)? else {
            return Ok(false);
        };
        let sql = format!(
            "INSERT INTO contacts_delete ({}, deleted_date) VALUES ({})
             ON CONFLICT(\"mobileno\") DO UPDATE SET deleted_date = excluded.deleted_date",
            column_list(),
            placeholders(1, Field::ALL.len() + 1)
        );
        let mut values = record_to_row(&record)?;
        values.push(SqlValue::Text(deleted_date.to_rfc3339()));
        tx.execute(&sql, params_from_iter(values))?;
        tx.execute(
            "DELETE FROM contacts WHERE \"mobileno\" = ?1",
            params![mobileno],
        )?;
        tx.commit()?;
        Ok(true)
    }

    fn list_trash(&self) -> StorageResult<Vec<TrashEntry>> {
        let conn = self.conn.lock().unwrap();
        let sql = format!(
            "SELECT {}, deleted_date FROM contacts_delete ORDER BY deleted_date DESC",
            column_list()
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([], |row| {
            let record = row_to_record(row)?;
            let deleted: String = row.get(Field::ALL.len())?;
            Ok((record, deleted))
        })?;

        let mut entries = Vec::new();
        for row in rows {
            let (record, deleted) = row?;
            entries.push(TrashEntry {
                record: record?,
                deleted_date: parse_utc(&deleted)?,
            });
        }
        Ok(entries)
    }

    fn get_trash(&self, mobileno: &str) -> StorageResult<Option<TrashEntry>> {
        let conn = self.conn.lock().unwrap();
        let sql = format!(
            "SELECT {}, deleted_date FROM contacts_delete WHERE \"mobileno\" = ?1",
            column_list()
        );
        let row = conn
            .query_row(&sql, params![mobileno], |row| {
                let record = row_to_record(row)?;
                let deleted: String = row.get(Field::ALL.len())?;
                Ok((record, deleted))
            })
            .optional()?;

        match row {
            Some((record, deleted)) => Ok(Some(TrashEntry {
                record: record?,
                deleted_date: parse_utc(&deleted)?,
            })),
            None => Ok(None),
        }
    }

    fn restore_from_trash(&self, mobileno: &str) -> StorageResult<Option<ContactRecord>> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        let Some(record) = get_from_table(&tx, "contacts_delete", mobileno)? else {
            return Ok(None);
        };
        upsert_contact_on(&tx, &record)?;
        tx.execute(
            "DELETE FROM contacts_delete WHERE \"mobileno\" = ?1",
            params![mobileno],
        )?;
        tx.commit()?;
        Ok(Some(record))
    }

    fn remove_trash(&self, mobileno: &str) -> StorageResult<bool> {
        let conn = self.conn.lock().unwrap();
        let rows = conn.execute(
            "DELETE FROM contacts_delete WHERE \"mobileno\" = ?1",
            params![mobileno],
        )?;
        Ok(rows > 0)
    }

    // === Audit Log ===

    fn append_import_log(&self, entry: &ImportLogEntry) -> StorageResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO import_log (actor, file_name, inserted, updated, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                entry.actor,
                entry.file_name,
                entry.inserted as i64,
                entry.updated as i64,
                entry.timestamp.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn list_import_logs(&self) -> StorageResult<Vec<ImportLogEntry>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT actor, file_name, inserted, updated, timestamp
             FROM import_log ORDER BY id DESC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, i64>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?;

        let mut entries = Vec::new();
        for row in rows {
            let (actor, file_name, inserted, updated, timestamp) = row?;
            entries.push(ImportLogEntry {
                actor,
                file_name,
                inserted: inserted as u64,
                updated: updated as u64,
                timestamp: parse_utc(&timestamp)?,
            });
        }
        Ok(entries)
    }

    // === Admin Accounts ===

    fn insert_admin(&self, account: &AdminAccount) -> StorageResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO admins (username, password_hash, email) VALUES (?1, ?2, ?3)",
            params![account.username, account.password_hash, account.email],
        )?;
        Ok(())
    }

    fn get_admin(&self, username: &str) -> StorageResult<Option<AdminAccount>> {
        let conn = self.conn.lock().unwrap();
        let row = conn
            .query_row(
                "SELECT username, password_hash, email FROM admins WHERE username = ?1",
                params![username],
                |row| {
                    Ok(AdminAccount {
                        username: row.get(0)?,
                        password_hash: row.get(1)?,
                        email: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(row)
    }
}
