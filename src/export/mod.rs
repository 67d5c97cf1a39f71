//! Contact table exporters (CSV and Excel)

use crate::contact::{render_list_field, ContactRecord, Field, FieldValue};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Workbook error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Render one field as a flat cell. Lists use the `[a, b]` rendering the
/// restore path knows how to parse.
pub fn field_cell(record: &ContactRecord, field: Field) -> String {
    match record.get(field) {
        FieldValue::Null => String::new(),
        FieldValue::Text(s) => s,
        FieldValue::Int(n) => n.to_string(),
        FieldValue::Bool(b) => b.to_string(),
        FieldValue::List(items) => render_list_field(&items),
        FieldValue::Date(d) => d.to_string(),
        FieldValue::DateTime(t) => t.to_rfc3339(),
    }
}

/// Serialize records to CSV with snake_case column headers, in canonical
/// column order.
pub fn write_csv(records: &[ContactRecord]) -> Result<Vec<u8>, ExportError> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    writer.write_record(Field::ALL.iter().map(|f| f.name()))?;
    for record in records {
        writer.write_record(Field::ALL.iter().map(|f| field_cell(record, *f)))?;
    }

    writer
        .into_inner()
        .map_err(|e| ExportError::Io(e.into_error()))
}

/// Serialize records to a single-sheet `.xlsx` workbook with the
/// human-readable headers an import upload uses.
pub fn write_xlsx(records: &[ContactRecord]) -> Result<Vec<u8>, ExportError> {
    let mut workbook = rust_xlsxwriter::Workbook::new();
    let worksheet = workbook.add_worksheet();

    for (col, field) in Field::ALL.iter().enumerate() {
        worksheet.write_string(0, col as u16, field.header())?;
    }
    for (row, record) in records.iter().enumerate() {
        for (col, field) in Field::ALL.iter().enumerate() {
            worksheet.write_string((row + 1) as u32, col as u16, field_cell(record, *field))?;
        }
    }

    Ok(workbook.save_to_buffer()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn sample() -> ContactRecord {
        let mut record = ContactRecord::new("9876543210");
        record.name = Some("Asha, Verma".to_string());
        record.tags = Some(vec!["vip".to_string(), "retail".to_string()]);
        record.create_date = NaiveDate::from_ymd_opt(2024, 1, 15);
        record.whatsapp_availability = Some(true);
        record
    }

    #[test]
    fn test_csv_has_header_plus_row_per_record() {
        let bytes = write_csv(&[sample()]).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("name,customer_unique_code"));
        // Embedded comma is quoted per RFC 4180
        assert!(lines[1].contains("\"Asha, Verma\""));
        assert!(lines[1].contains("[vip, retail]"));
        assert!(lines[1].contains("2024-01-15"));
    }

    #[test]
    fn test_csv_of_empty_table_is_header_only() {
        let bytes = write_csv(&[]).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert_eq!(text.lines().count(), 1);
    }

    #[test]
    fn test_xlsx_buffer_is_nonempty_zip() {
        let bytes = write_xlsx(&[sample()]).unwrap();
        // xlsx is a zip container; check the magic
        assert_eq!(&bytes[..2], b"PK");
    }

    #[test]
    fn test_field_cell_renders_null_as_empty() {
        let record = ContactRecord::new("1");
        assert_eq!(field_cell(&record, Field::Name), "");
        assert_eq!(field_cell(&record, Field::Mobileno), "1");
    }
}
