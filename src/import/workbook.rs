//! Excel workbook decoding for the bulk importer
//!
//! Accepts a single-worksheet `.xlsx` upload, maps the header row onto
//! [`Field`]s, and converts every data cell into the [`FieldValue`] shape
//! that field expects. Spreadsheets are messy: phone numbers arrive as
//! floats, booleans as text, dates as serial numbers — the converters here
//! absorb all of that so the reconciliation loop sees clean values.

use super::{ImportError, RawRow};
use crate::contact::{parse_list_field, ContactRecord, Field, FieldKind, FieldValue};
use calamine::{Data, Reader, Xlsx};
use std::collections::HashMap;
use std::io::Cursor;

/// Decode an `.xlsx` byte buffer into raw rows.
///
/// Rejects workbooks with more or fewer than one worksheet and headers
/// that match no known field. Fully empty data rows are skipped.
pub fn decode_workbook(bytes: &[u8]) -> Result<Vec<RawRow>, ImportError> {
    let mut workbook = Xlsx::new(Cursor::new(bytes.to_vec()))
        .map_err(|e| ImportError::Validation(format!("unreadable workbook: {}", e)))?;

    let sheet_names = workbook.sheet_names().to_vec();
    if sheet_names.len() != 1 {
        return Err(ImportError::Validation(format!(
            "workbook must contain exactly one sheet, found {}",
            sheet_names.len()
        )));
    }

    let range = workbook
        .worksheet_range(&sheet_names[0])
        .map_err(|e| ImportError::Validation(format!("unreadable worksheet: {}", e)))?;

    let mut row_iter = range.rows();
    let header_cells = row_iter
        .next()
        .ok_or_else(|| ImportError::Validation("worksheet has no header row".to_string()))?;

    // Map header row onto fields; collect every unknown header so the
    // caller sees them all at once.
    let mut columns: Vec<Option<Field>> = Vec::with_capacity(header_cells.len());
    let mut invalid = Vec::new();
    for cell in header_cells {
        let header = cell_text(cell);
        if header.is_empty() {
            columns.push(None);
            continue;
        }
        match Field::from_header(&header) {
            Some(field) => columns.push(Some(field)),
            None => {
                invalid.push(header);
                columns.push(None);
            }
        }
    }
    if !invalid.is_empty() {
        return Err(ImportError::Validation(format!(
            "invalid headers found in the uploaded file: {}",
            invalid.join(", ")
        )));
    }

    let mut rows = Vec::new();
    for (i, cells) in row_iter.enumerate() {
        if cells.iter().all(|c| matches!(c, Data::Empty)) {
            continue;
        }

        let mut values = HashMap::new();
        for (column, cell) in columns.iter().zip(cells) {
            let Some(field) = column else { continue };
            let value = cell_to_value(*field, cell);
            if !value.is_null() {
                values.insert(*field, value);
            }
        }

        rows.push(RawRow {
            // Sheet numbering: header is row 1, first data row is row 2.
            sheet_row: (i + 2) as u32,
            values,
        });
    }

    Ok(rows)
}

/// Render a cell as plain text.
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        Data::Int(n) => n.to_string(),
        Data::Float(f) => float_text(*f),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => dt
            .as_datetime()
            .map(|d| d.to_string())
            .unwrap_or_default(),
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Error(_) => String::new(),
    }
}

/// Integral floats render without the trailing `.0` — phone numbers and
/// pincodes come back from Excel as floats.
fn float_text(f: f64) -> String {
    if f.fract() == 0.0 && f.abs() < 9e15 {
        format!("{}", f as i64)
    } else {
        f.to_string()
    }
}

/// Convert one cell into the value shape `field` expects.
fn cell_to_value(field: Field, cell: &Data) -> FieldValue {
    if matches!(cell, Data::Empty | Data::Error(_)) {
        return FieldValue::Null;
    }

    match field.kind() {
        FieldKind::Text => {
            let text = cell_text(cell);
            if text.is_empty() {
                FieldValue::Null
            } else {
                FieldValue::Text(text)
            }
        }
        FieldKind::Int => match cell {
            Data::Int(n) => FieldValue::Int(*n),
            Data::Float(f) => FieldValue::Int(*f as i64),
            Data::String(s) => s
                .trim()
                .parse::<i64>()
                .map(FieldValue::Int)
                .unwrap_or(FieldValue::Null),
            _ => FieldValue::Null,
        },
        FieldKind::Bool => match cell {
            Data::Bool(b) => FieldValue::Bool(*b),
            Data::Int(n) => FieldValue::Bool(*n != 0),
            Data::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" | "1" => FieldValue::Bool(true),
                "false" | "no" | "0" => FieldValue::Bool(false),
                _ => FieldValue::Null,
            },
            _ => FieldValue::Null,
        },
        FieldKind::List => {
            let text = cell_text(cell);
            if text.is_empty() {
                FieldValue::Null
            } else {
                FieldValue::List(parse_list_field(&text))
            }
        }
        FieldKind::Date | FieldKind::DateTime => match cell {
            Data::DateTime(dt) => dt
                .as_datetime()
                .map(|d| FieldValue::Date(d.date()))
                .unwrap_or(FieldValue::Null),
            _ => ContactRecord::coerce(field, &cell_text(cell)),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_float_text_strips_integral_suffix() {
        assert_eq!(float_text(9876543210.0), "9876543210");
        assert_eq!(float_text(2.5), "2.5");
    }

    #[test]
    fn test_text_cell_from_float() {
        let value = cell_to_value(Field::Mobileno, &Data::Float(9876543210.0));
        assert_eq!(value, FieldValue::Text("9876543210".to_string()));
    }

    #[test]
    fn test_bool_cell_from_text() {
        assert_eq!(
            cell_to_value(Field::WhatsappAvailability, &Data::String("Yes".to_string())),
            FieldValue::Bool(true)
        );
        assert_eq!(
            cell_to_value(Field::WhatsappAvailability, &Data::String("maybe".to_string())),
            FieldValue::Null
        );
    }

    #[test]
    fn test_int_cell_from_string() {
        assert_eq!(
            cell_to_value(Field::Age, &Data::String(" 3 ".to_string())),
            FieldValue::Int(3)
        );
    }

    #[test]
    fn test_list_cell_parses_bracket_rendering() {
        let value = cell_to_value(Field::Tags, &Data::String("[vip, retail]".to_string()));
        assert_eq!(
            value,
            FieldValue::List(vec!["vip".to_string(), "retail".to_string()])
        );
    }

    #[test]
    fn test_date_cell_from_iso_string() {
        let value = cell_to_value(Field::CreateDate, &Data::String("2024-02-01".to_string()));
        assert_eq!(
            value,
            FieldValue::Date(chrono::NaiveDate::from_ymd_opt(2024, 2, 1).unwrap())
        );
    }

    #[test]
    fn test_empty_cell_is_null() {
        assert_eq!(cell_to_value(Field::Name, &Data::Empty), FieldValue::Null);
    }
}
