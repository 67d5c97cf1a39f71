//! Contact record representation

use super::field::{Field, FieldKind};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Typed value of a single contact field.
///
/// Used wherever fields move individually: selective imports, partial
/// updates, and the spreadsheet decoders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Text(String),
    Int(i64),
    Bool(bool),
    List(Vec<String>),
    Date(NaiveDate),
    DateTime(DateTime<Utc>),
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// True when the value is null or an empty/whitespace-only string.
    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Null => true,
            FieldValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// A single contact row, keyed by `mobileno`.
///
/// Every column except the key is optional: an imported record carries only
/// the fields the operator selected, everything else stays NULL.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContactRecord {
    pub mobileno: String,
    pub name: Option<String>,
    pub customer_unique_code: Option<String>,
    pub clinic_college_name: Option<String>,
    pub designation: Option<String>,
    pub department: Option<String>,
    pub address: Option<String>,
    pub whatsapp_availability: Option<bool>,
    pub alternative_mobile_no: Option<i64>,
    pub alternative_mobile_no2: Option<i64>,
    pub alternative_mobile_no3: Option<i64>,
    pub telephone: Option<String>,
    pub drug_license_no: Option<String>,
    pub gst: Option<String>,
    pub email_id: Option<String>,
    pub website: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub district: Option<String>,
    pub pincode: Option<String>,
    #[serde(rename = "type")]
    pub record_type: Option<String>,
    pub source: Option<String>,
    pub status: Option<String>,
    pub enquiry: Option<Vec<String>>,
    pub last_purchased_date: Option<NaiveDate>,
    pub branch_data: Option<String>,
    pub under_sales_person: Option<String>,
    pub create_date: Option<NaiveDate>,
    pub age: Option<i64>,
    pub tags: Option<Vec<String>>,
    pub last_updated_date: Option<DateTime<Utc>>,
}

fn opt_text(value: &Option<String>) -> FieldValue {
    match value {
        Some(s) => FieldValue::Text(s.clone()),
        None => FieldValue::Null,
    }
}

fn set_text(slot: &mut Option<String>, value: FieldValue) {
    *slot = match value {
        FieldValue::Text(s) => Some(s),
        _ => None,
    };
}

impl ContactRecord {
    pub fn new(mobileno: impl Into<String>) -> Self {
        Self {
            mobileno: mobileno.into(),
            ..Default::default()
        }
    }

    /// Read one field as a [`FieldValue`]. Total over [`Field`].
    pub fn get(&self, field: Field) -> FieldValue {
        match field {
            Field::Mobileno => FieldValue::Text(self.mobileno.clone()),
            Field::Name => opt_text(&self.name),
            Field::CustomerUniqueCode => opt_text(&self.customer_unique_code),
            Field::ClinicCollegeName => opt_text(&self.clinic_college_name),
            Field::Designation => opt_text(&self.designation),
            Field::Department => opt_text(&self.department),
            Field::Address => opt_text(&self.address),
            Field::WhatsappAvailability => match self.whatsapp_availability {
                Some(b) => FieldValue::Bool(b),
                None => FieldValue::Null,
            },
            Field::AlternativeMobileNo => match self.alternative_mobile_no {
                Some(n) => FieldValue::Int(n),
                None => FieldValue::Null,
            },
            Field::AlternativeMobileNo2 => match self.alternative_mobile_no2 {
                Some(n) => FieldValue::Int(n),
                None => FieldValue::Null,
            },
            Field::AlternativeMobileNo3 => match self.alternative_mobile_no3 {
                Some(n) => FieldValue::Int(n),
                None => FieldValue::Null,
            },
            Field::Telephone => opt_text(&self.telephone),
            Field::DrugLicenseNo => opt_text(&self.drug_license_no),
            Field::Gst => opt_text(&self.gst),
            Field::EmailId => opt_text(&self.email_id),
            Field::Website => opt_text(&self.website),
            Field::City => opt_text(&self.city),
            Field::State => opt_text(&self.state),
            Field::Country => opt_text(&self.country),
            Field::District => opt_text(&self.district),
            Field::Pincode => opt_text(&self.pincode),
            Field::RecordType => opt_text(&self.record_type),
            Field::Source => opt_text(&self.source),
            Field::Status => opt_text(&self.status),
            Field::Enquiry => match &self.enquiry {
                Some(items) => FieldValue::List(items.clone()),
                None => FieldValue::Null,
            },
            Field::LastPurchasedDate => match self.last_purchased_date {
                Some(d) => FieldValue::Date(d),
                None => FieldValue::Null,
            },
            Field::BranchData => opt_text(&self.branch_data),
            Field::UnderSalesPerson => opt_text(&self.under_sales_person),
            Field::CreateDate => match self.create_date {
                Some(d) => FieldValue::Date(d),
                None => FieldValue::Null,
            },
            Field::Age => match self.age {
                Some(n) => FieldValue::Int(n),
                None => FieldValue::Null,
            },
            Field::Tags => match &self.tags {
                Some(items) => FieldValue::List(items.clone()),
                None => FieldValue::Null,
            },
            Field::LastUpdatedDate => match self.last_updated_date {
                Some(t) => FieldValue::DateTime(t),
                None => FieldValue::Null,
            },
        }
    }

    /// Write one field from a [`FieldValue`].
    ///
    /// A value whose shape does not match the field's [`FieldKind`] clears
    /// the slot; mismatches are filtered out earlier by the decoders.
    pub fn set(&mut self, field: Field, value: FieldValue) {
        match field {
            Field::Mobileno => {
                if let FieldValue::Text(s) = value {
                    self.mobileno = s;
                }
            }
            Field::Name => set_text(&mut self.name, value),
            Field::CustomerUniqueCode => set_text(&mut self.customer_unique_code, value),
            Field::ClinicCollegeName => set_text(&mut self.clinic_college_name, value),
            Field::Designation => set_text(&mut self.designation, value),
            Field::Department => set_text(&mut self.department, value),
            Field::Address => set_text(&mut self.address, value),
            Field::WhatsappAvailability => {
                self.whatsapp_availability = match value {
                    FieldValue::Bool(b) => Some(b),
                    _ => None,
                }
            }
            Field::AlternativeMobileNo => {
                self.alternative_mobile_no = match value {
                    FieldValue::Int(n) => Some(n),
                    _ => None,
                }
            }
            Field::AlternativeMobileNo2 => {
                self.alternative_mobile_no2 = match value {
                    FieldValue::Int(n) => Some(n),
                    _ => None,
                }
            }
            Field::AlternativeMobileNo3 => {
                self.alternative_mobile_no3 = match value {
                    FieldValue::Int(n) => Some(n),
                    _ => None,
                }
            }
            Field::Telephone => set_text(&mut self.telephone, value),
            Field::DrugLicenseNo => set_text(&mut self.drug_license_no, value),
            Field::Gst => set_text(&mut self.gst, value),
            Field::EmailId => set_text(&mut self.email_id, value),
            Field::Website => set_text(&mut self.website, value),
            Field::City => set_text(&mut self.city, value),
            Field::State => set_text(&mut self.state, value),
            Field::Country => set_text(&mut self.country, value),
            Field::District => set_text(&mut self.district, value),
            Field::Pincode => set_text(&mut self.pincode, value),
            Field::RecordType => set_text(&mut self.record_type, value),
            Field::Source => set_text(&mut self.source, value),
            Field::Status => set_text(&mut self.status, value),
            Field::Enquiry => {
                self.enquiry = match value {
                    FieldValue::List(items) => Some(items),
                    _ => None,
                }
            }
            Field::LastPurchasedDate => {
                self.last_purchased_date = match value {
                    FieldValue::Date(d) => Some(d),
                    _ => None,
                }
            }
            Field::BranchData => set_text(&mut self.branch_data, value),
            Field::UnderSalesPerson => set_text(&mut self.under_sales_person, value),
            Field::CreateDate => {
                self.create_date = match value {
                    FieldValue::Date(d) => Some(d),
                    _ => None,
                }
            }
            Field::Age => {
                self.age = match value {
                    FieldValue::Int(n) => Some(n),
                    _ => None,
                }
            }
            Field::Tags => {
                self.tags = match value {
                    FieldValue::List(items) => Some(items),
                    _ => None,
                }
            }
            Field::LastUpdatedDate => {
                self.last_updated_date = match value {
                    FieldValue::DateTime(t) => Some(t),
                    _ => None,
                }
            }
        }
    }

    /// Coerce a raw text value into the shape the field expects.
    ///
    /// Used by the CSV restore path, where every cell arrives as a string.
    /// Empty strings always become Null. List cells accept the `[a, b]`
    /// rendering produced by the backup writer.
    pub fn coerce(field: Field, raw: &str) -> FieldValue {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return FieldValue::Null;
        }
        match field.kind() {
            FieldKind::Text => FieldValue::Text(trimmed.to_string()),
            FieldKind::Int => trimmed
                .parse::<i64>()
                .map(FieldValue::Int)
                .unwrap_or(FieldValue::Null),
            FieldKind::Bool => match trimmed {
                "true" | "1" => FieldValue::Bool(true),
                "false" | "0" => FieldValue::Bool(false),
                _ => FieldValue::Null,
            },
            FieldKind::List => FieldValue::List(parse_list_field(trimmed)),
            FieldKind::Date => trimmed
                .parse::<NaiveDate>()
                .map(FieldValue::Date)
                .or_else(|_| {
                    // Backup files render dates as full RFC 3339 timestamps.
                    trimmed
                        .parse::<DateTime<Utc>>()
                        .map(|t| FieldValue::Date(t.date_naive()))
                })
                .unwrap_or(FieldValue::Null),
            FieldKind::DateTime => trimmed
                .parse::<DateTime<Utc>>()
                .map(FieldValue::DateTime)
                .unwrap_or(FieldValue::Null),
        }
    }
}

/// Parse the `[a, b]` list rendering used in backup CSVs.
///
/// Tolerates quoted items and drops empty entries.
pub fn parse_list_field(raw: &str) -> Vec<String> {
    let cleaned = raw
        .trim()
        .trim_start_matches('[')
        .trim_end_matches(']')
        .trim();
    if cleaned.is_empty() {
        return Vec::new();
    }
    cleaned
        .split(',')
        .map(|item| item.trim().trim_matches('"').to_string())
        .filter(|item| !item.is_empty())
        .collect()
}

/// Render a string list the way backup CSVs store it: `[a, b]`.
pub fn render_list_field(items: &[String]) -> String {
    format!("[{}]", items.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_set_round_trip_all_fields() {
        let mut record = ContactRecord::new("9876543210");
        record.name = Some("Asha".to_string());
        record.whatsapp_availability = Some(true);
        record.alternative_mobile_no = Some(9123456789);
        record.enquiry = Some(vec!["pricing".to_string(), "demo".to_string()]);
        record.create_date = Some(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        record.age = Some(2);

        let mut copy = ContactRecord::new("9876543210");
        for field in Field::ALL {
            copy.set(field, record.get(field));
        }
        assert_eq!(copy, record);
    }

    #[test]
    fn test_set_null_clears_field() {
        let mut record = ContactRecord::new("1");
        record.city = Some("Pune".to_string());
        record.set(Field::City, FieldValue::Null);
        assert_eq!(record.city, None);
    }

    #[test]
    fn test_coerce_list_round_trip() {
        let items = vec!["follow-up".to_string(), "vip".to_string()];
        let rendered = render_list_field(&items);
        assert_eq!(rendered, "[follow-up, vip]");
        assert_eq!(
            ContactRecord::coerce(Field::Tags, &rendered),
            FieldValue::List(items)
        );
    }

    #[test]
    fn test_coerce_empty_is_null() {
        assert_eq!(ContactRecord::coerce(Field::Age, "  "), FieldValue::Null);
        assert_eq!(ContactRecord::coerce(Field::Name, ""), FieldValue::Null);
    }

    #[test]
    fn test_coerce_date_accepts_rfc3339() {
        let value = ContactRecord::coerce(Field::CreateDate, "2024-05-20T00:00:00+00:00");
        assert_eq!(
            value,
            FieldValue::Date(NaiveDate::from_ymd_opt(2024, 5, 20).unwrap())
        );
    }

    #[test]
    fn test_parse_list_field_handles_quotes_and_blanks() {
        assert_eq!(
            parse_list_field(r#"["a", "b", ""]"#),
            vec!["a".to_string(), "b".to_string()]
        );
        assert!(parse_list_field("[]").is_empty());
    }
}
