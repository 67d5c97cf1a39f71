//! Field inventory for contact records
//!
//! Every column of the contact table appears here exactly once. The enum is
//! the single source of truth for column names, spreadsheet headers, and
//! value kinds — the storage layer, the Excel importer, and the CSV/Excel
//! exporters all iterate `Field::ALL` instead of repeating column lists.

use serde::{Deserialize, Serialize};

/// A named column of a contact record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Name,
    CustomerUniqueCode,
    ClinicCollegeName,
    Designation,
    Department,
    Address,
    Mobileno,
    WhatsappAvailability,
    AlternativeMobileNo,
    AlternativeMobileNo2,
    AlternativeMobileNo3,
    Telephone,
    DrugLicenseNo,
    Gst,
    EmailId,
    Website,
    City,
    State,
    Country,
    District,
    Pincode,
    #[serde(rename = "type")]
    RecordType,
    Source,
    Status,
    Enquiry,
    LastPurchasedDate,
    BranchData,
    UnderSalesPerson,
    CreateDate,
    Age,
    Tags,
    LastUpdatedDate,
}

/// The storage/value shape of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Int,
    Bool,
    /// String list, stored as a JSON array.
    List,
    Date,
    /// Server-stamped timestamp.
    DateTime,
}

impl Field {
    /// Every field, in canonical column order.
    pub const ALL: [Field; 32] = [
        Field::Name,
        Field::CustomerUniqueCode,
        Field::ClinicCollegeName,
        Field::Designation,
        Field::Department,
        Field::Address,
        Field::Mobileno,
        Field::WhatsappAvailability,
        Field::AlternativeMobileNo,
        Field::AlternativeMobileNo2,
        Field::AlternativeMobileNo3,
        Field::Telephone,
        Field::DrugLicenseNo,
        Field::Gst,
        Field::EmailId,
        Field::Website,
        Field::City,
        Field::State,
        Field::Country,
        Field::District,
        Field::Pincode,
        Field::RecordType,
        Field::Source,
        Field::Status,
        Field::Enquiry,
        Field::LastPurchasedDate,
        Field::BranchData,
        Field::UnderSalesPerson,
        Field::CreateDate,
        Field::Age,
        Field::Tags,
        Field::LastUpdatedDate,
    ];

    /// Snake_case column name, as used in SQL and API payloads.
    pub fn name(&self) -> &'static str {
        match self {
            Field::Name => "name",
            Field::CustomerUniqueCode => "customer_unique_code",
            Field::ClinicCollegeName => "clinic_college_name",
            Field::Designation => "designation",
            Field::Department => "department",
            Field::Address => "address",
            Field::Mobileno => "mobileno",
            Field::WhatsappAvailability => "whatsapp_availability",
            Field::AlternativeMobileNo => "alternative_mobile_no",
            Field::AlternativeMobileNo2 => "alternative_mobile_no2",
            Field::AlternativeMobileNo3 => "alternative_mobile_no3",
            Field::Telephone => "telephone",
            Field::DrugLicenseNo => "drug_license_no",
            Field::Gst => "gst",
            Field::EmailId => "email_id",
            Field::Website => "website",
            Field::City => "city",
            Field::State => "state",
            Field::Country => "country",
            Field::District => "district",
            Field::Pincode => "pincode",
            Field::RecordType => "type",
            Field::Source => "source",
            Field::Status => "status",
            Field::Enquiry => "enquiry",
            Field::LastPurchasedDate => "last_purchased_date",
            Field::BranchData => "branch_data",
            Field::UnderSalesPerson => "under_sales_person",
            Field::CreateDate => "create_date",
            Field::Age => "age",
            Field::Tags => "tags",
            Field::LastUpdatedDate => "last_updated_date",
        }
    }

    /// Human-readable spreadsheet header, as it appears in row 1 of an
    /// uploaded or exported workbook.
    pub fn header(&self) -> &'static str {
        match self {
            Field::Name => "Name",
            Field::CustomerUniqueCode => "Customer Unique Code",
            Field::ClinicCollegeName => "Clinic/College/Company Name",
            Field::Designation => "Designation",
            Field::Department => "Department",
            Field::Address => "Address",
            Field::Mobileno => "MobileNo",
            Field::WhatsappAvailability => "Whatsapp Availability",
            Field::AlternativeMobileNo => "Alternative Mobile Number",
            Field::AlternativeMobileNo2 => "Alternative Mobile Number 2",
            Field::AlternativeMobileNo3 => "Alternative Mobile Number 3",
            Field::Telephone => "Telephone",
            Field::DrugLicenseNo => "Drug License No",
            Field::Gst => "GST #",
            Field::EmailId => "E-mail Id",
            Field::Website => "Website",
            Field::City => "City",
            Field::State => "State",
            Field::Country => "Country",
            Field::District => "District",
            Field::Pincode => "Pincode",
            Field::RecordType => "Type",
            Field::Source => "Source",
            Field::Status => "Status(Active/Inactive)",
            Field::Enquiry => "Enquiry",
            Field::LastPurchasedDate => "Last Purchased Date",
            Field::BranchData => "Branch Data",
            Field::UnderSalesPerson => "Under Sales person",
            Field::CreateDate => "Create Date",
            Field::Age => "Age of Data",
            Field::Tags => "Tags",
            Field::LastUpdatedDate => "Last Updated Date",
        }
    }

    pub fn kind(&self) -> FieldKind {
        match self {
            Field::WhatsappAvailability => FieldKind::Bool,
            Field::AlternativeMobileNo
            | Field::AlternativeMobileNo2
            | Field::AlternativeMobileNo3
            | Field::Age => FieldKind::Int,
            Field::Enquiry | Field::Tags => FieldKind::List,
            Field::LastPurchasedDate | Field::CreateDate => FieldKind::Date,
            Field::LastUpdatedDate => FieldKind::DateTime,
            _ => FieldKind::Text,
        }
    }

    /// Resolve a snake_case column name.
    pub fn from_name(name: &str) -> Option<Field> {
        Field::ALL.iter().copied().find(|f| f.name() == name)
    }

    /// Resolve a spreadsheet header.
    pub fn from_header(header: &str) -> Option<Field> {
        Field::ALL.iter().copied().find(|f| f.header() == header)
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_are_unique() {
        let mut seen = std::collections::HashSet::new();
        for field in Field::ALL {
            assert!(seen.insert(field.name()), "duplicate name: {}", field.name());
        }
    }

    #[test]
    fn test_headers_are_unique() {
        let mut seen = std::collections::HashSet::new();
        for field in Field::ALL {
            assert!(seen.insert(field.header()), "duplicate header: {}", field.header());
        }
    }

    #[test]
    fn test_name_round_trip() {
        for field in Field::ALL {
            assert_eq!(Field::from_name(field.name()), Some(field));
        }
        assert_eq!(Field::from_name("no_such_column"), None);
    }

    #[test]
    fn test_header_round_trip() {
        for field in Field::ALL {
            assert_eq!(Field::from_header(field.header()), Some(field));
        }
        assert_eq!(Field::from_header("Unrelated Header"), None);
    }

    #[test]
    fn test_serde_uses_column_names() {
        let json = serde_json::to_string(&Field::RecordType).unwrap();
        assert_eq!(json, "\"type\"");
        let parsed: Field = serde_json::from_str("\"mobileno\"").unwrap();
        assert_eq!(parsed, Field::Mobileno);
    }
}
