//! End-to-end import behavior over real workbook bytes.

mod common;

use common::{contact, test_api, workbook_bytes};
use rolodex::{ApiError, Field, ImportError};

#[test]
fn test_upload_inserts_new_and_updates_existing() {
    let (api, _dir) = test_api();
    api.create_contact(&contact("111", "Ada")).unwrap();

    let bytes = workbook_bytes(
        &[Field::Mobileno, Field::Name, Field::City],
        &[
            vec!["111", "Ada Lovelace", "London"],
            vec!["222", "Grace Hopper", "Arlington"],
        ],
    );
    let summary = api
        .import_workbook(&bytes, &[Field::Name, Field::City], "tester", "contacts.xlsx")
        .unwrap();
    assert_eq!(summary.inserted, 1);
    assert_eq!(summary.updated, 1);

    let ada = api.get_contact("111").unwrap();
    assert_eq!(ada.name.as_deref(), Some("Ada Lovelace"));
    assert_eq!(ada.city.as_deref(), Some("London"));

    let grace = api.get_contact("222").unwrap();
    assert_eq!(grace.name.as_deref(), Some("Grace Hopper"));
    assert!(grace.last_updated_date.is_some());
}

#[test]
fn test_unselected_columns_survive_update() {
    let (api, _dir) = test_api();
    let mut ada = contact("111", "Ada");
    ada.city = Some("London".to_string());
    api.create_contact(&ada).unwrap();

    let bytes = workbook_bytes(
        &[Field::Mobileno, Field::Name, Field::City],
        &[vec!["111", "Ada Lovelace", "Paris"]],
    );
    api.import_workbook(&bytes, &[Field::Name], "tester", "contacts.xlsx")
        .unwrap();

    let loaded = api.get_contact("111").unwrap();
    assert_eq!(loaded.name.as_deref(), Some("Ada Lovelace"));
    // City was not selected, so the spreadsheet value is ignored
    assert_eq!(loaded.city.as_deref(), Some("London"));
}

#[test]
fn test_missing_mobileno_rejects_whole_file() {
    let (api, _dir) = test_api();
    let bytes = workbook_bytes(
        &[Field::Mobileno, Field::Name],
        &[vec!["111", "Ada"], vec!["", "No Key"]],
    );
    let err = api
        .import_workbook(&bytes, &[Field::Name], "tester", "contacts.xlsx")
        .unwrap_err();
    assert!(matches!(err, ApiError::Import(ImportError::Validation(_))));
    assert!(api.list_contacts().unwrap().is_empty());
}

#[test]
fn test_duplicate_mobileno_in_file_is_rejected() {
    let (api, _dir) = test_api();
    let bytes = workbook_bytes(
        &[Field::Mobileno, Field::Name],
        &[vec!["111", "Ada"], vec!["111", "Ada Again"]],
    );
    let err = api
        .import_workbook(&bytes, &[Field::Name], "tester", "contacts.xlsx")
        .unwrap_err();
    assert!(matches!(err, ApiError::Import(ImportError::DuplicateKey(key)) if key == "111"));
    assert!(api.list_contacts().unwrap().is_empty());
}

#[test]
fn test_unknown_header_is_rejected() {
    let (api, _dir) = test_api();
    let mut workbook = rust_xlsxwriter::Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.write_string(0, 0, "MobileNo").unwrap();
    sheet.write_string(0, 1, "Shoe Size").unwrap();
    sheet.write_string(1, 0, "111").unwrap();
    let bytes = workbook.save_to_buffer().unwrap();

    let err = api
        .import_workbook(&bytes, &[Field::Name], "tester", "contacts.xlsx")
        .unwrap_err();
    assert!(
        matches!(&err, ApiError::Import(ImportError::Validation(msg)) if msg.contains("Shoe Size"))
    );
}

#[test]
fn test_multi_sheet_workbook_is_rejected() {
    let (api, _dir) = test_api();
    let mut workbook = rust_xlsxwriter::Workbook::new();
    let first = workbook.add_worksheet();
    first.write_string(0, 0, "MobileNo").unwrap();
    first.write_string(1, 0, "111").unwrap();
    workbook.add_worksheet();
    let bytes = workbook.save_to_buffer().unwrap();

    let err = api
        .import_workbook(&bytes, &[Field::Name], "tester", "contacts.xlsx")
        .unwrap_err();
    assert!(
        matches!(&err, ApiError::Import(ImportError::Validation(msg)) if msg.contains("exactly one sheet"))
    );
    assert!(api.list_contacts().unwrap().is_empty());
}

#[test]
fn test_import_writes_audit_log() {
    let (api, _dir) = test_api();
    let bytes = workbook_bytes(
        &[Field::Mobileno, Field::Name],
        &[vec!["111", "Ada"], vec!["222", "Grace"]],
    );
    api.import_workbook(&bytes, &[Field::Name], "tester", "contacts.xlsx")
        .unwrap();

    let logs = api.import_logs().unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].actor, "tester");
    assert_eq!(logs[0].file_name, "contacts.xlsx");
    assert_eq!(logs[0].inserted, 2);
    assert_eq!(logs[0].updated, 0);
}

#[test]
fn test_rerunning_same_file_updates_instead_of_inserting() {
    let (api, _dir) = test_api();
    let bytes = workbook_bytes(
        &[Field::Mobileno, Field::Name],
        &[vec!["111", "Ada"], vec!["222", "Grace"]],
    );
    let first = api
        .import_workbook(&bytes, &[Field::Name], "tester", "contacts.xlsx")
        .unwrap();
    assert_eq!((first.inserted, first.updated), (2, 0));

    let second = api
        .import_workbook(&bytes, &[Field::Name], "tester", "contacts.xlsx")
        .unwrap();
    assert_eq!((second.inserted, second.updated), (0, 2));
    assert_eq!(api.list_contacts().unwrap().len(), 2);
}

#[test]
fn test_typed_cells_round_trip_through_import() {
    let (api, _dir) = test_api();
    let bytes = workbook_bytes(
        &[
            Field::Mobileno,
            Field::Age,
            Field::Tags,
            Field::CreateDate,
            Field::WhatsappAvailability,
        ],
        &[vec!["111", "3", "vip, retail", "2024-01-15", "true"]],
    );
    api.import_workbook(
        &bytes,
        &[
            Field::Age,
            Field::Tags,
            Field::CreateDate,
            Field::WhatsappAvailability,
        ],
        "tester",
        "contacts.xlsx",
    )
    .unwrap();

    let loaded = api.get_contact("111").unwrap();
    assert_eq!(loaded.age, Some(3));
    assert_eq!(
        loaded.tags,
        Some(vec!["vip".to_string(), "retail".to_string()])
    );
    assert_eq!(
        loaded.create_date,
        chrono::NaiveDate::from_ymd_opt(2024, 1, 15)
    );
    assert_eq!(loaded.whatsapp_availability, Some(true));
}
