//! REST handlers.
//!
//! All contact and backup routes require a bearer token issued by
//! `POST /api/login`. Handlers stay thin: parse, call `ContactApi`,
//! serialize.

use axum::extract::{Multipart, Path, State};
use axum::http::header::{self, AUTHORIZATION};
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use super::error::AppError;
use super::state::AppState;
use crate::auth::Claims;
use crate::backup::BackupOutcome;
use crate::contact::{ContactRecord, Field, FieldValue};
use crate::import::ImportSummary;
use crate::storage::{BackupRow, ImportLogEntry, TrashEntry};

/// Claims of the authenticated admin, extracted from the bearer token.
pub struct AuthAdmin(pub Claims);

impl axum::extract::FromRequestParts<AppState> for AuthAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or(AppError::Unauthorized)?;
        let token = header.strip_prefix("Bearer ").ok_or(AppError::Unauthorized)?;
        let claims = state
            .api
            .verify_token(token)
            .map_err(|_| AppError::Unauthorized)?;
        Ok(AuthAdmin(claims))
    }
}

// --- Auth ---

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub token: String,
}

pub async fn login_handler(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let token = state.api.login(&payload.username, &payload.password)?;
    Ok(Json(LoginResponse { token }))
}

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub email: Option<String>,
}

pub async fn register_handler(
    State(state): State<AppState>,
    _admin: AuthAdmin,
    Json(payload): Json<RegisterRequest>,
) -> Result<StatusCode, AppError> {
    state
        .api
        .register_admin(&payload.username, &payload.password, payload.email.as_deref())?;
    Ok(StatusCode::CREATED)
}

// --- Contacts ---

pub async fn list_contacts_handler(
    State(state): State<AppState>,
    _admin: AuthAdmin,
) -> Result<Json<Vec<ContactRecord>>, AppError> {
    Ok(Json(state.api.list_contacts()?))
}

pub async fn create_contact_handler(
    State(state): State<AppState>,
    _admin: AuthAdmin,
    Json(record): Json<ContactRecord>,
) -> Result<StatusCode, AppError> {
    state.api.create_contact(&record)?;
    Ok(StatusCode::CREATED)
}

pub async fn get_contact_handler(
    State(state): State<AppState>,
    _admin: AuthAdmin,
    Path(mobileno): Path<String>,
) -> Result<Json<ContactRecord>, AppError> {
    Ok(Json(state.api.get_contact(&mobileno)?))
}

pub async fn contact_exists_handler(
    State(state): State<AppState>,
    _admin: AuthAdmin,
    Path(mobileno): Path<String>,
) -> Result<Json<Value>, AppError> {
    let exists = state.api.contact_exists(&mobileno)?;
    Ok(Json(json!({ "exists": exists })))
}

pub async fn update_contact_handler(
    State(state): State<AppState>,
    _admin: AuthAdmin,
    Path(mobileno): Path<String>,
    Json(payload): Json<Map<String, Value>>,
) -> Result<Json<ContactRecord>, AppError> {
    let fields = parse_field_updates(&payload)?;
    Ok(Json(state.api.update_contact(&mobileno, &fields)?))
}

#[derive(Deserialize)]
pub struct BulkDeleteRequest {
    pub mobilenos: Vec<String>,
}

pub async fn bulk_delete_handler(
    State(state): State<AppState>,
    _admin: AuthAdmin,
    Json(payload): Json<BulkDeleteRequest>,
) -> Result<Json<Value>, AppError> {
    let deleted = state.api.delete_contacts(&payload.mobilenos)?;
    Ok(Json(json!({ "deleted": deleted })))
}

pub async fn delete_contact_handler(
    State(state): State<AppState>,
    _admin: AuthAdmin,
    Path(mobileno): Path<String>,
) -> Result<StatusCode, AppError> {
    state.api.delete_contact(&mobileno)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Turn a JSON object into typed field updates.
///
/// The contact key and the server-stamped timestamp cannot be set this way.
fn parse_field_updates(payload: &Map<String, Value>) -> Result<Vec<(Field, FieldValue)>, AppError> {
    let mut fields = Vec::new();
    for (name, value) in payload {
        let field = Field::from_name(name)
            .ok_or_else(|| AppError::MalformedPayload(format!("unknown field: {}", name)))?;
        if matches!(field, Field::Mobileno | Field::LastUpdatedDate) {
            return Err(AppError::MalformedPayload(format!(
                "field cannot be updated: {}",
                name
            )));
        }
        fields.push((field, json_to_field_value(field, value)?));
    }
    Ok(fields)
}

fn json_to_field_value(field: Field, value: &Value) -> Result<FieldValue, AppError> {
    match value {
        Value::Null => Ok(FieldValue::Null),
        Value::Bool(b) => Ok(FieldValue::Bool(*b)),
        Value::Number(n) => Ok(ContactRecord::coerce(field, &n.to_string())),
        Value::String(s) => Ok(ContactRecord::coerce(field, s)),
        Value::Array(items) => {
            let mut list = Vec::with_capacity(items.len());
            for item in items {
                let Value::String(s) = item else {
                    return Err(AppError::MalformedPayload(format!(
                        "list field {} takes strings",
                        field.name()
                    )));
                };
                list.push(s.clone());
            }
            Ok(FieldValue::List(list))
        }
        Value::Object(_) => Err(AppError::MalformedPayload(format!(
            "unsupported value for field {}",
            field.name()
        ))),
    }
}

// --- Import / export ---

pub async fn import_handler(
    State(state): State<AppState>,
    AuthAdmin(claims): AuthAdmin,
    mut multipart: Multipart,
) -> Result<Json<ImportSummary>, AppError> {
    let mut bytes = None;
    let mut selection = None;
    let mut file_name = "upload.xlsx".to_string();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::MalformedPayload(e.to_string()))?
    {
        match field.name().unwrap_or("") {
            "file" => {
                if let Some(name) = field.file_name() {
                    file_name = name.to_string();
                }
                bytes = Some(
                    field
                        .bytes()
                        .await
                        .map_err(|e| AppError::MalformedPayload(e.to_string()))?,
                );
            }
            "fields" => {
                selection = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| AppError::MalformedPayload(e.to_string()))?,
                );
            }
            _ => {}
        }
    }

    let bytes = bytes.ok_or_else(|| AppError::MalformedPayload("missing file part".to_string()))?;
    let selection =
        selection.ok_or_else(|| AppError::MalformedPayload("missing fields part".to_string()))?;
    let selected = parse_selection(&selection)?;

    let api = state.api.clone();
    let actor = claims.sub;
    let summary = tokio::task::spawn_blocking(move || {
        api.import_workbook(&bytes, &selected, &actor, &file_name)
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))??;
    Ok(Json(summary))
}

/// Parse a comma-separated list of column names into fields.
fn parse_selection(raw: &str) -> Result<Vec<Field>, AppError> {
    let mut selected = Vec::new();
    for name in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let field = Field::from_name(name)
            .ok_or_else(|| AppError::MalformedPayload(format!("unknown field: {}", name)))?;
        selected.push(field);
    }
    if selected.is_empty() {
        return Err(AppError::MalformedPayload(
            "no fields selected for import".to_string(),
        ));
    }
    Ok(selected)
}

pub async fn import_logs_handler(
    State(state): State<AppState>,
    _admin: AuthAdmin,
) -> Result<Json<Vec<ImportLogEntry>>, AppError> {
    Ok(Json(state.api.import_logs()?))
}

pub async fn export_csv_handler(
    State(state): State<AppState>,
    _admin: AuthAdmin,
) -> Result<Response, AppError> {
    let bytes = state.api.export_csv()?;
    Ok(file_response(bytes, "contacts.csv", "text/csv"))
}

pub async fn export_xlsx_handler(
    State(state): State<AppState>,
    _admin: AuthAdmin,
) -> Result<Response, AppError> {
    let bytes = state.api.export_xlsx()?;
    Ok(file_response(
        bytes,
        "contacts.xlsx",
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    ))
}

fn file_response(bytes: Vec<u8>, name: &str, content_type: &str) -> Response {
    (
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", name),
            ),
        ],
        bytes,
    )
        .into_response()
}

// --- Backup ---

#[derive(Deserialize)]
pub struct BackupRequest {
    pub name: String,
}

pub async fn backup_handler(
    State(state): State<AppState>,
    _admin: AuthAdmin,
    Json(payload): Json<BackupRequest>,
) -> Result<Json<BackupOutcome>, AppError> {
    Ok(Json(state.api.backup(&payload.name)?))
}

pub async fn list_backups_handler(
    State(state): State<AppState>,
    _admin: AuthAdmin,
) -> Result<Json<Vec<String>>, AppError> {
    Ok(Json(state.api.list_backups()?))
}

pub async fn backup_data_handler(
    State(state): State<AppState>,
    _admin: AuthAdmin,
) -> Result<Json<Vec<BackupRow>>, AppError> {
    Ok(Json(state.api.backup_rows()?))
}

pub async fn download_backup_handler(
    State(state): State<AppState>,
    _admin: AuthAdmin,
    Path(file_name): Path<String>,
) -> Result<Response, AppError> {
    let bytes = state.api.read_backup(&file_name)?;
    Ok(file_response(bytes, &file_name, "text/csv"))
}

pub async fn restore_backup_handler(
    State(state): State<AppState>,
    _admin: AuthAdmin,
    Path(file_name): Path<String>,
) -> Result<Json<Value>, AppError> {
    let restored = state.api.restore(&file_name)?;
    Ok(Json(json!({ "restored": restored })))
}

pub async fn delete_backup_handler(
    State(state): State<AppState>,
    _admin: AuthAdmin,
    Path(file_name): Path<String>,
) -> Result<StatusCode, AppError> {
    state.api.delete_backup(&file_name)?;
    Ok(StatusCode::NO_CONTENT)
}

// --- Recycle bin ---

pub async fn list_trash_handler(
    State(state): State<AppState>,
    _admin: AuthAdmin,
) -> Result<Json<Vec<TrashEntry>>, AppError> {
    Ok(Json(state.api.list_trash()?))
}

pub async fn restore_trash_handler(
    State(state): State<AppState>,
    _admin: AuthAdmin,
    Path(mobileno): Path<String>,
) -> Result<Json<ContactRecord>, AppError> {
    Ok(Json(state.api.restore_trash(&mobileno)?))
}

pub async fn purge_trash_handler(
    State(state): State<AppState>,
    _admin: AuthAdmin,
    Path(mobileno): Path<String>,
) -> Result<StatusCode, AppError> {
    state.api.purge_trash(&mobileno)?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_selection_accepts_known_columns() {
        let selected = parse_selection("name, email_id ,age").unwrap();
        assert_eq!(selected, vec![Field::Name, Field::EmailId, Field::Age]);
    }

    #[test]
    fn test_parse_selection_rejects_unknown_and_empty() {
        assert!(matches!(
            parse_selection("name,bogus").unwrap_err(),
            AppError::MalformedPayload(_)
        ));
        assert!(matches!(
            parse_selection("  , ").unwrap_err(),
            AppError::MalformedPayload(_)
        ));
    }

    #[test]
    fn test_field_updates_reject_key_and_stamp() {
        let mut payload = Map::new();
        payload.insert("mobileno".to_string(), json!("999"));
        assert!(parse_field_updates(&payload).is_err());

        let mut payload = Map::new();
        payload.insert("last_updated_date".to_string(), json!("2024-01-01T00:00:00Z"));
        assert!(parse_field_updates(&payload).is_err());
    }

    #[test]
    fn test_json_values_coerce_by_field_kind() {
        assert_eq!(
            json_to_field_value(Field::Age, &json!(3)).unwrap(),
            FieldValue::Int(3)
        );
        assert_eq!(
            json_to_field_value(Field::Name, &json!("Ada")).unwrap(),
            FieldValue::Text("Ada".to_string())
        );
        assert_eq!(
            json_to_field_value(Field::Tags, &json!(["vip", "retail"])).unwrap(),
            FieldValue::List(vec!["vip".to_string(), "retail".to_string()])
        );
        assert_eq!(
            json_to_field_value(Field::Name, &Value::Null).unwrap(),
            FieldValue::Null
        );
        assert!(json_to_field_value(Field::Tags, &json!([1, 2])).is_err());
        assert!(json_to_field_value(Field::Name, &json!({})).is_err());
    }
}
