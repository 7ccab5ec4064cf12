use std::collections::BTreeMap;

use actix_web::{
    HttpRequest, HttpResponse, ResponseError,
    error::{JsonPayloadError, QueryPayloadError},
    http::StatusCode,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::error;

use crate::model::{
    apperror::{ApplicationError, ErrorType},
    kinds::FieldValue,
    models::{OpdAddInputType, OpdDetailType, PermissionDetailType, PermissionListOutputType, RecordDetailType, RecordDraft, RecordPageType, ResourceDescriptorType, UploadedImageType},
};

/***************** Opd models *********************/

/**
 * Request body for creating an agency. Missing fields are reported as validation errors.
 */
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpdAddRequest {
    pub nama: Option<String>,
    pub singkatan: Option<String>,
    pub slug: Option<String>,
}

impl OpdAddRequest {
    pub fn into_input(self, created_by: String) -> OpdAddInputType {
        OpdAddInputType { nama: self.nama.unwrap_or_default(), singkatan: self.singkatan.unwrap_or_default(), slug: self.slug.unwrap_or_default(), created_by }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OpdResponse {
    id: i64,
    nama: String,
    singkatan: String,
    slug: String,
    created_at: DateTime<Utc>,
    created_by: String,
}

impl From<OpdDetailType> for OpdResponse {
    fn from(opd: OpdDetailType) -> Self {
        OpdResponse { id: opd.id, nama: opd.nama, singkatan: opd.singkatan, slug: opd.slug, created_at: opd.created_at, created_by: opd.created_by }
    }
}

/***************** Record models *********************/

/**
 * Envelope keys a client may echo back from a listed row. They are never written.
 */
const READ_ONLY_KEYS: [&str; 6] = ["id", "namaOpd", "createdAt", "updatedAt", "createdBy", "updatedBy"];

/**
 * Query parameter scoping record lists and creates to one agency.
 */
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpdScopeQuery {
    pub opd_id: Option<i64>,
}

/**
 * A submitted record: envelope fields plus the kind's own fields side by side.
 */
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordDraftRequest {
    pub id_opd: Option<i64>,
    pub tahun: Option<Value>,
    pub bulan: Option<Value>,
    pub periode: Option<NaiveDate>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl From<RecordDraftRequest> for RecordDraft {
    fn from(request: RecordDraftRequest) -> Self {
        let mut fields = request.fields;
        for key in READ_ONLY_KEYS {
            fields.remove(key);
        }
        RecordDraft { id_opd: request.id_opd, tahun: request.tahun, bulan: request.bulan, periode: request.periode, fields }
    }
}

/**
 * A stored record in its flat wire shape.
 */
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordResponse {
    id: i64,
    periode: NaiveDate,
    tahun: i32,
    bulan: i32,
    id_opd: i64,
    nama_opd: String,
    #[serde(flatten)]
    fields: BTreeMap<String, FieldValue>,
    updated_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
    updated_by: String,
    created_by: String,
}

impl From<RecordDetailType> for RecordResponse {
    fn from(record: RecordDetailType) -> Self {
        RecordResponse {
            id: record.id,
            periode: record.period.periode,
            tahun: record.period.tahun,
            bulan: record.period.bulan,
            id_opd: record.id_opd,
            nama_opd: record.nama_opd,
            fields: record.fields,
            updated_at: record.updated_at,
            created_at: record.created_at,
            updated_by: record.updated_by,
            created_by: record.created_by,
        }
    }
}

/***************** Resource descriptor models *********************/

#[derive(Debug, Serialize)]
pub struct ColumnElement {
    key: &'static str,
    title: &'static str,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    column_type: Option<&'static str>,
}

/**
 * The zero value draft a create form starts from.
 */
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DefaultDataElement {
    periode: NaiveDate,
    tahun: i32,
    bulan: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    id_opd: Option<i64>,
    #[serde(flatten)]
    fields: BTreeMap<String, FieldValue>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceDescriptorResponse {
    title: String,
    description: String,
    api_endpoint: &'static str,
    query_key: Vec<Value>,
    columns: Vec<ColumnElement>,
    default_data: DefaultDataElement,
    #[serde(skip_serializing_if = "Option::is_none")]
    opd_id: Option<i64>,
}

impl From<ResourceDescriptorType> for ResourceDescriptorResponse {
    fn from(descriptor: ResourceDescriptorType) -> Self {
        let columns = descriptor
            .columns
            .into_iter()
            .map(|column| ColumnElement { key: column.key, title: column.title, column_type: column.numeric.then_some("numeric") })
            .collect();
        let default_data = DefaultDataElement {
            periode: descriptor.default_period.periode,
            tahun: descriptor.default_period.tahun,
            bulan: descriptor.default_period.bulan,
            id_opd: descriptor.opd_id,
            fields: descriptor.default_fields,
        };
        ResourceDescriptorResponse {
            title: descriptor.title,
            description: descriptor.description,
            api_endpoint: descriptor.kind.api_endpoint(),
            query_key: descriptor.query_key.parts(),
            columns,
            default_data,
            opd_id: descriptor.opd_id,
        }
    }
}

/**
 * An agency page: the agency, the CRUD descriptor scoped to it and its current rows.
 */
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordPageResponse {
    opd: OpdResponse,
    resource: ResourceDescriptorResponse,
    records: Vec<RecordResponse>,
}

impl From<RecordPageType> for RecordPageResponse {
    fn from(page: RecordPageType) -> Self {
        RecordPageResponse {
            opd: OpdResponse::from(page.agency),
            resource: ResourceDescriptorResponse::from(page.descriptor),
            records: page.records.into_iter().map(RecordResponse::from).collect(),
        }
    }
}

/***************** Permission models *********************/

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionElement {
    id: i64,
    name: String,
    resource: String,
    action: String,
    description: Option<String>,
}

impl From<PermissionDetailType> for PermissionElement {
    fn from(permission: PermissionDetailType) -> Self {
        PermissionElement { id: permission.id, name: permission.name, resource: permission.resource, action: permission.action, description: permission.description }
    }
}

#[derive(Debug, Serialize)]
pub struct PermissionListResponse {
    permissions: Vec<PermissionElement>,
    grouped: BTreeMap<String, Vec<PermissionElement>>,
}

impl From<PermissionListOutputType> for PermissionListResponse {
    fn from(output: PermissionListOutputType) -> Self {
        PermissionListResponse {
            permissions: output.permissions.into_iter().map(PermissionElement::from).collect(),
            grouped: output.grouped.into_iter().map(|(resource, permissions)| (resource, permissions.into_iter().map(PermissionElement::from).collect())).collect(),
        }
    }
}

/***************** Upload models *********************/

#[derive(Debug, Serialize)]
pub struct UploadImageResponse {
    url: String,
    filename: String,
    size: usize,
    #[serde(rename = "type")]
    content_type: String,
}

impl From<UploadedImageType> for UploadImageResponse {
    fn from(image: UploadedImageType) -> Self {
        UploadImageResponse { url: image.data_url, filename: image.filename, size: image.size, content_type: image.content_type }
    }
}

/***************** Google models *********************/

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleAuthQuery {
    pub return_url: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleAuthResponse {
    pub auth_url: String,
}

/***************** Error models *********************/

#[derive(Debug, Serialize)]
pub struct FieldErrorElement {
    pub field: String,
    pub message: String,
}

/**
 * Custom error response for the application.
 */
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /**
     * The error code associated with the error type.
     */
    pub code: u16,
    /**
     * A human-readable message describing the error.
     */
    pub message: String,
    /**
     * Offending fields of a validation error.
     */
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<FieldErrorElement>,
}

impl ResponseError for ApplicationError {
    fn status_code(&self) -> StatusCode {
        get_statuscode(&self.error_type)
    }

    /**
     * Generates an error response for the application error. Server side details are logged, not returned.
     */
    fn error_response(&self) -> HttpResponse {
        let status_code = self.status_code();
        let message = if status_code.is_server_error() && self.error_type != ErrorType::Unavailable {
            error!(error_type = ?self.error_type, "Request failed: {}", self.message);
            "Internal server error".to_string()
        } else {
            self.message.clone()
        };
        let errors = self.field_errors.iter().map(|field_error| FieldErrorElement { field: field_error.field.clone(), message: field_error.message.clone() }).collect();
        HttpResponse::build(status_code).json(ErrorResponse { code: get_error_code(&self.error_type), message, errors })
    }
}

/**
 * Maps application errors to HTTP status codes.
 *
 * # Arguments
 * `application_error`: The type of error that occurred.
 *
 * # Returns
 * The corresponding HTTP status code.
 */
fn get_statuscode(application_error: &ErrorType) -> StatusCode {
    match application_error {
        ErrorType::JwtAuthorization => StatusCode::UNAUTHORIZED,
        ErrorType::Forbidden => StatusCode::FORBIDDEN,
        ErrorType::Validation => StatusCode::BAD_REQUEST,
        ErrorType::NotFound => StatusCode::NOT_FOUND,
        ErrorType::ConstraintViolation => StatusCode::CONFLICT,
        ErrorType::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        ErrorType::Initialization | ErrorType::DatabaseError | ErrorType::Application => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/**
 * Maps application errors to error codes.
 */
fn get_error_code(application_error: &ErrorType) -> u16 {
    match application_error {
        ErrorType::JwtAuthorization => 1000,
        ErrorType::Initialization => 1001,
        ErrorType::Forbidden => 1002,
        ErrorType::DatabaseError => 1003,
        ErrorType::Validation => 1004,
        ErrorType::NotFound => 1005,
        ErrorType::ConstraintViolation => 1006,
        ErrorType::Unavailable => 1007,
        ErrorType::Application => 1008,
    }
}

/**
 * Reports malformed json bodies in the common error shape.
 */
pub fn json_error_handler(err: JsonPayloadError, _http_request: &HttpRequest) -> actix_web::Error {
    ApplicationError::new(ErrorType::Validation, format!("Invalid request body: {err}")).into()
}

/**
 * Maps query string deserialization failures to a field error. A malformed `opdId` is named, anything else is
 * reported against `query`.
 */
pub fn query_error_handler(err: QueryPayloadError, http_request: &HttpRequest) -> actix_web::Error {
    let bad_opd_id = url::form_urlencoded::parse(http_request.query_string().as_bytes()).any(|(key, value)| key == "opdId" && value.trim().parse::<i64>().is_err());
    if bad_opd_id {
        ApplicationError::invalid_field("opdId", "Must be a whole number").into()
    } else {
        ApplicationError::invalid_field("query", &format!("Invalid query string: {err}")).into()
    }
}

#[cfg(test)]
mod test {
    use actix_web::body::to_bytes;
    use serde_json::json;

    use super::*;
    use crate::{
        model::{apperror::FieldError, kinds::RecordKind, models::RecordPeriod},
        service::resources::describe,
    };

    async fn body_of(error: ApplicationError) -> (StatusCode, Value) {
        let response = error.error_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body()).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[actix_web::test]
    async fn test_validation_error_body() {
        let error = ApplicationError::validation(vec![FieldError::new("image", "No image provided"), FieldError::new("bulan", "Required")]);
        let (status, body) = body_of(error).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], 1004);
        assert_eq!(body["errors"][0], json!({"field": "image", "message": "No image provided"}));
        assert_eq!(body["errors"][1]["field"], "bulan");
    }

    #[actix_web::test]
    async fn test_server_error_is_generic() {
        let (status, body) = body_of(ApplicationError::new(ErrorType::DatabaseError, "connection refused on 10.0.0.4".to_string())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "Internal server error");
        assert!(body.get("errors").is_none());
    }

    #[actix_web::test]
    async fn test_status_codes() {
        assert_eq!(body_of(ApplicationError::new(ErrorType::NotFound, "x".to_string())).await.0, StatusCode::NOT_FOUND);
        assert_eq!(body_of(ApplicationError::new(ErrorType::Forbidden, "x".to_string())).await.0, StatusCode::FORBIDDEN);
        assert_eq!(body_of(ApplicationError::new(ErrorType::ConstraintViolation, "x".to_string())).await.0, StatusCode::CONFLICT);
        let (status, body) = body_of(ApplicationError::new(ErrorType::Unavailable, "Google integration is not configured".to_string())).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["message"], "Google integration is not configured");
    }

    #[test]
    fn test_record_draft_request_drops_read_only_keys() {
        let request: RecordDraftRequest = serde_json::from_value(json!({
            "id": 4, "namaOpd": "Dinas X", "idOpd": 2, "tahun": 2025, "bulan": 3, "golonganI": 10, "updatedBy": "someone"
        }))
        .unwrap();
        let draft = RecordDraft::from(request);
        assert_eq!(draft.id_opd, Some(2));
        assert_eq!(draft.tahun, Some(json!(2025)));
        assert_eq!(draft.fields.len(), 1);
        assert_eq!(draft.fields["golonganI"], json!(10));
    }

    #[test]
    fn test_record_response_is_flat() {
        let period = RecordPeriod::containing(NaiveDate::from_ymd_opt(2025, 3, 1).unwrap());
        let mut fields = RecordKind::StatusPegawai.default_fields();
        fields.insert("jumlahPns".to_string(), FieldValue::Numeric(12));
        let record = RecordDetailType {
            id: 1,
            kind: RecordKind::StatusPegawai,
            id_opd: 2,
            nama_opd: "Dinas X".to_string(),
            period,
            fields,
            updated_at: Utc::now(),
            created_at: Utc::now(),
            updated_by: "tester".to_string(),
            created_by: "tester".to_string(),
        };
        let value = serde_json::to_value(RecordResponse::from(record)).unwrap();
        assert_eq!(value["periode"], "2025-03-01");
        assert_eq!(value["idOpd"], 2);
        assert_eq!(value["namaOpd"], "Dinas X");
        assert_eq!(value["jumlahPns"], 12);
        assert_eq!(value["keterangan"], "");
    }

    #[test]
    fn test_descriptor_response() {
        let descriptor = describe(RecordKind::StatusDokumenWajib, Some(7), NaiveDate::from_ymd_opt(2025, 6, 20).unwrap());
        let value = serde_json::to_value(ResourceDescriptorResponse::from(descriptor)).unwrap();
        assert_eq!(value["apiEndpoint"], "status-dokumen-wajib");
        assert_eq!(value["queryKey"], json!(["status-dokumen-wajib", 7]));
        assert_eq!(value["opdId"], 7);
        assert_eq!(value["columns"][0], json!({"key": "tahun", "title": "Tahun", "type": "numeric"}));
        let nama_dokumen = value["columns"].as_array().unwrap().iter().find(|column| column["key"] == "namaDokumen").unwrap();
        assert!(nama_dokumen.get("type").is_none());
        assert_eq!(value["defaultData"]["periode"], "2025-06-01");
        assert_eq!(value["defaultData"]["idOpd"], 7);
        assert_eq!(value["defaultData"]["jumlahLengkap"], 0);
    }
}
