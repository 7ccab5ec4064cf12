use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde_json::{Map, Value};

use crate::model::{
    apperror::{ApplicationError, FieldError},
    kinds::{FieldValue, RecordKind},
};

/**
 * Longest accepted agency slug.
 */
pub const MAX_SLUG_LENGTH: usize = 100;

/***************** Agency (OPD) *********************/

/**
 * An agency as stored.
 */
#[derive(Debug, Clone, PartialEq)]
pub struct OpdDetailType {
    pub id: i64,
    pub nama: String,
    pub singkatan: String,
    pub slug: String,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
}

impl From<(i64, String, String, String, DateTime<Utc>, String)> for OpdDetailType {
    fn from(row: (i64, String, String, String, DateTime<Utc>, String)) -> Self {
        OpdDetailType { id: row.0, nama: row.1, singkatan: row.2, slug: row.3, created_at: row.4, created_by: row.5 }
    }
}

/**
 * Input for creating an agency.
 */
#[derive(Debug, Clone)]
pub struct OpdAddInputType {
    pub nama: String,
    pub singkatan: String,
    pub slug: String,
    pub created_by: String,
}

impl OpdAddInputType {
    /**
     * Trims the input and checks every field.
     *
     * # Returns
     * The normalized input, or a validation error naming each offending field.
     */
    pub fn validate(self) -> Result<Self, ApplicationError> {
        let nama = self.nama.trim().to_string();
        let singkatan = self.singkatan.trim().to_string();
        let slug = self.slug.trim().to_string();
        let mut field_errors = Vec::new();
        if nama.is_empty() {
            field_errors.push(FieldError::new("nama", "Required"));
        } else if nama.chars().count() > 255 {
            field_errors.push(FieldError::new("nama", "Must be at most 255 characters"));
        }
        if singkatan.is_empty() {
            field_errors.push(FieldError::new("singkatan", "Required"));
        } else if singkatan.chars().count() > 50 {
            field_errors.push(FieldError::new("singkatan", "Must be at most 50 characters"));
        }
        if slug.is_empty() {
            field_errors.push(FieldError::new("slug", "Required"));
        } else if !is_valid_slug(&slug) {
            field_errors.push(FieldError::new("slug", "Use lowercase letters, digits and single hyphens"));
        }
        if !field_errors.is_empty() {
            return Err(ApplicationError::validation(field_errors));
        }
        Ok(OpdAddInputType { nama, singkatan, slug, created_by: self.created_by })
    }
}

/**
 * Checks that a slug is URL safe: lowercase ascii letters and digits in groups separated by single hyphens.
 */
pub fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty()
        && slug.len() <= MAX_SLUG_LENGTH
        && slug.split('-').all(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()))
}

/**
 * How a route identifies its agency.
 */
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgencyRef {
    /**
     * Routes dedicated to a single agency.
     */
    Id(i64),
    /**
     * Routes resolved from the human facing slug.
     */
    Slug(String),
}

/***************** Monthly records *********************/

/**
 * The reporting period of a record. `periode` is always the first day of `bulan`.
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordPeriod {
    pub periode: NaiveDate,
    pub tahun: i32,
    pub bulan: i32,
}

impl RecordPeriod {
    /**
     * Builds the period from whichever of `tahun`/`bulan` and `periode` the caller supplied.
     * When both are present they must agree.
     */
    pub fn resolve(tahun: Option<i32>, bulan: Option<i32>, periode: Option<NaiveDate>) -> Result<Self, Vec<FieldError>> {
        let mut field_errors = Vec::new();
        if let Some(periode) = periode {
            let derived_tahun = periode.year();
            let derived_bulan = i32::try_from(periode.month()).unwrap_or_default();
            if tahun.is_some_and(|tahun| tahun != derived_tahun) {
                field_errors.push(FieldError::new("tahun", "Does not match periode"));
            }
            if bulan.is_some_and(|bulan| bulan != derived_bulan) {
                field_errors.push(FieldError::new("bulan", "Does not match periode"));
            }
            if !(1900..=9999).contains(&derived_tahun) {
                field_errors.push(FieldError::new("periode", "Year must be between 1900 and 9999"));
            }
            if !field_errors.is_empty() {
                return Err(field_errors);
            }
            return Self::from_parts(derived_tahun, derived_bulan).ok_or_else(|| vec![FieldError::new("periode", "Invalid date")]);
        }
        match tahun {
            None => field_errors.push(FieldError::new("tahun", "Required")),
            Some(tahun) if !(1900..=9999).contains(&tahun) => field_errors.push(FieldError::new("tahun", "Must be between 1900 and 9999")),
            Some(_) => {}
        }
        match bulan {
            None => field_errors.push(FieldError::new("bulan", "Required")),
            Some(bulan) if !(1..=12).contains(&bulan) => field_errors.push(FieldError::new("bulan", "Must be between 1 and 12")),
            Some(_) => {}
        }
        match (tahun, bulan) {
            (Some(tahun), Some(bulan)) if field_errors.is_empty() => Self::from_parts(tahun, bulan).ok_or_else(|| vec![FieldError::new("periode", "Invalid date")]),
            _ => Err(field_errors),
        }
    }

    /**
     * The period containing the given date.
     */
    pub fn containing(date: NaiveDate) -> Self {
        let bulan = i32::try_from(date.month()).unwrap_or(1);
        RecordPeriod { periode: date.with_day(1).unwrap_or(date), tahun: date.year(), bulan }
    }

    fn from_parts(tahun: i32, bulan: i32) -> Option<Self> {
        let month = u32::try_from(bulan).ok()?;
        NaiveDate::from_ymd_opt(tahun, month, 1).map(|periode| RecordPeriod { periode, tahun, bulan })
    }
}

/**
 * A record as submitted by a form, before validation.
 */
#[derive(Debug, Clone, Default)]
pub struct RecordDraft {
    pub id_opd: Option<i64>,
    /**
     * Kept as submitted so a non-numeric value becomes a field error instead of rejecting the whole body.
     */
    pub tahun: Option<Value>,
    pub bulan: Option<Value>,
    pub periode: Option<NaiveDate>,
    pub fields: Map<String, Value>,
}

/**
 * Validated input for creating a record.
 */
#[derive(Debug, Clone, PartialEq)]
pub struct RecordAddInputType {
    pub kind: RecordKind,
    pub id_opd: i64,
    pub period: RecordPeriod,
    pub fields: BTreeMap<String, FieldValue>,
    pub claim_name: String,
}

/**
 * Validated input for updating a record. The owning agency never changes.
 */
#[derive(Debug, Clone, PartialEq)]
pub struct RecordUpdateInputType {
    pub kind: RecordKind,
    pub id: i64,
    pub period: RecordPeriod,
    pub fields: BTreeMap<String, FieldValue>,
    pub claim_name: String,
}

/**
 * A stored record with its envelope resolved.
 */
#[derive(Debug, Clone, PartialEq)]
pub struct RecordDetailType {
    pub id: i64,
    pub kind: RecordKind,
    pub id_opd: i64,
    pub nama_opd: String,
    pub period: RecordPeriod,
    pub fields: BTreeMap<String, FieldValue>,
    pub updated_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_by: String,
    pub created_by: String,
}

/**
 * Identifies one cached list: every record of a kind, optionally scoped to one agency.
 */
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
    pub kind: RecordKind,
    pub id_opd: Option<i64>,
}

impl QueryKey {
    pub fn new(kind: RecordKind, id_opd: Option<i64>) -> Self {
        QueryKey { kind, id_opd }
    }

    /**
     * Every list key that can contain a record of `kind` owned by `id_opd`.
     */
    pub fn affected_by_write(kind: RecordKind, id_opd: i64) -> [QueryKey; 2] {
        [QueryKey::new(kind, None), QueryKey::new(kind, Some(id_opd))]
    }

    /**
     * Wire form, `[apiEndpoint]` or `[apiEndpoint, opdId]`.
     */
    pub fn parts(&self) -> Vec<Value> {
        let mut parts = vec![Value::from(self.kind.api_endpoint())];
        if let Some(id_opd) = self.id_opd {
            parts.push(Value::from(id_opd));
        }
        parts
    }
}

/***************** Resource descriptors *********************/

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDefinition {
    pub key: &'static str,
    pub title: &'static str,
    pub numeric: bool,
}

/**
 * Everything a generic CRUD page needs to render one record kind.
 */
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceDescriptorType {
    pub kind: RecordKind,
    pub opd_id: Option<i64>,
    pub title: String,
    pub description: String,
    pub query_key: QueryKey,
    pub columns: Vec<ColumnDefinition>,
    pub default_period: RecordPeriod,
    pub default_fields: BTreeMap<String, FieldValue>,
}

/**
 * A page bound to one agency: descriptor plus current rows.
 */
#[derive(Debug, Clone)]
pub struct RecordPageType {
    pub agency: OpdDetailType,
    pub descriptor: ResourceDescriptorType,
    pub records: Vec<RecordDetailType>,
}

/***************** Permissions *********************/

#[derive(Debug, Clone, PartialEq)]
pub struct PermissionDetailType {
    pub id: i64,
    pub name: String,
    pub resource: String,
    pub action: String,
    pub description: Option<String>,
}

impl From<(i64, String, String, String, Option<String>)> for PermissionDetailType {
    fn from(row: (i64, String, String, String, Option<String>)) -> Self {
        PermissionDetailType { id: row.0, name: row.1, resource: row.2, action: row.3, description: row.4 }
    }
}

pub struct PermissionListOutputType {
    pub permissions: Vec<PermissionDetailType>,
    pub grouped: BTreeMap<String, Vec<PermissionDetailType>>,
}

/***************** Uploads *********************/

#[derive(Debug, Clone, PartialEq)]
pub struct UploadedImageType {
    pub data_url: String,
    pub filename: String,
    pub size: usize,
    pub content_type: String,
}
