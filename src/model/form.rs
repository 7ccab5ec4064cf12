use std::collections::BTreeMap;

use serde_json::Value;

use crate::model::{
    apperror::{ApplicationError, FieldError},
    kinds::{FieldValue, RecordKind},
    models::{RecordAddInputType, RecordDraft, RecordPeriod, RecordUpdateInputType},
};

/**
 * Turns submitted drafts of one record kind into create or update payloads.
 *
 * All domain validation for records happens here. Handlers and services only move the payloads.
 */
#[derive(Debug, Clone, Copy)]
pub struct RecordForm {
    kind: RecordKind,
}

impl RecordForm {
    pub fn new(kind: RecordKind) -> Self {
        RecordForm { kind }
    }

    /**
     * Builds a create payload.
     *
     * # Arguments
     * `draft`: The submitted record.
     * `scope_opd`: Agency the caller is scoped to, if any. When set it wins over the draft's own `idOpd`,
     * and a conflicting draft value is rejected.
     * `claim_name`: Name of the user submitting the form.
     */
    pub fn create(&self, draft: RecordDraft, scope_opd: Option<i64>, claim_name: String) -> Result<RecordAddInputType, ApplicationError> {
        let mut field_errors = Vec::new();
        let id_opd = match (scope_opd, draft.id_opd) {
            (Some(scope), Some(submitted)) if scope != submitted => {
                field_errors.push(FieldError::new("idOpd", "Does not match the selected OPD"));
                None
            }
            (Some(scope), _) if scope > 0 => Some(scope),
            (Some(_), _) => {
                field_errors.push(FieldError::new("idOpd", "Must be a positive id"));
                None
            }
            (None, Some(submitted)) if submitted > 0 => Some(submitted),
            (None, Some(_)) => {
                field_errors.push(FieldError::new("idOpd", "Must be a positive id"));
                None
            }
            (None, None) => {
                field_errors.push(FieldError::new("idOpd", "Required"));
                None
            }
        };
        let (period, fields) = self.check(&draft, &mut field_errors);
        match (id_opd, period, fields) {
            (Some(id_opd), Some(period), Some(fields)) if field_errors.is_empty() => Ok(RecordAddInputType { kind: self.kind, id_opd, period, fields, claim_name }),
            _ => Err(ApplicationError::validation(field_errors)),
        }
    }

    /**
     * Builds an update payload. `idOpd` in the draft is ignored because ownership never changes.
     */
    pub fn update(&self, id: i64, draft: RecordDraft, claim_name: String) -> Result<RecordUpdateInputType, ApplicationError> {
        let mut field_errors = Vec::new();
        let (period, fields) = self.check(&draft, &mut field_errors);
        match (period, fields) {
            (Some(period), Some(fields)) if field_errors.is_empty() => Ok(RecordUpdateInputType { kind: self.kind, id, period, fields, claim_name }),
            _ => Err(ApplicationError::validation(field_errors)),
        }
    }

    fn check(&self, draft: &RecordDraft, field_errors: &mut Vec<FieldError>) -> (Option<RecordPeriod>, Option<BTreeMap<String, FieldValue>>) {
        let tahun = period_part("tahun", draft.tahun.as_ref(), field_errors);
        let bulan = period_part("bulan", draft.bulan.as_ref(), field_errors);
        let period = match (tahun, bulan) {
            (Ok(tahun), Ok(bulan)) => RecordPeriod::resolve(tahun, bulan, draft.periode).map_err(|errors| field_errors.extend(errors)).ok(),
            _ => None,
        };
        let fields = self.kind.validate_fields(&draft.fields).map_err(|errors| field_errors.extend(errors)).ok();
        (period, fields)
    }
}

/**
 * Reads `tahun` or `bulan`. Numbers may arrive as strings, and an empty string counts as missing.
 */
fn period_part(field: &str, value: Option<&Value>, field_errors: &mut Vec<FieldError>) -> Result<Option<i32>, ()> {
    let parsed = match value {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Number(number)) => number.as_i64().and_then(|n| i32::try_from(n).ok()),
        Some(Value::String(raw)) if raw.trim().is_empty() => return Ok(None),
        Some(Value::String(raw)) => raw.trim().parse::<i32>().ok(),
        Some(_) => None,
    };
    parsed.map(Some).ok_or_else(|| field_errors.push(FieldError::new(field, "Must be a whole number")))
}
