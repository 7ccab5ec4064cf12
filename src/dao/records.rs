use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{PgConnection, types::Json};
use tracing::{Instrument, instrument};

use crate::dao::handle_database_error;
use crate::model::{
    apperror::{ApplicationError, ErrorType},
    kinds::{FieldValue, RecordKind},
    models::{RecordAddInputType, RecordDetailType, RecordPeriod, RecordUpdateInputType},
};

/**
 * Database response type for record queries.
 */
pub type QueryRecordDbResp = (i64, String, i64, String, NaiveDate, i32, i32, Json<BTreeMap<String, FieldValue>>, DateTime<Utc>, DateTime<Utc>, String, String);

const RECORD_COLUMNS: &str = "r.id, r.kind, r.id_opd, o.nama, r.periode, r.tahun, r.bulan, r.data, r.updated_at, r.inserted_at, r.updated_by, r.inserted_by";

/**
 * SQL query to list records of one kind, optionally for one agency. Newest period first.
 */
fn query_record_list() -> String {
    format!(
        "SELECT {RECORD_COLUMNS} FROM monthly_record r JOIN opd o ON o.id = r.id_opd
         WHERE r.kind = $1 AND ($2::bigint IS NULL OR r.id_opd = $2)
         ORDER BY r.tahun DESC, r.bulan DESC, r.id_opd, r.id"
    )
}

/**
 * SQL query to get one record of a kind.
 */
fn query_record() -> String {
    format!("SELECT {RECORD_COLUMNS} FROM monthly_record r JOIN opd o ON o.id = r.id_opd WHERE r.id = $1 AND r.kind = $2")
}

/**
 * SQL query to add a record.
 */
const ADD_RECORD: &str = "INSERT INTO monthly_record (kind, id_opd, periode, tahun, bulan, data, inserted_by, updated_by, inserted_at, updated_at)
                          VALUES ($1, $2, $3, $4, $5, $6, $7, $7, now(), now()) RETURNING id";

/**
 * SQL query to update a record. The owning agency is never changed.
 */
const UPDATE_RECORD: &str = "UPDATE monthly_record SET periode = $1, tahun = $2, bulan = $3, data = $4, updated_by = $5, updated_at = now() WHERE id = $6 AND kind = $7";

/**
 * SQL query to delete a record, returning its owner.
 */
const DELETE_RECORD: &str = "DELETE FROM monthly_record WHERE id = $1 AND kind = $2 RETURNING id_opd";

/**
 * DAO for monthly record operations. Every kind lives in the same table, told apart by `kind`.
 */
pub struct RecordDao {}

impl RecordDao {
    pub fn new() -> Self {
        RecordDao {}
    }

    /**
     * Lists the records of a kind.
     *
     * # Arguments
     * `connection`: The database connection.
     * `kind`: Record kind to list.
     * `id_opd`: Restricts the list to one agency when set.
     */
    #[instrument(skip(self, connection), fields(result))]
    pub async fn get_record_list(&self, connection: &mut PgConnection, kind: RecordKind, id_opd: Option<i64>) -> Result<Vec<RecordDetailType>, ApplicationError> {
        let span = tracing::Span::current();
        let results: Vec<QueryRecordDbResp> = sqlx::query_as(&query_record_list())
            .bind(kind.api_endpoint())
            .bind(id_opd)
            .fetch_all(connection)
            .instrument(span)
            .await
            .map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to execute query to get {kind} list: {err}")))?;
        results.into_iter().map(Self::to_detail).collect()
    }

    /**
     * Gets one record of a kind.
     *
     * # Returns
     * `None` when no record of that kind has the id.
     */
    #[instrument(skip(self, connection), fields(result))]
    pub async fn get_record(&self, connection: &mut PgConnection, kind: RecordKind, id: i64) -> Result<Option<RecordDetailType>, ApplicationError> {
        let span = tracing::Span::current();
        let result: Option<QueryRecordDbResp> = sqlx::query_as(&query_record())
            .bind(id)
            .bind(kind.api_endpoint())
            .fetch_optional(connection)
            .instrument(span)
            .await
            .map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to execute query to get {kind}: {err}")))?;
        result.map(Self::to_detail).transpose()
    }

    /**
     * Adds a record.
     *
     * # Returns
     * The generated id.
     */
    #[instrument(skip(self, transaction), fields(result))]
    pub async fn add_record(&self, transaction: &mut PgConnection, record_add_input: RecordAddInputType) -> Result<i64, ApplicationError> {
        let span = tracing::Span::current();
        let (id,): (i64,) = sqlx::query_as(ADD_RECORD)
            .bind(record_add_input.kind.api_endpoint())
            .bind(record_add_input.id_opd)
            .bind(record_add_input.period.periode)
            .bind(record_add_input.period.tahun)
            .bind(record_add_input.period.bulan)
            .bind(Json(record_add_input.fields))
            .bind(record_add_input.claim_name)
            .fetch_one(transaction)
            .instrument(span)
            .await
            .map_err(|err| handle_database_error(err.as_database_error()))?;
        Ok(id)
    }

    /**
     * Updates the period and fields of a record.
     */
    #[instrument(skip(self, transaction), fields(result))]
    pub async fn update_record(&self, transaction: &mut PgConnection, record_update_input: RecordUpdateInputType) -> Result<(), ApplicationError> {
        let span = tracing::Span::current();
        let record_id = record_update_input.id;
        let result = sqlx::query(UPDATE_RECORD)
            .bind(record_update_input.period.periode)
            .bind(record_update_input.period.tahun)
            .bind(record_update_input.period.bulan)
            .bind(Json(record_update_input.fields))
            .bind(record_update_input.claim_name)
            .bind(record_id)
            .bind(record_update_input.kind.api_endpoint())
            .execute(transaction)
            .instrument(span)
            .await
            .map_err(|err| handle_database_error(err.as_database_error()))?;
        if result.rows_affected() == 0 {
            tracing::debug!("Record with id {} not found for update", record_id);
            return Err(ApplicationError::new(ErrorType::NotFound, "Record not found".to_string()));
        }
        if result.rows_affected() > 1 {
            tracing::warn!("Multiple records attempted updated. Rolled back");
            return Err(ApplicationError::new(ErrorType::Application, "Multiple records attempted updated. Rolled back".to_string()));
        }
        Ok(())
    }

    /**
     * Deletes a record.
     *
     * # Returns
     * The id of the agency that owned the record.
     */
    #[instrument(skip(self, transaction), fields(result))]
    pub async fn delete_record(&self, transaction: &mut PgConnection, kind: RecordKind, id: i64) -> Result<i64, ApplicationError> {
        let span = tracing::Span::current();
        let deleted: Vec<(i64,)> = sqlx::query_as(DELETE_RECORD)
            .bind(id)
            .bind(kind.api_endpoint())
            .fetch_all(transaction)
            .instrument(span)
            .await
            .map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to execute query to delete {kind}: {err}")))?;
        match deleted.as_slice() {
            [] => {
                tracing::debug!("Record with id {} not found for deletion", id);
                Err(ApplicationError::new(ErrorType::NotFound, "Record not found".to_string()))
            }
            [(id_opd,)] => Ok(*id_opd),
            _ => {
                tracing::warn!("Multiple records attempted deleted. Rolled back");
                Err(ApplicationError::new(ErrorType::Application, "Multiple records attempted deleted. Rolled back".to_string()))
            }
        }
    }

    fn to_detail(row: QueryRecordDbResp) -> Result<RecordDetailType, ApplicationError> {
        let (id, kind, id_opd, nama_opd, periode, tahun, bulan, data, updated_at, created_at, updated_by, created_by) = row;
        let kind = RecordKind::from_str(&kind).map_err(|()| ApplicationError::new(ErrorType::DatabaseError, format!("Unknown record kind {kind} stored for record {id}")))?;
        Ok(RecordDetailType { id, kind, id_opd, nama_opd, period: RecordPeriod { periode, tahun, bulan }, fields: data.0, updated_at, created_at, updated_by, created_by })
    }
}
