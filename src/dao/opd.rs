use chrono::{DateTime, Utc};
use sqlx::PgConnection;
use tracing::{Instrument, instrument};

use crate::dao::handle_database_error;
use crate::model::{
    apperror::{ApplicationError, ErrorType},
    models::{OpdAddInputType, OpdDetailType},
};

/**
 * Database response type for agency queries.
 */
pub type QueryOpdDbResp = (i64, String, String, String, DateTime<Utc>, String);

/**
 * SQL query to list all agencies.
 */
const QUERY_OPD_LIST: &str = "SELECT id, nama, singkatan, slug, inserted_at, inserted_by FROM opd ORDER BY id";

/**
 * SQL query to find an agency by slug.
 */
const QUERY_OPD_BY_SLUG: &str = "SELECT id, nama, singkatan, slug, inserted_at, inserted_by FROM opd WHERE slug = $1";

/**
 * SQL query to find an agency by id.
 */
const QUERY_OPD_BY_ID: &str = "SELECT id, nama, singkatan, slug, inserted_at, inserted_by FROM opd WHERE id = $1";

/**
 * SQL query to add an agency. The id comes from the table sequence.
 */
const ADD_OPD: &str = "INSERT INTO opd (nama, singkatan, slug, inserted_by, inserted_at) VALUES ($1, $2, $3, $4, now()) RETURNING id, nama, singkatan, slug, inserted_at, inserted_by";

/**
 * DAO for agency (OPD) operations.
 */
pub struct OpdDao {}

impl OpdDao {
    pub fn new() -> Self {
        OpdDao {}
    }

    /**
     * Lists every agency ordered by id.
     *
     * # Arguments
     * `connection`: The database connection.
     */
    #[instrument(skip(self, connection), fields(result))]
    pub async fn get_opd_list(&self, connection: &mut PgConnection) -> Result<Vec<OpdDetailType>, ApplicationError> {
        let span = tracing::Span::current();
        let results: Vec<QueryOpdDbResp> = sqlx::query_as(QUERY_OPD_LIST)
            .fetch_all(connection)
            .instrument(span)
            .await
            .map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to execute query to get opd list: {err}")))?;
        Ok(results.into_iter().map(OpdDetailType::from).collect())
    }

    /**
     * Finds an agency by its slug.
     *
     * # Returns
     * `None` when no agency carries the slug.
     */
    #[instrument(skip(self, connection), fields(result))]
    pub async fn find_by_slug(&self, connection: &mut PgConnection, slug: &str) -> Result<Option<OpdDetailType>, ApplicationError> {
        let span = tracing::Span::current();
        let result: Option<QueryOpdDbResp> = sqlx::query_as(QUERY_OPD_BY_SLUG)
            .bind(slug)
            .fetch_optional(connection)
            .instrument(span)
            .await
            .map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to execute query to find opd by slug: {err}")))?;
        Ok(result.map(OpdDetailType::from))
    }

    /**
     * Finds an agency by its id.
     */
    #[instrument(skip(self, connection), fields(result))]
    pub async fn find_by_id(&self, connection: &mut PgConnection, id: i64) -> Result<Option<OpdDetailType>, ApplicationError> {
        let span = tracing::Span::current();
        let result: Option<QueryOpdDbResp> = sqlx::query_as(QUERY_OPD_BY_ID)
            .bind(id)
            .fetch_optional(connection)
            .instrument(span)
            .await
            .map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to execute query to find opd by id: {err}")))?;
        Ok(result.map(OpdDetailType::from))
    }

    /**
     * Adds an agency.
     *
     * # Arguments
     * `transaction`: The transaction to insert within.
     * `opd_add_input`: The validated agency.
     *
     * # Returns
     * The stored agency including its generated id.
     */
    #[instrument(skip(self, transaction), fields(result))]
    pub async fn add_opd(&self, transaction: &mut PgConnection, opd_add_input: OpdAddInputType) -> Result<OpdDetailType, ApplicationError> {
        let span = tracing::Span::current();
        let result: QueryOpdDbResp = sqlx::query_as(ADD_OPD)
            .bind(opd_add_input.nama)
            .bind(opd_add_input.singkatan)
            .bind(opd_add_input.slug)
            .bind(opd_add_input.created_by)
            .fetch_one(transaction)
            .instrument(span)
            .await
            .map_err(|err| handle_database_error(err.as_database_error()))?;
        Ok(OpdDetailType::from(result))
    }
}
