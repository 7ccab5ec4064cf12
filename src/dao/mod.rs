pub mod opd;
pub mod permissions;
pub mod records;

use crate::model::apperror::{ApplicationError, ErrorType};

/**
 * Maps a failed write to an application error using the Postgres SQLSTATE.
 *
 * # Arguments
 * `error`: The database error, if the failure came from the server.
 */
pub fn handle_database_error(error: Option<&dyn sqlx::error::DatabaseError>) -> ApplicationError {
    if let Some(db_error) = error {
        tracing::info!(code = ?db_error.code(), constraint = ?db_error.constraint(), "Write rejected by database: {}", db_error);
        return match db_error.code().as_deref() {
            // unique_violation
            Some("23505") => ApplicationError::new(ErrorType::ConstraintViolation, "Already exists".to_string()),
            // foreign_key_violation
            Some("23503") => ApplicationError::new(ErrorType::ConstraintViolation, "Referenced OPD does not exist".to_string()),
            // string_data_right_truncation
            Some("22001") => ApplicationError::new(ErrorType::Validation, "Value too long".to_string()),
            _ => {
                tracing::error!("Unhandled database error: {}", db_error);
                ApplicationError::new(ErrorType::DatabaseError, "Unhandled database error".to_string())
            }
        };
    }
    ApplicationError::new(ErrorType::DatabaseError, "Failed to execute database operation".to_string())
}

#[cfg(feature = "integration-test")]
#[cfg(test)]
pub mod test_support {
    use sqlx::PgPool;

    /**
     * Initialize the database connection pool.
     */
    pub async fn init_db() -> PgPool {
        dotenv::from_filename("./sqlx-postgresql-migration/.env-test").ok();
        let pool = PgPool::connect(dotenv::var("DATABASE_URL").unwrap().as_str()).await.unwrap();
        sqlx::migrate!("./sqlx-postgresql-migration/migrations").run(&pool).await.unwrap();
        pool
    }
}
