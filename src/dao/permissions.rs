use sqlx::PgConnection;
use tracing::{Instrument, instrument};

use crate::model::{
    apperror::{ApplicationError, ErrorType},
    models::PermissionDetailType,
};

/**
 * Database response type for permission queries.
 */
pub type QueryPermissionDbResp = (i64, String, String, String, Option<String>);

/**
 * SQL query to list the permission catalogue.
 */
const QUERY_PERMISSION_LIST: &str = "SELECT id, name, resource, action, description FROM permission ORDER BY resource, action, id";

/**
 * DAO for the permission catalogue.
 */
pub struct PermissionDao {}

impl PermissionDao {
    pub fn new() -> Self {
        PermissionDao {}
    }

    /**
     * Lists every known permission ordered by resource and action.
     */
    #[instrument(skip(self, connection), fields(result))]
    pub async fn get_permission_list(&self, connection: &mut PgConnection) -> Result<Vec<PermissionDetailType>, ApplicationError> {
        let span = tracing::Span::current();
        let results: Vec<QueryPermissionDbResp> = sqlx::query_as(QUERY_PERMISSION_LIST)
            .fetch_all(connection)
            .instrument(span)
            .await
            .map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to execute query to get permission list: {err}")))?;
        Ok(results.into_iter().map(PermissionDetailType::from).collect())
    }
}

#[cfg(feature = "integration-test")]
#[cfg(test)]
mod integration_test {
    use super::*;
    use crate::dao::test_support::init_db;

    #[sqlx::test]
    async fn test_seeded_permissions() {
        let pool = init_db().await;
        let mut connection = pool.acquire().await.unwrap();
        let permissions = PermissionDao::new().get_permission_list(&mut connection).await.unwrap();
        assert!(permissions.iter().any(|permission| permission.name == "permission:read"));
    }
}
