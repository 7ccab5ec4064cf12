use std::collections::BTreeMap;

use sqlx::{Pool, Postgres};

use crate::{
    dao::permissions::PermissionDao,
    model::{
        apperror::{ApplicationError, ErrorType},
        models::{PermissionDetailType, PermissionListOutputType},
    },
};

/**
 * Grant needed to read the permission catalogue.
 */
pub const PERMISSION_READ: &str = "permission:read";

/**
 * Represents the service for the permission catalogue.
 */
pub struct PermissionService {
    permission_dao: PermissionDao,
    /**
     * Optional connection pool for database operations. Optional for test purposes until we have a better way to mock the database.
     */
    connection_pool: Option<Pool<Postgres>>,
}

impl PermissionService {
    pub fn new(permission_dao: PermissionDao, connection_pool: Option<Pool<Postgres>>) -> Self {
        PermissionService { permission_dao, connection_pool }
    }

    /**
     * Lists every permission, flat and grouped by resource.
     */
    pub async fn get_permission_list(&self) -> Result<PermissionListOutputType, ApplicationError> {
        let Some(connection_pool) = &self.connection_pool else {
            return Err(ApplicationError::new(ErrorType::DatabaseError, "No database connection available".to_string()));
        };
        let mut connection = connection_pool.acquire().await.map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to acquire connection: {err}")))?;
        let permissions = self.permission_dao.get_permission_list(&mut connection).await?;
        let grouped = group_by_resource(&permissions);
        Ok(PermissionListOutputType { permissions, grouped })
    }
}

/**
 * Groups permissions by resource, keeping their order within each group.
 */
pub fn group_by_resource(permissions: &[PermissionDetailType]) -> BTreeMap<String, Vec<PermissionDetailType>> {
    let mut grouped: BTreeMap<String, Vec<PermissionDetailType>> = BTreeMap::new();
    for permission in permissions {
        grouped.entry(permission.resource.clone()).or_default().push(permission.clone());
    }
    grouped
}
