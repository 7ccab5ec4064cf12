use sqlx::{Pool, Postgres};

use crate::{
    dao::opd::OpdDao,
    model::{
        apperror::{ApplicationError, ErrorType},
        models::{AgencyRef, OpdAddInputType, OpdDetailType, is_valid_slug},
    },
};

/**
 * Represents the service for managing agencies (OPD).
 */
pub struct OpdService {
    /**
     * The DAO for agency operations.
     */
    opd_dao: OpdDao,
    /**
     * Optional connection pool for database operations. Optional for test purposes until we have a better way to mock the database.
     */
    connection_pool: Option<Pool<Postgres>>,
}

impl OpdService {
    pub fn new(opd_dao: OpdDao, connection_pool: Option<Pool<Postgres>>) -> Self {
        OpdService { opd_dao, connection_pool }
    }

    /**
     * Lists every agency ordered by id.
     */
    pub async fn get_opd_list(&self) -> Result<Vec<OpdDetailType>, ApplicationError> {
        let connection_pool = self.pool()?;
        let mut connection = connection_pool.acquire().await.map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to acquire connection: {err}")))?;
        self.opd_dao.get_opd_list(&mut connection).await
    }

    /**
     * Adds an agency.
     *
     * # Arguments
     * `opd_add_input`: The validated agency.
     *
     * # Returns
     * The stored agency with its generated id.
     */
    pub async fn add_opd(&self, opd_add_input: OpdAddInputType) -> Result<OpdDetailType, ApplicationError> {
        let connection_pool = self.pool()?;
        let mut transaction = connection_pool.begin().await.map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to begin transaction: {err}")))?;
        let opd = match self.opd_dao.add_opd(&mut transaction, opd_add_input).await {
            Ok(opd) => {
                transaction.commit().await.map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to commit transaction: {err}")))?;
                opd
            }
            Err(err) => {
                transaction.rollback().await.map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to rollback transaction: {err}")))?;
                return Err(err);
            }
        };
        tracing::info!(id = opd.id, slug = %opd.slug, "OPD added");
        Ok(opd)
    }

    /**
     * Resolves the agency a route refers to. A single lookup, never retried.
     *
     * # Arguments
     * `agency_ref`: Fixed id or slug from the route.
     *
     * # Returns
     * The agency, or a `NotFound` error. Slugs that cannot exist are rejected without a lookup.
     */
    pub async fn resolve(&self, agency_ref: &AgencyRef) -> Result<OpdDetailType, ApplicationError> {
        if let AgencyRef::Slug(slug) = agency_ref {
            if !is_valid_slug(slug) {
                tracing::debug!("Rejected malformed slug {slug}");
                return Err(not_found(agency_ref));
            }
        }
        let connection_pool = self.pool()?;
        let mut connection = connection_pool.acquire().await.map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to acquire connection: {err}")))?;
        let opd = match agency_ref {
            AgencyRef::Id(id) => self.opd_dao.find_by_id(&mut connection, *id).await?,
            AgencyRef::Slug(slug) => self.opd_dao.find_by_slug(&mut connection, slug).await?,
        };
        opd.ok_or_else(|| not_found(agency_ref))
    }

    fn pool(&self) -> Result<&Pool<Postgres>, ApplicationError> {
        self.connection_pool.as_ref().ok_or_else(|| ApplicationError::new(ErrorType::DatabaseError, "No database connection available".to_string()))
    }
}

fn not_found(agency_ref: &AgencyRef) -> ApplicationError {
    let message = match agency_ref {
        AgencyRef::Id(id) => format!("OPD {id} not found"),
        AgencyRef::Slug(slug) => format!("OPD '{slug}' not found"),
    };
    ApplicationError::new(ErrorType::NotFound, message)
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn test_malformed_slug_is_not_found_without_database() {
        let service = OpdService::new(OpdDao::new(), None);
        let error = service.resolve(&AgencyRef::Slug("Bukan Slug".to_string())).await.unwrap_err();
        assert_eq!(error.error_type, ErrorType::NotFound);
        assert_eq!(error.message, "OPD 'Bukan Slug' not found");
    }

    #[tokio::test]
    async fn test_valid_slug_needs_database() {
        let service = OpdService::new(OpdDao::new(), None);
        let error = service.resolve(&AgencyRef::Slug("dinas-x".to_string())).await.unwrap_err();
        assert_eq!(error.error_type, ErrorType::DatabaseError);
    }
}

#[cfg(feature = "integration-test")]
#[cfg(test)]
mod integration_test {
    use super::*;
    use crate::dao::test_support::init_db;

    #[sqlx::test]
    async fn test_resolve_unknown_slug() {
        let pool = init_db().await;
        let service = OpdService::new(OpdDao::new(), Some(pool));
        let error = service.resolve(&AgencyRef::Slug("opd-yang-tidak-ada".to_string())).await.unwrap_err();
        assert_eq!(error.error_type, ErrorType::NotFound);
    }
}
