use std::sync::Arc;

use sqlx::{Pool, Postgres};

use crate::{
    dao::records::RecordDao,
    model::{
        apperror::{ApplicationError, ErrorType},
        kinds::RecordKind,
        models::{QueryKey, RecordAddInputType, RecordDetailType, RecordUpdateInputType},
    },
    service::cache::ListCache,
};

/**
 * Represents the service for managing monthly records of every kind.
 */
pub struct RecordService {
    /**
     * The DAO for record operations.
     */
    record_dao: RecordDao,
    /**
     * Optional connection pool for database operations. Optional for test purposes until we have a better way to mock the database.
     */
    connection_pool: Option<Pool<Postgres>>,
    /**
     * Lists by query key. Every write invalidates the keys it affects.
     */
    list_cache: ListCache,
}

impl RecordService {
    /**
     * Creates a new instance of `RecordService`.
     *
     * # Arguments
     * `record_dao`: The DAO for record operations.
     * `connection_pool`: Optional connection pool for database operations.
     * `list_cache`: Cache for record lists.
     */
    pub fn new(record_dao: RecordDao, connection_pool: Option<Pool<Postgres>>, list_cache: ListCache) -> Self {
        RecordService { record_dao, connection_pool, list_cache }
    }

    /**
     * Lists the records of a kind through the list cache.
     *
     * # Arguments
     * `kind`: Record kind to list.
     * `id_opd`: Restricts the list to one agency when set.
     */
    pub async fn get_record_list(&self, kind: RecordKind, id_opd: Option<i64>) -> Result<Arc<Vec<RecordDetailType>>, ApplicationError> {
        let connection_pool = self.pool()?;
        let record_dao = &self.record_dao;
        self.list_cache
            .get_or_fetch(&QueryKey::new(kind, id_opd), move || async move {
                let mut connection = connection_pool.acquire().await.map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to acquire connection: {err}")))?;
                record_dao.get_record_list(&mut connection, kind, id_opd).await
            })
            .await
    }

    /**
     * Gets one record.
     *
     * # Returns
     * The record or a `NotFound` error.
     */
    pub async fn get_record(&self, kind: RecordKind, id: i64) -> Result<RecordDetailType, ApplicationError> {
        let connection_pool = self.pool()?;
        let mut connection = connection_pool.acquire().await.map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to acquire connection: {err}")))?;
        self.record_dao.get_record(&mut connection, kind, id).await?.ok_or_else(|| ApplicationError::new(ErrorType::NotFound, "Record not found".to_string()))
    }

    /**
     * Adds a record and invalidates the lists that can contain it.
     *
     * # Returns
     * The stored record.
     */
    pub async fn add_record(&self, record_add_input: RecordAddInputType) -> Result<RecordDetailType, ApplicationError> {
        let connection_pool = self.pool()?;
        let kind = record_add_input.kind;
        let mut transaction = connection_pool.begin().await.map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to begin transaction: {err}")))?;
        let result = match self.record_dao.add_record(&mut transaction, record_add_input).await {
            Ok(id) => self.record_dao.get_record(&mut transaction, kind, id).await,
            Err(err) => Err(err),
        };
        let record = match result {
            Ok(Some(record)) => {
                transaction.commit().await.map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to commit transaction: {err}")))?;
                record
            }
            Ok(None) => {
                transaction.rollback().await.map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to rollback transaction: {err}")))?;
                return Err(ApplicationError::new(ErrorType::Application, "Inserted record could not be read back".to_string()));
            }
            Err(err) => {
                transaction.rollback().await.map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to rollback transaction: {err}")))?;
                return Err(err);
            }
        };
        self.list_cache.invalidate(&QueryKey::affected_by_write(record.kind, record.id_opd)).await;
        tracing::info!(kind = %record.kind, id = record.id, id_opd = record.id_opd, "Record added");
        Ok(record)
    }

    /**
     * Updates a record and invalidates the lists that can contain it.
     *
     * # Returns
     * The stored record after the update.
     */
    pub async fn update_record(&self, record_update_input: RecordUpdateInputType) -> Result<RecordDetailType, ApplicationError> {
        let connection_pool = self.pool()?;
        let (kind, id) = (record_update_input.kind, record_update_input.id);
        let mut transaction = connection_pool.begin().await.map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to begin transaction: {err}")))?;
        let result = match self.record_dao.update_record(&mut transaction, record_update_input).await {
            Ok(()) => self.record_dao.get_record(&mut transaction, kind, id).await,
            Err(err) => Err(err),
        };
        let record = match result {
            Ok(Some(record)) => {
                transaction.commit().await.map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to commit transaction: {err}")))?;
                record
            }
            Ok(None) => {
                transaction.rollback().await.map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to rollback transaction: {err}")))?;
                return Err(ApplicationError::new(ErrorType::NotFound, "Record not found".to_string()));
            }
            Err(err) => {
                transaction.rollback().await.map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to rollback transaction: {err}")))?;
                return Err(err);
            }
        };
        self.list_cache.invalidate(&QueryKey::affected_by_write(record.kind, record.id_opd)).await;
        tracing::info!(kind = %record.kind, id = record.id, id_opd = record.id_opd, "Record updated");
        Ok(record)
    }

    /**
     * Deletes a record and invalidates the lists that contained it.
     */
    pub async fn delete_record(&self, kind: RecordKind, id: i64) -> Result<(), ApplicationError> {
        let connection_pool = self.pool()?;
        let mut transaction = connection_pool.begin().await.map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to begin transaction: {err}")))?;
        let id_opd = match self.record_dao.delete_record(&mut transaction, kind, id).await {
            Ok(id_opd) => {
                transaction.commit().await.map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to commit transaction: {err}")))?;
                id_opd
            }
            Err(err) => {
                transaction.rollback().await.map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to rollback transaction: {err}")))?;
                return Err(err);
            }
        };
        self.list_cache.invalidate(&QueryKey::affected_by_write(kind, id_opd)).await;
        tracing::info!(%kind, id, id_opd, "Record deleted");
        Ok(())
    }

    fn pool(&self) -> Result<&Pool<Postgres>, ApplicationError> {
        self.connection_pool.as_ref().ok_or_else(|| ApplicationError::new(ErrorType::DatabaseError, "No database connection available".to_string()))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::model::{config::CacheConfig, models::RecordPeriod};

    fn service_without_database() -> RecordService {
        RecordService::new(RecordDao::new(), None, ListCache::new(&CacheConfig::default()))
    }

    #[tokio::test]
    async fn test_list_without_database() {
        let error = service_without_database().get_record_list(RecordKind::StatusPegawai, None).await.unwrap_err();
        assert_eq!(error.error_type, ErrorType::DatabaseError);
    }

    #[tokio::test]
    async fn test_add_without_database() {
        let input = RecordAddInputType {
            kind: RecordKind::StatusPegawai,
            id_opd: 1,
            period: RecordPeriod::resolve(Some(2024), Some(1), None).unwrap(),
            fields: RecordKind::StatusPegawai.default_fields(),
            claim_name: "test".to_string(),
        };
        let error = service_without_database().add_record(input).await.unwrap_err();
        assert_eq!(error.error_type, ErrorType::DatabaseError);
    }
}

#[cfg(feature = "integration-test")]
#[cfg(test)]
mod integration_test {
    use super::*;
    use crate::dao::{opd::OpdDao, test_support::init_db};
    use crate::model::{
        config::CacheConfig,
        kinds::FieldValue,
        models::{OpdAddInputType, RecordPeriod},
    };

    #[sqlx::test]
    async fn test_list_reflects_create_and_update() {
        let pool = init_db().await;
        let mut transaction = pool.begin().await.unwrap();
        let opd = OpdDao::new()
            .add_opd(&mut transaction, OpdAddInputType { nama: "Dinas Cache".to_string(), singkatan: "DC".to_string(), slug: "dinas-cache-service".to_string(), created_by: "test_user".to_string() })
            .await
            .unwrap();
        transaction.commit().await.unwrap();

        let service = RecordService::new(RecordDao::new(), Some(pool.clone()), ListCache::new(&CacheConfig::default()));
        assert!(service.get_record_list(RecordKind::KenaikanPangkat, Some(opd.id)).await.unwrap().is_empty());

        let mut fields = RecordKind::KenaikanPangkat.default_fields();
        fields.insert("jumlahReguler".to_string(), FieldValue::Numeric(5));
        let period = RecordPeriod::resolve(Some(2024), Some(6), None).unwrap();
        let added = service
            .add_record(RecordAddInputType { kind: RecordKind::KenaikanPangkat, id_opd: opd.id, period, fields: fields.clone(), claim_name: "test_user".to_string() })
            .await
            .unwrap();
        let listed = service.get_record_list(RecordKind::KenaikanPangkat, Some(opd.id)).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, added.id);

        fields.insert("jumlahReguler".to_string(), FieldValue::Numeric(6));
        service
            .update_record(RecordUpdateInputType { kind: RecordKind::KenaikanPangkat, id: added.id, period, fields, claim_name: "test_user".to_string() })
            .await
            .unwrap();
        let listed = service.get_record_list(RecordKind::KenaikanPangkat, Some(opd.id)).await.unwrap();
        assert_eq!(listed[0].fields.get("jumlahReguler"), Some(&FieldValue::Numeric(6)));

        service.delete_record(RecordKind::KenaikanPangkat, added.id).await.unwrap();
        assert!(service.get_record_list(RecordKind::KenaikanPangkat, Some(opd.id)).await.unwrap().is_empty());
    }
}
