use chrono::NaiveDate;

use crate::{
    model::{
        apperror::ApplicationError,
        kinds::{FieldType, RecordKind},
        models::{AgencyRef, ColumnDefinition, QueryKey, RecordPageType, RecordPeriod, ResourceDescriptorType},
    },
    service::{opd::OpdService, records::RecordService},
};

/**
 * Builds the descriptor a generic CRUD page renders a record kind with.
 *
 * # Arguments
 * `kind`: The record kind.
 * `opd_id`: Agency the page is scoped to. Unscoped pages get an extra agency column.
 * `today`: Used for the default period of the create form.
 */
pub fn describe(kind: RecordKind, opd_id: Option<i64>, today: NaiveDate) -> ResourceDescriptorType {
    let mut columns = Vec::with_capacity(kind.fields().len() + 3);
    if opd_id.is_none() {
        columns.push(ColumnDefinition { key: "namaOpd", title: "OPD", numeric: false });
    }
    columns.push(ColumnDefinition { key: "tahun", title: "Tahun", numeric: true });
    columns.push(ColumnDefinition { key: "bulan", title: "Bulan", numeric: true });
    columns.extend(kind.fields().iter().map(|definition| ColumnDefinition { key: definition.key, title: definition.title, numeric: definition.field_type == FieldType::Numeric }));
    ResourceDescriptorType {
        kind,
        opd_id,
        title: kind.title().to_string(),
        description: kind.description().to_string(),
        query_key: QueryKey::new(kind, opd_id),
        columns,
        default_period: RecordPeriod::containing(today),
        default_fields: kind.default_fields(),
    }
}

/**
 * Resolves the agency of a page and loads its rows.
 *
 * # Returns
 * The page, or `NotFound` when the agency does not exist. Rows are never loaded for an unknown agency.
 */
pub async fn get_record_page(opd_service: &OpdService, record_service: &RecordService, agency_ref: &AgencyRef, kind: RecordKind, today: NaiveDate) -> Result<RecordPageType, ApplicationError> {
    let agency = opd_service.resolve(agency_ref).await?;
    let descriptor = describe(kind, Some(agency.id), today);
    let records = record_service.get_record_list(kind, Some(agency.id)).await?;
    Ok(RecordPageType { agency, descriptor, records: records.as_ref().clone() })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        dao::{opd::OpdDao, records::RecordDao},
        model::{apperror::ErrorType, config::CacheConfig},
        service::cache::ListCache,
    };

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 2, 14).unwrap()
    }

    #[test]
    fn test_scoped_descriptor() {
        let descriptor = describe(RecordKind::GolonganPegawai, Some(5), today());
        let keys: Vec<&str> = descriptor.columns.iter().map(|column| column.key).collect();
        assert_eq!(keys, vec!["tahun", "bulan", "golonganI", "golonganII", "golonganIII", "golonganIV"]);
        assert!(descriptor.columns.iter().all(|column| column.numeric));
        assert_eq!(descriptor.query_key, QueryKey::new(RecordKind::GolonganPegawai, Some(5)));
        assert_eq!(descriptor.default_period.tahun, 2025);
        assert_eq!(descriptor.default_period.bulan, 2);
        assert_eq!(descriptor.default_fields.len(), 4);
    }

    #[test]
    fn test_unscoped_descriptor_shows_agency() {
        let descriptor = describe(RecordKind::StatusDokumenWajib, None, today());
        assert_eq!(descriptor.columns[0].key, "namaOpd");
        let status = descriptor.columns.iter().find(|column| column.key == "status").unwrap();
        assert!(!status.numeric);
        assert_eq!(descriptor.title, "Status Dokumen Wajib");
    }

    #[tokio::test]
    async fn test_page_for_malformed_slug_is_not_found() {
        let opd_service = OpdService::new(OpdDao::new(), None);
        let record_service = RecordService::new(RecordDao::new(), None, ListCache::new(&CacheConfig::default()));
        let error = get_record_page(&opd_service, &record_service, &AgencyRef::Slug("--".to_string()), RecordKind::StatusPegawai, today()).await.unwrap_err();
        assert_eq!(error.error_type, ErrorType::NotFound);
    }
}
