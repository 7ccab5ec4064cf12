use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::model::apperror::FieldError;

/**
 * Longest accepted value for a text field.
 */
pub const MAX_TEXT_LENGTH: usize = 255;

/**
 * The six monthly statistic categories an agency reports on.
 *
 * Every kind shares the record envelope (id, period, agency) and adds the fields listed in its field table.
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RecordKind {
    StatusKenaikanPangkat,
    StatusSkKenaikanPangkat,
    StatusPegawai,
    GolonganPegawai,
    KenaikanPangkat,
    StatusDokumenWajib,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Numeric,
    Text,
}

/**
 * One kind specific field. `key` is the camelCase name used on the wire and in storage.
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDefinition {
    pub key: &'static str,
    pub title: &'static str,
    pub field_type: FieldType,
}

const fn numeric(key: &'static str, title: &'static str) -> FieldDefinition {
    FieldDefinition { key, title, field_type: FieldType::Numeric }
}

const fn text(key: &'static str, title: &'static str) -> FieldDefinition {
    FieldDefinition { key, title, field_type: FieldType::Text }
}

const STATUS_KENAIKAN_PANGKAT_FIELDS: [FieldDefinition; 4] = [
    numeric("jumlahUsulan", "Jumlah Usulan"),
    numeric("jumlahProses", "Jumlah Proses"),
    numeric("jumlahSelesai", "Jumlah Selesai"),
    text("keterangan", "Keterangan"),
];

const STATUS_SK_KENAIKAN_PANGKAT_FIELDS: [FieldDefinition; 4] = [
    numeric("jumlahSkTerbit", "SK Terbit"),
    numeric("jumlahSkDiserahkan", "SK Diserahkan"),
    numeric("jumlahSkBelumDiserahkan", "SK Belum Diserahkan"),
    text("keterangan", "Keterangan"),
];

const STATUS_PEGAWAI_FIELDS: [FieldDefinition; 4] = [
    numeric("jumlahPns", "PNS"),
    numeric("jumlahPppk", "PPPK"),
    numeric("jumlahHonorer", "Honorer"),
    text("keterangan", "Keterangan"),
];

const GOLONGAN_PEGAWAI_FIELDS: [FieldDefinition; 4] = [
    numeric("golonganI", "Golongan I"),
    numeric("golonganII", "Golongan II"),
    numeric("golonganIII", "Golongan III"),
    numeric("golonganIV", "Golongan IV"),
];

const KENAIKAN_PANGKAT_FIELDS: [FieldDefinition; 4] = [
    numeric("jumlahReguler", "Reguler"),
    numeric("jumlahPilihan", "Pilihan"),
    numeric("jumlahPenyesuaianIjazah", "Penyesuaian Ijazah"),
    text("keterangan", "Keterangan"),
];

const STATUS_DOKUMEN_WAJIB_FIELDS: [FieldDefinition; 4] = [
    text("namaDokumen", "Nama Dokumen"),
    text("status", "Status"),
    numeric("jumlahLengkap", "Lengkap"),
    numeric("jumlahBelumLengkap", "Belum Lengkap"),
];

/**
 * Value of a kind specific field, as stored in the record's `data` column and sent on the wire.
 */
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Numeric(i64),
    Text(String),
}

impl RecordKind {
    pub const ALL: [RecordKind; 6] = [
        RecordKind::StatusKenaikanPangkat,
        RecordKind::StatusSkKenaikanPangkat,
        RecordKind::StatusPegawai,
        RecordKind::GolonganPegawai,
        RecordKind::KenaikanPangkat,
        RecordKind::StatusDokumenWajib,
    ];

    /**
     * REST resource name. Also the value stored in the `kind` column.
     */
    pub fn api_endpoint(self) -> &'static str {
        match self {
            RecordKind::StatusKenaikanPangkat => "status-kenaikan-pangkat",
            RecordKind::StatusSkKenaikanPangkat => "status-sk-kenaikan-pangkat",
            RecordKind::StatusPegawai => "status-pegawai",
            RecordKind::GolonganPegawai => "golongan-pegawai",
            RecordKind::KenaikanPangkat => "kenaikan-pangkat",
            RecordKind::StatusDokumenWajib => "status-dokumen-wajib",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            RecordKind::StatusKenaikanPangkat => "Status Kenaikan Pangkat",
            RecordKind::StatusSkKenaikanPangkat => "Status SK Kenaikan Pangkat",
            RecordKind::StatusPegawai => "Status Pegawai",
            RecordKind::GolonganPegawai => "Golongan Pegawai",
            RecordKind::KenaikanPangkat => "Kenaikan Pangkat",
            RecordKind::StatusDokumenWajib => "Status Dokumen Wajib",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            RecordKind::StatusKenaikanPangkat => "Rekap bulanan usulan kenaikan pangkat per tahap proses",
            RecordKind::StatusSkKenaikanPangkat => "Rekap bulanan penerbitan dan penyerahan SK kenaikan pangkat",
            RecordKind::StatusPegawai => "Jumlah pegawai menurut status kepegawaian",
            RecordKind::GolonganPegawai => "Sebaran pegawai menurut golongan",
            RecordKind::KenaikanPangkat => "Jumlah kenaikan pangkat menurut jenis",
            RecordKind::StatusDokumenWajib => "Kelengkapan dokumen wajib pegawai",
        }
    }

    pub fn fields(self) -> &'static [FieldDefinition] {
        match self {
            RecordKind::StatusKenaikanPangkat => &STATUS_KENAIKAN_PANGKAT_FIELDS,
            RecordKind::StatusSkKenaikanPangkat => &STATUS_SK_KENAIKAN_PANGKAT_FIELDS,
            RecordKind::StatusPegawai => &STATUS_PEGAWAI_FIELDS,
            RecordKind::GolonganPegawai => &GOLONGAN_PEGAWAI_FIELDS,
            RecordKind::KenaikanPangkat => &KENAIKAN_PANGKAT_FIELDS,
            RecordKind::StatusDokumenWajib => &STATUS_DOKUMEN_WAJIB_FIELDS,
        }
    }

    /**
     * Zero values for every field of the kind. Numeric fields are 0, text fields are empty.
     */
    pub fn default_fields(self) -> BTreeMap<String, FieldValue> {
        self.fields()
            .iter()
            .map(|definition| {
                let value = match definition.field_type {
                    FieldType::Numeric => FieldValue::Numeric(0),
                    FieldType::Text => FieldValue::Text(String::new()),
                };
                (definition.key.to_string(), value)
            })
            .collect()
    }

    /**
     * Validates submitted kind fields against the field table.
     *
     * Missing or null fields take their zero value. Unknown keys are rejected.
     *
     * # Arguments
     * `submitted`: The kind specific part of a submitted record.
     *
     * # Returns
     * The complete, typed field set or every field error found.
     */
    pub fn validate_fields(self, submitted: &Map<String, Value>) -> Result<BTreeMap<String, FieldValue>, Vec<FieldError>> {
        let definitions = self.fields();
        let mut field_errors: Vec<FieldError> = submitted
            .keys()
            .filter(|key| !definitions.iter().any(|definition| definition.key == key.as_str()))
            .map(|key| FieldError::new(key, "Unknown field"))
            .collect();
        let mut fields = BTreeMap::new();
        for definition in definitions {
            let value = submitted.get(definition.key).unwrap_or(&Value::Null);
            match parse_field_value(definition.field_type, value) {
                Ok(field_value) => {
                    fields.insert(definition.key.to_string(), field_value);
                }
                Err(message) => field_errors.push(FieldError::new(definition.key, message)),
            }
        }
        if field_errors.is_empty() { Ok(fields) } else { Err(field_errors) }
    }
}

fn parse_field_value(field_type: FieldType, value: &Value) -> Result<FieldValue, &'static str> {
    match (field_type, value) {
        (FieldType::Numeric, Value::Null) => Ok(FieldValue::Numeric(0)),
        (FieldType::Numeric, Value::Number(number)) => number.as_i64().filter(|n| *n >= 0).map(FieldValue::Numeric).ok_or("Must be a non-negative whole number"),
        // Form inputs frequently submit numbers as strings.
        (FieldType::Numeric, Value::String(raw)) => match raw.trim() {
            "" => Ok(FieldValue::Numeric(0)),
            trimmed => trimmed.parse::<i64>().ok().filter(|n| *n >= 0).map(FieldValue::Numeric).ok_or("Must be a non-negative whole number"),
        },
        (FieldType::Numeric, _) => Err("Must be a non-negative whole number"),
        (FieldType::Text, Value::Null) => Ok(FieldValue::Text(String::new())),
        (FieldType::Text, Value::String(raw)) => {
            let trimmed = raw.trim();
            if trimmed.chars().count() > MAX_TEXT_LENGTH {
                return Err("Must be at most 255 characters");
            }
            Ok(FieldValue::Text(trimmed.to_string()))
        }
        (FieldType::Text, _) => Err("Must be text"),
    }
}

impl FromStr for RecordKind {
    type Err = ();

    fn from_str(api_endpoint: &str) -> Result<Self, Self::Err> {
        RecordKind::ALL.into_iter().find(|kind| kind.api_endpoint() == api_endpoint).ok_or(())
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.api_endpoint())
    }
}
