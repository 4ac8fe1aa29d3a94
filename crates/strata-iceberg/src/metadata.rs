//! Iceberg-style metadata and snapshot documents.
//!
//! Documents are JSON and carry a `.json` extension. (The system this
//! replaces wrote JSON content into `.avro`-named manifest keys; the
//! extension now matches the content.) Keys are sequence-numbered with a
//! 5-digit zero-padded prefix under `<table location>/metadata/`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use strata_core::table::ColumnSchema;

/// Format version advertised by synthesized tables.
pub const FORMAT_VERSION: i32 = 1;

/// Table metadata document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableMetadataDoc {
    /// Iceberg format version.
    pub format_version: i32,
    /// Stable table identifier (UUID, never wall-clock derived).
    pub table_uuid: String,
    /// Table location as an `s3://` URI.
    pub location: String,
    /// Last update timestamp in epoch milliseconds.
    pub last_updated_ms: i64,
    /// Highest assigned column id.
    pub last_column_id: i32,
    /// Id of the current schema.
    pub current_schema_id: i32,
    /// All table schemas.
    pub schemas: Vec<SchemaDoc>,
    /// Id of the default partition spec.
    pub default_spec_id: i32,
    /// All partition specs (always a single unpartitioned spec).
    pub partition_specs: Vec<PartitionSpecDoc>,
    /// Highest assigned partition field id.
    pub last_partition_id: i32,
    /// Id of the default sort order.
    pub default_sort_order_id: i32,
    /// All sort orders (always a single unsorted order).
    pub sort_orders: Vec<SortOrderDoc>,
    /// Table properties.
    pub properties: BTreeMap<String, String>,
}

/// One table schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaDoc {
    /// Schema id.
    pub schema_id: i32,
    /// Always `struct`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Ordered schema fields.
    pub fields: Vec<FieldDoc>,
}

/// One schema field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDoc {
    /// Field id, unique within the schema. Allocated from field position so
    /// repeated synthesis of the same file is idempotent.
    pub id: i32,
    /// Field name.
    pub name: String,
    /// Whether the field is required.
    pub required: bool,
    /// Lowercase type name.
    #[serde(rename = "type")]
    pub field_type: String,
}

/// One partition spec.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartitionSpecDoc {
    /// Spec id.
    pub spec_id: i32,
    /// Partition fields (always empty).
    pub fields: Vec<serde_json::Value>,
}

/// One sort order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SortOrderDoc {
    /// Order id.
    pub order_id: i32,
    /// Sort fields (always empty).
    pub fields: Vec<serde_json::Value>,
}

/// Snapshot document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotDoc {
    /// Snapshot identifier, unique per table.
    pub snapshot_id: i64,
    /// Snapshot timestamp in epoch milliseconds.
    pub timestamp_ms: i64,
    /// Location of the manifest list this snapshot refers to.
    pub manifest_list: String,
    /// Id of the schema current at snapshot time.
    pub schema_id: i32,
    /// Operation summary.
    pub summary: SnapshotSummary,
}

/// Snapshot operation summary. Counter values are strings on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotSummary {
    /// Operation kind (`append`).
    pub operation: String,
    /// Number of data files added.
    #[serde(rename = "added-data-files")]
    pub added_data_files: String,
    /// Number of records added.
    #[serde(rename = "added-records")]
    pub added_records: String,
    /// Bytes of data files added.
    #[serde(rename = "added-files-size")]
    pub added_files_size: String,
    /// Total records in the table after the snapshot.
    #[serde(rename = "total-records")]
    pub total_records: String,
    /// Total bytes of data files after the snapshot.
    #[serde(rename = "total-files-size")]
    pub total_files_size: String,
    /// Total data file count after the snapshot.
    #[serde(rename = "total-data-files")]
    pub total_data_files: String,
    /// Total delete file count after the snapshot.
    #[serde(rename = "total-delete-files")]
    pub total_delete_files: String,
}

/// Default table properties stamped on synthesized tables.
#[must_use]
pub fn default_properties() -> BTreeMap<String, String> {
    BTreeMap::from([
        ("write.format.default".to_string(), "PARQUET".to_string()),
        ("commit.retry.num-retries".to_string(), "5".to_string()),
        ("commit.retry.min-wait-ms".to_string(), "100".to_string()),
        ("commit.retry.max-wait-ms".to_string(), "2000".to_string()),
    ])
}

/// Translates probed columns into Iceberg schema fields with positional ids.
#[must_use]
pub fn schema_fields(columns: &[ColumnSchema]) -> Vec<FieldDoc> {
    columns
        .iter()
        .enumerate()
        .map(|(position, column)| FieldDoc {
            id: i32::try_from(position + 1).unwrap_or(i32::MAX),
            name: column.name.clone(),
            required: true,
            field_type: column.logical_type.lowercase_name().to_string(),
        })
        .collect()
}

/// Derives a snapshot identifier from UUID entropy.
///
/// Identifiers must be unique within a table even for calls in the same
/// millisecond, so wall-clock time is never used.
#[must_use]
pub fn generate_snapshot_id() -> i64 {
    let bytes = *Uuid::new_v4().as_bytes();
    let mut word = [0u8; 8];
    word.copy_from_slice(&bytes[..8]);
    i64::from_be_bytes(word) & i64::MAX
}

/// Returns the metadata sub-path of a table location.
#[must_use]
pub fn metadata_prefix(table_location: &str) -> String {
    format!("{table_location}/metadata/")
}

/// Returns the object key of a table metadata document.
#[must_use]
pub fn metadata_doc_key(table_location: &str, sequence: usize, id: &Uuid) -> String {
    format!("{}{sequence:05}-{id}-metadata.json", metadata_prefix(table_location))
}

/// Returns the object key of a snapshot document.
#[must_use]
pub fn snapshot_doc_key(
    table_location: &str,
    sequence: usize,
    id: &Uuid,
    snapshot_id: i64,
) -> String {
    format!(
        "{}{sequence:05}-{id}-snap-{snapshot_id}.json",
        metadata_prefix(table_location)
    )
}

/// Returns the manifest-list location referenced by a snapshot document.
#[must_use]
pub fn manifest_list_location(
    bucket: &str,
    table_location: &str,
    sequence: usize,
    id: &Uuid,
) -> String {
    format!(
        "s3://{bucket}/{}{sequence:05}-{id}-manifest-list.json",
        metadata_prefix(table_location)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_core::table::LogicalType;

    #[test]
    fn field_ids_are_positional_and_unique() {
        let columns = vec![
            ColumnSchema {
                name: "id".to_string(),
                logical_type: LogicalType::Int64,
                nullable: false,
                source_description: "INT64".to_string(),
            },
            ColumnSchema {
                name: "region".to_string(),
                logical_type: LogicalType::String,
                nullable: true,
                source_description: "BYTE_ARRAY (UTF8)".to_string(),
            },
        ];

        let fields = schema_fields(&columns);
        assert_eq!(fields[0].id, 1);
        assert_eq!(fields[1].id, 2);
        assert_eq!(fields[0].field_type, "int64");
        assert_eq!(fields[1].field_type, "string");

        // Re-translation allocates the same ids.
        let again = schema_fields(&columns);
        assert_eq!(fields[0].id, again[0].id);
        assert_eq!(fields[1].id, again[1].id);
    }

    #[test]
    fn snapshot_ids_are_distinct_and_non_negative() {
        let a = generate_snapshot_id();
        let b = generate_snapshot_id();
        assert!(a >= 0);
        assert!(b >= 0);
        assert_ne!(a, b);
    }

    #[test]
    fn document_keys_are_sequence_numbered_json() {
        let id = Uuid::new_v4();
        let key = metadata_doc_key("sales_iceberg", 0, &id);
        assert!(key.starts_with("sales_iceberg/metadata/00000-"));
        assert!(key.ends_with("-metadata.json"));

        let snap = snapshot_doc_key("sales_iceberg", 1, &id, 42);
        assert!(snap.starts_with("sales_iceberg/metadata/00001-"));
        assert!(snap.ends_with("-snap-42.json"));
    }
}
