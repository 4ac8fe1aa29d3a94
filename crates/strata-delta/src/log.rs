//! Delta-style commit log documents.
//!
//! One JSON document per log entry, written under
//! `<table location>/_delta_log/<20-digit zero-padded version>.json`.
//! Entry 0 is always `CREATE TABLE` and carries no file additions; entries
//! ≥ 1 are `WRITE` entries adding data files. The log is append-only —
//! existing entries are never rewritten.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use strata_core::table::ColumnSchema;
use strata_core::{Error, Result};

/// Reader/writer protocol versions advertised by synthesized tables.
pub const MIN_READER_VERSION: i32 = 1;
/// Writer protocol version advertised by synthesized tables.
pub const MIN_WRITER_VERSION: i32 = 2;

/// Operation recorded in a commit entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeltaOperation {
    /// Table creation (entry 0 only).
    #[serde(rename = "CREATE TABLE")]
    CreateTable,
    /// Data file addition.
    #[serde(rename = "WRITE")]
    Write,
}

/// One entry of the commit log.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    /// Commit provenance.
    pub commit_info: CommitInfo,
    /// Protocol versions.
    pub protocol: Protocol,
    /// Table metadata; present on the `CREATE TABLE` entry only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta_data: Option<MetaData>,
    /// Added data files; present on `WRITE` entries only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub add: Option<Vec<AddFile>>,
}

/// Commit provenance block.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitInfo {
    /// Commit timestamp in epoch milliseconds.
    pub timestamp: i64,
    /// Operation kind.
    pub operation: DeltaOperation,
    /// Operation parameters.
    pub operation_parameters: OperationParameters,
    /// Version the writer read before committing; -1 for table creation.
    pub read_version: i64,
    /// Isolation level label.
    pub isolation_level: String,
    /// Whether the commit only appends data.
    pub is_blind_append: bool,
}

/// Parameters of the operation that produced a commit.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationParameters {
    /// Write mode (`create` or `append`).
    pub mode: String,
    /// Partitioning columns as a JSON-encoded list (always empty here).
    pub partition_by: String,
}

/// Protocol versions block.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Protocol {
    /// Minimum reader version.
    pub min_reader_version: i32,
    /// Minimum writer version.
    pub min_writer_version: i32,
}

impl Default for Protocol {
    fn default() -> Self {
        Self {
            min_reader_version: MIN_READER_VERSION,
            min_writer_version: MIN_WRITER_VERSION,
        }
    }
}

/// Table metadata block of the `CREATE TABLE` entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetaData {
    /// Stable table identifier (UUID, never wall-clock derived).
    pub id: String,
    /// Table name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// Data file format.
    pub format: FileFormat,
    /// JSON-encoded struct schema.
    pub schema_string: String,
    /// Partition columns (always empty).
    pub partition_columns: Vec<String>,
    /// Table configuration properties.
    pub configuration: BTreeMap<String, String>,
    /// Creation timestamp in epoch milliseconds.
    pub created_time: i64,
}

/// Data file format descriptor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileFormat {
    /// Provider name.
    pub provider: String,
    /// Provider options.
    pub options: BTreeMap<String, String>,
}

impl Default for FileFormat {
    fn default() -> Self {
        Self {
            provider: "parquet".to_string(),
            options: BTreeMap::new(),
        }
    }
}

/// A data file added by a `WRITE` entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddFile {
    /// Object key of the added file.
    pub path: String,
    /// File size in bytes.
    pub size: u64,
    /// Modification timestamp in epoch milliseconds.
    pub modification_time: i64,
    /// Whether the file changes table data.
    pub data_change: bool,
    /// Per-file statistics.
    pub stats: FileStats,
}

/// Per-file statistics carried by an add entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileStats {
    /// Row count of the file.
    pub num_records: i64,
    /// Per-column minimums (not collected).
    pub min_values: BTreeMap<String, serde_json::Value>,
    /// Per-column maximums (not collected).
    pub max_values: BTreeMap<String, serde_json::Value>,
    /// Per-column null counts (not collected).
    pub null_count: BTreeMap<String, serde_json::Value>,
}

/// Struct schema serialized into `MetaData::schema_string`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructSchema {
    /// Always `struct`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Ordered struct fields.
    pub fields: Vec<StructField>,
}

/// One field of a struct schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructField {
    /// Field name.
    pub name: String,
    /// Lowercase type name.
    #[serde(rename = "type")]
    pub field_type: String,
    /// Whether the field accepts nulls.
    pub nullable: bool,
    /// Field metadata (always empty).
    pub metadata: BTreeMap<String, serde_json::Value>,
}

/// Translates probed columns into the Delta struct schema, preserving field
/// order and names exactly.
#[must_use]
pub fn struct_schema(columns: &[ColumnSchema]) -> StructSchema {
    StructSchema {
        kind: "struct".to_string(),
        fields: columns
            .iter()
            .map(|column| StructField {
                name: column.name.clone(),
                field_type: column.logical_type.lowercase_name().to_string(),
                nullable: true,
                metadata: BTreeMap::new(),
            })
            .collect(),
    }
}

/// Default configuration properties stamped on synthesized tables.
#[must_use]
pub fn default_configuration() -> BTreeMap<String, String> {
    BTreeMap::from([
        ("delta.enableChangeDataFeed".to_string(), "true".to_string()),
        ("delta.minReaderVersion".to_string(), MIN_READER_VERSION.to_string()),
        ("delta.minWriterVersion".to_string(), MIN_WRITER_VERSION.to_string()),
        ("delta.columnMapping.mode".to_string(), "name".to_string()),
    ])
}

/// Returns the log sub-path of a table location.
#[must_use]
pub fn log_prefix(table_location: &str) -> String {
    format!("{table_location}/_delta_log/")
}

/// Returns the object key of a log entry.
///
/// # Errors
///
/// Returns [`Error::Validation`] when `version` is negative.
pub fn log_entry_key(table_location: &str, version: i64) -> Result<String> {
    if version < 0 {
        return Err(Error::validation("delta log version must be non-negative"));
    }
    Ok(format!("{}{version:020}.json", log_prefix(table_location)))
}

/// Extracts the version number from a log entry key, if it names one.
///
/// Keys that do not follow the `<version>.json` pattern (checkpoints,
/// foreign objects) yield `None`.
#[must_use]
pub fn parse_entry_version(key: &str, prefix: &str) -> Option<i64> {
    key.strip_prefix(prefix)?
        .strip_suffix(".json")?
        .parse()
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_core::table::LogicalType;

    #[test]
    fn log_entry_key_is_zero_padded_to_twenty_digits() {
        let key = log_entry_key("sales_delta", 1).expect("key");
        assert_eq!(key, "sales_delta/_delta_log/00000000000000000001.json");
        assert!(log_entry_key("sales_delta", -1).is_err());
    }

    #[test]
    fn parse_entry_version_roundtrips() {
        let prefix = log_prefix("sales_delta");
        let key = log_entry_key("sales_delta", 42).expect("key");
        assert_eq!(parse_entry_version(&key, &prefix), Some(42));
        assert_eq!(
            parse_entry_version("sales_delta/_delta_log/_last_checkpoint", &prefix),
            None
        );
        assert_eq!(parse_entry_version("other/00000000000000000000.json", &prefix), None);
    }

    #[test]
    fn struct_schema_preserves_order_and_lowercases_types() {
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

        let schema = struct_schema(&columns);
        assert_eq!(schema.kind, "struct");
        assert_eq!(schema.fields[0].name, "id");
        assert_eq!(schema.fields[0].field_type, "int64");
        assert_eq!(schema.fields[1].name, "region");
        assert_eq!(schema.fields[1].field_type, "string");
        assert!(schema.fields.iter().all(|f| f.nullable));
    }
}
