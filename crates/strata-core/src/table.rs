//! Canonical table-format contract shared by every Strata component.
//!
//! The types here are the wire contract of the metadata API and the input
//! contract of the synthesizers. [`TableMetadata`] is always derived — it is
//! recomputed on every request and never cached or treated as authoritative.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::{Error, Result};

/// Supported table formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TableFormat {
    /// Delta Lake table.
    Delta,
    /// Apache Iceberg table.
    Iceberg,
}

impl TableFormat {
    /// Parses a table format using case-insensitive matching.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] when `raw` is unknown or empty.
    pub fn parse(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "delta" => Ok(Self::Delta),
            "iceberg" => Ok(Self::Iceberg),
            other => Err(Error::validation(format!(
                "unknown table format '{other}'; expected one of: delta, iceberg"
            ))),
        }
    }

    /// Returns the canonical lowercase string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Delta => "delta",
            Self::Iceberg => "iceberg",
        }
    }

    /// Returns the location suffix appended to the source key stem.
    #[must_use]
    pub const fn location_suffix(self) -> &'static str {
        match self {
            Self::Delta => "_delta",
            Self::Iceberg => "_iceberg",
        }
    }

    /// Returns the sub-path of the table prefix holding the metadata log.
    #[must_use]
    pub const fn log_dir(self) -> &'static str {
        match self {
            Self::Delta => "_delta_log",
            Self::Iceberg => "metadata",
        }
    }
}

impl std::fmt::Display for TableFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Logical column type extracted from a columnar file footer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum LogicalType {
    /// UTF-8 string.
    String,
    /// 32-bit signed integer.
    Int32,
    /// 64-bit signed integer.
    Int64,
    /// 32-bit IEEE float.
    Float,
    /// 64-bit IEEE float.
    Double,
    /// Boolean.
    Boolean,
    /// Arbitrary byte array.
    Binary,
    /// Timestamp (epoch-based).
    Timestamp,
    /// Nested group of fields.
    Struct,
}

impl LogicalType {
    /// Returns the lowercase type name used in synthesized schemas.
    ///
    /// Lowercasing is idempotent: translating an already-translated name is
    /// a no-op, which keeps repeated synthesis stable.
    #[must_use]
    pub const fn lowercase_name(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::Float => "float",
            Self::Double => "double",
            Self::Boolean => "boolean",
            Self::Binary => "binary",
            Self::Timestamp => "timestamp",
            Self::Struct => "struct",
        }
    }
}

/// One column of a probed table schema.
///
/// Columns form an ordered sequence; names are unique within a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ColumnSchema {
    /// Column name.
    pub name: String,
    /// Logical type.
    #[serde(rename = "type")]
    pub logical_type: LogicalType,
    /// Whether the column accepts nulls. Defaults to `true` when the source
    /// format leaves repetition unspecified.
    pub nullable: bool,
    /// The source format's own description of the type (for diagnostics).
    pub source_description: String,
}

/// A probed columnar file. Transient: lives for one conversion request and
/// is never persisted as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbedFile {
    /// Bucket holding the source object.
    pub bucket: String,
    /// Key of the source object.
    pub key: String,
    /// Size of the source object in bytes.
    pub byte_size: u64,
    /// Total row count from the file footer.
    pub row_count: i64,
    /// Ordered column schemas.
    pub columns: Vec<ColumnSchema>,
}

/// Reference to a data file that is part of a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FileRef {
    /// Object key of the data file.
    pub path: String,
    /// File size in bytes.
    pub size: u64,
    /// Last-modified timestamp in epoch milliseconds.
    pub modification_time: i64,
    /// Row count, when known at synthesis time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_records: Option<i64>,
    /// Whether the file changes table data (always true for synthesized adds).
    pub data_change: bool,
}

/// Aggregate statistics over a table's data files.
///
/// Field population differs by producer: conversions report record-based
/// averages, directory summaries report file-based averages. Averages are 0
/// when the divisor is 0 — never NaN or infinity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TableStatistics {
    /// Number of data files.
    pub num_files: u64,
    /// Total row count, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_records: Option<i64>,
    /// Total size of all files in bytes.
    pub total_size: u64,
    /// Average bytes per record, when the row count is known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_record_size: Option<f64>,
    /// Average bytes per file (directory summaries).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_file_size: Option<f64>,
}

impl TableStatistics {
    /// Statistics for a single freshly converted file.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn for_conversion(row_count: i64, byte_size: u64) -> Self {
        let average_record_size = if row_count > 0 {
            Some(byte_size as f64 / row_count as f64)
        } else {
            Some(0.0)
        };
        Self {
            num_files: 1,
            num_records: Some(row_count),
            total_size: byte_size,
            average_record_size,
            average_file_size: None,
        }
    }

    /// Statistics derived from a directory listing.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn for_listing(num_files: u64, total_size: u64) -> Self {
        let average_file_size = if num_files > 0 {
            Some(total_size as f64 / num_files as f64)
        } else {
            Some(0.0)
        };
        Self {
            num_files,
            num_records: None,
            total_size,
            average_record_size: None,
            average_file_size,
        }
    }
}

/// Derived description of a table. Recomputed on every request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TableMetadata {
    /// Table name derived from the source key.
    pub table_name: String,
    /// Table location as an `s3://` URI.
    pub location: String,
    /// Table format.
    pub format: TableFormat,
    /// Column schemas; empty when no schema is available (directory
    /// summaries do not parse manifests).
    pub schema: Vec<ColumnSchema>,
    /// Current log version (Delta) or metadata sequence (Iceberg).
    pub version: i64,
    /// Current snapshot id (Iceberg only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_snapshot_id: Option<i64>,
    /// Data files belonging to the table.
    pub files: Vec<FileRef>,
    /// Aggregate statistics.
    pub statistics: TableStatistics,
}

/// Derives the table name from a source object key: the final path segment
/// with the columnar-file extension stripped.
#[must_use]
pub fn table_name_from_key(key: &str) -> String {
    let stem = key_stem(key);
    stem.rsplit('/').next().unwrap_or(stem).to_string()
}

/// Derives the table storage prefix for a source key: the sibling path
/// `<key-without-extension><format suffix>`.
#[must_use]
pub fn table_location_for(key: &str, format: TableFormat) -> String {
    format!("{}{}", key_stem(key), format.location_suffix())
}

fn key_stem(key: &str) -> &str {
    key.strip_suffix(".parquet").unwrap_or(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_format_is_case_insensitive() {
        assert_eq!(TableFormat::parse("Delta").unwrap(), TableFormat::Delta);
        assert_eq!(TableFormat::parse(" ICEBERG ").unwrap(), TableFormat::Iceberg);
        assert!(TableFormat::parse("hudi").is_err());
    }

    #[test]
    fn lowercase_name_is_idempotent() {
        for ty in [
            LogicalType::String,
            LogicalType::Int64,
            LogicalType::Double,
            LogicalType::Boolean,
        ] {
            let name = ty.lowercase_name();
            assert_eq!(name, name.to_ascii_lowercase());
        }
    }

    #[test]
    fn table_name_strips_extension_and_path() {
        assert_eq!(table_name_from_key("sales.parquet"), "sales");
        assert_eq!(table_name_from_key("raw/2024/sales.parquet"), "sales");
        assert_eq!(table_name_from_key("noext"), "noext");
    }

    #[test]
    fn table_location_is_a_sibling_path() {
        assert_eq!(
            table_location_for("sales.parquet", TableFormat::Delta),
            "sales_delta"
        );
        assert_eq!(
            table_location_for("raw/sales.parquet", TableFormat::Iceberg),
            "raw/sales_iceberg"
        );
    }

    #[test]
    fn conversion_statistics_guard_against_zero_rows() {
        let stats = TableStatistics::for_conversion(0, 4096);
        assert_eq!(stats.average_record_size, Some(0.0));

        let stats = TableStatistics::for_conversion(1000, 50000);
        assert_eq!(stats.average_record_size, Some(50.0));
        assert_eq!(stats.num_records, Some(1000));
    }

    #[test]
    fn listing_statistics_guard_against_zero_files() {
        let stats = TableStatistics::for_listing(0, 0);
        assert_eq!(stats.average_file_size, Some(0.0));
        assert_eq!(stats.num_files, 0);
    }

    #[test]
    fn statistics_serialize_camel_case() {
        let stats = TableStatistics::for_conversion(1000, 50000);
        let value = serde_json::to_value(&stats).expect("serialize");
        assert_eq!(value["numFiles"], 1);
        assert_eq!(value["numRecords"], 1000);
        assert_eq!(value["totalSize"], 50000);
        assert_eq!(value["averageRecordSize"], 50.0);
    }
}
