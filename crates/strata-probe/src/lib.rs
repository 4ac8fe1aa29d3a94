//! # strata-probe
//!
//! Schema prober for Parquet payloads stored in object storage.
//!
//! Parquet requires random access to a trailing footer, so the payload is
//! first spilled from the storage stream into a local scratch file (bounded
//! by disk, not memory), then parsed with the `parquet` footer reader. The
//! scratch file is owned by the probing request and deleted on every exit
//! path, including parse failures and request cancellation.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

use std::collections::HashSet;
use std::path::PathBuf;

use parquet::basic::{ConvertedType, LogicalType as ParquetLogicalType, Repetition, Type as PhysicalType};
use parquet::file::reader::{FileReader, SerializedFileReader};
use parquet::schema::types::Type as SchemaType;
use tokio::io::AsyncWriteExt as _;

use futures::StreamExt as _;
use strata_core::storage::ByteStream;
use strata_core::table::{ColumnSchema, LogicalType, ProbedFile};
use strata_core::{Error, Result};

/// Probes Parquet payloads for their schema and row statistics.
///
/// Stateless apart from the scratch directory; safe to share across requests.
/// Scratch files are never shared or reused between requests.
#[derive(Debug, Clone, Default)]
pub struct SchemaProber {
    scratch_dir: Option<PathBuf>,
}

impl SchemaProber {
    /// Creates a prober that spills to the system temp directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a prober that spills to the given directory.
    #[must_use]
    pub fn with_scratch_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            scratch_dir: Some(dir.into()),
        }
    }

    /// Streams a payload to scratch and extracts its schema and row count.
    ///
    /// `bucket` and `key` identify the source object for the returned
    /// [`ProbedFile`]; the byte size is counted from the stream itself.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`] when the payload is not a valid Parquet file
    /// (missing or truncated footer, bad magic, duplicate column names) — no
    /// partial schema is ever returned. Storage errors from the stream and
    /// scratch I/O failures propagate unchanged.
    pub async fn probe(
        &self,
        bucket: &str,
        key: &str,
        mut payload: ByteStream,
    ) -> Result<ProbedFile> {
        let scratch = match &self.scratch_dir {
            Some(dir) => tempfile::NamedTempFile::new_in(dir),
            None => tempfile::NamedTempFile::new(),
        }
        .map_err(|e| Error::store_with_source("failed to create scratch file", e))?;

        let mut file = tokio::fs::File::from_std(
            scratch
                .reopen()
                .map_err(|e| Error::store_with_source("failed to open scratch file", e))?,
        );

        let mut byte_size: u64 = 0;
        while let Some(chunk) = payload.next().await {
            let chunk = chunk?;
            byte_size += chunk.len() as u64;
            file.write_all(&chunk)
                .await
                .map_err(|e| Error::store_with_source("failed to spill payload to scratch", e))?;
        }
        file.flush()
            .await
            .map_err(|e| Error::store_with_source("failed to flush scratch file", e))?;
        drop(file);

        let footer_input = scratch
            .reopen()
            .map_err(|e| Error::store_with_source("failed to reopen scratch file", e))?;

        // Footer parsing is synchronous and seek-heavy; keep it off the
        // async workers.
        let (row_count, columns) =
            tokio::task::spawn_blocking(move || read_footer(footer_input))
                .await
                .map_err(|e| Error::Internal {
                    message: format!("schema probe task failed: {e}"),
                })??;

        // The scratch file is deleted on drop regardless; an explicit close
        // lets us log deletion failures without masking the result.
        if let Err(e) = scratch.close() {
            tracing::warn!(error = %e, "failed to remove scratch file");
        }

        tracing::debug!(
            bucket = %bucket,
            key = %key,
            byte_size,
            row_count,
            columns = columns.len(),
            "probed parquet payload"
        );

        Ok(ProbedFile {
            bucket: bucket.to_string(),
            key: key.to_string(),
            byte_size,
            row_count,
            columns,
        })
    }
}

fn read_footer(file: std::fs::File) -> Result<(i64, Vec<ColumnSchema>)> {
    let reader = SerializedFileReader::new(file)
        .map_err(|e| Error::parse(format!("invalid parquet payload: {e}")))?;

    let metadata = reader.metadata().file_metadata();
    let row_count = metadata.num_rows();

    let root = metadata.schema();
    let mut columns = Vec::with_capacity(root.get_fields().len());
    let mut seen = HashSet::new();
    for field in root.get_fields() {
        let column = column_schema(field.as_ref())?;
        if !seen.insert(column.name.clone()) {
            return Err(Error::parse(format!(
                "duplicate column name in parquet schema: {}",
                column.name
            )));
        }
        columns.push(column);
    }

    Ok((row_count, columns))
}

fn column_schema(field: &SchemaType) -> Result<ColumnSchema> {
    let info = field.get_basic_info();
    // OPTIONAL and REPEATED both admit missing values; REQUIRED is the only
    // repetition that forbids nulls.
    let nullable = !info.has_repetition() || info.repetition() != Repetition::REQUIRED;

    let (logical_type, source_description) = match field {
        SchemaType::PrimitiveType { physical_type, .. } => {
            let converted = info.converted_type();
            let logical = info.logical_type();
            let mapped = map_primitive(*physical_type, converted, logical.as_ref());
            let description = if converted == ConvertedType::NONE {
                format!("{physical_type:?}")
            } else {
                format!("{physical_type:?} ({converted:?})")
            };
            (mapped, description)
        }
        SchemaType::GroupType { .. } => (LogicalType::Struct, "GROUP".to_string()),
    };

    Ok(ColumnSchema {
        name: info.name().to_string(),
        logical_type,
        nullable,
        source_description,
    })
}

fn map_primitive(
    physical: PhysicalType,
    converted: ConvertedType,
    logical: Option<&ParquetLogicalType>,
) -> LogicalType {
    match physical {
        PhysicalType::BOOLEAN => LogicalType::Boolean,
        PhysicalType::INT32 => LogicalType::Int32,
        PhysicalType::INT64 => {
            if matches!(logical, Some(ParquetLogicalType::Timestamp { .. })) {
                LogicalType::Timestamp
            } else {
                LogicalType::Int64
            }
        }
        PhysicalType::INT96 => LogicalType::Timestamp,
        PhysicalType::FLOAT => LogicalType::Float,
        PhysicalType::DOUBLE => LogicalType::Double,
        PhysicalType::BYTE_ARRAY => {
            if converted == ConvertedType::UTF8
                || matches!(logical, Some(ParquetLogicalType::String))
            {
                LogicalType::String
            } else {
                LogicalType::Binary
            }
        }
        PhysicalType::FIXED_LEN_BYTE_ARRAY => LogicalType::Binary,
    }
}
