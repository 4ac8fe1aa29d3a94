//! Best-effort Delta table summaries from directory listings.
//!
//! No log replay: the current version is derived from the number of log
//! entries and listed data files are not validated against any log entry.
//! An empty or missing log yields version 0 and an empty file list, never an
//! error.

use chrono::Utc;

use strata_core::storage::BlobStore;
use strata_core::table::{FileRef, TableFormat, TableMetadata, TableStatistics};
use strata_core::Result;

use crate::log::log_prefix;

/// Re-derives a table description by listing its storage prefix.
///
/// # Errors
///
/// Returns [`strata_core::Error::BucketNotFound`] when the bucket is missing
/// and [`strata_core::Error::Store`] on listing failures. An empty prefix is
/// not an error.
pub async fn summarize(
    store: &dyn BlobStore,
    bucket: &str,
    table_name: &str,
) -> Result<TableMetadata> {
    let table_prefix = format!("{table_name}/");
    let objects = store.list(bucket, &table_prefix).await?;

    let log = log_prefix(table_name);
    let log_entries = store.list(bucket, &log).await?;
    let version = i64::try_from(log_entries.len()).unwrap_or(i64::MAX).saturating_sub(1).max(0);

    let now = Utc::now().timestamp_millis();
    let files: Vec<FileRef> = objects
        .iter()
        .filter(|obj| !obj.key.starts_with(&log))
        .map(|obj| FileRef {
            path: obj.key.clone(),
            size: obj.size,
            modification_time: obj
                .last_modified
                .map_or(now, |ts| ts.timestamp_millis()),
            num_records: None,
            data_change: true,
        })
        .collect();

    let total_size: u64 = objects.iter().map(|obj| obj.size).sum();

    tracing::debug!(
        bucket = %bucket,
        table = %table_name,
        version,
        files = files.len(),
        "summarized delta table directory"
    );

    Ok(TableMetadata {
        table_name: table_name.to_string(),
        location: format!("s3://{bucket}/{table_name}"),
        format: TableFormat::Delta,
        schema: Vec::new(),
        version,
        current_snapshot_id: None,
        files,
        statistics: TableStatistics::for_listing(objects.len() as u64, total_size),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    use bytes::Bytes;
    use strata_core::storage::{MemoryStore, WritePrecondition};
    use strata_core::table::ProbedFile;

    use crate::synthesize::DeltaSynthesizer;

    #[tokio::test]
    async fn empty_table_prefix_yields_version_zero_not_an_error() {
        let store = MemoryStore::new();
        store.create_bucket("data").expect("create bucket");

        let metadata = summarize(&store, "data", "sales_delta")
            .await
            .expect("summary should succeed");

        assert_eq!(metadata.version, 0);
        assert!(metadata.files.is_empty());
        assert!(metadata.schema.is_empty());
        assert_eq!(metadata.statistics.num_files, 0);
        assert_eq!(metadata.statistics.average_file_size, Some(0.0));
    }

    #[tokio::test]
    async fn summary_counts_log_entries_and_excludes_them_from_files() {
        let store = Arc::new(MemoryStore::new());

        // Source data file lives under the table prefix.
        store
            .put(
                "data",
                "sales_delta/part-0000.parquet",
                Bytes::from(vec![0u8; 128]),
                "application/octet-stream",
                WritePrecondition::None,
            )
            .await
            .expect("seed data file");

        let synthesizer = DeltaSynthesizer::new(store.clone());
        synthesizer
            .synthesize(&ProbedFile {
                bucket: "data".to_string(),
                key: "sales.parquet".to_string(),
                byte_size: 50000,
                row_count: 1000,
                columns: Vec::new(),
            })
            .await
            .expect("synthesis");

        let metadata = summarize(store.as_ref(), "data", "sales_delta")
            .await
            .expect("summary");

        // Two log entries were written, so the current version is 1.
        assert_eq!(metadata.version, 1);
        assert_eq!(metadata.files.len(), 1);
        assert_eq!(metadata.files[0].path, "sales_delta/part-0000.parquet");
        assert!(metadata
            .files
            .iter()
            .all(|f| !f.path.contains("_delta_log")));
        assert_eq!(metadata.location, "s3://data/sales_delta");
    }
}
