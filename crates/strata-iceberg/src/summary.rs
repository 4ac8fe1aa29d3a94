//! Best-effort Iceberg table summaries from directory listings.
//!
//! Manifest and metadata documents are never parsed: the schema is reported
//! empty and the version is derived from the number of objects under the
//! `metadata/` prefix. An empty table prefix is not an error.

use chrono::Utc;

use strata_core::storage::BlobStore;
use strata_core::table::{FileRef, TableFormat, TableMetadata, TableStatistics};
use strata_core::Result;

use crate::metadata::metadata_prefix;

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

    let metadata = metadata_prefix(table_name);
    let metadata_docs = store.list(bucket, &metadata).await?;
    let version = i64::try_from(metadata_docs.len())
        .unwrap_or(i64::MAX)
        .saturating_sub(1)
        .max(0);

    let now = Utc::now().timestamp_millis();
    let files: Vec<FileRef> = objects
        .iter()
        .filter(|obj| !obj.key.starts_with(&metadata))
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
        "summarized iceberg table directory"
    );

    Ok(TableMetadata {
        table_name: table_name.to_string(),
        location: format!("s3://{bucket}/{table_name}"),
        format: TableFormat::Iceberg,
        schema: Vec::new(),
        version,
        current_snapshot_id: None,
        files,
        statistics: TableStatistics::for_listing(objects.len() as u64, total_size),
    })
}
