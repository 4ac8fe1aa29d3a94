//! Iceberg metadata synthesis from a probed Parquet file.

use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use uuid::Uuid;

use strata_core::storage::{BlobStore, WriteOutcome, WritePrecondition};
use strata_core::table::{
    FileRef, ProbedFile, TableFormat, TableMetadata, TableStatistics, table_location_for,
    table_name_from_key,
};
use strata_core::{Error, Result};

use crate::metadata::{
    FORMAT_VERSION, PartitionSpecDoc, SchemaDoc, SnapshotDoc, SnapshotSummary, SortOrderDoc,
    TableMetadataDoc, default_properties, generate_snapshot_id, manifest_list_location,
    metadata_doc_key, metadata_prefix, schema_fields, snapshot_doc_key,
};

/// Synthesizes Iceberg-style metadata documents for a single Parquet object
/// and persists them next to the source file.
///
/// Documents are written with `DoesNotExist` preconditions in sequence order;
/// an occupied sequence surfaces [`Error::ConcurrentModification`]. As with
/// the Delta synthesizer, the list-then-write sequence itself is not
/// serialized across processes (single-writer assumption).
#[derive(Clone)]
pub struct IcebergSynthesizer {
    store: Arc<dyn BlobStore>,
}

impl std::fmt::Debug for IcebergSynthesizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IcebergSynthesizer").finish_non_exhaustive()
    }
}

impl IcebergSynthesizer {
    /// Creates a synthesizer over the given store.
    #[must_use]
    pub fn new(store: Arc<dyn BlobStore>) -> Self {
        Self { store }
    }

    /// Builds and persists the metadata + snapshot documents for `probed`,
    /// returning the table description.
    ///
    /// The document sequence continues from the count of objects already
    /// present under the table's `metadata/` prefix, so repeated synthesis
    /// appends new sequences instead of assuming a clean slate.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConcurrentModification`] when a computed sequence is
    /// already occupied, [`Error::Store`] / [`Error::Serialization`] on
    /// storage and encoding failures.
    pub async fn synthesize(&self, probed: &ProbedFile) -> Result<TableMetadata> {
        let table_name = table_name_from_key(&probed.key);
        let table_location = table_location_for(&probed.key, TableFormat::Iceberg);
        let prefix = metadata_prefix(&table_location);

        let existing = self.store.list(&probed.bucket, &prefix).await?;
        let next_sequence = existing.len();

        let now = Utc::now().timestamp_millis();
        let doc_id = Uuid::new_v4();
        let snapshot_id = generate_snapshot_id();

        let fields = schema_fields(&probed.columns);
        let last_column_id = i32::try_from(fields.len()).unwrap_or(i32::MAX);

        let metadata_doc = TableMetadataDoc {
            format_version: FORMAT_VERSION,
            table_uuid: Uuid::new_v4().to_string(),
            location: format!("s3://{}/{table_location}", probed.bucket),
            last_updated_ms: now,
            last_column_id,
            current_schema_id: 0,
            schemas: vec![SchemaDoc {
                schema_id: 0,
                kind: "struct".to_string(),
                fields,
            }],
            default_spec_id: 0,
            partition_specs: vec![PartitionSpecDoc {
                spec_id: 0,
                fields: Vec::new(),
            }],
            last_partition_id: 0,
            default_sort_order_id: 0,
            sort_orders: vec![SortOrderDoc {
                order_id: 0,
                fields: Vec::new(),
            }],
            properties: default_properties(),
        };

        let manifest_list =
            manifest_list_location(&probed.bucket, &table_location, next_sequence, &doc_id);
        let row_count = probed.row_count.to_string();
        let byte_size = probed.byte_size.to_string();
        let snapshot_doc = SnapshotDoc {
            snapshot_id,
            timestamp_ms: now,
            manifest_list,
            schema_id: 0,
            summary: SnapshotSummary {
                operation: "append".to_string(),
                added_data_files: "1".to_string(),
                added_records: row_count.clone(),
                added_files_size: byte_size.clone(),
                total_records: row_count,
                total_files_size: byte_size,
                total_data_files: "1".to_string(),
                total_delete_files: "0".to_string(),
            },
        };

        let documents = [
            (
                metadata_doc_key(&table_location, next_sequence, &doc_id),
                encode(&metadata_doc)?,
            ),
            (
                snapshot_doc_key(&table_location, next_sequence + 1, &doc_id, snapshot_id),
                encode(&snapshot_doc)?,
            ),
        ];

        for (key, body) in documents {
            let outcome = self
                .store
                .put(
                    &probed.bucket,
                    &key,
                    body,
                    "application/json",
                    WritePrecondition::DoesNotExist,
                )
                .await?;
            if outcome == WriteOutcome::PreconditionFailed {
                return Err(Error::concurrent_modification(format!(
                    "iceberg metadata document already exists: {key}"
                )));
            }

            tracing::info!(
                bucket = %probed.bucket,
                table = %table_name,
                key = %key,
                "wrote iceberg metadata document"
            );
        }

        Ok(TableMetadata {
            table_name,
            location: format!("s3://{}/{table_location}", probed.bucket),
            format: TableFormat::Iceberg,
            schema: probed.columns.clone(),
            version: i64::try_from(next_sequence).unwrap_or(i64::MAX),
            current_snapshot_id: Some(snapshot_id),
            files: vec![FileRef {
                path: probed.key.clone(),
                size: probed.byte_size,
                modification_time: now,
                num_records: Some(probed.row_count),
                data_change: true,
            }],
            statistics: TableStatistics::for_conversion(probed.row_count, probed.byte_size),
        })
    }
}

fn encode<T: serde::Serialize>(doc: &T) -> Result<Bytes> {
    serde_json::to_vec(doc)
        .map(Bytes::from)
        .map_err(|e| Error::serialization(format!("failed to encode iceberg document: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;
    use strata_core::storage::{ByteStream, MemoryStore, ObjectInfo};
    use strata_core::table::{ColumnSchema, LogicalType};

    fn sales_probe() -> ProbedFile {
        ProbedFile {
            bucket: "data".to_string(),
            key: "sales.parquet".to_string(),
            byte_size: 50000,
            row_count: 1000,
            columns: vec![
                ColumnSchema {
                    name: "id".to_string(),
                    logical_type: LogicalType::Int64,
                    nullable: false,
                    source_description: "INT64".to_string(),
                },
                ColumnSchema {
                    name: "amount".to_string(),
                    logical_type: LogicalType::Double,
                    nullable: true,
                    source_description: "DOUBLE".to_string(),
                },
                ColumnSchema {
                    name: "region".to_string(),
                    logical_type: LogicalType::String,
                    nullable: true,
                    source_description: "BYTE_ARRAY (UTF8)".to_string(),
                },
            ],
        }
    }

    #[tokio::test]
    async fn synthesis_writes_metadata_and_snapshot_documents() {
        let store = Arc::new(MemoryStore::new());
        store.create_bucket("data").expect("create bucket");
        let synthesizer = IcebergSynthesizer::new(store.clone());

        let metadata = synthesizer
            .synthesize(&sales_probe())
            .await
            .expect("synthesis should succeed");

        assert_eq!(metadata.table_name, "sales");
        assert_eq!(metadata.location, "s3://data/sales_iceberg");
        assert_eq!(metadata.format, TableFormat::Iceberg);
        assert_eq!(metadata.statistics.average_record_size, Some(50.0));
        let snapshot_id = metadata.current_snapshot_id.expect("snapshot id");

        let docs = store
            .list("data", "sales_iceberg/metadata/")
            .await
            .expect("list");
        assert_eq!(docs.len(), 2);
        assert!(docs[0].key.starts_with("sales_iceberg/metadata/00000-"));
        assert!(docs[0].key.ends_with("-metadata.json"));
        assert!(docs[1].key.starts_with("sales_iceberg/metadata/00001-"));
        assert!(docs[1].key.ends_with(&format!("-snap-{snapshot_id}.json")));
        // Content is JSON and the extension says so.
        assert!(docs.iter().all(|d| d.key.ends_with(".json")));

        let body = store.get("data", &docs[0].key).await.expect("metadata doc");
        let doc: serde_json::Value = serde_json::from_slice(&body).expect("valid json");
        assert_eq!(doc["formatVersion"], 1);
        assert_eq!(doc["location"], "s3://data/sales_iceberg");
        assert_eq!(doc["lastColumnId"], 3);
        let fields = doc["schemas"][0]["fields"].as_array().expect("fields");
        let ids: Vec<_> = fields.iter().map(|f| f["id"].as_i64().unwrap()).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(fields[0]["type"], "int64");
        assert_eq!(fields[2]["type"], "string");
        assert!(fields.iter().all(|f| f["required"] == true));

        let body = store.get("data", &docs[1].key).await.expect("snapshot doc");
        let snap: serde_json::Value = serde_json::from_slice(&body).expect("valid json");
        assert_eq!(snap["snapshotId"], snapshot_id);
        assert_eq!(snap["summary"]["operation"], "append");
        assert_eq!(snap["summary"]["added-records"], "1000");
        assert_eq!(snap["summary"]["total-files-size"], "50000");
    }

    #[tokio::test]
    async fn repeated_synthesis_appends_new_sequences_with_fresh_snapshot_ids() {
        let store = Arc::new(MemoryStore::new());
        store.create_bucket("data").expect("create bucket");
        let synthesizer = IcebergSynthesizer::new(store.clone());

        let first = synthesizer.synthesize(&sales_probe()).await.expect("first");
        let second = synthesizer.synthesize(&sales_probe()).await.expect("second");

        assert_ne!(first.current_snapshot_id, second.current_snapshot_id);
        assert_eq!(first.version, 0);
        assert_eq!(second.version, 2);

        let docs = store
            .list("data", "sales_iceberg/metadata/")
            .await
            .expect("list");
        assert_eq!(docs.len(), 4);
        assert!(docs[2].key.starts_with("sales_iceberg/metadata/00002-"));
        assert!(docs[3].key.starts_with("sales_iceberg/metadata/00003-"));
    }

    #[tokio::test]
    async fn zero_row_file_reports_zero_average() {
        let store = Arc::new(MemoryStore::new());
        store.create_bucket("data").expect("create bucket");
        let synthesizer = IcebergSynthesizer::new(store);
        let mut probe = sales_probe();
        probe.row_count = 0;

        let metadata = synthesizer.synthesize(&probe).await.expect("synthesis");
        assert_eq!(metadata.statistics.average_record_size, Some(0.0));
    }

    /// Store whose conditional writes always lose, as if another writer
    /// claimed every key first.
    struct AlwaysOccupiedStore(MemoryStore);

    #[async_trait]
    impl BlobStore for AlwaysOccupiedStore {
        async fn get(&self, bucket: &str, key: &str) -> Result<Bytes> {
            self.0.get(bucket, key).await
        }

        async fn get_stream(&self, bucket: &str, key: &str) -> Result<ByteStream> {
            self.0.get_stream(bucket, key).await
        }

        async fn put(
            &self,
            bucket: &str,
            key: &str,
            data: Bytes,
            content_type: &str,
            precondition: WritePrecondition,
        ) -> Result<WriteOutcome> {
            if precondition == WritePrecondition::DoesNotExist {
                return Ok(WriteOutcome::PreconditionFailed);
            }
            self.0.put(bucket, key, data, content_type, precondition).await
        }

        async fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<ObjectInfo>> {
            self.0.list(bucket, prefix).await
        }
    }

    #[tokio::test]
    async fn occupied_sequence_surfaces_concurrent_modification() {
        let inner = MemoryStore::new();
        inner.create_bucket("data").expect("create bucket");

        let synthesizer = IcebergSynthesizer::new(Arc::new(AlwaysOccupiedStore(inner)));
        let err = synthesizer.synthesize(&sales_probe()).await.unwrap_err();
        assert!(matches!(err, Error::ConcurrentModification { .. }), "got {err:?}");
    }
}
