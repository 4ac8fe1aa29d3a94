//! Delta log synthesis from a probed Parquet file.

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

use crate::log::{
    AddFile, CommitInfo, DeltaOperation, FileFormat, FileStats, LogEntry, MetaData,
    OperationParameters, Protocol, default_configuration, log_entry_key, log_prefix,
    parse_entry_version, struct_schema,
};

/// Synthesizes a Delta-style commit log for a single Parquet object and
/// persists it next to the source file.
///
/// Each log entry is written with a `DoesNotExist` precondition, so the
/// append-only invariant holds even when two writers race: the loser gets
/// [`Error::ConcurrentModification`] instead of overwriting. Synthesis is
/// otherwise single-writer — there is no cross-process serialization of the
/// list-then-append sequence.
#[derive(Clone)]
pub struct DeltaSynthesizer {
    store: Arc<dyn BlobStore>,
}

impl std::fmt::Debug for DeltaSynthesizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeltaSynthesizer").finish_non_exhaustive()
    }
}

impl DeltaSynthesizer {
    /// Creates a synthesizer over the given store.
    #[must_use]
    pub fn new(store: Arc<dyn BlobStore>) -> Self {
        Self { store }
    }

    /// Builds and persists the commit log for `probed`, returning the table
    /// description.
    ///
    /// An empty log yields entries 0 (`CREATE TABLE`) and 1 (`WRITE`); a log
    /// with highest version `v` yields a single `WRITE` entry at `v + 1` —
    /// synthesis continues from the existing log, it never assumes a clean
    /// slate. Partially written documents from a failed earlier attempt are
    /// left in place and absorbed by this continuation.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConcurrentModification`] when a computed version is
    /// already occupied, [`Error::Store`] / [`Error::Serialization`] on
    /// storage and encoding failures.
    pub async fn synthesize(&self, probed: &ProbedFile) -> Result<TableMetadata> {
        let table_name = table_name_from_key(&probed.key);
        let table_location = table_location_for(&probed.key, TableFormat::Delta);
        let prefix = log_prefix(&table_location);

        let existing = self.store.list(&probed.bucket, &prefix).await?;
        let highest = existing
            .iter()
            .filter_map(|obj| parse_entry_version(&obj.key, &prefix))
            .max();

        let now = Utc::now().timestamp_millis();
        let entries = match highest {
            None => vec![
                (0, Self::create_table_entry(probed, &table_name, now)),
                (1, Self::write_entry(probed, 0, now)),
            ],
            Some(v) => vec![(v + 1, Self::write_entry(probed, v, now))],
        };

        let mut version = 0;
        for (entry_version, entry) in entries {
            let key = log_entry_key(&table_location, entry_version)?;
            let body = serde_json::to_vec(&entry).map_err(|e| {
                Error::serialization(format!("failed to encode delta log entry: {e}"))
            })?;

            let outcome = self
                .store
                .put(
                    &probed.bucket,
                    &key,
                    Bytes::from(body),
                    "application/json",
                    WritePrecondition::DoesNotExist,
                )
                .await?;
            if outcome == WriteOutcome::PreconditionFailed {
                return Err(Error::concurrent_modification(format!(
                    "delta log version {entry_version} already exists for {table_location}"
                )));
            }

            tracing::info!(
                bucket = %probed.bucket,
                table = %table_name,
                version = entry_version,
                "wrote delta log entry"
            );
            version = entry_version;
        }

        Ok(TableMetadata {
            table_name,
            location: format!("s3://{}/{table_location}", probed.bucket),
            format: TableFormat::Delta,
            schema: probed.columns.clone(),
            version,
            current_snapshot_id: None,
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

    fn create_table_entry(probed: &ProbedFile, table_name: &str, now: i64) -> LogEntry {
        let schema = struct_schema(&probed.columns);
        // schema_string is embedded JSON; serializing a just-built value
        // cannot fail.
        let schema_string = serde_json::to_string(&schema).unwrap_or_default();

        LogEntry {
            commit_info: CommitInfo {
                timestamp: now,
                operation: DeltaOperation::CreateTable,
                operation_parameters: OperationParameters {
                    mode: "create".to_string(),
                    partition_by: "[]".to_string(),
                },
                read_version: -1,
                isolation_level: "Serializable".to_string(),
                is_blind_append: true,
            },
            protocol: Protocol::default(),
            meta_data: Some(MetaData {
                id: Uuid::new_v4().to_string(),
                name: table_name.to_string(),
                description: format!("Delta table converted from {}", probed.key),
                format: FileFormat::default(),
                schema_string,
                partition_columns: Vec::new(),
                configuration: default_configuration(),
                created_time: now,
            }),
            add: None,
        }
    }

    fn write_entry(probed: &ProbedFile, read_version: i64, now: i64) -> LogEntry {
        LogEntry {
            commit_info: CommitInfo {
                timestamp: now,
                operation: DeltaOperation::Write,
                operation_parameters: OperationParameters {
                    mode: "append".to_string(),
                    partition_by: "[]".to_string(),
                },
                read_version,
                isolation_level: "Serializable".to_string(),
                is_blind_append: true,
            },
            protocol: Protocol::default(),
            meta_data: None,
            add: Some(vec![AddFile {
                path: probed.key.clone(),
                size: probed.byte_size,
                modification_time: now,
                data_change: true,
                stats: FileStats {
                    num_records: probed.row_count,
                    ..FileStats::default()
                },
            }]),
        }
    }
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

    async fn log_entry(store: &MemoryStore, version: i64) -> serde_json::Value {
        let key = log_entry_key("sales_delta", version).expect("key");
        let bytes = store.get("data", &key).await.expect("log entry present");
        serde_json::from_slice(&bytes).expect("valid json")
    }

    #[tokio::test]
    async fn first_synthesis_writes_create_and_write_entries() {
        let store = Arc::new(MemoryStore::new());
        store.create_bucket("data").expect("create bucket");
        let synthesizer = DeltaSynthesizer::new(store.clone());

        let metadata = synthesizer
            .synthesize(&sales_probe())
            .await
            .expect("synthesis should succeed");

        assert_eq!(metadata.table_name, "sales");
        assert_eq!(metadata.location, "s3://data/sales_delta");
        assert_eq!(metadata.version, 1);
        assert_eq!(metadata.files.len(), 1);
        assert_eq!(metadata.files[0].path, "sales.parquet");
        assert_eq!(metadata.files[0].size, 50000);
        assert_eq!(metadata.statistics.num_records, Some(1000));
        assert_eq!(metadata.statistics.average_record_size, Some(50.0));

        let v0 = log_entry(&store, 0).await;
        assert_eq!(v0["commitInfo"]["operation"], "CREATE TABLE");
        assert_eq!(v0["commitInfo"]["operationParameters"]["mode"], "create");
        assert_eq!(v0["commitInfo"]["readVersion"], -1);
        assert!(v0["metaData"].is_object());
        assert!(v0.get("add").is_none());

        let schema_string = v0["metaData"]["schemaString"].as_str().expect("schemaString");
        let schema: serde_json::Value = serde_json::from_str(schema_string).expect("embedded json");
        let names: Vec<_> = schema["fields"]
            .as_array()
            .expect("fields")
            .iter()
            .map(|f| f["name"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["id", "amount", "region"]);
        assert_eq!(schema["fields"][0]["type"], "int64");

        let v1 = log_entry(&store, 1).await;
        assert_eq!(v1["commitInfo"]["operation"], "WRITE");
        assert_eq!(v1["commitInfo"]["readVersion"], 0);
        assert_eq!(v1["add"][0]["path"], "sales.parquet");
        assert_eq!(v1["add"][0]["stats"]["numRecords"], 1000);
        assert!(v1.get("metaData").is_none());
    }

    #[tokio::test]
    async fn second_synthesis_continues_from_highest_version() {
        let store = Arc::new(MemoryStore::new());
        store.create_bucket("data").expect("create bucket");
        let synthesizer = DeltaSynthesizer::new(store.clone());

        synthesizer.synthesize(&sales_probe()).await.expect("first run");
        let metadata = synthesizer.synthesize(&sales_probe()).await.expect("second run");

        assert_eq!(metadata.version, 2);

        let v2 = log_entry(&store, 2).await;
        assert_eq!(v2["commitInfo"]["operation"], "WRITE");
        assert_eq!(v2["commitInfo"]["readVersion"], 1);
        assert!(v2.get("metaData").is_none());

        // Version 1 must not have been rewritten.
        let v1 = log_entry(&store, 1).await;
        assert_eq!(v1["commitInfo"]["readVersion"], 0);
    }

    #[tokio::test]
    async fn zero_row_file_reports_zero_average() {
        let store = Arc::new(MemoryStore::new());
        store.create_bucket("data").expect("create bucket");
        let synthesizer = DeltaSynthesizer::new(store);

        let mut probe = sales_probe();
        probe.row_count = 0;
        let metadata = synthesizer.synthesize(&probe).await.expect("synthesis");

        assert_eq!(metadata.statistics.average_record_size, Some(0.0));
        assert_eq!(metadata.statistics.num_records, Some(0));
    }

    /// Store wrapper that hides existing objects from listings, simulating a
    /// second writer landing between list and put.
    struct StaleListStore(MemoryStore);

    #[async_trait]
    impl BlobStore for StaleListStore {
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
            self.0.put(bucket, key, data, content_type, precondition).await
        }

        async fn list(&self, _bucket: &str, _prefix: &str) -> Result<Vec<ObjectInfo>> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn occupied_version_surfaces_concurrent_modification() {
        let inner = MemoryStore::new();
        let occupied = log_entry_key("sales_delta", 0).expect("key");
        inner
            .put(
                "data",
                &occupied,
                Bytes::from("{}"),
                "application/json",
                WritePrecondition::None,
            )
            .await
            .expect("seed occupied version");

        let synthesizer = DeltaSynthesizer::new(Arc::new(StaleListStore(inner)));
        let err = synthesizer.synthesize(&sales_probe()).await.unwrap_err();
        assert!(matches!(err, Error::ConcurrentModification { .. }), "got {err:?}");
    }
}
