//! Blob storage gateway for S3-compatible object stores (MinIO, AWS S3).
//!
//! This module defines the storage contract shared by every component:
//! whole-object and streaming reads, conditional writes, and single-page
//! prefix listings. The conditional `DoesNotExist` write is the primitive the
//! table-format synthesizers build their append-only log protocol on.
//!
//! Listings are collapsed into one ordered sequence capped at the store's
//! page limit; callers must not assume completeness beyond that cap.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::StreamExt as _;
use futures::stream::BoxStream;
use object_store::path::Path as StorePath;
use object_store::{
    Attribute, Attributes, ObjectStore, PutMode, PutOptions, PutPayload,
    aws::AmazonS3Builder,
};

use crate::error::{Error, Result};

/// Maximum number of keys returned by a single listing.
///
/// Matches the single-page `ListObjectsV2` contract; prefixes holding more
/// objects are reported truncated, not paginated.
pub const MAX_LIST_KEYS: usize = 1000;

/// A stream of payload chunks from a storage read.
pub type ByteStream = BoxStream<'static, Result<Bytes>>;

/// Precondition for conditional writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WritePrecondition {
    /// Write only if the object does not exist.
    DoesNotExist,
    /// Write unconditionally.
    None,
}

/// Result of a conditional write.
///
/// A failed precondition is a normal outcome, never an error: callers decide
/// whether an occupied key is a conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The object was written.
    Created,
    /// The precondition was not met; nothing was written.
    PreconditionFailed,
}

/// Metadata about a stored object, as reported by a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectInfo {
    /// Object key relative to the bucket.
    pub key: String,
    /// Object size in bytes.
    pub size: u64,
    /// Last modification timestamp, when the store reports one.
    pub last_modified: Option<DateTime<Utc>>,
}

/// Storage gateway trait for S3-compatible object storage.
///
/// Holds no per-request state beyond connection configuration. Missing keys
/// and missing buckets surface as distinct error variants so the API layer
/// can map both to 404 with distinguishable messages.
#[async_trait]
pub trait BlobStore: Send + Sync + 'static {
    /// Reads an entire object into memory.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ObjectNotFound`] / [`Error::BucketNotFound`] when the
    /// key or bucket is missing, [`Error::Store`] otherwise.
    async fn get(&self, bucket: &str, key: &str) -> Result<Bytes>;

    /// Opens a streaming read of an object.
    ///
    /// Used for payloads that may exceed the memory budget; the prober
    /// spills the stream to local scratch before parsing.
    ///
    /// # Errors
    ///
    /// Same taxonomy as [`BlobStore::get`].
    async fn get_stream(&self, bucket: &str, key: &str) -> Result<ByteStream>;

    /// Writes an object, optionally guarded by a precondition.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Store`] on storage failures. A failed precondition is
    /// reported through [`WriteOutcome::PreconditionFailed`], not an error.
    async fn put(
        &self,
        bucket: &str,
        key: &str,
        data: Bytes,
        content_type: &str,
        precondition: WritePrecondition,
    ) -> Result<WriteOutcome>;

    /// Lists objects under the given prefix, ordered by key.
    ///
    /// Returns at most [`MAX_LIST_KEYS`] entries; an empty prefix yields an
    /// empty vector, not an error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BucketNotFound`] when the bucket is missing,
    /// [`Error::Store`] otherwise.
    async fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<ObjectInfo>>;
}

// ============================================================================
// S3 / MinIO backend
// ============================================================================

/// Connection configuration for [`S3Store`].
#[derive(Clone, Default)]
pub struct StoreConfig {
    /// Endpoint override (e.g. `http://127.0.0.1:9000` for MinIO).
    pub endpoint: Option<String>,
    /// Region; defaults to `us-east-1` when unset.
    pub region: Option<String>,
    /// Access key id.
    pub access_key_id: Option<String>,
    /// Secret access key.
    pub secret_access_key: Option<String>,
    /// Allow plain-HTTP endpoints (local MinIO).
    pub allow_http: bool,
}

impl std::fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreConfig")
            .field("endpoint", &self.endpoint)
            .field("region", &self.region)
            .field("access_key_id", &self.access_key_id)
            .field(
                "secret_access_key",
                &self.secret_access_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field("allow_http", &self.allow_http)
            .finish()
    }
}

/// [`BlobStore`] backed by the `object_store` AWS implementation.
///
/// Buckets are addressed per request, so clients are built lazily and cached
/// by bucket name. Path-style addressing is used throughout for MinIO
/// compatibility.
#[derive(Debug)]
pub struct S3Store {
    config: StoreConfig,
    clients: RwLock<HashMap<String, Arc<dyn ObjectStore>>>,
}

impl S3Store {
    /// Creates a store from connection configuration.
    #[must_use]
    pub fn new(config: StoreConfig) -> Self {
        Self {
            config,
            clients: RwLock::new(HashMap::new()),
        }
    }

    fn client(&self, bucket: &str) -> Result<Arc<dyn ObjectStore>> {
        if let Some(client) = self
            .clients
            .read()
            .map_err(|_| Error::Internal {
                message: "client cache lock poisoned".into(),
            })?
            .get(bucket)
        {
            return Ok(Arc::clone(client));
        }

        let mut builder = AmazonS3Builder::new()
            .with_bucket_name(bucket)
            .with_region(self.config.region.as_deref().unwrap_or("us-east-1"))
            .with_virtual_hosted_style_request(false)
            .with_allow_http(self.config.allow_http);
        if let Some(endpoint) = self.config.endpoint.as_deref() {
            builder = builder.with_endpoint(endpoint);
        }
        if let Some(key) = self.config.access_key_id.as_deref() {
            builder = builder.with_access_key_id(key);
        }
        if let Some(secret) = self.config.secret_access_key.as_deref() {
            builder = builder.with_secret_access_key(secret);
        }

        let client: Arc<dyn ObjectStore> = Arc::new(
            builder
                .build()
                .map_err(|e| Error::store_with_source("failed to build S3 client", e))?,
        );

        self.clients
            .write()
            .map_err(|_| Error::Internal {
                message: "client cache lock poisoned".into(),
            })?
            .insert(bucket.to_string(), Arc::clone(&client));

        Ok(client)
    }
}

fn translate_error(err: object_store::Error, bucket: &str, key: &str) -> Error {
    match err {
        object_store::Error::NotFound { .. } => Error::ObjectNotFound {
            bucket: bucket.to_string(),
            key: key.to_string(),
        },
        other => {
            // MinIO and S3 report a missing bucket inside the error body
            // rather than as a typed variant.
            if other.to_string().contains("NoSuchBucket") {
                Error::BucketNotFound {
                    bucket: bucket.to_string(),
                }
            } else {
                Error::store_with_source(format!("s3://{bucket}/{key}"), other)
            }
        }
    }
}

#[async_trait]
impl BlobStore for S3Store {
    async fn get(&self, bucket: &str, key: &str) -> Result<Bytes> {
        let client = self.client(bucket)?;
        let path = StorePath::from(key);
        let result = client
            .get(&path)
            .await
            .map_err(|e| translate_error(e, bucket, key))?;
        result
            .bytes()
            .await
            .map_err(|e| translate_error(e, bucket, key))
    }

    async fn get_stream(&self, bucket: &str, key: &str) -> Result<ByteStream> {
        let client = self.client(bucket)?;
        let path = StorePath::from(key);
        let result = client
            .get(&path)
            .await
            .map_err(|e| translate_error(e, bucket, key))?;

        let bucket = bucket.to_string();
        let key = key.to_string();
        Ok(result
            .into_stream()
            .map(move |chunk| chunk.map_err(|e| translate_error(e, &bucket, &key)))
            .boxed())
    }

    async fn put(
        &self,
        bucket: &str,
        key: &str,
        data: Bytes,
        content_type: &str,
        precondition: WritePrecondition,
    ) -> Result<WriteOutcome> {
        let client = self.client(bucket)?;
        let path = StorePath::from(key);

        let mut attributes = Attributes::new();
        attributes.insert(Attribute::ContentType, content_type.to_string().into());
        let opts = PutOptions {
            mode: match precondition {
                WritePrecondition::DoesNotExist => PutMode::Create,
                WritePrecondition::None => PutMode::Overwrite,
            },
            attributes,
            ..PutOptions::default()
        };

        match client.put_opts(&path, PutPayload::from(data), opts).await {
            Ok(_) => Ok(WriteOutcome::Created),
            Err(object_store::Error::AlreadyExists { .. }) => Ok(WriteOutcome::PreconditionFailed),
            Err(e) => Err(translate_error(e, bucket, key)),
        }
    }

    async fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<ObjectInfo>> {
        let client = self.client(bucket)?;
        let path = if prefix.is_empty() {
            None
        } else {
            Some(StorePath::from(prefix))
        };

        let mut stream = client.list(path.as_ref());
        let mut objects = Vec::new();
        while let Some(meta) = stream.next().await {
            let meta = meta.map_err(|e| translate_error(e, bucket, prefix))?;
            objects.push(ObjectInfo {
                key: meta.location.to_string(),
                size: meta.size,
                last_modified: Some(meta.last_modified),
            });
            if objects.len() >= MAX_LIST_KEYS {
                break;
            }
        }
        objects.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(objects)
    }
}

// ============================================================================
// In-memory backend (tests)
// ============================================================================

/// In-memory [`BlobStore`] for tests and debug mode.
///
/// Thread-safe via `RwLock`. Buckets are created implicitly on first write;
/// reads and listings against unknown buckets report [`Error::BucketNotFound`]
/// to mirror the S3 behavior.
#[derive(Debug, Default)]
pub struct MemoryStore {
    buckets: RwLock<HashMap<String, HashMap<String, StoredObject>>>,
}

#[derive(Debug, Clone)]
struct StoredObject {
    data: Bytes,
    last_modified: DateTime<Utc>,
}

impl MemoryStore {
    /// Creates a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty bucket so reads against it succeed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Internal`] if the lock is poisoned.
    pub fn create_bucket(&self, bucket: &str) -> Result<()> {
        self.buckets
            .write()
            .map_err(|_| Error::Internal {
                message: "lock poisoned".into(),
            })?
            .entry(bucket.to_string())
            .or_default();
        Ok(())
    }
}

#[async_trait]
impl BlobStore for MemoryStore {
    async fn get(&self, bucket: &str, key: &str) -> Result<Bytes> {
        let buckets = self.buckets.read().map_err(|_| Error::Internal {
            message: "lock poisoned".into(),
        })?;

        let objects = buckets.get(bucket).ok_or_else(|| Error::BucketNotFound {
            bucket: bucket.to_string(),
        })?;
        objects
            .get(key)
            .map(|o| o.data.clone())
            .ok_or_else(|| Error::ObjectNotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            })
    }

    async fn get_stream(&self, bucket: &str, key: &str) -> Result<ByteStream> {
        let data = self.get(bucket, key).await?;
        Ok(futures::stream::once(async move { Ok(data) }).boxed())
    }

    async fn put(
        &self,
        bucket: &str,
        key: &str,
        data: Bytes,
        _content_type: &str,
        precondition: WritePrecondition,
    ) -> Result<WriteOutcome> {
        let mut buckets = self.buckets.write().map_err(|_| Error::Internal {
            message: "lock poisoned".into(),
        })?;

        let objects = buckets.entry(bucket.to_string()).or_default();
        if precondition == WritePrecondition::DoesNotExist && objects.contains_key(key) {
            return Ok(WriteOutcome::PreconditionFailed);
        }

        objects.insert(
            key.to_string(),
            StoredObject {
                data,
                last_modified: Utc::now(),
            },
        );
        Ok(WriteOutcome::Created)
    }

    async fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<ObjectInfo>> {
        let buckets = self.buckets.read().map_err(|_| Error::Internal {
            message: "lock poisoned".into(),
        })?;

        let objects = buckets.get(bucket).ok_or_else(|| Error::BucketNotFound {
            bucket: bucket.to_string(),
        })?;

        let mut listed: Vec<ObjectInfo> = objects
            .iter()
            .filter(|(k, _)| k.starts_with(prefix))
            .map(|(key, obj)| ObjectInfo {
                key: key.clone(),
                size: obj.data.len() as u64,
                last_modified: Some(obj.last_modified),
            })
            .collect();
        listed.sort_by(|a, b| a.key.cmp(&b.key));
        listed.truncate(MAX_LIST_KEYS);
        Ok(listed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_store_roundtrip() {
        let store = MemoryStore::new();
        let data = Bytes::from("hello world");

        let outcome = store
            .put("data", "test/file.txt", data.clone(), "text/plain", WritePrecondition::None)
            .await
            .expect("put should succeed");
        assert_eq!(outcome, WriteOutcome::Created);

        let retrieved = store.get("data", "test/file.txt").await.expect("get should succeed");
        assert_eq!(retrieved, data);
    }

    #[tokio::test]
    async fn memory_store_distinguishes_missing_object_from_missing_bucket() {
        let store = MemoryStore::new();
        store.create_bucket("data").expect("create bucket");

        let err = store.get("data", "absent.parquet").await.unwrap_err();
        assert!(matches!(err, Error::ObjectNotFound { .. }));

        let err = store.get("no-such-bucket", "absent.parquet").await.unwrap_err();
        assert!(matches!(err, Error::BucketNotFound { .. }));
    }

    #[tokio::test]
    async fn precondition_does_not_exist_rejects_second_write() {
        let store = MemoryStore::new();

        let outcome = store
            .put("data", "log/0.json", Bytes::from("v0"), "application/json", WritePrecondition::DoesNotExist)
            .await
            .expect("put should succeed");
        assert_eq!(outcome, WriteOutcome::Created);

        let outcome = store
            .put("data", "log/0.json", Bytes::from("v0'"), "application/json", WritePrecondition::DoesNotExist)
            .await
            .expect("put should succeed");
        assert_eq!(outcome, WriteOutcome::PreconditionFailed);

        // Losing writer must not have replaced the original contents.
        let data = store.get("data", "log/0.json").await.expect("get");
        assert_eq!(data, Bytes::from("v0"));
    }

    #[tokio::test]
    async fn list_filters_by_prefix_and_sorts() {
        let store = MemoryStore::new();
        for key in ["b/2.json", "a/1.parquet", "a/0.parquet"] {
            store
                .put("data", key, Bytes::from("x"), "application/octet-stream", WritePrecondition::None)
                .await
                .expect("put");
        }

        let listed = store.list("data", "a/").await.expect("list");
        let keys: Vec<_> = listed.iter().map(|o| o.key.as_str()).collect();
        assert_eq!(keys, vec!["a/0.parquet", "a/1.parquet"]);
        assert_eq!(listed[0].size, 1);
        assert!(listed[0].last_modified.is_some());
    }

    #[tokio::test]
    async fn get_stream_yields_full_payload() {
        let store = MemoryStore::new();
        store
            .put("data", "file.bin", Bytes::from(vec![7u8; 256]), "application/octet-stream", WritePrecondition::None)
            .await
            .expect("put");

        let mut stream = store.get_stream("data", "file.bin").await.expect("stream");
        let mut total = 0;
        while let Some(chunk) = stream.next().await {
            total += chunk.expect("chunk").len();
        }
        assert_eq!(total, 256);
    }
}
