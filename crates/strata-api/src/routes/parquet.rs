//! Parquet probing routes: schema and row count, no synthesis.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use utoipa::ToSchema;

use strata_core::Error;
use strata_core::table::ColumnSchema;

use crate::error::{ApiError, ApiResult};
use crate::routes::text::{FileQuery, require_file_params};
use crate::server::AppState;

/// Schema and row statistics of a probed Parquet object.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ParquetMetadata {
    /// Bucket holding the object.
    pub bucket_name: String,
    /// Key of the object.
    pub file_key: String,
    /// Ordered column schemas.
    pub schema: Vec<ColumnSchema>,
    /// Total row count from the footer.
    pub row_count: i64,
}

/// Creates parquet probing routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/metadata/parquet/bucket", get(parquet_metadata))
        .route("/view-parquet-metadata", get(view_parquet_metadata))
}

pub(crate) async fn probe(state: &AppState, bucket: &str, key: &str) -> Result<ParquetMetadata, Error> {
    let payload = state.store.get_stream(bucket, key).await?;
    let probed = state.prober.probe(bucket, key, payload).await?;
    Ok(ParquetMetadata {
        bucket_name: bucket.to_string(),
        file_key: key.to_string(),
        schema: probed.columns,
        row_count: probed.row_count,
    })
}

/// Probes a Parquet object for its schema and row count.
#[utoipa::path(
    get,
    path = "/metadata/parquet/bucket",
    tag = "metadata",
    params(FileQuery),
    responses(
        (status = 200, description = "Parquet metadata", body = ParquetMetadata),
        (status = 400, description = "Missing parameters", body = crate::error::ApiErrorBody),
        (status = 500, description = "Probe or store error", body = crate::error::ApiErrorBody),
    )
)]
pub(crate) async fn parquet_metadata(
    State(state): State<Arc<AppState>>,
    Query(query): Query<FileQuery>,
) -> ApiResult<Json<ParquetMetadata>> {
    let (bucket, key) = require_file_params(&query)?;

    // This route reports every probe failure as a processing error; the
    // 404-mapping variant is /view-parquet-metadata.
    probe(&state, bucket, key)
        .await
        .map(Json)
        .map_err(|e| match e {
            Error::Validation { .. } => ApiError::from(e),
            other => ApiError::internal(format!("error processing parquet file: {other}")),
        })
}

/// Probes a Parquet object, mapping missing objects and buckets to 404.
#[utoipa::path(
    get,
    path = "/view-parquet-metadata",
    tag = "metadata",
    params(FileQuery),
    responses(
        (status = 200, description = "Parquet metadata", body = ParquetMetadata),
        (status = 400, description = "Missing parameters", body = crate::error::ApiErrorBody),
        (status = 404, description = "Object or bucket not found", body = crate::error::ApiErrorBody),
        (status = 500, description = "Probe or store error", body = crate::error::ApiErrorBody),
    )
)]
pub(crate) async fn view_parquet_metadata(
    State(state): State<Arc<AppState>>,
    Query(query): Query<FileQuery>,
) -> ApiResult<Json<ParquetMetadata>> {
    let (bucket, key) = require_file_params(&query)?;

    probe(&state, bucket, key)
        .await
        .map(Json)
        .map_err(|e| match e {
            Error::ObjectNotFound { .. } => {
                ApiError::not_found("Parquet file not found in the specified bucket")
            }
            Error::BucketNotFound { .. } => ApiError::not_found("Specified bucket not found"),
            other => ApiError::from(other),
        })
}
