//! Conversion routes: probe a Parquet object and synthesize table metadata.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};

use strata_core::table::{ProbedFile, TableMetadata};
use strata_delta::DeltaSynthesizer;
use strata_iceberg::IcebergSynthesizer;

use crate::error::ApiResult;
use crate::routes::text::{FileQuery, require_file_params};
use crate::server::AppState;

/// Creates conversion routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/convert-to-delta", get(convert_to_delta))
        .route("/convert-to-iceberg", get(convert_to_iceberg))
}

pub(crate) async fn probe_source(state: &AppState, bucket: &str, key: &str) -> ApiResult<ProbedFile> {
    let payload = state.store.get_stream(bucket, key).await?;
    Ok(state.prober.probe(bucket, key, payload).await?)
}

/// Synthesizes a Delta-style commit log for a Parquet object.
#[utoipa::path(
    get,
    path = "/convert-to-delta",
    tag = "convert",
    params(FileQuery),
    responses(
        (status = 200, description = "Synthesized table metadata", body = TableMetadata),
        (status = 400, description = "Missing parameters", body = crate::error::ApiErrorBody),
        (status = 404, description = "Source object not found", body = crate::error::ApiErrorBody),
        (status = 409, description = "Log version already occupied", body = crate::error::ApiErrorBody),
        (status = 500, description = "Probe or store error", body = crate::error::ApiErrorBody),
    )
)]
pub(crate) async fn convert_to_delta(
    State(state): State<Arc<AppState>>,
    Query(query): Query<FileQuery>,
) -> ApiResult<Json<TableMetadata>> {
    let (bucket, key) = require_file_params(&query)?;

    tracing::info!(bucket = %bucket, key = %key, "converting parquet object to delta");

    let probed = probe_source(&state, bucket, key).await?;
    let synthesizer = DeltaSynthesizer::new(Arc::clone(&state.store));
    Ok(Json(synthesizer.synthesize(&probed).await?))
}

/// Synthesizes Iceberg-style metadata documents for a Parquet object.
#[utoipa::path(
    get,
    path = "/convert-to-iceberg",
    tag = "convert",
    params(FileQuery),
    responses(
        (status = 200, description = "Synthesized table metadata", body = TableMetadata),
        (status = 400, description = "Missing parameters", body = crate::error::ApiErrorBody),
        (status = 404, description = "Source object not found", body = crate::error::ApiErrorBody),
        (status = 409, description = "Metadata sequence already occupied", body = crate::error::ApiErrorBody),
        (status = 500, description = "Probe or store error", body = crate::error::ApiErrorBody),
    )
)]
pub(crate) async fn convert_to_iceberg(
    State(state): State<Arc<AppState>>,
    Query(query): Query<FileQuery>,
) -> ApiResult<Json<TableMetadata>> {
    let (bucket, key) = require_file_params(&query)?;

    tracing::info!(bucket = %bucket, key = %key, "converting parquet object to iceberg");

    let probed = probe_source(&state, bucket, key).await?;
    let synthesizer = IcebergSynthesizer::new(Arc::clone(&state.store));
    Ok(Json(synthesizer.synthesize(&probed).await?))
}
