//! Bucket listing routes.
//!
//! Thin wrappers over the blob store gateway: one listing call per request,
//! optionally filtered by file extension. Listings are single-page — see
//! [`strata_core::storage::MAX_LIST_KEYS`].

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::error::{ApiError, ApiResult};
use crate::server::AppState;

/// Query parameters for listing routes.
#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    /// Bucket to list.
    pub bucket_name: Option<String>,
    /// Key prefix to list under.
    pub prefix: Option<String>,
}

/// One listed object.
#[derive(Debug, Serialize, ToSchema)]
pub struct FileEntry {
    /// Object key.
    pub key: String,
    /// Object size in bytes.
    pub size: u64,
}

/// Creates listing routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/list-files", get(list_files))
        .route("/list-parquet-files", get(list_parquet_files))
        .route("/list-delta-files", get(list_delta_files))
}

fn require_bucket(query: &ListQuery) -> ApiResult<&str> {
    query
        .bucket_name
        .as_deref()
        .ok_or_else(|| ApiError::bad_request("Bucket name is required."))
}

/// Lists object keys under a prefix.
#[utoipa::path(
    get,
    path = "/list-files",
    tag = "objects",
    params(ListQuery),
    responses(
        (status = 200, description = "Object keys", body = Vec<String>),
        (status = 400, description = "Missing bucket name", body = crate::error::ApiErrorBody),
        (status = 500, description = "Store error", body = crate::error::ApiErrorBody),
    )
)]
pub(crate) async fn list_files(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Vec<String>>> {
    let bucket = require_bucket(&query)?;
    let objects = state
        .store
        .list(bucket, query.prefix.as_deref().unwrap_or(""))
        .await?;
    Ok(Json(objects.into_iter().map(|o| o.key).collect()))
}

pub(crate) async fn list_with_extension(
    state: &AppState,
    query: &ListQuery,
    extension: &str,
) -> ApiResult<Vec<FileEntry>> {
    let bucket = require_bucket(query)?;
    let objects = state
        .store
        .list(bucket, query.prefix.as_deref().unwrap_or(""))
        .await?;
    Ok(objects
        .into_iter()
        .filter(|o| o.key.ends_with(extension))
        .map(|o| FileEntry {
            key: o.key,
            size: o.size,
        })
        .collect())
}

/// Lists Parquet objects under a prefix.
#[utoipa::path(
    get,
    path = "/list-parquet-files",
    tag = "objects",
    params(ListQuery),
    responses(
        (status = 200, description = "Parquet objects", body = Vec<FileEntry>),
        (status = 400, description = "Missing bucket name", body = crate::error::ApiErrorBody),
        (status = 500, description = "Store error", body = crate::error::ApiErrorBody),
    )
)]
pub(crate) async fn list_parquet_files(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Vec<FileEntry>>> {
    Ok(Json(list_with_extension(&state, &query, ".parquet").await?))
}

/// Lists Delta log-file objects under a prefix.
#[utoipa::path(
    get,
    path = "/list-delta-files",
    tag = "objects",
    params(ListQuery),
    responses(
        (status = 200, description = "Delta log objects", body = Vec<FileEntry>),
        (status = 400, description = "Missing bucket name", body = crate::error::ApiErrorBody),
        (status = 500, description = "Store error", body = crate::error::ApiErrorBody),
    )
)]
pub(crate) async fn list_delta_files(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Vec<FileEntry>>> {
    Ok(Json(list_with_extension(&state, &query, ".dlt").await?))
}
