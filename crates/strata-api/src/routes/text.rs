//! Plain-text metadata extraction.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::error::{ApiError, ApiResult};
use crate::server::AppState;

/// Query parameters for file-scoped routes.
#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct FileQuery {
    /// Bucket holding the object.
    pub bucket_name: Option<String>,
    /// Key of the object.
    pub file_key: Option<String>,
}

/// Resolves both required parameters or fails with a message naming them.
pub fn require_file_params(query: &FileQuery) -> ApiResult<(&str, &str)> {
    match (query.bucket_name.as_deref(), query.file_key.as_deref()) {
        (Some(bucket), Some(key)) => Ok((bucket, key)),
        _ => Err(ApiError::bad_request(
            "Bucket name and file key are required.",
        )),
    }
}

/// Metadata extracted from a plain-text object.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TextMetadata {
    /// Bucket holding the object.
    pub bucket_name: String,
    /// Key of the object.
    pub file_key: String,
    /// Object size in bytes.
    pub size: u64,
    /// Number of lines.
    pub line_count: usize,
    /// Number of whitespace-separated words.
    pub word_count: usize,
    /// Number of characters.
    pub character_count: usize,
}

/// Creates text metadata routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/metadata/txt/bucket", get(txt_metadata))
}

/// Extracts line/word/character counts from a text object.
#[utoipa::path(
    get,
    path = "/metadata/txt/bucket",
    tag = "metadata",
    params(FileQuery),
    responses(
        (status = 200, description = "Text metadata", body = TextMetadata),
        (status = 400, description = "Missing parameters", body = crate::error::ApiErrorBody),
        (status = 500, description = "Store error", body = crate::error::ApiErrorBody),
    )
)]
pub(crate) async fn txt_metadata(
    State(state): State<Arc<AppState>>,
    Query(query): Query<FileQuery>,
) -> ApiResult<Json<TextMetadata>> {
    let (bucket, key) = require_file_params(&query)?;

    let data = state.store.get(bucket, key).await?;
    let content = String::from_utf8_lossy(&data);

    Ok(Json(TextMetadata {
        bucket_name: bucket.to_string(),
        file_key: key.to_string(),
        size: data.len() as u64,
        line_count: content.split('\n').count(),
        word_count: content.split_whitespace().count(),
        character_count: content.chars().count(),
    }))
}
