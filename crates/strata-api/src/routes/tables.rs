//! Table directory summary routes.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use utoipa::IntoParams;

use strata_core::table::TableMetadata;

use crate::error::{ApiError, ApiResult};
use crate::server::AppState;

/// Query parameters for table-scoped routes.
#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct TableQuery {
    /// Bucket holding the table.
    pub bucket_name: Option<String>,
    /// Table storage prefix.
    pub table_name: Option<String>,
}

fn require_table_params(query: &TableQuery) -> ApiResult<(&str, &str)> {
    match (query.bucket_name.as_deref(), query.table_name.as_deref()) {
        (Some(bucket), Some(table)) => Ok((bucket, table)),
        _ => Err(ApiError::bad_request(
            "Bucket name and table name are required.",
        )),
    }
}

/// Creates table summary routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/delta-metadata", get(delta_metadata))
        .route("/iceberg-metadata", get(iceberg_metadata))
}

/// Summarizes a Delta table directory.
#[utoipa::path(
    get,
    path = "/delta-metadata",
    tag = "tables",
    params(TableQuery),
    responses(
        (status = 200, description = "Table summary", body = TableMetadata),
        (status = 400, description = "Missing parameters", body = crate::error::ApiErrorBody),
        (status = 500, description = "Store error", body = crate::error::ApiErrorBody),
    )
)]
pub(crate) async fn delta_metadata(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TableQuery>,
) -> ApiResult<Json<TableMetadata>> {
    let (bucket, table) = require_table_params(&query)?;
    Ok(Json(
        strata_delta::summarize(state.store.as_ref(), bucket, table).await?,
    ))
}

/// Summarizes an Iceberg table directory.
#[utoipa::path(
    get,
    path = "/iceberg-metadata",
    tag = "tables",
    params(TableQuery),
    responses(
        (status = 200, description = "Table summary", body = TableMetadata),
        (status = 400, description = "Missing parameters", body = crate::error::ApiErrorBody),
        (status = 500, description = "Store error", body = crate::error::ApiErrorBody),
    )
)]
pub(crate) async fn iceberg_metadata(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TableQuery>,
) -> ApiResult<Json<TableMetadata>> {
    let (bucket, table) = require_table_params(&query)?;
    Ok(Json(
        strata_iceberg::summarize(state.store.as_ref(), bucket, table).await?,
    ))
}
