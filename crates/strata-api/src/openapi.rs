//! OpenAPI document aggregation.

use axum::Json;
use axum::response::IntoResponse;
use utoipa::OpenApi;

/// OpenAPI description of the metadata API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Strata Metadata API",
        description = "Inspects S3/MinIO buckets and synthesizes Delta- and Iceberg-style table metadata for Parquet objects."
    ),
    paths(
        crate::routes::objects::list_files,
        crate::routes::objects::list_parquet_files,
        crate::routes::objects::list_delta_files,
        crate::routes::text::txt_metadata,
        crate::routes::parquet::parquet_metadata,
        crate::routes::parquet::view_parquet_metadata,
        crate::routes::convert::convert_to_delta,
        crate::routes::convert::convert_to_iceberg,
        crate::routes::tables::delta_metadata,
        crate::routes::tables::iceberg_metadata,
    ),
    components(schemas(
        crate::error::ApiErrorBody,
        crate::routes::objects::FileEntry,
        crate::routes::text::TextMetadata,
        crate::routes::parquet::ParquetMetadata,
        strata_core::table::TableMetadata,
        strata_core::table::TableStatistics,
        strata_core::table::TableFormat,
        strata_core::table::ColumnSchema,
        strata_core::table::LogicalType,
        strata_core::table::FileRef,
    ))
)]
pub struct ApiDoc;

/// Serves the OpenAPI document.
pub async fn serve_openapi() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}
