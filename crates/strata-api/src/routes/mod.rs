//! HTTP route handlers.

pub mod convert;
pub mod objects;
pub mod parquet;
pub mod tables;
pub mod text;

use std::sync::Arc;

use axum::Router;

use crate::server::AppState;

/// All metadata API routes.
pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .merge(objects::routes())
        .merge(text::routes())
        .merge(parquet::routes())
        .merge(convert::routes())
        .merge(tables::routes())
}
