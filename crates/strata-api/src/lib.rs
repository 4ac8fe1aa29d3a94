//! # strata-api
//!
//! HTTP metadata API for Strata: bucket listings, Parquet schema probing,
//! Delta/Iceberg metadata synthesis, and table directory summaries.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod error;
pub mod openapi;
pub mod routes;
pub mod server;

pub use config::Config;
pub use error::{ApiError, ApiResult};
pub use server::{Server, ServerBuilder};
