//! # strata-core
//!
//! Core abstractions for the Strata table-metadata service:
//!
//! - **Storage**: the [`storage::BlobStore`] gateway over S3-compatible
//!   object stores (MinIO, AWS S3), with an in-memory test backend
//! - **Table contract**: shared table-format types ([`table::TableMetadata`],
//!   [`table::ColumnSchema`], [`table::ProbedFile`])
//! - **Errors**: the shared [`error::Error`] taxonomy
//! - **Observability**: tracing initialization helpers
//!
//! All cross-component interaction happens through the types defined here.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod observability;
pub mod storage;
pub mod table;

pub use error::{Error, Result};
pub use observability::{LogFormat, init_logging};
pub use storage::{
    BlobStore, ByteStream, MemoryStore, ObjectInfo, S3Store, StoreConfig, WriteOutcome,
    WritePrecondition,
};
pub use table::{
    ColumnSchema, FileRef, LogicalType, ProbedFile, TableFormat, TableMetadata, TableStatistics,
    table_location_for, table_name_from_key,
};
