//! # strata-iceberg
//!
//! Iceberg-style table metadata synthesis: builds metadata and snapshot
//! documents for a probed Parquet object and re-derives table summaries from
//! directory listings.
//!
//! This is deliberately not an Iceberg implementation — no manifest files
//! are materialized, no catalog pointer is kept, and the indexer never
//! replays snapshots. One source file becomes one metadata + snapshot pair.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod metadata;
pub mod summary;
pub mod synthesize;

pub use summary::summarize;
pub use synthesize::IcebergSynthesizer;
