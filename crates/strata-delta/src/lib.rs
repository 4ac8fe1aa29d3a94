//! # strata-delta
//!
//! Delta-style table metadata synthesis: builds an append-only commit log
//! for a probed Parquet object and re-derives table summaries from directory
//! listings.
//!
//! This is deliberately not a Delta Lake implementation — no conflict
//! detection across writers beyond conditional creates, no checkpoints, no
//! time travel, no log replay. One source file becomes one commit log.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod log;
pub mod summary;
pub mod synthesize;

pub use summary::summarize;
pub use synthesize::DeltaSynthesizer;
