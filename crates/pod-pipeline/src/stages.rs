//! Pipeline stages for episode processing.
//!
//! Each stage module owns one of the four independent status tracks
//! (or, for `sync`, the feed-refresh job that feeds them): download,
//! transcriber, metadata, indexer, plus the `postprocessor` chain that
//! runs metadata → indexer → cleanup off the main loop.

pub mod download;
pub mod indexer;
pub mod metadata;
pub mod postprocessor;
pub mod sync;
pub mod transcriber;
