//! Core domain types for the podcast ingestion pipeline

mod error;
mod models;

pub use error::CoreError;
pub use models::*;
