//! Reading workflows: ingestion and confirmation

pub mod confirm;
pub mod ingest;

pub use confirm::confirm_reading;
pub use ingest::{ingest_reading, IngestResult, Submission};
