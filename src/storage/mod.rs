//! Storage module for persisting opportunity batches as JSON files.

pub mod batch;
pub mod record;

pub use batch::{BatchStore, LoadedBatch};
pub use record::{OpportunityBatch, OpportunityRecord, SCHEMA_VERSION};
