//! Cucumber step definitions for capability contract tests.

pub mod blob_storage;
pub mod nosql_table;
pub mod pubsub;
pub mod queue;
