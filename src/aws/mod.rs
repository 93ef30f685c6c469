//! AWS provider: S3, SQS, SNS and DynamoDB.
//!
//! Runs against a shared LocalStack container in emulator mode or the real
//! services in live mode.

pub mod adapter;
pub mod blob;
pub mod clients;
pub mod dynamodb;
pub mod error;
pub mod pubsub;
pub mod queue;

pub use adapter::AwsCloudAdapter;
pub use blob::S3BlobStorage;
pub use clients::AwsClients;
pub use dynamodb::{DynamoTable, KeySchemaCache, TableKeys};
pub use error::{classify, classify_code};
pub use pubsub::SnsPubSub;
pub use queue::SqsQueue;
