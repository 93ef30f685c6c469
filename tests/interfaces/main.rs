//! Contract tests for cloud capabilities using Cucumber.
//!
//! Every capability implementation must satisfy the same feature files.
//! Select a backend via environment variable:
//!
//! ```bash
//! # In-memory (default)
//! cargo test --test interfaces --features test-utils
//!
//! # AWS services on LocalStack (uses testcontainers)
//! CLOUD_BACKEND=localstack cargo test --test interfaces --features test-utils,aws
//! ```

mod backend;
mod steps;

use cucumber::World;
use steps::blob_storage::BlobStorageWorld;
use steps::nosql_table::NoSqlTableWorld;
use steps::pubsub::PubSubWorld;
use steps::queue::QueueWorld;

#[tokio::main]
async fn main() {
    cloud_testkit::utils::init_tracing();

    println!("\n=== Running BlobStorage Contract Tests ===\n");
    BlobStorageWorld::cucumber()
        .fail_on_skipped()
        .run("tests/interfaces/features/blob_storage.feature")
        .await;

    println!("\n=== Running Queue Contract Tests ===\n");
    QueueWorld::cucumber()
        .fail_on_skipped()
        .run("tests/interfaces/features/queue.feature")
        .await;

    println!("\n=== Running PubSub Contract Tests ===\n");
    PubSubWorld::cucumber()
        .fail_on_skipped()
        .run("tests/interfaces/features/pubsub.feature")
        .await;

    println!("\n=== Running NoSqlTable Contract Tests ===\n");
    NoSqlTableWorld::cucumber()
        .fail_on_skipped()
        .run("tests/interfaces/features/nosql_table.feature")
        .await;
}
