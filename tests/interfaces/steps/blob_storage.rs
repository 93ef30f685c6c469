//! BlobStorage contract step definitions.

use std::sync::Arc;

use cloud_testkit::capability::{BlobStorage, CapabilityError};
use cucumber::{given, then, when, World};

use crate::backend::{CloudBackend, CloudContext};

/// Test context for BlobStorage scenarios.
#[derive(Debug, World)]
#[world(init = Self::new)]
pub struct BlobStorageWorld {
    backend: CloudBackend,
    context: Option<CloudContext>,
    last_error: Option<CapabilityError>,
}

impl BlobStorageWorld {
    fn new() -> Self {
        Self {
            backend: CloudBackend::from_env(),
            context: None,
            last_error: None,
        }
    }

    fn context(&self) -> &CloudContext {
        self.context.as_ref().expect("Cloud context not initialized")
    }

    fn blobs(&self) -> Arc<dyn BlobStorage> {
        self.context().blob_storage()
    }

    fn bucket(&self, logical: &str) -> String {
        self.context().name(logical)
    }

    fn record(&mut self, result: Result<(), CapabilityError>) {
        if let Err(e) = result {
            self.last_error = Some(e);
        }
    }
}

// --- Background ---

#[given("a BlobStorage backend")]
async fn given_blob_backend(world: &mut BlobStorageWorld) {
    println!("Using backend: {}", world.backend.name());
    world.context = Some(CloudContext::new(world.backend));
}

// --- Given steps ---

#[given(expr = "bucket {string} exists")]
async fn given_bucket_exists(world: &mut BlobStorageWorld, bucket: String) {
    let bucket = world.bucket(&bucket);
    world
        .blobs()
        .ensure_bucket(&bucket)
        .await
        .expect("Failed to ensure bucket");
}

#[given(expr = "objects {string} in bucket {string}")]
async fn given_objects(world: &mut BlobStorageWorld, keys: String, bucket: String) {
    let bucket = world.bucket(&bucket);
    let blobs = world.blobs();
    for key in keys.split(',').map(str::trim) {
        blobs
            .put_object(&bucket, key, key.as_bytes().to_vec(), "text/plain")
            .await
            .expect("Failed to put object");
    }
}

// --- When steps ---

#[when(expr = "I ensure bucket {string} twice")]
async fn when_ensure_bucket_twice(world: &mut BlobStorageWorld, bucket: String) {
    let bucket = world.bucket(&bucket);
    let blobs = world.blobs();
    for _ in 0..2 {
        let result = blobs.ensure_bucket(&bucket).await;
        world.record(result);
    }
}

#[when(expr = "I put object {string} with content {string} into bucket {string}")]
async fn when_put_object(world: &mut BlobStorageWorld, key: String, content: String, bucket: String) {
    let bucket = world.bucket(&bucket);
    let result = world
        .blobs()
        .put_object(&bucket, &key, content.into_bytes(), "text/plain")
        .await;
    world.record(result);
}

#[when(expr = "I delete object {string} from bucket {string}")]
async fn when_delete_object(world: &mut BlobStorageWorld, key: String, bucket: String) {
    let bucket = world.bucket(&bucket);
    let result = world.blobs().delete_object(&bucket, &key).await;
    world.record(result);
}

#[when(expr = "I delete bucket {string}")]
async fn when_delete_bucket(world: &mut BlobStorageWorld, bucket: String) {
    let bucket = world.bucket(&bucket);
    let result = world.blobs().delete_bucket(&bucket).await;
    world.record(result);
}

// --- Then steps ---

#[then("no error occurred")]
async fn then_no_error(world: &mut BlobStorageWorld) {
    assert!(
        world.last_error.is_none(),
        "Unexpected error: {:?}",
        world.last_error
    );
}

#[then("an invalid argument error occurred")]
async fn then_invalid_argument(world: &mut BlobStorageWorld) {
    assert!(
        matches!(world.last_error, Some(CapabilityError::InvalidArgument(_))),
        "Expected invalid argument, got {:?}",
        world.last_error
    );
}

#[then(expr = "object {string} in bucket {string} has content {string}")]
async fn then_object_content(world: &mut BlobStorageWorld, key: String, bucket: String, content: String) {
    let bucket = world.bucket(&bucket);
    let stored = world
        .blobs()
        .get_string(&bucket, &key)
        .await
        .expect("Failed to get object");
    assert_eq!(stored.as_deref(), Some(content.as_str()));
}

#[then(expr = "object {string} in bucket {string} is absent")]
async fn then_object_absent(world: &mut BlobStorageWorld, key: String, bucket: String) {
    let bucket = world.bucket(&bucket);
    let stored = world
        .blobs()
        .get_object(&bucket, &key)
        .await
        .expect("Reading a missing object must not fail");
    assert!(stored.is_none());
}

#[then(expr = "object {string} exists in bucket {string}")]
async fn then_object_exists(world: &mut BlobStorageWorld, key: String, bucket: String) {
    let bucket = world.bucket(&bucket);
    assert!(world.blobs().exists(&bucket, &key).await.expect("exists failed"));
}

#[then(expr = "object {string} does not exist in bucket {string}")]
async fn then_object_not_exists(world: &mut BlobStorageWorld, key: String, bucket: String) {
    let bucket = world.bucket(&bucket);
    assert!(!world.blobs().exists(&bucket, &key).await.expect("exists failed"));
}

#[then(expr = "listing bucket {string} with prefix {string} returns {int} keys")]
async fn then_list_with_prefix(world: &mut BlobStorageWorld, bucket: String, prefix: String, count: usize) {
    let bucket = world.bucket(&bucket);
    let keys = world
        .blobs()
        .list_keys(&bucket, Some(&prefix))
        .await
        .expect("Failed to list keys");
    assert_eq!(keys.len(), count, "keys: {:?}", keys);
    assert!(keys.iter().all(|k| k.starts_with(&prefix)));
}

#[then(expr = "listing bucket {string} without prefix returns {int} keys")]
async fn then_list_all(world: &mut BlobStorageWorld, bucket: String, count: usize) {
    let bucket = world.bucket(&bucket);
    let keys = world
        .blobs()
        .list_keys(&bucket, None)
        .await
        .expect("Failed to list keys");
    assert_eq!(keys.len(), count, "keys: {:?}", keys);
}
