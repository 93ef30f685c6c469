//! Queue contract step definitions.

use std::sync::Arc;
use std::time::Duration;

use cloud_testkit::capability::{CapabilityError, Queue};
use cucumber::{given, then, when, World};

use crate::backend::{CloudBackend, CloudContext};

/// Test context for Queue scenarios.
#[derive(Debug, World)]
#[world(init = Self::new)]
pub struct QueueWorld {
    backend: CloudBackend,
    context: Option<CloudContext>,
    last_error: Option<CapabilityError>,
}

impl QueueWorld {
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

    fn queue(&self) -> Arc<dyn Queue> {
        self.context().queue()
    }

    fn queue_name(&self, logical: &str) -> String {
        self.context().name(logical)
    }

    fn record(&mut self, result: Result<(), CapabilityError>) {
        if let Err(e) = result {
            self.last_error = Some(e);
        }
    }
}

// --- Background ---

#[given("a Queue backend")]
async fn given_queue_backend(world: &mut QueueWorld) {
    println!("Using backend: {}", world.backend.name());
    world.context = Some(CloudContext::new(world.backend));
}

// --- Given steps ---

#[given(expr = "queue {string} exists")]
async fn given_queue_exists(world: &mut QueueWorld, queue: String) {
    let queue = world.queue_name(&queue);
    world
        .queue()
        .ensure_queue(&queue)
        .await
        .expect("Failed to ensure queue");
}

// --- When steps ---

#[when(expr = "I send {string} to queue {string}")]
async fn when_send(world: &mut QueueWorld, body: String, queue: String) {
    let queue = world.queue_name(&queue);
    let result = world.queue().send(&queue, &body).await;
    world.record(result);
}

#[when(expr = "I ensure queue {string} twice")]
async fn when_ensure_twice(world: &mut QueueWorld, queue: String) {
    let queue = world.queue_name(&queue);
    let capability = world.queue();
    for _ in 0..2 {
        let result = capability.ensure_queue(&queue).await;
        world.record(result);
    }
}

#[when(expr = "I delete queue {string} twice")]
async fn when_delete_twice(world: &mut QueueWorld, queue: String) {
    let queue = world.queue_name(&queue);
    let capability = world.queue();
    for _ in 0..2 {
        let result = capability.delete_queue(&queue).await;
        world.record(result);
    }
}

// --- Then steps ---

#[then("no error occurred")]
async fn then_no_error(world: &mut QueueWorld) {
    assert!(
        world.last_error.is_none(),
        "Unexpected error: {:?}",
        world.last_error
    );
}

#[then("an invalid argument error occurred")]
async fn then_invalid_argument(world: &mut QueueWorld) {
    assert!(
        matches!(world.last_error, Some(CapabilityError::InvalidArgument(_))),
        "Expected invalid argument, got {:?}",
        world.last_error
    );
}

#[then(expr = "receiving twice from queue {string} yields {string} and {string}")]
async fn then_receive_two(world: &mut QueueWorld, queue: String, first: String, second: String) {
    let queue = world.queue_name(&queue);
    let capability = world.queue();

    let mut received = Vec::new();
    for _ in 0..2 {
        let body = capability
            .receive_timeout(&queue, Duration::from_secs(5))
            .await
            .expect("Failed to receive");
        received.push(body.expect("Expected a message"));
    }
    received.sort();

    let mut expected = vec![first, second];
    expected.sort();
    assert_eq!(received, expected);
}

#[then(expr = "receiving from queue {string} within {int} seconds yields {string}")]
async fn then_receive_body(world: &mut QueueWorld, queue: String, seconds: u64, body: String) {
    let queue = world.queue_name(&queue);
    let received = world
        .queue()
        .receive_timeout(&queue, Duration::from_secs(seconds))
        .await
        .expect("Failed to receive");
    assert_eq!(received.as_deref(), Some(body.as_str()));
}

#[then(expr = "receiving from queue {string} within {int} seconds yields nothing")]
async fn then_receive_nothing_within(world: &mut QueueWorld, queue: String, seconds: u64) {
    let queue = world.queue_name(&queue);
    let received = world
        .queue()
        .receive_timeout(&queue, Duration::from_secs(seconds))
        .await
        .expect("Failed to receive");
    assert!(received.is_none(), "Unexpected message: {:?}", received);
}

#[then(expr = "receiving from queue {string} yields nothing")]
async fn then_receive_nothing(world: &mut QueueWorld, queue: String) {
    let queue = world.queue_name(&queue);
    let received = world.queue().receive(&queue).await.expect("Failed to receive");
    assert!(received.is_none(), "Unexpected message: {:?}", received);
}
