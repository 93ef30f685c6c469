//! PubSub contract step definitions.

use std::sync::Arc;
use std::time::Duration;

use cloud_testkit::capability::{CapabilityError, PubSub};
use cucumber::{given, then, when, World};

use crate::backend::{CloudBackend, CloudContext};

/// Test context for PubSub scenarios.
#[derive(Debug, World)]
#[world(init = Self::new)]
pub struct PubSubWorld {
    backend: CloudBackend,
    context: Option<CloudContext>,
    last_error: Option<CapabilityError>,
}

impl PubSubWorld {
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

    fn pubsub(&self) -> Arc<dyn PubSub> {
        self.context().pub_sub()
    }

    fn name(&self, logical: &str) -> String {
        self.context().name(logical)
    }

    fn record(&mut self, result: Result<(), CapabilityError>) {
        if let Err(e) = result {
            self.last_error = Some(e);
        }
    }

    async fn receive_within(&self, queue: &str, seconds: u64) -> Option<String> {
        let queue = self.name(queue);
        self.pubsub()
            .receive_timeout(&queue, Duration::from_secs(seconds))
            .await
            .expect("Failed to receive")
    }
}

// --- Background ---

#[given("a PubSub backend")]
async fn given_pubsub_backend(world: &mut PubSubWorld) {
    println!("Using backend: {}", world.backend.name());
    world.context = Some(CloudContext::new(world.backend));
}

// --- Given steps ---

#[given(expr = "topic {string} exists")]
async fn given_topic_exists(world: &mut PubSubWorld, topic: String) {
    let topic = world.name(&topic);
    world
        .pubsub()
        .ensure_topic(&topic)
        .await
        .expect("Failed to ensure topic");
}

#[given(expr = "queue {string} is subscribed to topic {string}")]
async fn given_subscription(world: &mut PubSubWorld, queue: String, topic: String) {
    let queue = world.name(&queue);
    let topic = world.name(&topic);
    world
        .pubsub()
        .ensure_subscription(&topic, &queue)
        .await
        .expect("Failed to subscribe queue");
}

// --- When steps ---

#[when(expr = "I publish {string} to topic {string}")]
async fn when_publish(world: &mut PubSubWorld, body: String, topic: String) {
    let topic = world.name(&topic);
    let result = world.pubsub().publish(&topic, &body).await;
    world.record(result);
}

#[when(expr = "I ensure topic {string} twice")]
async fn when_ensure_twice(world: &mut PubSubWorld, topic: String) {
    let topic = world.name(&topic);
    let pubsub = world.pubsub();
    for _ in 0..2 {
        let result = pubsub.ensure_topic(&topic).await;
        world.record(result);
    }
}

#[when(expr = "I delete topic {string} twice")]
async fn when_delete_twice(world: &mut PubSubWorld, topic: String) {
    let topic = world.name(&topic);
    let pubsub = world.pubsub();
    for _ in 0..2 {
        let result = pubsub.delete_topic(&topic).await;
        world.record(result);
    }
}

// --- Then steps ---

#[then("no error occurred")]
async fn then_no_error(world: &mut PubSubWorld) {
    assert!(
        world.last_error.is_none(),
        "Unexpected error: {:?}",
        world.last_error
    );
}

#[then("an invalid argument error occurred")]
async fn then_invalid_argument(world: &mut PubSubWorld) {
    assert!(
        matches!(world.last_error, Some(CapabilityError::InvalidArgument(_))),
        "Expected invalid argument, got {:?}",
        world.last_error
    );
}

#[then(expr = "receiving from subscription queue {string} within {int} seconds yields {string}")]
async fn then_receive_body(world: &mut PubSubWorld, queue: String, seconds: u64, body: String) {
    let received = world.receive_within(&queue, seconds).await;
    assert_eq!(received.as_deref(), Some(body.as_str()));
}

#[then(expr = "receiving from subscription queue {string} within {int} seconds yields nothing")]
async fn then_receive_nothing(world: &mut PubSubWorld, queue: String, seconds: u64) {
    let received = world.receive_within(&queue, seconds).await;
    assert!(received.is_none(), "Unexpected message: {:?}", received);
}

#[then(expr = "receiving twice from subscription queue {string} yields {string} and {string}")]
async fn then_receive_two(world: &mut PubSubWorld, queue: String, first: String, second: String) {
    let mut received = Vec::new();
    for _ in 0..2 {
        received.push(
            world
                .receive_within(&queue, 5)
                .await
                .expect("Expected a message"),
        );
    }
    received.sort();

    let mut expected = vec![first, second];
    expected.sort();
    assert_eq!(received, expected);
}
