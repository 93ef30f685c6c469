//! In-memory publish/subscribe fanning out into a [`MockQueue`].

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::queue::MockQueue;
use crate::capability::{PubSub, Queue, Result};
use crate::validation::validate_name;

/// Topics mapping to subscribed queue names.
pub struct MockPubSub {
    topics: RwLock<HashMap<String, BTreeSet<String>>>,
    queue: Arc<MockQueue>,
}

impl MockPubSub {
    /// Deliver into `queue`, usually the same instance the adapter hands out
    /// as its [`Queue`] capability.
    pub fn new(queue: Arc<MockQueue>) -> Self {
        Self {
            topics: RwLock::new(HashMap::new()),
            queue,
        }
    }

    pub async fn subscriptions(&self, topic: &str) -> Vec<String> {
        self.topics
            .read()
            .await
            .get(topic)
            .map(|queues| queues.iter().cloned().collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl PubSub for MockPubSub {
    async fn ensure_topic(&self, topic: &str) -> Result<()> {
        validate_name("topic", topic)?;
        self.topics
            .write()
            .await
            .entry(topic.to_string())
            .or_default();
        Ok(())
    }

    async fn delete_topic(&self, topic: &str) -> Result<()> {
        validate_name("topic", topic)?;
        self.topics.write().await.remove(topic);
        Ok(())
    }

    async fn ensure_subscription(&self, topic: &str, queue: &str) -> Result<()> {
        validate_name("topic", topic)?;
        validate_name("queue", queue)?;
        self.queue.ensure_queue(queue).await?;
        self.topics
            .write()
            .await
            .entry(topic.to_string())
            .or_default()
            .insert(queue.to_string());
        Ok(())
    }

    async fn publish(&self, topic: &str, body: &str) -> Result<()> {
        validate_name("topic", topic)?;
        let subscribers = {
            let mut topics = self.topics.write().await;
            topics.entry(topic.to_string()).or_default().clone()
        };
        for queue in subscribers {
            self.queue.push(&queue, body).await;
        }
        Ok(())
    }

    async fn receive_timeout(&self, queue: &str, timeout: Duration) -> Result<Option<String>> {
        self.queue.receive_timeout(queue, timeout).await
    }
}
