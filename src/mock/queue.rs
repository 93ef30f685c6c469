//! In-memory queue.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::capability::{Queue, Result};
use crate::utils::retry::deadline_after;
use crate::validation::validate_name;

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// FIFO queues held in memory. Sending to or receiving from a missing queue
/// creates it, matching the provider implementation.
#[derive(Default)]
pub struct MockQueue {
    queues: RwLock<HashMap<String, VecDeque<String>>>,
}

impl MockQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages waiting in `queue`.
    pub async fn depth(&self, queue: &str) -> usize {
        self.queues
            .read()
            .await
            .get(queue)
            .map_or(0, VecDeque::len)
    }

    pub(crate) async fn push(&self, queue: &str, body: &str) {
        self.queues
            .write()
            .await
            .entry(queue.to_string())
            .or_default()
            .push_back(body.to_string());
    }

    async fn pop(&self, queue: &str) -> Option<String> {
        self.queues
            .write()
            .await
            .entry(queue.to_string())
            .or_default()
            .pop_front()
    }
}

#[async_trait]
impl Queue for MockQueue {
    async fn ensure_queue(&self, queue: &str) -> Result<()> {
        validate_name("queue", queue)?;
        self.queues
            .write()
            .await
            .entry(queue.to_string())
            .or_default();
        Ok(())
    }

    async fn delete_queue(&self, queue: &str) -> Result<()> {
        validate_name("queue", queue)?;
        self.queues.write().await.remove(queue);
        Ok(())
    }

    async fn send(&self, queue: &str, body: &str) -> Result<()> {
        validate_name("queue", queue)?;
        self.push(queue, body).await;
        Ok(())
    }

    async fn receive_timeout(&self, queue: &str, timeout: Duration) -> Result<Option<String>> {
        validate_name("queue", queue)?;
        let deadline = deadline_after(timeout);

        loop {
            if let Some(body) = self.pop(queue).await {
                return Ok(Some(body));
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(None);
            }
            tokio::time::sleep(remaining.min(POLL_INTERVAL)).await;
        }
    }
}
