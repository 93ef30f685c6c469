//! SQS queue capability.
//!
//! Queues are resolved by name and created on demand. Receive long-polls and
//! deletes each message by its receipt handle before handing the body back,
//! so a caller never sees the same message twice.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_sqs::types::QueueAttributeName;
use aws_sdk_sqs::Client;
use backon::BackoffBuilder;
use tokio::sync::OnceCell;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::clients::AwsClients;
use super::error::provider_error;
use crate::capability::{CapabilityError, ErrorKind, Queue, Result};
use crate::utils::retry::{deadline_after, provisioning_backoff, PROVISIONING_DEADLINE};
use crate::validation::validate_name;

/// Longest long-poll SQS accepts.
const MAX_WAIT_SECONDS: u64 = 20;
/// Seconds a received message stays invisible before it is deleted.
const VISIBILITY_TIMEOUT_SECONDS: i32 = 10;
/// Pause between non-blocking polls when less than a second remains.
const SHORT_POLL_PAUSE: Duration = Duration::from_millis(100);

/// SQS implementation of [`Queue`].
pub struct SqsQueue {
    clients: Arc<AwsClients>,
    client: OnceCell<Client>,
    provisioning_deadline: Duration,
}

impl SqsQueue {
    pub fn new(clients: Arc<AwsClients>) -> Self {
        Self {
            clients,
            client: OnceCell::new(),
            provisioning_deadline: PROVISIONING_DEADLINE,
        }
    }

    /// Override how long `ensure_queue` retries transient failures.
    pub fn with_provisioning_deadline(mut self, deadline: Duration) -> Self {
        self.provisioning_deadline = deadline;
        self
    }

    pub(crate) async fn client(&self) -> Result<&Client> {
        self.client.get_or_try_init(|| self.clients.sqs()).await
    }

    /// Queue URL, or `None` if the queue does not exist.
    pub(crate) async fn resolve_queue_url(&self, queue: &str) -> Result<Option<String>> {
        let client = self.client().await?;
        match client.get_queue_url().queue_name(queue).send().await {
            Ok(output) => Ok(output.queue_url),
            Err(e) => {
                let err = provider_error("get_queue_url", queue, e);
                if err.is_not_found() {
                    Ok(None)
                } else {
                    Err(err)
                }
            }
        }
    }

    /// Resolve or create the queue once, propagating transient failures.
    async fn resolve_or_create(&self, queue: &str) -> Result<String> {
        if let Some(url) = self.resolve_queue_url(queue).await? {
            return Ok(url);
        }

        let client = self.client().await?;
        match client.create_queue().queue_name(queue).send().await {
            Ok(output) => {
                info!(queue = %queue, "Created SQS queue");
                output.queue_url.ok_or_else(|| {
                    CapabilityError::UnexpectedResponse(format!(
                        "create_queue for '{queue}' returned no URL"
                    ))
                })
            }
            Err(e) => {
                let err = provider_error("create_queue", queue, e);
                if err.kind() == Some(ErrorKind::AlreadyExists) {
                    self.resolve_queue_url(queue).await?.ok_or(err)
                } else {
                    Err(err)
                }
            }
        }
    }

    /// Resolve or create the queue, retrying transient failures.
    ///
    /// Retries stop at the provisioning deadline; one last resolve is then
    /// attempted before the last transient error is returned.
    pub(crate) async fn ensure_queue_url(&self, queue: &str) -> Result<String> {
        let deadline = deadline_after(self.provisioning_deadline);
        let mut backoff = provisioning_backoff().build();

        let last_error = loop {
            match self.resolve_or_create(queue).await {
                Ok(url) => return Ok(url),
                Err(e) if e.is_retryable() => match backoff.next() {
                    Some(delay) if Instant::now() + delay < deadline => {
                        warn!(
                            queue = %queue,
                            error = %e,
                            delay_ms = delay.as_millis() as u64,
                            "Transient error provisioning queue, retrying"
                        );
                        tokio::time::sleep(delay).await;
                    }
                    _ => break e,
                },
                Err(e) => return Err(e),
            }
        };

        match self.resolve_queue_url(queue).await {
            Ok(Some(url)) => Ok(url),
            _ => Err(last_error),
        }
    }

    /// ARN of the queue at `queue_url`.
    pub(crate) async fn queue_arn(&self, queue: &str, queue_url: &str) -> Result<String> {
        let client = self.client().await?;
        let output = client
            .get_queue_attributes()
            .queue_url(queue_url)
            .attribute_names(QueueAttributeName::QueueArn)
            .send()
            .await
            .map_err(|e| provider_error("get_queue_attributes", queue, e))?;

        output
            .attributes
            .and_then(|mut attrs| attrs.remove(&QueueAttributeName::QueueArn))
            .ok_or_else(|| {
                CapabilityError::UnexpectedResponse(format!("queue '{queue}' has no ARN"))
            })
    }

    async fn delete_message(&self, queue: &str, queue_url: &str, receipt: &str) -> Result<()> {
        let client = self.client().await?;
        client
            .delete_message()
            .queue_url(queue_url)
            .receipt_handle(receipt)
            .send()
            .await
            .map_err(|e| provider_error("delete_message", queue, e))?;
        Ok(())
    }
}

#[async_trait]
impl Queue for SqsQueue {
    async fn ensure_queue(&self, queue: &str) -> Result<()> {
        validate_name("queue", queue)?;
        let url = self.ensure_queue_url(queue).await?;
        debug!(queue = %queue, url = %url, "Queue ready");
        Ok(())
    }

    async fn delete_queue(&self, queue: &str) -> Result<()> {
        validate_name("queue", queue)?;
        let Some(url) = self.resolve_queue_url(queue).await? else {
            return Ok(());
        };

        let client = self.client().await?;
        match client.delete_queue().queue_url(&url).send().await {
            Ok(_) => {
                info!(queue = %queue, "Deleted SQS queue");
                Ok(())
            }
            Err(e) => {
                let err = provider_error("delete_queue", queue, e);
                if err.is_not_found() {
                    Ok(())
                } else {
                    Err(err)
                }
            }
        }
    }

    async fn send(&self, queue: &str, body: &str) -> Result<()> {
        validate_name("queue", queue)?;
        let url = self.resolve_or_create(queue).await?;

        let client = self.client().await?;
        client
            .send_message()
            .queue_url(&url)
            .message_body(body)
            .send()
            .await
            .map_err(|e| provider_error("send_message", queue, e))?;

        debug!(queue = %queue, bytes = body.len(), "Sent message");
        Ok(())
    }

    async fn receive_timeout(&self, queue: &str, timeout: Duration) -> Result<Option<String>> {
        validate_name("queue", queue)?;
        let deadline = deadline_after(timeout);
        let url = self.resolve_or_create(queue).await?;
        let client = self.client().await?;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let wait_seconds = remaining.as_secs().min(MAX_WAIT_SECONDS) as i32;

            let output = client
                .receive_message()
                .queue_url(&url)
                .max_number_of_messages(1)
                .wait_time_seconds(wait_seconds)
                .visibility_timeout(VISIBILITY_TIMEOUT_SECONDS)
                .send()
                .await
                .map_err(|e| provider_error("receive_message", queue, e))?;

            if let Some(message) = output.messages.unwrap_or_default().into_iter().next() {
                let receipt = message.receipt_handle.ok_or_else(|| {
                    CapabilityError::UnexpectedResponse(format!(
                        "message from '{queue}' has no receipt handle"
                    ))
                })?;
                self.delete_message(queue, &url, &receipt).await?;
                debug!(queue = %queue, "Received and deleted message");
                return Ok(Some(message.body.unwrap_or_default()));
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(None);
            }
            if wait_seconds == 0 {
                tokio::time::sleep(remaining.min(SHORT_POLL_PAUSE)).await;
            }
        }
    }
}
