//! SNS topics delivering into SQS queues.
//!
//! Topics have no get-by-name call, so they are resolved by scanning the
//! paginated topic listing. Subscriptions use raw message delivery, and the
//! destination queue's access policy grants each subscribed topic send
//! permission through its own statement.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_sns::Client;
use aws_sdk_sqs::types::QueueAttributeName;
use serde_json::{json, Value};
use tokio::sync::OnceCell;
use tracing::{debug, info};

use super::clients::AwsClients;
use super::error::provider_error;
use super::queue::SqsQueue;
use crate::capability::{CapabilityError, PubSub, Queue, Result};
use crate::validation::validate_name;

const POLICY_VERSION: &str = "2012-10-17";

/// SNS + SQS implementation of [`PubSub`].
pub struct SnsPubSub {
    clients: Arc<AwsClients>,
    client: OnceCell<Client>,
    queue: SqsQueue,
}

impl SnsPubSub {
    pub fn new(clients: Arc<AwsClients>) -> Self {
        Self {
            queue: SqsQueue::new(clients.clone()),
            clients,
            client: OnceCell::new(),
        }
    }

    async fn client(&self) -> Result<&Client> {
        self.client.get_or_try_init(|| self.clients.sns()).await
    }

    /// Topic ARN by name, scanning every page of the listing.
    async fn find_topic_arn(&self, topic: &str) -> Result<Option<String>> {
        let client = self.client().await?;
        let suffix = format!(":{topic}");
        let mut next_token: Option<String> = None;

        loop {
            let output = client
                .list_topics()
                .set_next_token(next_token.take())
                .send()
                .await
                .map_err(|e| provider_error("list_topics", topic, e))?;

            let found = output
                .topics
                .unwrap_or_default()
                .into_iter()
                .filter_map(|t| t.topic_arn)
                .find(|arn| arn.ends_with(&suffix));
            if found.is_some() {
                return Ok(found);
            }

            match output.next_token {
                Some(token) if !token.is_empty() => next_token = Some(token),
                _ => return Ok(None),
            }
        }
    }

    async fn ensure_topic_arn(&self, topic: &str) -> Result<String> {
        if let Some(arn) = self.find_topic_arn(topic).await? {
            return Ok(arn);
        }

        let client = self.client().await?;
        let output = client
            .create_topic()
            .name(topic)
            .send()
            .await
            .map_err(|e| provider_error("create_topic", topic, e))?;

        info!(topic = %topic, "Created SNS topic");
        output.topic_arn.ok_or_else(|| {
            CapabilityError::UnexpectedResponse(format!("create_topic for '{topic}' returned no ARN"))
        })
    }

    /// Add a send grant for `topic_arn` to the queue policy if missing.
    async fn grant_topic_access(
        &self,
        queue: &str,
        queue_url: &str,
        queue_arn: &str,
        topic_arn: &str,
    ) -> Result<()> {
        let sqs = self.queue.client().await?;
        let output = sqs
            .get_queue_attributes()
            .queue_url(queue_url)
            .attribute_names(QueueAttributeName::Policy)
            .send()
            .await
            .map_err(|e| provider_error("get_queue_attributes", queue, e))?;

        let existing = output
            .attributes
            .and_then(|mut attrs| attrs.remove(&QueueAttributeName::Policy));

        let Some(policy) = merge_policy(existing.as_deref(), queue_arn, topic_arn)? else {
            debug!(queue = %queue, topic_arn = %topic_arn, "Queue policy already grants topic");
            return Ok(());
        };

        sqs.set_queue_attributes()
            .queue_url(queue_url)
            .attributes(QueueAttributeName::Policy, policy)
            .send()
            .await
            .map_err(|e| provider_error("set_queue_attributes", queue, e))?;

        debug!(queue = %queue, topic_arn = %topic_arn, "Granted topic access to queue");
        Ok(())
    }

    async fn subscription_exists(&self, topic_arn: &str, queue_arn: &str) -> Result<bool> {
        let client = self.client().await?;
        let mut next_token: Option<String> = None;

        loop {
            let output = client
                .list_subscriptions_by_topic()
                .topic_arn(topic_arn)
                .set_next_token(next_token.take())
                .send()
                .await
                .map_err(|e| provider_error("list_subscriptions_by_topic", topic_arn, e))?;

            let exists = output.subscriptions.unwrap_or_default().iter().any(|s| {
                s.protocol.as_deref() == Some("sqs") && s.endpoint.as_deref() == Some(queue_arn)
            });
            if exists {
                return Ok(true);
            }

            match output.next_token {
                Some(token) if !token.is_empty() => next_token = Some(token),
                _ => return Ok(false),
            }
        }
    }
}

#[async_trait]
impl PubSub for SnsPubSub {
    async fn ensure_topic(&self, topic: &str) -> Result<()> {
        validate_name("topic", topic)?;
        self.ensure_topic_arn(topic).await?;
        Ok(())
    }

    async fn delete_topic(&self, topic: &str) -> Result<()> {
        validate_name("topic", topic)?;
        let Some(arn) = self.find_topic_arn(topic).await? else {
            return Ok(());
        };

        let client = self.client().await?;
        match client.delete_topic().topic_arn(&arn).send().await {
            Ok(_) => {
                info!(topic = %topic, "Deleted SNS topic");
                Ok(())
            }
            Err(e) => {
                let err = provider_error("delete_topic", topic, e);
                if err.is_not_found() {
                    Ok(())
                } else {
                    Err(err)
                }
            }
        }
    }

    async fn ensure_subscription(&self, topic: &str, queue: &str) -> Result<()> {
        validate_name("topic", topic)?;
        validate_name("queue", queue)?;

        let topic_arn = self.ensure_topic_arn(topic).await?;
        let queue_url = self.queue.ensure_queue_url(queue).await?;
        let queue_arn = self.queue.queue_arn(queue, &queue_url).await?;

        self.grant_topic_access(queue, &queue_url, &queue_arn, &topic_arn)
            .await?;

        if self.subscription_exists(&topic_arn, &queue_arn).await? {
            debug!(topic = %topic, queue = %queue, "Subscription already present");
            return Ok(());
        }

        let client = self.client().await?;
        client
            .subscribe()
            .topic_arn(&topic_arn)
            .protocol("sqs")
            .endpoint(&queue_arn)
            .attributes("RawMessageDelivery", "true")
            .return_subscription_arn(true)
            .send()
            .await
            .map_err(|e| provider_error("subscribe", topic, e))?;

        info!(topic = %topic, queue = %queue, "Subscribed queue to topic");
        Ok(())
    }

    async fn publish(&self, topic: &str, body: &str) -> Result<()> {
        validate_name("topic", topic)?;
        let topic_arn = self.ensure_topic_arn(topic).await?;

        let client = self.client().await?;
        client
            .publish()
            .topic_arn(&topic_arn)
            .message(body)
            .send()
            .await
            .map_err(|e| provider_error("publish", topic, e))?;

        debug!(topic = %topic, bytes = body.len(), "Published message");
        Ok(())
    }

    async fn receive_timeout(&self, queue: &str, timeout: Duration) -> Result<Option<String>> {
        self.queue.receive_timeout(queue, timeout).await
    }
}

/// Policy statement letting `topic_arn` send to `queue_arn`.
fn topic_statement(queue_arn: &str, topic_arn: &str) -> Value {
    json!({
        "Effect": "Allow",
        "Principal": "*",
        "Action": "sqs:SendMessage",
        "Resource": queue_arn,
        "Condition": { "ArnEquals": { "aws:SourceArn": topic_arn } }
    })
}

fn grants_topic(statement: &Value, queue_arn: &str, topic_arn: &str) -> bool {
    statement.get("Resource").and_then(Value::as_str) == Some(queue_arn)
        && statement
            .pointer("/Condition/ArnEquals/aws:SourceArn")
            .and_then(Value::as_str)
            == Some(topic_arn)
}

/// Merge a grant for `topic_arn` into an existing queue policy.
///
/// Returns `None` when the policy already grants the topic. Statements for
/// other topics are kept.
fn merge_policy(existing: Option<&str>, queue_arn: &str, topic_arn: &str) -> Result<Option<String>> {
    let mut policy: Value = match existing {
        Some(doc) if !doc.trim().is_empty() => serde_json::from_str(doc).map_err(|e| {
            CapabilityError::UnexpectedResponse(format!("queue policy is not valid JSON: {e}"))
        })?,
        _ => json!({ "Version": POLICY_VERSION, "Statement": [] }),
    };

    let Some(doc) = policy.as_object_mut() else {
        return Err(CapabilityError::UnexpectedResponse(
            "queue policy is not a JSON object".to_string(),
        ));
    };

    let mut statements = match doc.remove("Statement") {
        Some(Value::Array(list)) => list,
        Some(single @ Value::Object(_)) => vec![single],
        _ => Vec::new(),
    };

    if statements
        .iter()
        .any(|s| grants_topic(s, queue_arn, topic_arn))
    {
        return Ok(None);
    }

    statements.push(topic_statement(queue_arn, topic_arn));
    doc.entry("Version")
        .or_insert_with(|| Value::String(POLICY_VERSION.to_string()));
    doc.insert("Statement".to_string(), Value::Array(statements));

    Ok(Some(policy.to_string()))
}
