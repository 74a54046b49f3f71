use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_sqs::error::DisplayErrorContext;
use batch_dispatch_core::contract::Batch;
use batch_dispatch_core::dispatch::SendReport;
use batch_dispatch_core::PipelineError;
use tracing::{debug, info, warn};

#[async_trait]
pub trait MessageSender: Send + Sync {
    /// Looks up the queue URL; failure aborts the producer run.
    async fn resolve_queue(&self, queue_name: &str) -> Result<String, PipelineError>;

    /// Enqueues one batch body; failures come back as `PipelineError::Send`.
    async fn send_message(
        &self,
        queue_url: &str,
        message_id: &str,
        body: String,
    ) -> Result<(), PipelineError>;
}

#[derive(Debug, Clone)]
pub struct SqsMessageSender {
    client: aws_sdk_sqs::Client,
}

impl SqsMessageSender {
    pub fn new(client: aws_sdk_sqs::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl MessageSender for SqsMessageSender {
    async fn resolve_queue(&self, queue_name: &str) -> Result<String, PipelineError> {
        let response = self
            .client
            .get_queue_url()
            .queue_name(queue_name)
            .send()
            .await
            .map_err(|error| {
                PipelineError::access(
                    format!("failed to resolve queue {queue_name}"),
                    DisplayErrorContext(&error).to_string(),
                )
            })?;

        response
            .queue_url()
            .map(str::to_string)
            .ok_or_else(|| PipelineError::access(format!("queue {queue_name}"), "no queue URL returned"))
    }

    async fn send_message(
        &self,
        queue_url: &str,
        message_id: &str,
        body: String,
    ) -> Result<(), PipelineError> {
        self.client
            .send_message()
            .queue_url(queue_url)
            .message_body(body)
            .send()
            .await
            .map(|_| ())
            .map_err(|error| PipelineError::Send {
                message_id: message_id.to_string(),
                message: DisplayErrorContext(&error).to_string(),
            })
    }
}

/// Sends each batch as one message, in order, pausing `delay` between sends.
///
/// A failed send is recorded and the remaining batches are still attempted.
/// Nothing is retried here; redelivery belongs to the queue's redrive policy.
pub async fn send_batches(
    sender: &dyn MessageSender,
    queue_url: &str,
    batches: &[Batch],
    delay: Duration,
) -> SendReport {
    let mut report = SendReport::new(batches.len());

    for (batch_index, batch) in batches.iter().enumerate() {
        if batch_index > 0 && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let body = match serde_json::to_string(batch) {
            Ok(body) => body,
            Err(error) => {
                report.record_failure(batch_index, &batch.message_id, 0, error.to_string());
                continue;
            }
        };
        let payload_bytes = body.len();

        match sender
            .send_message(queue_url, &batch.message_id, body)
            .await
        {
            Ok(()) => {
                debug!(
                    component = "queue_sender",
                    message_id = %batch.message_id,
                    document_count = batch.document_count,
                    payload_bytes,
                    "message sent"
                );
                report.record_sent(payload_bytes);
            }
            Err(error) => {
                warn!(
                    component = "queue_sender",
                    message_id = %batch.message_id,
                    batch_index,
                    error = %error,
                    "message send failed"
                );
                report.record_failure(
                    batch_index,
                    &batch.message_id,
                    payload_bytes,
                    error.to_string(),
                );
            }
        }
    }

    info!(
        component = "queue_sender",
        messages_created = report.messages_created,
        messages_sent = report.messages_sent,
        failed = report.failed_batches.len(),
        "sends completed"
    );
    report
}
