use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use batch_dispatch_core::topology::RedrivePolicy;
use batch_dispatch_core::PipelineError;
use batch_dispatch_lambda::adapters::batch_processor::BatchProcessor;
use batch_dispatch_lambda::adapters::queue_sender::MessageSender;
use batch_dispatch_lambda::handlers::consumer::handle_consumer_event;
use serde_json::json;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedMessage {
    pub body: String,
    pub receive_count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Acknowledged,
    Redelivered,
    DeadLettered,
}

#[derive(Default)]
struct QueueState {
    primary: VecDeque<QueuedMessage>,
    dead_letter: Vec<QueuedMessage>,
    send_attempts: usize,
}

/// Standard-queue stand-in: a primary queue, a dead-letter queue and a
/// redrive policy deciding where an unacknowledged message goes.
#[derive(Clone)]
pub struct InMemoryQueue {
    name: String,
    failing_sends: Vec<usize>,
    policy: RedrivePolicy,
    state: Arc<Mutex<QueueState>>,
}

impl InMemoryQueue {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            failing_sends: Vec::new(),
            policy: RedrivePolicy::default(),
            state: Arc::new(Mutex::new(QueueState::default())),
        }
    }

    /// Rejects the sends with these zero-based attempt indices.
    pub fn failing_sends(mut self, attempts: Vec<usize>) -> Self {
        self.failing_sends = attempts;
        self
    }

    pub fn url(&self) -> String {
        format!("https://sqs.us-east-1.amazonaws.com/000000000000/{}", self.name)
    }

    pub fn primary(&self) -> Vec<QueuedMessage> {
        self.lock().primary.iter().cloned().collect()
    }

    pub fn dead_letter(&self) -> Vec<QueuedMessage> {
        self.lock().dead_letter.clone()
    }

    pub fn send_attempts(&self) -> usize {
        self.lock().send_attempts
    }

    /// Delivers the head message to the consumer handler and applies the
    /// outcome: delete on success, otherwise redeliver or dead-letter.
    pub async fn deliver_next(&self, processor: &dyn BatchProcessor) -> Option<Delivery> {
        let mut message = self.lock().primary.pop_front()?;
        message.receive_count += 1;

        let event = json!({
            "Records": [{
                "eventSource": "aws:sqs",
                "messageId": format!("{}-{}", self.name, message.receive_count),
                "body": message.body.clone(),
            }]
        });

        let outcome = handle_consumer_event(&event, processor).await;
        let mut state = self.lock();
        match outcome {
            Ok(_) => Some(Delivery::Acknowledged),
            Err(_) if self.policy.should_dead_letter(message.receive_count) => {
                state.dead_letter.push(message);
                Some(Delivery::DeadLettered)
            }
            Err(_) => {
                state.primary.push_back(message);
                Some(Delivery::Redelivered)
            }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, QueueState> {
        self.state.lock().expect("poisoned queue state")
    }
}

#[async_trait]
impl MessageSender for InMemoryQueue {
    async fn resolve_queue(&self, queue_name: &str) -> Result<String, PipelineError> {
        if queue_name == self.name {
            Ok(self.url())
        } else {
            Err(PipelineError::access(
                format!("failed to resolve queue {queue_name}"),
                "AWS.SimpleQueueService.NonExistentQueue",
            ))
        }
    }

    async fn send_message(
        &self,
        queue_url: &str,
        message_id: &str,
        body: String,
    ) -> Result<(), PipelineError> {
        assert_eq!(queue_url, self.url());
        let mut state = self.lock();
        let attempt = state.send_attempts;
        state.send_attempts += 1;
        if self.failing_sends.contains(&attempt) {
            return Err(PipelineError::Send {
                message_id: message_id.to_string(),
                message: "network error: connection reset".to_string(),
            });
        }
        state.primary.push_back(QueuedMessage {
            body,
            receive_count: 0,
        });
        Ok(())
    }
}
