//! Queue timing and redrive parameters derived from the consumer's limits.
//!
//! Visibility timeout and receive count are computed here once and consumed by
//! the deployment template, so they cannot drift from the consumer timeout.

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::PipelineError;

pub const MAX_RECEIVE_COUNT: u32 = 3;
/// Four days, for both the primary and the dead-letter queue.
pub const MESSAGE_RETENTION_SECONDS: u32 = 345_600;
pub const MAX_VISIBILITY_TIMEOUT_SECONDS: u32 = 43_200;
pub const VISIBILITY_TIMEOUT_MULTIPLIER: u32 = 6;
pub const MAX_LAMBDA_TIMEOUT_SECONDS: u32 = 900;
/// One queued batch per consumer invocation.
pub const CONSUMER_BATCH_SIZE: u32 = 1;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConsumerSettings {
    pub timeout_seconds: u32,
    pub memory_mb: u32,
}

impl ConsumerSettings {
    pub fn new(timeout_seconds: u32, memory_mb: u32) -> Result<Self, PipelineError> {
        if timeout_seconds == 0 || timeout_seconds > MAX_LAMBDA_TIMEOUT_SECONDS {
            return Err(PipelineError::validation(format!(
                "consumer timeout must be between 1 and {MAX_LAMBDA_TIMEOUT_SECONDS} seconds"
            )));
        }
        if !(128..=10_240).contains(&memory_mb) {
            return Err(PipelineError::validation(
                "consumer memory must be between 128 and 10240 MB",
            ));
        }
        Ok(Self {
            timeout_seconds,
            memory_mb,
        })
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RedrivePolicy {
    pub max_receive_count: u32,
}

impl Default for RedrivePolicy {
    fn default() -> Self {
        Self {
            max_receive_count: MAX_RECEIVE_COUNT,
        }
    }
}

impl RedrivePolicy {
    /// True once a message has been received `max_receive_count` times
    /// without being acknowledged.
    pub fn should_dead_letter(&self, receive_count: u32) -> bool {
        receive_count >= self.max_receive_count
    }

    pub fn to_template(&self, dead_letter_arn: serde_json::Value) -> serde_json::Value {
        json!({
            "deadLetterTargetArn": dead_letter_arn,
            "maxReceiveCount": self.max_receive_count,
        })
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct QueueTopology {
    pub visibility_timeout_seconds: u32,
    pub message_retention_seconds: u32,
    pub dead_letter_retention_seconds: u32,
    pub consumer_batch_size: u32,
    pub redrive: RedrivePolicy,
}

impl QueueTopology {
    pub fn derive(consumer: &ConsumerSettings) -> Self {
        let visibility_timeout_seconds = consumer
            .timeout_seconds
            .saturating_mul(VISIBILITY_TIMEOUT_MULTIPLIER)
            .min(MAX_VISIBILITY_TIMEOUT_SECONDS)
            .max(consumer.timeout_seconds);

        Self {
            visibility_timeout_seconds,
            message_retention_seconds: MESSAGE_RETENTION_SECONDS,
            dead_letter_retention_seconds: MESSAGE_RETENTION_SECONDS,
            consumer_batch_size: CONSUMER_BATCH_SIZE,
            redrive: RedrivePolicy::default(),
        }
    }
}
