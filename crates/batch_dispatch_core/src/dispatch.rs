use serde::{Deserialize, Serialize};

use crate::contract::FailedSend;

/// Outcome of pushing one producer run's batches onto the queue.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SendReport {
    pub messages_created: usize,
    pub messages_sent: usize,
    pub failed_batches: Vec<FailedSend>,
    pub total_payload_size_bytes: usize,
}

impl SendReport {
    pub fn new(messages_created: usize) -> Self {
        Self {
            messages_created,
            ..Self::default()
        }
    }

    pub fn record_sent(&mut self, payload_bytes: usize) {
        self.messages_sent += 1;
        self.total_payload_size_bytes += payload_bytes;
    }

    pub fn record_failure(
        &mut self,
        batch_index: usize,
        message_id: impl Into<String>,
        payload_bytes: usize,
        error: impl Into<String>,
    ) {
        self.total_payload_size_bytes += payload_bytes;
        self.failed_batches.push(FailedSend {
            batch_index,
            message_id: message_id.into(),
            error: error.into(),
        });
    }

    pub fn all_sent(&self) -> bool {
        self.failed_batches.is_empty() && self.messages_sent == self.messages_created
    }

    pub fn average_message_size_bytes(&self) -> f64 {
        if self.messages_created == 0 {
            0.0
        } else {
            self.total_payload_size_bytes as f64 / self.messages_created as f64
        }
    }

    pub fn failed_indices(&self) -> Vec<usize> {
        self.failed_batches
            .iter()
            .map(|failure| failure.batch_index)
            .collect()
    }
}
