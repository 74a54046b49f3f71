use std::time::Instant;

use batch_dispatch_core::contract::{Batch, ConsumerResponse};
use batch_dispatch_core::PipelineError;
use serde_json::Value;
use tracing::{error, info};

use crate::adapters::batch_processor::BatchProcessor;

/// Processes every queued batch in an SQS event.
///
/// Any failure is returned as an error so the invocation fails and the
/// message returns to the queue until its receive count reaches the redrive
/// maximum.
pub async fn handle_consumer_event(
    event: &Value,
    processor: &dyn BatchProcessor,
) -> Result<ConsumerResponse, PipelineError> {
    let batches = decode_sqs_batches(event)?;

    let mut documents_processed = 0usize;
    for batch in &batches {
        let started_at = Instant::now();
        info!(
            component = "consumer",
            message_id = %batch.message_id,
            document_count = batch.document_count,
            "batch started"
        );

        match processor.process_batch(batch).await {
            Ok(outcome) => {
                documents_processed += outcome.documents_processed;
                info!(
                    component = "consumer",
                    message_id = %batch.message_id,
                    documents_processed = outcome.documents_processed,
                    duration_ms = elapsed_ms(started_at),
                    "batch completed"
                );
            }
            Err(failure) => {
                error!(
                    component = "consumer",
                    message_id = %batch.message_id,
                    duration_ms = elapsed_ms(started_at),
                    error = %failure,
                    "batch failed"
                );
                return Err(failure);
            }
        }
    }

    Ok(ConsumerResponse {
        status: "ok".to_string(),
        batches_processed: batches.len(),
        documents_processed,
    })
}

fn elapsed_ms(started_at: Instant) -> u64 {
    u64::try_from(started_at.elapsed().as_millis()).unwrap_or(u64::MAX)
}

pub fn is_sqs_event(event: &Value) -> bool {
    event
        .get("Records")
        .and_then(Value::as_array)
        .map(|records| {
            !records.is_empty()
                && records.iter().all(|record| {
                    record
                        .get("eventSource")
                        .and_then(Value::as_str)
                        .map(|source| source == "aws:sqs")
                        .unwrap_or(false)
                })
        })
        .unwrap_or(false)
}

pub fn decode_sqs_batches(event: &Value) -> Result<Vec<Batch>, PipelineError> {
    let records = event
        .get("Records")
        .and_then(Value::as_array)
        .ok_or_else(|| PipelineError::processing("SQS event must include Records array"))?;

    let mut batches = Vec::with_capacity(records.len());
    for record in records {
        let body = record
            .get("body")
            .and_then(Value::as_str)
            .ok_or_else(|| PipelineError::processing("SQS record body must be a string"))?;
        let batch: Batch = serde_json::from_str(body).map_err(|error| {
            PipelineError::processing(format!("invalid batch message body: {error}"))
        })?;
        if batch.document_count != batch.documents.len() {
            return Err(PipelineError::processing(format!(
                "{} declares {} documents but carries {}",
                batch.message_id,
                batch.document_count,
                batch.documents.len()
            )));
        }
        batches.push(batch);
    }

    Ok(batches)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::adapters::batch_processor::BatchOutcome;

    struct RecordingProcessor {
        seen: Mutex<Vec<String>>,
        fail: bool,
    }

    #[async_trait]
    impl BatchProcessor for RecordingProcessor {
        async fn process_batch(&self, batch: &Batch) -> Result<BatchOutcome, PipelineError> {
            self.seen
                .lock()
                .expect("poisoned mutex")
                .push(batch.message_id.clone());
            if self.fail {
                Err(PipelineError::processing("downstream unavailable"))
            } else {
                Ok(BatchOutcome {
                    documents_processed: batch.document_count,
                })
            }
        }
    }

    fn sqs_event(body: &str) -> Value {
        json!({
            "Records": [
                {"eventSource": "aws:sqs", "messageId": "m-1", "body": body}
            ]
        })
    }

    const BODY: &str = r#"{"message_id":"batch_1","document_count":1,"documents":[{"file_path":"Source/a.txt","file_name":"a.txt","file_extension":"txt","timestamp":"2026-03-01T00:00:00.000Z"}]}"#;

    #[test]
    fn detects_sqs_event_shape() {
        assert!(is_sqs_event(&sqs_event("{}")));
        assert!(!is_sqs_event(&json!({"Records": []})));
        assert!(!is_sqs_event(&json!({"bucket_name": "b"})));
        assert!(!is_sqs_event(&json!({
            "Records": [{"eventSource": "aws:s3", "body": "{}"}]
        })));
    }

    #[test]
    fn elapsed_ms_measures_from_start() {
        let started_at = Instant::now();
        assert!(elapsed_ms(started_at) < 60_000);
    }

    #[test]
    fn rejects_record_without_body_string() {
        let event = json!({
            "Records": [{"eventSource": "aws:sqs", "body": 42}]
        });
        let error = decode_sqs_batches(&event).expect_err("non-string body should fail");
        assert!(error.to_string().contains("SQS record body must be a string"));
    }

    #[test]
    fn rejects_body_that_is_not_a_batch() {
        let error = decode_sqs_batches(&sqs_event("[]")).expect_err("should fail");
        assert_eq!(error.kind(), "processing_error");
    }

    #[test]
    fn rejects_inconsistent_document_count() {
        let body = BODY.replace("\"document_count\":1", "\"document_count\":2");
        assert!(decode_sqs_batches(&sqs_event(&body)).is_err());
    }

    #[tokio::test]
    async fn processes_decoded_batch() {
        let processor = RecordingProcessor {
            seen: Mutex::new(Vec::new()),
            fail: false,
        };
        let response = handle_consumer_event(&sqs_event(BODY), &processor)
            .await
            .expect("consumer should succeed");

        assert_eq!(response.batches_processed, 1);
        assert_eq!(response.documents_processed, 1);
        assert_eq!(*processor.seen.lock().expect("poisoned mutex"), vec!["batch_1"]);
    }

    #[tokio::test]
    async fn processor_failure_fails_the_invocation() {
        let processor = RecordingProcessor {
            seen: Mutex::new(Vec::new()),
            fail: true,
        };
        let error = handle_consumer_event(&sqs_event(BODY), &processor)
            .await
            .expect_err("failure should propagate");
        assert_eq!(error.kind(), "processing_error");
    }
}
