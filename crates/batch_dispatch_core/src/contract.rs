use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::PipelineError;

pub const PRODUCER_SCHEMA_VERSION: &str = "v1";
/// Ceiling applied to every batch body, kept below the SQS hard limit.
pub const MAX_MESSAGE_SIZE_BYTES: usize = 250 * 1024;
pub const SQS_HARD_LIMIT_BYTES: usize = 256 * 1024;
const _: () = assert!(MAX_MESSAGE_SIZE_BYTES < SQS_HARD_LIMIT_BYTES);
pub const DEFAULT_REGION: &str = "us-east-1";
pub const DEFAULT_DELAY_SECONDS: f64 = 0.1;
/// Upper bound on the inter-send delay; one producer run must fit a Lambda timeout.
pub const MAX_DELAY_SECONDS: f64 = 60.0;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Document {
    pub file_path: String,
    pub file_name: String,
    pub file_extension: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Batch {
    pub message_id: String,
    pub document_count: usize,
    pub documents: Vec<Document>,
}

impl Batch {
    pub fn new(sequence: usize, documents: Vec<Document>) -> Self {
        Self {
            message_id: message_id(sequence),
            document_count: documents.len(),
            documents,
        }
    }
}

/// Sequential batch label, 1-based within one producer run.
pub fn message_id(sequence: usize) -> String {
    format!("batch_{sequence}")
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProducerRequest {
    #[serde(default)]
    pub bucket_name: String,
    #[serde(default)]
    pub folder_key: String,
    #[serde(default)]
    pub queue_name: String,
    #[serde(default = "default_region")]
    pub region_name: String,
    #[serde(default = "default_delay_seconds")]
    pub delay_between_messages: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NormalizedProducerRequest {
    pub bucket_name: String,
    pub folder_prefix: String,
    pub queue_name: String,
    pub region_name: String,
    pub delay_between_messages: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FailedSend {
    pub batch_index: usize,
    pub message_id: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ExecutionDetails {
    pub bucket_name: String,
    pub folder_key: String,
    pub queue_name: String,
    pub region_name: String,
    pub delay_between_messages: f64,
    pub max_message_size_bytes: usize,
    pub schema_version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_fingerprint: Option<String>,
    pub duration_ms: u64,
    pub failed_batches: Vec<FailedSend>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProducerSummary {
    pub success: bool,
    pub message: String,
    pub files_found: usize,
    pub documents_created: usize,
    pub messages_created: usize,
    pub messages_sent: usize,
    pub total_payload_size_bytes: usize,
    pub average_message_size_bytes: f64,
    pub execution_details: ExecutionDetails,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProducerResponse {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub body: ProducerSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConsumerResponse {
    pub status: String,
    pub batches_processed: usize,
    pub documents_processed: usize,
}

pub fn default_region() -> String {
    DEFAULT_REGION.to_string()
}

pub fn default_delay_seconds() -> f64 {
    DEFAULT_DELAY_SECONDS
}

pub fn normalize_request(
    payload: ProducerRequest,
) -> Result<NormalizedProducerRequest, PipelineError> {
    let bucket_name = payload.bucket_name.trim().to_string();
    if bucket_name.is_empty() {
        return Err(PipelineError::validation("bucket_name is required"));
    }

    let queue_name = payload.queue_name.trim().to_string();
    if queue_name.is_empty() {
        return Err(PipelineError::validation("queue_name is required"));
    }

    let delay = payload.delay_between_messages;
    if !delay.is_finite() || delay < 0.0 {
        return Err(PipelineError::validation(
            "delay_between_messages must be a non-negative number",
        ));
    }
    if delay > MAX_DELAY_SECONDS {
        return Err(PipelineError::validation(format!(
            "delay_between_messages must not exceed {MAX_DELAY_SECONDS} seconds"
        )));
    }

    let region_name = match payload.region_name.trim() {
        "" => default_region(),
        region => region.to_string(),
    };

    Ok(NormalizedProducerRequest {
        bucket_name,
        folder_prefix: folder_prefix(&payload.folder_key),
        queue_name,
        region_name,
        delay_between_messages: delay,
    })
}

/// Listing prefix for a folder key; a non-empty folder always ends with `/`.
pub fn folder_prefix(folder_key: &str) -> String {
    let trimmed = folder_key.trim().trim_start_matches('/');
    if trimmed.is_empty() || trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{trimmed}/")
    }
}

pub fn request_fingerprint(request: &NormalizedProducerRequest) -> String {
    let mut hasher = Sha256::new();
    hasher.update(stable_contract_json(request));
    format!("{:x}", hasher.finalize())
}

pub fn stable_contract_json(value: impl Serialize) -> String {
    serde_json::to_string(&value).unwrap_or_default()
}

impl ExecutionDetails {
    pub fn for_request(request: &NormalizedProducerRequest, max_message_size_bytes: usize) -> Self {
        Self {
            bucket_name: request.bucket_name.clone(),
            folder_key: request.folder_prefix.clone(),
            queue_name: request.queue_name.clone(),
            region_name: request.region_name.clone(),
            delay_between_messages: request.delay_between_messages,
            max_message_size_bytes,
            schema_version: PRODUCER_SCHEMA_VERSION.to_string(),
            request_fingerprint: Some(request_fingerprint(request)),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(bucket: &str, queue: &str) -> ProducerRequest {
        ProducerRequest {
            bucket_name: bucket.to_string(),
            folder_key: "Source".to_string(),
            queue_name: queue.to_string(),
            region_name: default_region(),
            delay_between_messages: DEFAULT_DELAY_SECONDS,
        }
    }

    #[test]
    fn request_defaults_apply_to_omitted_fields() {
        let payload: ProducerRequest =
            serde_json::from_str(r#"{"bucket_name":"b","queue_name":"q"}"#)
                .expect("payload should parse");

        assert_eq!(payload.folder_key, "");
        assert_eq!(payload.region_name, "us-east-1");
        assert!((payload.delay_between_messages - 0.1).abs() < f64::EPSILON);
    }

    #[test]
    fn normalize_request_rejects_missing_bucket() {
        let error = normalize_request(request("  ", "queue")).expect_err("should fail");
        assert_eq!(error, PipelineError::validation("bucket_name is required"));
    }

    #[test]
    fn normalize_request_rejects_missing_queue() {
        let error = normalize_request(request("bucket", "")).expect_err("should fail");
        assert_eq!(error.kind(), "validation_error");
        assert!(error.to_string().contains("queue_name"));
    }

    #[test]
    fn normalize_request_rejects_negative_delay() {
        let mut payload = request("bucket", "queue");
        payload.delay_between_messages = -1.0;
        assert!(normalize_request(payload).is_err());
    }

    #[test]
    fn normalize_request_appends_folder_separator() {
        let normalized = normalize_request(request("bucket", "queue")).expect("should pass");
        assert_eq!(normalized.folder_prefix, "Source/");
        assert_eq!(folder_prefix(""), "");
        assert_eq!(folder_prefix("a/b/"), "a/b/");
        assert_eq!(folder_prefix("/a"), "a/");
    }

    #[test]
    fn fingerprint_is_stable_for_identical_requests() {
        let a = normalize_request(request("bucket", "queue")).expect("should pass");
        let b = normalize_request(request(" bucket ", "queue")).expect("should pass");
        assert_eq!(request_fingerprint(&a), request_fingerprint(&b));
        assert_eq!(request_fingerprint(&a).len(), 64);
    }

    #[test]
    fn batch_serializes_with_wire_field_names() {
        let batch = Batch::new(1, Vec::new());
        let json = serde_json::to_string(&batch).expect("batch should serialize");
        assert_eq!(
            json,
            r#"{"message_id":"batch_1","document_count":0,"documents":[]}"#
        );
    }

    #[test]
    fn producer_response_uses_status_code_key() {
        let response = ProducerResponse {
            status_code: 200,
            body: ProducerSummary::default(),
        };
        let value = serde_json::to_value(&response).expect("response should serialize");
        assert_eq!(value["statusCode"], 200);
        assert!(value["body"]["execution_details"].is_object());
    }
}
