use std::time::{Duration, Instant};

use batch_dispatch_core::batching::build_batches;
use batch_dispatch_core::contract::{
    normalize_request, ExecutionDetails, NormalizedProducerRequest, ProducerRequest,
    ProducerResponse, ProducerSummary, MAX_MESSAGE_SIZE_BYTES,
};
use batch_dispatch_core::dispatch::SendReport;
use batch_dispatch_core::document::transform_paths;
use batch_dispatch_core::PipelineError;
use serde_json::{json, Value};
use tracing::{error, info, warn};

use crate::adapters::connector::ProducerConnector;
use crate::adapters::path_lister::{collect_paths, PathLister};
use crate::adapters::queue_sender::{send_batches, MessageSender};

/// Counts accumulated by one producer run, reported even when it fails.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProducerProgress {
    pub files_found: usize,
    pub documents_created: usize,
    pub report: SendReport,
}

pub async fn handle_producer_event(
    event: Value,
    connector: &dyn ProducerConnector,
) -> ProducerResponse {
    let started_at = Instant::now();

    let request = match parse_producer_event(event) {
        Ok(value) => value,
        Err(error) => {
            warn!(component = "producer", error = %error, "request rejected");
            return build_response(
                &Err(error),
                &ProducerProgress::default(),
                ExecutionDetails::default(),
                started_at,
            );
        }
    };

    let details = ExecutionDetails::for_request(&request, MAX_MESSAGE_SIZE_BYTES);
    info!(
        component = "producer",
        bucket = %request.bucket_name,
        prefix = %request.folder_prefix,
        queue = %request.queue_name,
        region = %request.region_name,
        "producer started"
    );
    if let Some(configured) =
        mismatched_source_bucket(connector.consumer_source_bucket(), &request.bucket_name)
    {
        // Documents carry keys only; the consumer resolves them against its own bucket.
        warn!(
            component = "producer",
            bucket = %request.bucket_name,
            consumer_source_bucket = %configured,
            "listed bucket differs from the consumer's source bucket"
        );
    }

    let clients = connector.connect(&request.region_name).await;
    let mut progress = ProducerProgress::default();
    let outcome = run_producer(
        &request,
        clients.lister.as_ref(),
        clients.sender.as_ref(),
        MAX_MESSAGE_SIZE_BYTES,
        &mut progress,
    )
    .await;

    build_response(&outcome, &progress, details, started_at)
}

/// Validates the invocation payload before any remote work happens.
pub fn parse_producer_event(event: Value) -> Result<NormalizedProducerRequest, PipelineError> {
    let payload = normalize_apigw_event(event).map_err(PipelineError::validation)?;
    let request = serde_json::from_value::<ProducerRequest>(payload)
        .map_err(|error| PipelineError::validation(format!("Malformed request: {error}")))?;
    normalize_request(request)
}

/// Lists, transforms, batches, then sends, each stage finishing before the next.
pub async fn run_producer(
    request: &NormalizedProducerRequest,
    lister: &dyn PathLister,
    sender: &dyn MessageSender,
    max_message_bytes: usize,
    progress: &mut ProducerProgress,
) -> Result<(), PipelineError> {
    let paths = collect_paths(lister.list_paths(&request.bucket_name, &request.folder_prefix)).await?;
    progress.files_found = paths.len();
    info!(
        component = "producer",
        files_found = paths.len(),
        "listing completed"
    );

    if paths.is_empty() {
        return Ok(());
    }

    let documents = transform_paths(&paths)?;
    progress.documents_created = documents.len();

    let batches = build_batches(documents, max_message_bytes)?;
    progress.report = SendReport::new(batches.len());
    info!(
        component = "producer",
        documents_created = progress.documents_created,
        messages_created = batches.len(),
        "batches built"
    );

    let queue_url = sender.resolve_queue(&request.queue_name).await?;
    let delay = Duration::from_secs_f64(request.delay_between_messages);
    progress.report = send_batches(sender, &queue_url, &batches, delay).await;

    Ok(())
}

fn build_response(
    outcome: &Result<(), PipelineError>,
    progress: &ProducerProgress,
    mut details: ExecutionDetails,
    started_at: Instant,
) -> ProducerResponse {
    let report = &progress.report;
    details.duration_ms = u64::try_from(started_at.elapsed().as_millis()).unwrap_or(u64::MAX);
    details.failed_batches = report.failed_batches.clone();

    let (status_code, success, message) = match outcome {
        Ok(()) if progress.files_found == 0 => {
            (200, true, "No files found to process".to_string())
        }
        Ok(()) if report.all_sent() => (
            200,
            true,
            "File retrieval and messaging completed successfully".to_string(),
        ),
        Ok(()) => (
            207,
            false,
            format!(
                "{} of {} messages failed to send",
                report.failed_batches.len(),
                report.messages_created
            ),
        ),
        Err(error) => {
            details.error_kind = Some(error.kind().to_string());
            details.error = Some(error.to_string());
            (error.status_code(), false, error.to_string())
        }
    };

    let summary = ProducerSummary {
        success,
        message,
        files_found: progress.files_found,
        documents_created: progress.documents_created,
        messages_created: report.messages_created,
        messages_sent: report.messages_sent,
        total_payload_size_bytes: report.total_payload_size_bytes,
        average_message_size_bytes: report.average_message_size_bytes(),
        execution_details: details,
    };

    if success {
        info!(
            component = "producer",
            files_found = summary.files_found,
            messages_sent = summary.messages_sent,
            duration_ms = summary.execution_details.duration_ms,
            "producer completed"
        );
    } else {
        error!(
            component = "producer",
            status_code,
            summary = %summary.message,
            failed_batches = ?report.failed_indices(),
            "producer finished with errors"
        );
    }

    ProducerResponse {
        status_code,
        body: summary,
    }
}

fn mismatched_source_bucket<'a>(configured: Option<&'a str>, requested: &str) -> Option<&'a str> {
    configured.filter(|bucket| *bucket != requested)
}

fn normalize_apigw_event(event: Value) -> Result<Value, String> {
    let Some(object) = event.as_object() else {
        return Err("Request payload must be a JSON object".to_string());
    };

    let Some(body) = object.get("body") else {
        return Ok(event);
    };

    match body {
        Value::Null => Ok(json!({})),
        Value::Object(_) => Ok(body.clone()),
        Value::String(text) => {
            serde_json::from_str(text).map_err(|error| format!("Malformed JSON body: {error}"))
        }
        _ => Err("Request body must be a JSON object".to_string()),
    }
}
