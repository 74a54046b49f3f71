use async_trait::async_trait;
use aws_sdk_s3::error::DisplayErrorContext;
use batch_dispatch_core::contract::{Batch, Document};
use batch_dispatch_core::PipelineError;
use tracing::{error, info};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    pub documents_processed: usize,
}

/// Per-batch work performed by the consumer function.
///
/// An `Err` fails the invocation and leaves the message to the queue's
/// redrive policy, so implementations must tolerate redelivery.
#[async_trait]
pub trait BatchProcessor: Send + Sync {
    async fn process_batch(&self, batch: &Batch) -> Result<BatchOutcome, PipelineError>;
}

/// Server-side copy of one object.
#[async_trait]
pub trait ObjectCopier: Send + Sync {
    async fn copy_object(
        &self,
        source_bucket: &str,
        source_key: &str,
        destination_bucket: &str,
        destination_key: &str,
    ) -> Result<(), String>;
}

#[derive(Debug, Clone)]
pub struct S3ObjectCopier {
    client: aws_sdk_s3::Client,
}

impl S3ObjectCopier {
    pub fn new(client: aws_sdk_s3::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ObjectCopier for S3ObjectCopier {
    async fn copy_object(
        &self,
        source_bucket: &str,
        source_key: &str,
        destination_bucket: &str,
        destination_key: &str,
    ) -> Result<(), String> {
        self.client
            .copy_object()
            .copy_source(copy_source(source_bucket, source_key))
            .bucket(destination_bucket)
            .key(destination_key)
            .send()
            .await
            .map(|_| ())
            .map_err(|error| DisplayErrorContext(&error).to_string())
    }
}

/// Copies every document's object under a destination prefix.
#[derive(Debug, Clone)]
pub struct CopyProcessor<C> {
    copier: C,
    source_bucket: String,
    destination_bucket: String,
    destination_prefix: String,
}

pub type S3CopyProcessor = CopyProcessor<S3ObjectCopier>;

impl S3CopyProcessor {
    pub fn new(
        client: aws_sdk_s3::Client,
        source_bucket: impl Into<String>,
        destination_bucket: impl Into<String>,
        destination_prefix: impl Into<String>,
    ) -> Self {
        Self::with_copier(
            S3ObjectCopier::new(client),
            source_bucket,
            destination_bucket,
            destination_prefix,
        )
    }
}

impl<C: ObjectCopier> CopyProcessor<C> {
    pub fn with_copier(
        copier: C,
        source_bucket: impl Into<String>,
        destination_bucket: impl Into<String>,
        destination_prefix: impl Into<String>,
    ) -> Self {
        Self {
            copier,
            source_bucket: source_bucket.into(),
            destination_bucket: destination_bucket.into(),
            destination_prefix: destination_prefix.into(),
        }
    }

    async fn copy_document(&self, document: &Document) -> Result<String, String> {
        let destination = destination_key(&self.destination_prefix, &document.file_name);
        self.copier
            .copy_object(
                &self.source_bucket,
                &document.file_path,
                &self.destination_bucket,
                &destination,
            )
            .await?;
        Ok(destination)
    }
}

#[async_trait]
impl<C: ObjectCopier> BatchProcessor for CopyProcessor<C> {
    async fn process_batch(&self, batch: &Batch) -> Result<BatchOutcome, PipelineError> {
        let mut failures = Vec::new();
        let mut documents_processed = 0usize;

        for document in &batch.documents {
            match self.copy_document(document).await {
                Ok(destination) => {
                    info!(
                        component = "copy_processor",
                        message_id = %batch.message_id,
                        source = %document.file_path,
                        destination = %destination,
                        "object copied"
                    );
                    documents_processed += 1;
                }
                Err(message) => {
                    error!(
                        component = "copy_processor",
                        message_id = %batch.message_id,
                        source = %document.file_path,
                        error = %message,
                        "object copy failed"
                    );
                    failures.push(document.file_path.clone());
                }
            }
        }

        if failures.is_empty() {
            Ok(BatchOutcome {
                documents_processed,
            })
        } else {
            Err(PipelineError::processing(format!(
                "{} of {} copies failed in {}: {}",
                failures.len(),
                batch.document_count,
                batch.message_id,
                failures.join(", ")
            )))
        }
    }
}

pub fn destination_key(prefix: &str, file_name: &str) -> String {
    let prefix = prefix.trim_matches('/');
    if prefix.is_empty() {
        file_name.to_string()
    } else {
        format!("{prefix}/{file_name}")
    }
}

/// `bucket/key` with each key segment URL-encoded, as CopyObject expects.
pub fn copy_source(bucket: &str, key: &str) -> String {
    let encoded: Vec<_> = key
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect();
    format!("{bucket}/{}", encoded.join("/"))
}
