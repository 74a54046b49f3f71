use thiserror::Error;

/// Failure taxonomy shared by the producer and consumer paths.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    /// Missing or malformed input. Raised before any remote call.
    #[error("{0}")]
    Validation(String),

    /// Listing or queue lookup denied, or the target does not exist.
    #[error("{context}: {message}")]
    Access { context: String, message: String },

    /// A single document cannot fit in a message on its own.
    #[error(
        "document {index} ({file_path}) serializes to {size_bytes} bytes, above the {max_bytes} byte message ceiling"
    )]
    OversizedDocument {
        index: usize,
        file_path: String,
        size_bytes: usize,
        max_bytes: usize,
    },

    /// One message failed to enqueue.
    #[error("failed to send {message_id}: {message}")]
    Send { message_id: String, message: String },

    /// Consumer-side failure; the queue's redrive policy owns retries.
    #[error("{0}")]
    Processing(String),

    #[error("serialization failed: {0}")]
    Serialization(String),
}

impl PipelineError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn access(context: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Access {
            context: context.into(),
            message: message.into(),
        }
    }

    pub fn processing(message: impl Into<String>) -> Self {
        Self::Processing(message.into())
    }

    /// Stable identifier reported in responses and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::Access { .. } => "access_error",
            Self::OversizedDocument { .. } => "oversized_document_error",
            Self::Send { .. } => "send_error",
            Self::Processing(_) => "processing_error",
            Self::Serialization(_) => "serialization_error",
        }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation(_) => 400,
            Self::Access { .. } => 403,
            Self::OversizedDocument { .. } => 413,
            Self::Send { .. } => 502,
            Self::Processing(_) | Self::Serialization(_) => 500,
        }
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(error: serde_json::Error) -> Self {
        Self::Serialization(error.to_string())
    }
}
