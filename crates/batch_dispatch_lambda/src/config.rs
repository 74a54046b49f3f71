//! Runtime configuration for the Lambda binary.
//!
//! AWS settings are passed explicitly to every client constructor rather than
//! read from ambient state, so the producer can target the region named in its
//! payload.

use aws_config::{BehaviorVersion, Region, SdkConfig};
use batch_dispatch_core::contract::DEFAULT_REGION;
use batch_dispatch_core::PipelineError;

pub const DEFAULT_DESTINATION_PREFIX: &str = "Destination/";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AwsSettings {
    pub region: String,
    /// Custom endpoint URL (for LocalStack).
    pub endpoint_url: Option<String>,
}

impl AwsSettings {
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            endpoint_url: None,
        }
    }

    pub fn with_endpoint(mut self, endpoint_url: Option<String>) -> Self {
        self.endpoint_url = endpoint_url;
        self
    }
}

pub async fn load_sdk_config(settings: &AwsSettings) -> SdkConfig {
    let mut loader = aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(settings.region.clone()));

    if let Some(endpoint) = &settings.endpoint_url {
        loader = loader.endpoint_url(endpoint);
    }

    loader.load().await
}

pub fn s3_client(sdk_config: &SdkConfig, settings: &AwsSettings) -> aws_sdk_s3::Client {
    let builder = aws_sdk_s3::config::Builder::from(sdk_config);
    // LocalStack only serves path-style requests.
    let config = if settings.endpoint_url.is_some() {
        builder.force_path_style(true).build()
    } else {
        builder.build()
    };
    aws_sdk_s3::Client::from_conf(config)
}

pub fn sqs_client(sdk_config: &SdkConfig) -> aws_sdk_sqs::Client {
    aws_sdk_sqs::Client::new(sdk_config)
}

/// Environment-provided settings, read once per cold start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeSettings {
    pub default_region: String,
    pub endpoint_url: Option<String>,
    pub source_bucket: Option<String>,
    pub destination_bucket: Option<String>,
    pub destination_prefix: String,
}

impl RuntimeSettings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let source_bucket = non_empty("SOURCE_BUCKET");
        Self {
            default_region: non_empty("AWS_REGION").unwrap_or_else(|| DEFAULT_REGION.to_string()),
            endpoint_url: non_empty("AWS_ENDPOINT_URL"),
            destination_bucket: non_empty("DESTINATION_BUCKET").or_else(|| source_bucket.clone()),
            source_bucket,
            destination_prefix: non_empty("DESTINATION_PREFIX")
                .unwrap_or_else(|| DEFAULT_DESTINATION_PREFIX.to_string()),
        }
    }

    pub fn aws_settings(&self, region: &str) -> AwsSettings {
        AwsSettings::new(region).with_endpoint(self.endpoint_url.clone())
    }

    /// Source and destination buckets for the consumer's copy step.
    pub fn copy_buckets(&self) -> Result<(String, String), PipelineError> {
        let source = self
            .source_bucket
            .clone()
            .ok_or_else(|| PipelineError::processing("SOURCE_BUCKET must be configured"))?;
        let destination = self
            .destination_bucket
            .clone()
            .unwrap_or_else(|| source.clone());
        Ok((source, destination))
    }
}
