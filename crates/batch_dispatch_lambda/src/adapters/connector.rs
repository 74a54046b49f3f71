use async_trait::async_trait;

use crate::adapters::path_lister::{PathLister, S3PathLister};
use crate::adapters::queue_sender::{MessageSender, SqsMessageSender};
use crate::config::{load_sdk_config, s3_client, sqs_client, RuntimeSettings};

pub struct ProducerClients {
    pub lister: Box<dyn PathLister>,
    pub sender: Box<dyn MessageSender>,
}

/// Builds the producer's remote clients for the region named in its payload.
#[async_trait]
pub trait ProducerConnector: Send + Sync {
    async fn connect(&self, region: &str) -> ProducerClients;

    /// Bucket the consumer copies from, when this deployment configures one.
    fn consumer_source_bucket(&self) -> Option<&str> {
        None
    }
}

#[derive(Debug, Clone)]
pub struct AwsProducerConnector {
    settings: RuntimeSettings,
}

impl AwsProducerConnector {
    pub fn new(settings: RuntimeSettings) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl ProducerConnector for AwsProducerConnector {
    async fn connect(&self, region: &str) -> ProducerClients {
        let aws_settings = self.settings.aws_settings(region);
        let sdk_config = load_sdk_config(&aws_settings).await;

        ProducerClients {
            lister: Box::new(S3PathLister::new(s3_client(&sdk_config, &aws_settings))),
            sender: Box::new(SqsMessageSender::new(sqs_client(&sdk_config))),
        }
    }

    fn consumer_source_bucket(&self) -> Option<&str> {
        self.settings.source_bucket.as_deref()
    }
}
