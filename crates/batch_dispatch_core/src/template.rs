//! Infrastructure template for the two functions and their queues.
//!
//! Both functions deploy the same runtime artifact; queue timing comes from
//! [`QueueTopology::derive`] and queue permissions reference the queue by name.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::PipelineError;
use crate::topology::{ConsumerSettings, QueueTopology, MAX_LAMBDA_TIMEOUT_SECONDS};

const QUEUE_RESOURCE: &str = "FileDispatchQueue";
const DEAD_LETTER_RESOURCE: &str = "FileDispatchDeadLetterQueue";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeploymentSettings {
    pub queue_name: String,
    pub dead_letter_queue_name: String,
    pub source_bucket: String,
    pub destination_prefix: String,
    pub code_uri: String,
    pub producer_timeout_seconds: u32,
    pub producer_memory_mb: u32,
    pub consumer: ConsumerSettings,
}

impl DeploymentSettings {
    pub fn validate(&self) -> Result<(), PipelineError> {
        for (field, value) in [
            ("queue_name", &self.queue_name),
            ("dead_letter_queue_name", &self.dead_letter_queue_name),
            ("source_bucket", &self.source_bucket),
            ("code_uri", &self.code_uri),
        ] {
            if value.trim().is_empty() {
                return Err(PipelineError::validation(format!("{field} cannot be empty")));
            }
        }
        if self.queue_name == self.dead_letter_queue_name {
            return Err(PipelineError::validation(
                "dead_letter_queue_name must differ from queue_name",
            ));
        }
        if self.producer_timeout_seconds == 0
            || self.producer_timeout_seconds > MAX_LAMBDA_TIMEOUT_SECONDS
        {
            return Err(PipelineError::validation(format!(
                "producer timeout must be between 1 and {MAX_LAMBDA_TIMEOUT_SECONDS} seconds"
            )));
        }
        Ok(())
    }
}

pub fn render_template(settings: &DeploymentSettings) -> Result<Value, PipelineError> {
    settings.validate()?;
    let topology = QueueTopology::derive(&settings.consumer);

    Ok(json!({
        "AWSTemplateFormatVersion": "2010-09-09",
        "Transform": "AWS::Serverless-2016-10-31",
        "Description": "Lists S3 objects, batches their metadata and fans it out through SQS",
        "Globals": {
            "Function": {
                "CodeUri": settings.code_uri,
                "Handler": "bootstrap",
                "Runtime": "provided.al2023",
                "Architectures": ["x86_64"],
                "Environment": {
                    "Variables": { "RUST_LOG": "info" }
                }
            }
        },
        "Resources": {
            DEAD_LETTER_RESOURCE: {
                "Type": "AWS::SQS::Queue",
                "Properties": {
                    "QueueName": settings.dead_letter_queue_name,
                    "MessageRetentionPeriod": topology.dead_letter_retention_seconds,
                }
            },
            QUEUE_RESOURCE: {
                "Type": "AWS::SQS::Queue",
                "Properties": {
                    "QueueName": settings.queue_name,
                    "VisibilityTimeout": topology.visibility_timeout_seconds,
                    "MessageRetentionPeriod": topology.message_retention_seconds,
                    "RedrivePolicy": topology
                        .redrive
                        .to_template(json!({ "Fn::GetAtt": [DEAD_LETTER_RESOURCE, "Arn"] })),
                }
            },
            "FileDispatchProducerFunction": {
                "Type": "AWS::Serverless::Function",
                "Properties": {
                    "Timeout": settings.producer_timeout_seconds,
                    "MemorySize": settings.producer_memory_mb,
                    "Policies": [
                        { "S3ReadPolicy": { "BucketName": settings.source_bucket } },
                        {
                            "SQSSendMessagePolicy": {
                                "QueueName": { "Fn::GetAtt": [QUEUE_RESOURCE, "QueueName"] }
                            }
                        }
                    ]
                }
            },
            "FileDispatchConsumerFunction": {
                "Type": "AWS::Serverless::Function",
                "Properties": {
                    "Timeout": settings.consumer.timeout_seconds,
                    "MemorySize": settings.consumer.memory_mb,
                    "Environment": {
                        "Variables": {
                            "RUST_LOG": "info",
                            "SOURCE_BUCKET": settings.source_bucket,
                            "DESTINATION_PREFIX": settings.destination_prefix,
                        }
                    },
                    "Policies": [
                        { "S3CrudPolicy": { "BucketName": settings.source_bucket } }
                    ],
                    "Events": {
                        "QueueEvent": {
                            "Type": "SQS",
                            "Properties": {
                                "Queue": { "Fn::GetAtt": [QUEUE_RESOURCE, "Arn"] },
                                "BatchSize": topology.consumer_batch_size,
                            }
                        }
                    }
                }
            }
        },
        "Outputs": {
            "QueueUrl": { "Value": { "Ref": QUEUE_RESOURCE } },
            "QueueName": { "Value": { "Fn::GetAtt": [QUEUE_RESOURCE, "QueueName"] } },
            "DeadLetterQueueUrl": { "Value": { "Ref": DEAD_LETTER_RESOURCE } }
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> DeploymentSettings {
        DeploymentSettings {
            queue_name: "file-upload-manager".to_string(),
            dead_letter_queue_name: "file-upload-manager-dlq".to_string(),
            source_bucket: "test-bucket".to_string(),
            destination_prefix: "Destination/".to_string(),
            code_uri: "dist/runtime.zip".to_string(),
            producer_timeout_seconds: 900,
            producer_memory_mb: 1_024,
            consumer: ConsumerSettings::new(120, 512).expect("valid consumer settings"),
        }
    }

    #[test]
    fn queue_timing_is_derived_from_consumer_timeout() {
        let template = render_template(&settings()).expect("template should render");
        let queue = &template["Resources"][QUEUE_RESOURCE]["Properties"];

        assert_eq!(queue["VisibilityTimeout"], 720);
        assert_eq!(queue["MessageRetentionPeriod"], 345_600);
        assert_eq!(queue["RedrivePolicy"]["maxReceiveCount"], 3);
        assert_eq!(
            template["Resources"][DEAD_LETTER_RESOURCE]["Properties"]["MessageRetentionPeriod"],
            345_600
        );
    }

    #[test]
    fn send_policy_references_queue_name_not_arn() {
        let template = render_template(&settings()).expect("template should render");
        let policies = &template["Resources"]["FileDispatchProducerFunction"]["Properties"]
            ["Policies"];

        assert_eq!(
            policies[1]["SQSSendMessagePolicy"]["QueueName"],
            json!({ "Fn::GetAtt": [QUEUE_RESOURCE, "QueueName"] })
        );
    }

    #[test]
    fn consumer_reads_one_message_per_invocation() {
        let template = render_template(&settings()).expect("template should render");
        let event = &template["Resources"]["FileDispatchConsumerFunction"]["Properties"]["Events"]
            ["QueueEvent"]["Properties"];
        assert_eq!(event["BatchSize"], 1);
    }

    #[test]
    fn rejects_shared_queue_names() {
        let mut invalid = settings();
        invalid.dead_letter_queue_name = invalid.queue_name.clone();
        assert!(render_template(&invalid).is_err());
    }
}
