use batch_dispatch_core::PipelineError;
use batch_dispatch_lambda::adapters::batch_processor::S3CopyProcessor;
use batch_dispatch_lambda::adapters::connector::AwsProducerConnector;
use batch_dispatch_lambda::config::{load_sdk_config, s3_client, RuntimeSettings};
use batch_dispatch_lambda::handlers::consumer::{handle_consumer_event, is_sqs_event};
use batch_dispatch_lambda::handlers::producer::handle_producer_event;
use batch_dispatch_lambda::logging::init_logging;
use lambda_runtime::{service_fn, Error, LambdaEvent};
use serde_json::Value;

/// Clients built once per cold start and shared by every invocation.
struct RuntimeDependencies {
    connector: AwsProducerConnector,
    copy_processor: Result<S3CopyProcessor, PipelineError>,
}

impl RuntimeDependencies {
    async fn load(settings: RuntimeSettings) -> Self {
        let copy_processor = match settings.copy_buckets() {
            Ok((source_bucket, destination_bucket)) => {
                let aws_settings = settings.aws_settings(&settings.default_region);
                let sdk_config = load_sdk_config(&aws_settings).await;
                Ok(S3CopyProcessor::new(
                    s3_client(&sdk_config, &aws_settings),
                    source_bucket,
                    destination_bucket,
                    settings.destination_prefix.clone(),
                ))
            }
            Err(error) => Err(error),
        };

        Self {
            connector: AwsProducerConnector::new(settings),
            copy_processor,
        }
    }
}

async fn handle_request(
    event: LambdaEvent<Value>,
    deps: &RuntimeDependencies,
) -> Result<Value, Error> {
    if is_sqs_event(&event.payload) {
        let processor = deps
            .copy_processor
            .as_ref()
            .map_err(|error| Error::from(error.to_string()))?;
        let response = handle_consumer_event(&event.payload, processor)
            .await
            .map_err(|error| Error::from(error.to_string()))?;
        serde_json::to_value(response)
            .map_err(|error| Error::from(format!("failed to serialize consumer response: {error}")))
    } else {
        let response = handle_producer_event(event.payload, &deps.connector).await;
        serde_json::to_value(response)
            .map_err(|error| Error::from(format!("failed to serialize producer response: {error}")))
    }
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    init_logging();

    let deps = RuntimeDependencies::load(RuntimeSettings::from_env()).await;
    let deps = &deps;
    lambda_runtime::run(service_fn(move |event| async move {
        handle_request(event, deps).await
    }))
    .await
}
