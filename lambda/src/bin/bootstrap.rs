// Lambda bootstrap entry point for the mParticle outgoing worker

use std::sync::Arc;

use aws_config::Region;
use aws_config::meta::region::RegionProviderChain;
use lambda_runtime::{Error, LambdaEvent, run, service_fn};
use mparticle_outgoing::core::config::AppConfig;
use mparticle_outgoing::core::models::SqsEvent;
use mparticle_outgoing::worker::{SqsLambdaHandler, function_handler};
use tracing::{error, info};

const DEFAULT_REGION: &str = "us-east-1";

#[tokio::main]
async fn main() -> Result<(), Error> {
    mparticle_outgoing::setup_logging();

    let config = AppConfig::from_env().map_err(|e| {
        error!("Config error: {}", e);
        Error::from(e)
    })?;

    let region = RegionProviderChain::default_provider().or_else(Region::new(DEFAULT_REGION));
    let shared_config = aws_config::from_env().region(region).load().await;
    let sqs_client = aws_sdk_sqs::Client::new(&shared_config);

    info!(
        "Starting mParticle outgoing worker (queue={}, environment={}, disabled={})",
        config.queue_url, config.environment, config.mparticle_disabled
    );

    let handler = SqsLambdaHandler::from_config(config, Arc::new(sqs_client));
    let handler = &handler;
    run(service_fn(move |event: LambdaEvent<SqsEvent>| async move {
        function_handler(handler, event).await
    }))
    .await
}
