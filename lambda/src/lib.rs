/// mParticle outgoing Lambda - forwards queued profile events to mParticle.
///
/// An SQS event source mapping invokes this function with batches of outgoing
/// messages. Each message carries the mParticle credentials of the workspace it
/// belongs to, a profile (email and/or mpid) and one or more custom events.
///
/// # Architecture
///
/// The system uses:
/// - AWS Lambda for serverless execution, with SQS partial batch responses
/// - `serde_json` to decode queue messages into `OutgoingMessage`s
/// - reqwest to upload mParticle S2S v2 batches
/// - SQS `ChangeMessageVisibility` for exponential back-off of retryable failures
/// - CloudWatch Embedded Metric Format for the oversized-message metric
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use mparticle_outgoing::core::config::AppConfig;
/// use mparticle_outgoing::core::models::SqsEvent;
/// use mparticle_outgoing::worker::SqsLambdaHandler;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     mparticle_outgoing::setup_logging();
///
///     let config = AppConfig::from_env()?;
///     let shared_config = aws_config::from_env().load().await;
///     let sqs = aws_sdk_sqs::Client::new(&shared_config);
///     let handler = SqsLambdaHandler::from_config(config, Arc::new(sqs));
///
///     let response = handler.handle(SqsEvent::default(), None).await;
///     assert!(response.batch_item_failures.is_empty());
///     Ok(())
/// }
/// ```
// Module declarations
pub mod core;
pub mod errors;
pub mod metrics;
pub mod mparticle;
pub mod worker;

/// Configure structured logging with JSON format for AWS Lambda environments.
///
/// The level filter is read from `LOG_LEVEL` (for example `debug` or
/// `mparticle_outgoing=trace`) and defaults to `info`. Calling this more than
/// once is harmless.
///
/// # Example
///
/// ```
/// mparticle_outgoing::setup_logging();
/// ```
pub fn setup_logging() {
    use tracing_subscriber::EnvFilter;
    use tracing_subscriber::prelude::*;

    let filter = EnvFilter::try_from_env("LOG_LEVEL").unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = tracing_subscriber::fmt::layer().json().with_target(true);

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}
