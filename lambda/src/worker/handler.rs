use std::sync::Arc;

use lambda_runtime::{Error, LambdaEvent};
use tracing::{error, info, warn};

use super::processor::{MessageProcessor, RecordProcessor};
use super::visibility::{VisibilityClient, change_visibility_for_failed_requests};
use crate::core::config::AppConfig;
use crate::core::models::{BatchItemFailure, FailedRequest, SqsBatchResponse, SqsEvent, SqsMessage};
use crate::errors::{Disposition, ProcessError};
use crate::metrics::{MESSAGE_TOO_LARGE, Metrics};
use crate::mparticle::{ApiFactory, MParticleClient};

/// Drives one SQS batch through the processor and reports partial failures.
pub struct SqsLambdaHandler {
    config: AppConfig,
    processor: Arc<dyn RecordProcessor>,
    visibility: Arc<dyn VisibilityClient>,
    metrics: Metrics,
}

impl SqsLambdaHandler {
    #[must_use]
    pub fn new(
        config: AppConfig,
        processor: Arc<dyn RecordProcessor>,
        visibility: Arc<dyn VisibilityClient>,
        metrics: Metrics,
    ) -> Self {
        Self {
            config,
            processor,
            visibility,
            metrics,
        }
    }

    /// Production wiring: real mParticle client, EMF metrics to stdout.
    #[must_use]
    pub fn from_config(config: AppConfig, visibility: Arc<dyn VisibilityClient>) -> Self {
        let client = MParticleClient::new(Arc::new(ApiFactory::new()), config.environment);
        let processor = MessageProcessor::from_config(&config, Arc::new(client));
        Self::new(config, Arc::new(processor), visibility, Metrics::lambda())
    }

    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub async fn handle(&self, event: SqsEvent, request_id: Option<&str>) -> SqsBatchResponse {
        let mut batch_item_failures = Vec::new();
        let mut change_visibility_list = Vec::new();

        for record in &event.records {
            let Err(e) = self.processor.process(record).await else {
                continue;
            };

            match e.disposition() {
                Disposition::Drop => {
                    error!(
                        "Non-retryable exception occurred processing message id {} because of: [{}] {}.",
                        record.message_id,
                        e.status_code(),
                        e
                    );
                }
                Disposition::RetryImmediately => {
                    self.report_too_large(record, &e, request_id);
                    // retried straight away, so no visibility change
                    batch_item_failures.push(failure_for(record));
                }
                Disposition::RetryLater => {
                    warn!(
                        "Retryable exception occurred processing message id {} because of exception: [{}] {}. Will retry.",
                        record.message_id,
                        e.status_code(),
                        e
                    );
                    change_visibility_list.push(FailedRequest {
                        message_id: record.message_id.clone(),
                        status_code: e.status_code(),
                        retry_after: e.retry_after(),
                        receipt_handle: record.receipt_handle.clone(),
                        receive_count: record.approximate_receive_count(),
                    });
                    batch_item_failures.push(failure_for(record));
                }
            }
        }

        change_visibility_for_failed_requests(
            self.visibility.as_ref(),
            &self.config.queue_url,
            &change_visibility_list,
            self.config.base_timeout,
            self.config.timeout_factor,
        )
        .await;

        SqsBatchResponse {
            batch_item_failures,
        }
    }

    fn report_too_large(&self, record: &SqsMessage, e: &ProcessError, request_id: Option<&str>) {
        // only log the first delivery; the metric below counts every one
        if record.approximate_receive_count() <= 1
            && let ProcessError::PayloadTooLarge { size, message } = e
        {
            error!(
                "Message {} is too large ({} bytes), will not send to mParticle. [{}] {}",
                record.message_id,
                size,
                message.client_id.as_deref().unwrap_or_default(),
                message.profile_label()
            );
        }
        self.metrics
            .mark(request_id, Some(&record.message_id), MESSAGE_TOO_LARGE, 1);
    }
}

fn failure_for(record: &SqsMessage) -> BatchItemFailure {
    BatchItemFailure {
        item_identifier: record.message_id.clone(),
    }
}

/// Lambda entry point; never fails the whole invocation for per-record errors.
pub async fn function_handler(
    handler: &SqsLambdaHandler,
    event: LambdaEvent<SqsEvent>,
) -> Result<SqsBatchResponse, Error> {
    let request_id = event.context.request_id.clone();
    info!(
        "Received SQS batch of {} records (request_id={})",
        event.payload.records.len(),
        request_id
    );

    let response = handler.handle(event.payload, Some(&request_id)).await;
    info!(
        "Batch finished with {} item failures (request_id={})",
        response.batch_item_failures.len(),
        request_id
    );
    Ok(response)
}
