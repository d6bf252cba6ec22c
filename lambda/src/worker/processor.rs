use std::sync::Arc;

use async_trait::async_trait;
#[cfg(feature = "debug-logs")]
use tracing::info;
#[cfg(not(feature = "debug-logs"))]
use tracing::debug;

use crate::core::config::AppConfig;
use crate::core::message::OutgoingMessage;
use crate::core::models::SqsMessage;
use crate::errors::ProcessError;
use crate::mparticle::batch::BatchEnvironment;
use crate::mparticle::client::EventSubmitter;

/// mParticle refuses batches larger than this many bytes.
pub const MAX_MPARTICLE_MESSAGE_LENGTH: usize = 256 * 1024;

#[async_trait]
pub trait RecordProcessor: Send + Sync {
    /// # Errors
    ///
    /// Returns a `ProcessError` whose disposition decides what happens to the record.
    async fn process(&self, record: &SqsMessage) -> Result<(), ProcessError>;
}

/// Parses, validates and forwards one SQS record.
pub struct MessageProcessor {
    mparticle_disabled: bool,
    environment: BatchEnvironment,
    submitter: Arc<dyn EventSubmitter>,
}

impl MessageProcessor {
    #[must_use]
    pub fn new(
        mparticle_disabled: bool,
        environment: BatchEnvironment,
        submitter: Arc<dyn EventSubmitter>,
    ) -> Self {
        Self {
            mparticle_disabled,
            environment,
            submitter,
        }
    }

    #[must_use]
    pub fn from_config(config: &AppConfig, submitter: Arc<dyn EventSubmitter>) -> Self {
        Self::new(config.mparticle_disabled, config.environment, submitter)
    }

    /// # Errors
    ///
    /// Missing credentials and bad JSON are not retryable; an oversized batch is.
    pub fn parse_and_validate(&self, raw_message: &str) -> Result<OutgoingMessage, ProcessError> {
        let message: OutgoingMessage = serde_json::from_str(raw_message).map_err(|e| {
            ProcessError::UnparseablePayload(format!(
                "Could not deserialize message: {raw_message} ({e})"
            ))
        })?;

        if message
            .authentication_key
            .as_deref()
            .is_none_or(str::is_empty)
        {
            return Err(ProcessError::AuthenticationKeyNotProvided);
        }
        if message
            .authentication_secret
            .as_deref()
            .is_none_or(str::is_empty)
        {
            return Err(ProcessError::AuthenticationSecretNotProvided);
        }

        let batch = message.to_batch(self.environment)?;
        let outgoing_length = serde_json::to_vec(&batch)
            .map_err(|e| {
                ProcessError::UnparseablePayload(format!("Could not serialize batch: {e}"))
            })?
            .len();
        if outgoing_length > MAX_MPARTICLE_MESSAGE_LENGTH {
            return Err(ProcessError::PayloadTooLarge {
                size: outgoing_length,
                message: Box::new(message),
            });
        }

        Ok(message)
    }
}

#[async_trait]
impl RecordProcessor for MessageProcessor {
    async fn process(&self, record: &SqsMessage) -> Result<(), ProcessError> {
        #[cfg(feature = "debug-logs")]
        info!("Received message: {}", record.body);

        #[cfg(not(feature = "debug-logs"))]
        debug!("Received message: {}", record.body);

        let message = self.parse_and_validate(&record.body)?;

        if !self.mparticle_disabled {
            self.submitter.submit(&message).await?;
        }
        Ok(())
    }
}
