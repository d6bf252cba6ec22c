use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use super::api::{ApiFactory, ApiResponse, EventsApi};
use super::batch::{Batch, BatchEnvironment};
use crate::core::message::OutgoingMessage;
use crate::errors::ProcessError;

pub const DEFAULT_BASE_URL: &str = "https://inbound.mparticle.com/s2s/v2/";
pub const TOO_MANY_REQUESTS: u16 = 429;

/// Anything that can forward an outgoing message to mParticle.
#[async_trait]
pub trait EventSubmitter: Send + Sync {
    /// # Errors
    ///
    /// Returns a `ProcessError` whose disposition tells the caller whether to retry.
    async fn submit(&self, message: &OutgoingMessage) -> Result<(), ProcessError>;
}

pub struct MParticleClient {
    api_factory: Arc<ApiFactory>,
    environment: BatchEnvironment,
}

impl MParticleClient {
    #[must_use]
    pub fn new(api_factory: Arc<ApiFactory>, environment: BatchEnvironment) -> Self {
        Self {
            api_factory,
            environment,
        }
    }

    fn events_api(&self, message: &OutgoingMessage) -> Result<Arc<dyn EventsApi>, ProcessError> {
        let api_key = message.authentication_key.as_deref().unwrap_or_default();
        let api_secret = message.authentication_secret.as_deref().unwrap_or_default();
        let api_url = message
            .api_url
            .as_deref()
            .filter(|url| !url.is_empty())
            .unwrap_or(DEFAULT_BASE_URL);

        self.api_factory
            .create(api_key, api_secret, &normalize_url(api_url))
    }
}

#[async_trait]
impl EventSubmitter for MParticleClient {
    async fn submit(&self, message: &OutgoingMessage) -> Result<(), ProcessError> {
        let now = Utc::now();
        let batch = message.to_batch(self.environment)?;
        let events_api = self.events_api(message)?;

        log_received_and_translated_message(message, &batch);

        let response = events_api.upload_events(&batch).await?;
        info!("Received response code: {}", response.status);

        classify_response(&response, now)?;

        debug!("Successfully sent message: {:?}", message.client_id);
        Ok(())
    }
}

/// Map a non-2xx response onto the retry taxonomy.
///
/// # Errors
///
/// 429 and other 4xx/5xx become `RetryLater`; anything else unsuccessful is `Rejected`.
pub fn classify_response(response: &ApiResponse, now: DateTime<Utc>) -> Result<(), ProcessError> {
    if response.is_success() {
        return Ok(());
    }

    let status_code = response.status;
    if status_code == TOO_MANY_REQUESTS {
        return Err(ProcessError::RetryLater {
            status_code,
            message: response.reason.clone(),
            retry_after: parse_retry_after(response.retry_after.as_deref(), now),
        });
    }
    if (400..600).contains(&status_code) {
        return Err(ProcessError::RetryLater {
            status_code,
            message: response.reason.clone(),
            retry_after: 0,
        });
    }
    Err(ProcessError::Rejected {
        status_code,
        message: response.reason.clone(),
    })
}

/// Seconds to wait according to a `Retry-After` value; 0 means "use the back-off".
#[must_use]
pub fn parse_retry_after(header: Option<&str>, now: DateTime<Utc>) -> u64 {
    let Some(value) = header else {
        info!("Retry-after header missing from response. Will use default.");
        return 0;
    };

    let value = value.trim();
    if let Ok(seconds) = value.parse::<u64>() {
        return seconds;
    }

    if let Ok(instant) = DateTime::parse_from_rfc2822(value) {
        let instant = instant.with_timezone(&Utc);
        if now < instant {
            return u64::try_from((instant - now).num_seconds()).unwrap_or(0);
        }
        return 1;
    }

    warn!(
        "Unable to parse retry after header: {}, will use default",
        value
    );
    0
}

/// Make sure the URL path ends with `/` so relative endpoints resolve under it.
#[must_use]
pub fn normalize_url(url: &str) -> String {
    match url.find('?') {
        Some(query_index) if query_index > 0 => {
            if url[..query_index].ends_with('/') {
                url.to_string()
            } else {
                format!("{}/{}", &url[..query_index], &url[query_index..])
            }
        }
        _ if !url.ends_with('/') => format!("{url}/"),
        _ => url.to_string(),
    }
}

fn log_received_and_translated_message(message: &OutgoingMessage, batch: &Batch) {
    if !tracing::enabled!(tracing::Level::DEBUG) {
        return;
    }

    let redacted = OutgoingMessage {
        authentication_secret: message
            .authentication_secret
            .as_ref()
            .map(|_| "********".to_string()),
        ..message.clone()
    };
    let batch_json =
        serde_json::to_string(batch).unwrap_or_else(|_| "(unserializable)".to_string());
    let message_json =
        serde_json::to_string(&redacted).unwrap_or_else(|_| "(unserializable)".to_string());

    debug!(
        "Attempting to send batch: {} for message: {}",
        batch_json, message_json
    );
}
