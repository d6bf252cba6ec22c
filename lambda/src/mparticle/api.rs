//! mParticle Events API access.
//!
//! `EventsApi` is the upload seam. `HttpEventsApi` is the reqwest-backed implementation
//! and `ApiFactory` memoizes one instance per (key, secret, base URL).

use std::collections::HashMap;
use std::sync::{Arc, LazyLock, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::RETRY_AFTER;
use tracing::{debug, warn};
use url::Url;

use super::batch::Batch;
use crate::errors::ProcessError;

const EVENTS_PATH: &str = "events";

// One connection pool shared by every cached API instance.
static HTTP_CLIENT: LazyLock<Client> = LazyLock::new(|| {
    Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
        .unwrap_or_else(|e| {
            warn!("Failed to build configured HTTP client, using defaults: {}", e);
            Client::new()
        })
});

/// What came back from an upload, reduced to the parts the classifier needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub reason: String,
    pub retry_after: Option<String>,
}

impl ApiResponse {
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[async_trait]
pub trait EventsApi: Send + Sync {
    /// # Errors
    ///
    /// Returns `Transport` when no HTTP response was received.
    async fn upload_events(&self, batch: &Batch) -> Result<ApiResponse, ProcessError>;
}

pub struct HttpEventsApi {
    http: Client,
    endpoint: Url,
    api_key: String,
    api_secret: String,
}

impl HttpEventsApi {
    /// # Errors
    ///
    /// Returns `Rejected` when `base_url` is not an absolute URL.
    pub fn new(
        http: Client,
        api_key: &str,
        api_secret: &str,
        base_url: &str,
    ) -> Result<Self, ProcessError> {
        let endpoint = Url::parse(base_url)
            .and_then(|base| base.join(EVENTS_PATH))
            .map_err(|e| ProcessError::Rejected {
                status_code: 0,
                message: format!("Invalid mParticle API URL {base_url}: {e}"),
            })?;

        Ok(Self {
            http,
            endpoint,
            api_key: api_key.to_string(),
            api_secret: api_secret.to_string(),
        })
    }

    #[must_use]
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl EventsApi for HttpEventsApi {
    async fn upload_events(&self, batch: &Batch) -> Result<ApiResponse, ProcessError> {
        let resp = self
            .http
            .post(self.endpoint.clone())
            .basic_auth(&self.api_key, Some(&self.api_secret))
            .json(batch)
            .send()
            .await?;

        let status = resp.status();
        let retry_after = resp
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        if !status.is_success() {
            let body_text = resp
                .text()
                .await
                .unwrap_or_else(|_| "<failed to read body>".to_string());
            debug!("mParticle responded {} with body: {}", status, body_text);
        }

        Ok(ApiResponse {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or_default().to_string(),
            retry_after,
        })
    }
}

type ApiConstructor =
    dyn Fn(&str, &str, &str) -> Result<Arc<dyn EventsApi>, ProcessError> + Send + Sync;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ApiDetails {
    api_key: String,
    api_secret: String,
    api_url: String,
}

/// Memoizing constructor for `EventsApi` instances.
///
/// Construction happens under the cache lock, so only one instance is built at a
/// time. Failed constructions are not cached and will be attempted again.
pub struct ApiFactory {
    cache: Mutex<HashMap<ApiDetails, Arc<dyn EventsApi>>>,
    constructor: Box<ApiConstructor>,
}

impl Default for ApiFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl ApiFactory {
    #[must_use]
    pub fn new() -> Self {
        Self::with_constructor(|key, secret, url| {
            let api = HttpEventsApi::new(HTTP_CLIENT.clone(), key, secret, url)?;
            Ok(Arc::new(api) as Arc<dyn EventsApi>)
        })
    }

    pub fn with_constructor<F>(constructor: F) -> Self
    where
        F: Fn(&str, &str, &str) -> Result<Arc<dyn EventsApi>, ProcessError>
            + Send
            + Sync
            + 'static,
    {
        Self {
            cache: Mutex::new(HashMap::new()),
            constructor: Box::new(constructor),
        }
    }

    /// # Errors
    ///
    /// Propagates the constructor's error; nothing is cached in that case.
    pub fn create(
        &self,
        api_key: &str,
        api_secret: &str,
        api_url: &str,
    ) -> Result<Arc<dyn EventsApi>, ProcessError> {
        let details = ApiDetails {
            api_key: api_key.to_string(),
            api_secret: api_secret.to_string(),
            api_url: api_url.to_string(),
        };

        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(api) = cache.get(&details) {
            return Ok(Arc::clone(api));
        }

        let api = (self.constructor)(api_key, api_secret, api_url)?;
        cache.insert(details, Arc::clone(&api));
        Ok(api)
    }

    #[must_use]
    pub fn cached_len(&self) -> usize {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
