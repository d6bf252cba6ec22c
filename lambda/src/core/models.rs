use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Attribute SQS uses for the delivery attempt count.
pub const APPROXIMATE_RECEIVE_COUNT: &str = "ApproximateReceiveCount";

/// The SQS event delivered by an event source mapping.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SqsEvent {
    #[serde(rename = "Records", default)]
    pub records: Vec<SqsMessage>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SqsMessage {
    #[serde(default)]
    pub message_id: String,
    #[serde(default)]
    pub receipt_handle: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub attributes: HashMap<String, String>,
}

impl SqsMessage {
    /// Delivery attempt count; 1 when SQS did not send a usable value.
    #[must_use]
    pub fn approximate_receive_count(&self) -> u32 {
        self.attributes
            .get(APPROXIMATE_RECEIVE_COUNT)
            .and_then(|value| value.parse().ok())
            .unwrap_or(1)
    }
}

/// Partial batch response; records listed here stay on the queue.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SqsBatchResponse {
    pub batch_item_failures: Vec<BatchItemFailure>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchItemFailure {
    pub item_identifier: String,
}

/// A record that should come back later, with what is needed to delay it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedRequest {
    pub message_id: String,
    pub status_code: u16,
    pub retry_after: u64,
    pub receipt_handle: String,
    pub receive_count: u32,
}
