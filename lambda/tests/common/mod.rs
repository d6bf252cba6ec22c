//! Hand-written trait doubles shared by the integration tests.
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use mparticle_outgoing::core::message::OutgoingMessage;
use mparticle_outgoing::core::models::{SqsEvent, SqsMessage};
use mparticle_outgoing::errors::{ProcessError, VisibilityError};
use mparticle_outgoing::metrics::MetricsSink;
use mparticle_outgoing::mparticle::batch::Batch;
use mparticle_outgoing::mparticle::{ApiResponse, EventSubmitter, EventsApi};
use mparticle_outgoing::worker::processor::RecordProcessor;
use mparticle_outgoing::worker::visibility::VisibilityClient;

pub const VALID: &str = include_str!("../fixtures/messages/valid.json");
pub const VALID_WITHOUT_URL: &str = include_str!("../fixtures/messages/validWithoutURL.json");
pub const VALID_WITHOUT_URL2: &str = include_str!("../fixtures/messages/validWithoutURL2.json");
pub const MISSING_KEY: &str = include_str!("../fixtures/messages/invalid1.json");
pub const MISSING_SECRET: &str = include_str!("../fixtures/messages/invalid2.json");

pub fn load_message(json: &str) -> OutgoingMessage {
    serde_json::from_str(json).expect("fixture should deserialize")
}

pub fn sqs_message(message_id: &str, body: &str, receipt_handle: &str) -> SqsMessage {
    SqsMessage {
        message_id: message_id.to_string(),
        receipt_handle: receipt_handle.to_string(),
        body: body.to_string(),
        ..SqsMessage::default()
    }
}

pub fn sqs_event(records: Vec<SqsMessage>) -> SqsEvent {
    SqsEvent { records }
}

/// `size` records with random ids and a minimal valid-looking body.
pub fn generated_event(size: usize) -> SqsEvent {
    let records = (0..size)
        .map(|index| {
            sqs_message(
                &uuid::Uuid::new_v4().to_string(),
                &format!(
                    "{{\"authenticationKey\":\"1\",\"authenticationSecret\":\"2\",\"message\":\"test message{index}\"}}"
                ),
                &format!("test-receipt-handle{index}"),
            )
        })
        .collect();
    sqs_event(records)
}

type Outcome = dyn Fn(&SqsMessage) -> Result<(), ProcessError> + Send + Sync;

pub struct MockProcessor {
    outcome: Box<Outcome>,
    calls: AtomicUsize,
}

impl MockProcessor {
    pub fn succeeding() -> Self {
        Self::with(|_| Ok(()))
    }

    pub fn with<F>(outcome: F) -> Self
    where
        F: Fn(&SqsMessage) -> Result<(), ProcessError> + Send + Sync + 'static,
    {
        Self {
            outcome: Box::new(outcome),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RecordProcessor for MockProcessor {
    async fn process(&self, record: &SqsMessage) -> Result<(), ProcessError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        (self.outcome)(record)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisibilityCall {
    pub queue_url: String,
    pub receipt_handle: String,
    pub visibility_timeout: i32,
}

#[derive(Default)]
pub struct MockVisibility {
    calls: Mutex<Vec<VisibilityCall>>,
    fail: bool,
}

impl MockVisibility {
    pub fn failing() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn calls(&self) -> Vec<VisibilityCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl VisibilityClient for MockVisibility {
    async fn change_visibility(
        &self,
        queue_url: &str,
        receipt_handle: &str,
        visibility_timeout: i32,
    ) -> Result<(), VisibilityError> {
        self.calls.lock().unwrap().push(VisibilityCall {
            queue_url: queue_url.to_string(),
            receipt_handle: receipt_handle.to_string(),
            visibility_timeout,
        });
        if self.fail {
            return Err(VisibilityError("ReceiptHandleIsInvalid".to_string()));
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct MockSubmitter {
    submitted: Mutex<Vec<OutgoingMessage>>,
    fail_with_status: Option<u16>,
}

impl MockSubmitter {
    pub fn failing(status_code: u16) -> Self {
        Self {
            submitted: Mutex::new(Vec::new()),
            fail_with_status: Some(status_code),
        }
    }

    pub fn submitted(&self) -> Vec<OutgoingMessage> {
        self.submitted.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventSubmitter for MockSubmitter {
    async fn submit(&self, message: &OutgoingMessage) -> Result<(), ProcessError> {
        self.submitted.lock().unwrap().push(message.clone());
        match self.fail_with_status {
            Some(status_code) => Err(ProcessError::RetryLater {
                status_code,
                message: "scripted failure".to_string(),
                retry_after: 0,
            }),
            None => Ok(()),
        }
    }
}

pub enum ApiBehaviour {
    Respond(ApiResponse),
    TransportError,
}

pub struct MockEventsApi {
    behaviour: ApiBehaviour,
    uploads: Mutex<Vec<Batch>>,
}

impl MockEventsApi {
    pub fn responding(status: u16) -> Arc<Self> {
        Self::responding_with(status, None)
    }

    pub fn responding_with(status: u16, retry_after: Option<&str>) -> Arc<Self> {
        Arc::new(Self {
            behaviour: ApiBehaviour::Respond(ApiResponse {
                status,
                reason: "scripted".to_string(),
                retry_after: retry_after.map(str::to_string),
            }),
            uploads: Mutex::new(Vec::new()),
        })
    }

    pub fn broken() -> Arc<Self> {
        Arc::new(Self {
            behaviour: ApiBehaviour::TransportError,
            uploads: Mutex::new(Vec::new()),
        })
    }

    pub fn uploads(&self) -> Vec<Batch> {
        self.uploads.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventsApi for MockEventsApi {
    async fn upload_events(&self, batch: &Batch) -> Result<ApiResponse, ProcessError> {
        self.uploads.lock().unwrap().push(batch.clone());
        match &self.behaviour {
            ApiBehaviour::Respond(response) => Ok(response.clone()),
            ApiBehaviour::TransportError => {
                Err(ProcessError::Transport("connection reset".to_string()))
            }
        }
    }
}

#[derive(Default)]
pub struct CapturingSink {
    documents: Mutex<Vec<String>>,
}

impl CapturingSink {
    pub fn documents(&self) -> Vec<serde_json::Value> {
        self.documents
            .lock()
            .unwrap()
            .iter()
            .map(|d| serde_json::from_str(d).expect("metrics document should be JSON"))
            .collect()
    }
}

impl MetricsSink for CapturingSink {
    fn accept(&self, document: String) {
        self.documents.lock().unwrap().push(document);
    }
}
