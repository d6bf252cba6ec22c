mod common;

use std::collections::HashMap;
use std::sync::Arc;

use common::{MISSING_KEY, MISSING_SECRET, MockSubmitter, VALID, sqs_message};
use mparticle_outgoing::core::message::{EventName, EventType, OutgoingMessage};
use mparticle_outgoing::errors::{Disposition, ProcessError};
use mparticle_outgoing::mparticle::batch::BatchEnvironment;
use mparticle_outgoing::worker::processor::{
    MAX_MPARTICLE_MESSAGE_LENGTH, MessageProcessor, RecordProcessor,
};

fn processor(disabled: bool) -> (MessageProcessor, Arc<MockSubmitter>) {
    let submitter = Arc::new(MockSubmitter::default());
    let processor =
        MessageProcessor::new(disabled, BatchEnvironment::Development, submitter.clone());
    (processor, submitter)
}

/// A valid message whose single event carries enough attributes to exceed the size limit.
fn too_long_body() -> String {
    let additional_data: HashMap<String, String> = (0..3_000)
        .map(|i| (format!("attribute_{i:05}"), "x".repeat(80)))
        .collect();
    serde_json::json!({
        "authenticationKey": "test_key",
        "authenticationSecret": "test_secret",
        "clientId": "3386",
        "profileEmail": "REDACTED@gmail.com",
        "events": [{
            "eventName": "EMAIL_SUBSCRIBE",
            "eventType": "OTHER",
            "additionalData": additional_data,
        }],
    })
    .to_string()
}

#[tokio::test]
async fn test_missing_authentication_key_is_rejected() {
    let (processor, submitter) = processor(false);

    let err = processor
        .process(&sqs_message("m1", MISSING_KEY, "rh1"))
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "Authentication key not provided.");
    assert_eq!(err.disposition(), Disposition::Drop);
    assert!(submitter.submitted().is_empty());
}

#[tokio::test]
async fn test_missing_authentication_secret_is_rejected() {
    let (processor, submitter) = processor(false);

    let err = processor
        .process(&sqs_message("m1", MISSING_SECRET, "rh1"))
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "Authentication secret not provided.");
    assert_eq!(err.disposition(), Disposition::Drop);
    assert!(submitter.submitted().is_empty());
}

#[tokio::test]
async fn test_valid_payload_is_submitted() {
    let (processor, submitter) = processor(false);

    processor
        .process(&sqs_message("m1", VALID, "rh1"))
        .await
        .unwrap();

    let submitted = submitter.submitted();
    assert_eq!(submitted.len(), 1);
    let message = &submitted[0];
    assert_eq!(message.authentication_key.as_deref(), Some("test_key"));
    assert_eq!(message.authentication_secret.as_deref(), Some("test_secret"));
    assert_eq!(message.events.len(), 2);
    assert_eq!(message.events[0].event_name, EventName::EmailSubscribe);
    assert_eq!(message.events[0].event_type, EventType::Other);
    assert_eq!(message.events[1].event_name, EventName::EmailUnsubscribe);
    assert_eq!(message.events[1].event_type, EventType::Other);
}

#[tokio::test]
async fn test_too_large_message_is_rejected_before_submit() {
    let (processor, submitter) = processor(false);

    let err = processor
        .process(&sqs_message("m1", &too_long_body(), "rh1"))
        .await
        .unwrap_err();

    match err {
        ProcessError::PayloadTooLarge { size, message } => {
            assert!(size > MAX_MPARTICLE_MESSAGE_LENGTH);
            assert_eq!(message.client_id.as_deref(), Some("3386"));
        }
        other => panic!("Unexpected error type: {other:?}"),
    }
    assert!(submitter.submitted().is_empty());
}

#[tokio::test]
async fn test_garbage_body_is_unparseable() {
    let (processor, submitter) = processor(false);

    let err = processor
        .process(&sqs_message("m1", "not json", "rh1"))
        .await
        .unwrap_err();

    assert!(matches!(err, ProcessError::UnparseablePayload(_)));
    assert!(err.to_string().starts_with("Could not deserialize message: not json"));
    assert!(submitter.submitted().is_empty());
}

#[tokio::test]
async fn test_disabled_processor_validates_but_does_not_submit() {
    let (processor, submitter) = processor(true);

    processor
        .process(&sqs_message("m1", VALID, "rh1"))
        .await
        .unwrap();
    let err = processor
        .process(&sqs_message("m2", MISSING_KEY, "rh2"))
        .await
        .unwrap_err();

    assert!(matches!(err, ProcessError::AuthenticationKeyNotProvided));
    assert!(submitter.submitted().is_empty());
}

#[tokio::test]
async fn test_submit_errors_propagate() {
    let submitter = Arc::new(MockSubmitter::failing(503));
    let processor = MessageProcessor::new(false, BatchEnvironment::Production, submitter.clone());

    let err = processor
        .process(&sqs_message("m1", VALID, "rh1"))
        .await
        .unwrap_err();

    assert_eq!(err.status_code(), 503);
    assert_eq!(err.disposition(), Disposition::RetryLater);
    assert_eq!(submitter.submitted().len(), 1);
}

#[test]
fn test_parse_and_validate_returns_message() {
    let (processor, _) = processor(false);
    let message: OutgoingMessage = processor.parse_and_validate(VALID).unwrap();
    assert_eq!(message.api_url.as_deref(), Some("https://test_url.com"));
}
