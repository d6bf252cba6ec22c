use thiserror::Error;

use crate::core::message::OutgoingMessage;

/// How the SQS handler treats a record whose processing failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Let SQS delete the record; retrying cannot help.
    Drop,
    /// Report the record as failed but leave its visibility timeout alone.
    RetryImmediately,
    /// Report the record as failed and push its visibility timeout out.
    RetryLater,
}

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("Authentication key not provided.")]
    AuthenticationKeyNotProvided,

    #[error("Authentication secret not provided.")]
    AuthenticationSecretNotProvided,

    #[error("{0}")]
    UnparseablePayload(String),

    #[error("Payload is too large ({size} bytes)")]
    PayloadTooLarge {
        size: usize,
        message: Box<OutgoingMessage>,
    },

    #[error("Request rejected by mParticle: [{status_code}] {message}")]
    Rejected { status_code: u16, message: String },

    #[error("Request to mParticle should be retried: [{status_code}] {message}")]
    RetryLater {
        status_code: u16,
        message: String,
        /// Seconds requested by the server, 0 when it did not say.
        retry_after: u64,
    },

    #[error("Failed to send HTTP request: {0}")]
    Transport(String),
}

impl ProcessError {
    #[must_use]
    pub fn disposition(&self) -> Disposition {
        match self {
            Self::AuthenticationKeyNotProvided
            | Self::AuthenticationSecretNotProvided
            | Self::UnparseablePayload(_)
            | Self::Rejected { .. } => Disposition::Drop,
            Self::PayloadTooLarge { .. } => Disposition::RetryImmediately,
            Self::RetryLater { .. } | Self::Transport(_) => Disposition::RetryLater,
        }
    }

    /// HTTP status behind the failure, 0 when none was received.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Rejected { status_code, .. } | Self::RetryLater { status_code, .. } => {
                *status_code
            }
            _ => 0,
        }
    }

    #[must_use]
    pub fn retry_after(&self) -> u64 {
        match self {
            Self::RetryLater { retry_after, .. } => *retry_after,
            _ => 0,
        }
    }
}

impl From<reqwest::Error> for ProcessError {
    fn from(error: reqwest::Error) -> Self {
        ProcessError::Transport(error.to_string())
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("QUEUE URL is not set")]
    MissingQueueUrl,

    #[error("Invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },
}

#[derive(Debug, Error)]
#[error("Failed to change message visibility: {0}")]
pub struct VisibilityError(pub String);

// Generic implementation for AWS SDK errors
impl<E, R> From<aws_sdk_sqs::error::SdkError<E, R>> for VisibilityError
where
    E: std::error::Error + 'static,
    R: std::fmt::Debug,
{
    fn from(error: aws_sdk_sqs::error::SdkError<E, R>) -> Self {
        VisibilityError(aws_sdk_sqs::error::DisplayErrorContext(&error).to_string())
    }
}
