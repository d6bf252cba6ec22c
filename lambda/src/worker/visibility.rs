use async_trait::async_trait;
use rand::Rng;
use tracing::debug;

use crate::core::models::FailedRequest;
use crate::errors::VisibilityError;

/// Longest visibility timeout SQS accepts, in seconds (12 hours).
pub const MAX_VISIBILITY_TIMEOUT: i32 = 43_200;

#[async_trait]
pub trait VisibilityClient: Send + Sync {
    /// # Errors
    ///
    /// Returns an error if the SQS call fails.
    async fn change_visibility(
        &self,
        queue_url: &str,
        receipt_handle: &str,
        visibility_timeout: i32,
    ) -> Result<(), VisibilityError>;
}

#[async_trait]
impl VisibilityClient for aws_sdk_sqs::Client {
    async fn change_visibility(
        &self,
        queue_url: &str,
        receipt_handle: &str,
        visibility_timeout: i32,
    ) -> Result<(), VisibilityError> {
        self.change_message_visibility()
            .queue_url(queue_url)
            .receipt_handle(receipt_handle)
            .visibility_timeout(visibility_timeout)
            .send()
            .await?;
        Ok(())
    }
}

/// Jittered exponential back-off: a value in `[base * factor^(n-1), base * factor^n)`.
///
/// Saturates at [`MAX_VISIBILITY_TIMEOUT`] once the range reaches past it.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn calculate_visibility_timeout(
    base_timeout: u32,
    timeout_factor: u32,
    receive_count: u32,
) -> u64 {
    let max_timeout = u64::from(MAX_VISIBILITY_TIMEOUT.unsigned_abs());
    if base_timeout == 0 {
        return 0;
    }

    let exponent = i32::try_from(receive_count).unwrap_or(i32::MAX);
    let base = f64::from(base_timeout);
    let factor = f64::from(timeout_factor);
    let lower_bound = base * factor.powi(exponent.saturating_sub(1));
    let higher_bound = base * factor.powi(exponent);

    // an infinite range cannot be sampled
    if !higher_bound.is_finite() || lower_bound >= max_timeout as f64 {
        return max_timeout;
    }

    let span = higher_bound - lower_bound;
    let jitter = if span > 0.0 {
        rand::thread_rng().gen_range(0.0..span)
    } else {
        0.0
    };

    (jitter as u64)
        .saturating_add(lower_bound as u64)
        .min(max_timeout)
}

/// The server's `Retry-After` wins; otherwise back off on the receive count.
#[must_use]
pub fn effective_timeout(request: &FailedRequest, base_timeout: u32, timeout_factor: u32) -> i32 {
    let seconds = if request.retry_after > 0 {
        request.retry_after
    } else {
        calculate_visibility_timeout(base_timeout, timeout_factor, request.receive_count)
    };
    i32::try_from(seconds)
        .unwrap_or(i32::MAX)
        .min(MAX_VISIBILITY_TIMEOUT)
}

/// Push out the visibility of every failed record. Failures are logged, never raised.
pub async fn change_visibility_for_failed_requests(
    client: &dyn VisibilityClient,
    queue_url: &str,
    failed_requests: &[FailedRequest],
    base_timeout: u32,
    timeout_factor: u32,
) {
    for request in failed_requests {
        let visibility_timeout = effective_timeout(request, base_timeout, timeout_factor);
        if let Err(e) = client
            .change_visibility(queue_url, &request.receipt_handle, visibility_timeout)
            .await
        {
            debug!(
                "Change visibility timeout error for message {}: {}",
                request.message_id, e
            );
        }
    }
}
