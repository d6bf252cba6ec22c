//! SQS-triggered worker: per-record processing, failure reporting and visibility back-off

pub mod handler;
pub mod processor;
pub mod visibility;

// Re-export the main handler for convenience
pub use handler::{SqsLambdaHandler, function_handler};
