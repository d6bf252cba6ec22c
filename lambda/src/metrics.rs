//! CloudWatch Embedded Metric Format (EMF) emitter.
//!
//! Each `mark` writes one self-describing JSON document to the sink. In Lambda the
//! sink is stdout, where CloudWatch Logs picks the document up and extracts the metric.

use std::env;
use std::sync::Arc;

use chrono::Utc;
use serde_json::{Map, Value, json};

pub const MESSAGE_TOO_LARGE: &str = "MessageTooLarge";
pub const SERVICE: &str = "mparticle-outgoing-lambda";
pub const NAMESPACE: &str = "aws-embedded-metrics";

const LAMBDA_SERVICE_TYPE: &str = "AWS::Lambda::Function";

pub trait MetricsSink: Send + Sync {
    fn accept(&self, document: String);
}

/// Writes documents to stdout, one per line.
pub struct StdoutSink;

impl MetricsSink for StdoutSink {
    fn accept(&self, document: String) {
        println!("{document}");
    }
}

/// Default dimension values describing where the metrics come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsEnvironment {
    pub log_group: String,
    pub service_name: String,
    pub service_type: String,
}

impl MetricsEnvironment {
    #[must_use]
    pub fn lambda() -> Self {
        let function_name = env::var("AWS_LAMBDA_FUNCTION_NAME").unwrap_or_default();
        Self {
            log_group: env::var("AWS_LAMBDA_LOG_GROUP_NAME")
                .unwrap_or_else(|_| function_name.clone()),
            service_name: function_name,
            service_type: LAMBDA_SERVICE_TYPE.to_string(),
        }
    }
}

#[derive(Clone)]
pub struct Metrics {
    environment: MetricsEnvironment,
    sink: Arc<dyn MetricsSink>,
}

impl Metrics {
    #[must_use]
    pub fn new(environment: MetricsEnvironment, sink: Arc<dyn MetricsSink>) -> Self {
        Self { environment, sink }
    }

    #[must_use]
    pub fn lambda() -> Self {
        Self::new(MetricsEnvironment::lambda(), Arc::new(StdoutSink))
    }

    /// Emit a single `Count` metric, tagged with the record and invocation ids.
    pub fn mark(&self, request_id: Option<&str>, message_id: Option<&str>, name: &str, count: u64) {
        let mut document = Map::new();
        document.insert(
            "_aws".to_string(),
            json!({
                "Timestamp": Utc::now().timestamp_millis(),
                "CloudWatchMetrics": [{
                    "Namespace": NAMESPACE,
                    "Dimensions": [["LogGroup", "ServiceName", "ServiceType", "Service"]],
                    "Metrics": [{"Name": name, "Unit": "Count"}],
                }],
            }),
        );
        document.insert("LogGroup".to_string(), json!(self.environment.log_group));
        document.insert("ServiceName".to_string(), json!(self.environment.service_name));
        document.insert("ServiceType".to_string(), json!(self.environment.service_type));
        document.insert("Service".to_string(), json!(SERVICE));
        if let Some(message_id) = message_id {
            document.insert("MessageId".to_string(), json!(message_id));
        }
        if let Some(request_id) = request_id {
            document.insert("function_request_id".to_string(), json!(request_id));
        }
        document.insert(name.to_string(), json!(count));

        self.sink.accept(Value::Object(document).to_string());
    }
}
