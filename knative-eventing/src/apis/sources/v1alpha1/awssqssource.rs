use super::{AwsCredentials, EventSourceStatus};
use knative::SourceSpec;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// AwsSqsSource receives messages from an Amazon SQS queue and sends them to a sink as
/// CloudEvents.
#[derive(CustomResource, Serialize, Deserialize, Debug, Clone, JsonSchema, PartialEq)]
#[kube(
    kind = "AwsSqsSource",
    group = "sources.knative.dev",
    version = "v1alpha1",
    status = "EventSourceStatus",
    derive = "PartialEq",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct AwsSqsSourceSpec {
    /// ARN of the queue to consume messages from.
    pub arn: String,
    /// Credentials to interact with the Amazon SQS API.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credentials: Option<AwsCredentials>,
    /// Sink and CloudEventOverrides
    #[serde(flatten)]
    pub source_spec: SourceSpec,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn deserializes_with_flattened_sink() {
        let source: AwsSqsSource = serde_json::from_value(serde_json::json!({
            "apiVersion": "sources.knative.dev/v1alpha1",
            "kind": "AwsSqsSource",
            "metadata": { "name": "queue", "namespace": "default" },
            "spec": {
                "arn": "arn:aws:sqs:us-west-2:123456789012:queue",
                "sink": {
                    "ref": { "apiVersion": "eventing.knative.dev/v1", "kind": "Broker", "name": "default" }
                }
            }
        })).unwrap();

        let sink = source.spec.source_spec.sink.as_ref().unwrap();
        assert_eq!(sink.reference().unwrap().kind, "Broker");
        assert!(source.spec.credentials.is_none());
        assert!(source.status.is_none());
    }
}
