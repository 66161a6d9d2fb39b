use super::{AwsCredentials, EventSourceStatus};
use knative::SourceSpec;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// AwsSnsSource subscribes to an Amazon SNS topic and forwards the notifications it receives
/// over HTTP to a sink as CloudEvents. The Source is addressable: its status carries the URL
/// of the endpoint subscribed to the topic.
#[derive(CustomResource, Serialize, Deserialize, Debug, Clone, JsonSchema, PartialEq)]
#[kube(
    kind = "AwsSnsSource",
    group = "sources.knative.dev",
    version = "v1alpha1",
    status = "EventSourceStatus",
    derive = "PartialEq",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct AwsSnsSourceSpec {
    /// ARN of the topic to subscribe to.
    pub arn: String,
    /// Credentials to interact with the Amazon SNS API.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credentials: Option<AwsCredentials>,
    /// Sink and CloudEventOverrides
    #[serde(flatten)]
    pub source_spec: SourceSpec,
}
