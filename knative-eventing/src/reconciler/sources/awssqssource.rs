use crate::apis::sources::v1alpha1::{AwsSqsSource, EventSourceStatus};
use crate::reconciler::adapter::AdapterSpec;
use crate::reconciler::source::{AdapterBuilder, EventSource};
use k8s_openapi::api::core::v1::ResourceRequirements;
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use knative::{CloudEventAttributes, CloudEventOverrides, Destination};
use std::collections::BTreeMap;
use url::Url;

pub const SQS_MESSAGE_EVENT_TYPE: &str = "com.amazon.sqs.message";

impl EventSource for AwsSqsSource {
    const COMPONENT: &'static str = "awssqssource";

    fn sink(&self) -> Option<&Destination> {
        self.spec.source_spec.sink.as_ref()
    }

    fn ce_overrides(&self) -> Option<&CloudEventOverrides> {
        self.spec.source_spec.ce_overrides.as_ref()
    }

    fn source_status(&self) -> Option<&EventSourceStatus> {
        self.status.as_ref()
    }

    fn source_status_mut(&mut self) -> &mut Option<EventSourceStatus> {
        &mut self.status
    }
}

/// Runs one replica of the queue consumer.
#[derive(Clone, Debug)]
pub struct AwsSqsAdapterBuilder {
    image: String,
}

impl AwsSqsAdapterBuilder {
    pub fn new(image: impl Into<String>) -> Self {
        AwsSqsAdapterBuilder { image: image.into() }
    }
}

fn resources() -> ResourceRequirements {
    ResourceRequirements {
        requests: Some(BTreeMap::from([
            ("cpu".to_string(), Quantity("50m".to_string())),
            ("memory".to_string(), Quantity("20Mi".to_string())),
        ])),
        limits: Some(BTreeMap::from([
            ("cpu".to_string(), Quantity("250m".to_string())),
            ("memory".to_string(), Quantity("64Mi".to_string())),
        ])),
    }
}

impl AdapterBuilder<AwsSqsSource> for AwsSqsAdapterBuilder {
    fn build(&self, source: &AwsSqsSource, _sink: &Url) -> AdapterSpec {
        let credentials = source.spec.credentials.iter().flat_map(|c| c.env_vars());
        AdapterSpec::replica_managed(&self.image, 1)
            .with_env("ARN", &source.spec.arn)
            .with_env_vars(credentials)
            .with_resources(resources())
    }

    fn event_types(&self, source: &AwsSqsSource) -> Vec<CloudEventAttributes> {
        vec![CloudEventAttributes::new(SQS_MESSAGE_EVENT_TYPE, &source.spec.arn)]
    }

    fn needs_authorization(&self) -> bool {
        true
    }
}
