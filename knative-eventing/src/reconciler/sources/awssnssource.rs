use crate::apis::sources::v1alpha1::{AwsSnsSource, EventSourceStatus};
use crate::reconciler::adapter::AdapterSpec;
use crate::reconciler::source::{AdapterBuilder, EventSource};
use knative::{CloudEventAttributes, CloudEventOverrides, Destination};
use url::Url;

pub const SNS_NOTIFICATION_EVENT_TYPE: &str = "com.amazon.sns.notification";

const HTTP_PORT: i32 = 8080;
const HEALTH_PATH: &str = "/health";

impl EventSource for AwsSnsSource {
    const COMPONENT: &'static str = "awssnssource";

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

/// Runs the HTTP endpoint subscribed to the topic, scaled on demand.
#[derive(Clone, Debug)]
pub struct AwsSnsAdapterBuilder {
    image: String,
}

impl AwsSnsAdapterBuilder {
    pub fn new(image: impl Into<String>) -> Self {
        AwsSnsAdapterBuilder { image: image.into() }
    }
}

impl AdapterBuilder<AwsSnsSource> for AwsSnsAdapterBuilder {
    fn build(&self, source: &AwsSnsSource, _sink: &Url) -> AdapterSpec {
        let credentials = source.spec.credentials.iter().flat_map(|c| c.env_vars());
        AdapterSpec::request_driven(&self.image)
            .with_env("ARN", &source.spec.arn)
            .with_env_vars(credentials)
            .with_port("http1", HTTP_PORT)
            .with_probe_path(HEALTH_PATH)
    }

    fn event_types(&self, source: &AwsSnsSource) -> Vec<CloudEventAttributes> {
        vec![CloudEventAttributes::new(SNS_NOTIFICATION_EVENT_TYPE, &source.spec.arn)]
    }
}
