use k8s_openapi::api::core::v1::PodSpec;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use knative::{derive::ConditionType, Addressable, Status};
use knative_conditions::Condition;
use enumset::EnumSetType;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use url::Url;

/// Service acts as a top-level container that manages a Route and Configuration which implement a
/// network service.
///
/// Only the fields needed to run a single-container workload are modeled.
#[derive(CustomResource, Serialize, Deserialize, Debug, Clone, Default, JsonSchema, PartialEq)]
#[kube(
    kind = "Service",
    group = "serving.knative.dev",
    version = "v1",
    status = "ServiceStatus",
    derive = "PartialEq",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct ServiceSpec {
    /// Template holds the latest specification for the Revision to be stamped out.
    pub template: RevisionTemplateSpec,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RevisionTemplateSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ObjectMeta>,
    pub spec: RevisionSpec,
}

/// RevisionSpec holds the desired state of the Revision (from the client).
#[derive(Serialize, Deserialize, Debug, Clone, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RevisionSpec {
    #[serde(flatten)]
    pub pod_spec: PodSpec,
    /// ContainerConcurrency specifies the maximum allowed in-flight (concurrent)
    /// requests per container of the Revision.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container_concurrency: Option<i64>,
    /// TimeoutSeconds is the maximum duration in seconds that the request routing
    /// layer will wait for a request delivered to a container to begin replying.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<i64>,
}

#[derive(ConditionType, EnumSetType, Deserialize, Serialize, Debug, JsonSchema)]
pub enum ServiceCondition {
    Ready,
    /// The latest Configuration is ready.
    #[dependent]
    ConfigurationsReady,
    /// The Route is ready.
    #[dependent]
    RoutesReady,
}

/// Communicates the observed state of the [`Service`] (from the controller).
#[derive(Serialize, Deserialize, Debug, Clone, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ServiceStatus {
    #[serde(flatten)]
    pub status: Status<ServiceCondition>,
    /// URL holds the url that will distribute traffic over the provided traffic targets.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<Url>,
    /// Address holds the information needed for a Route to be the target of an event.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<Addressable>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest_ready_revision_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest_created_revision_name: Option<String>,
}

impl ServiceStatus {
    pub fn ready_condition(&self) -> Option<&Condition<ServiceCondition>> {
        self.status.conditions.get(ServiceCondition::Ready)
    }

    pub fn is_ready(&self) -> bool {
        self.ready_condition().map(Condition::is_true).unwrap_or(false)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::fs;

    fn read_mock(filename: &str) -> Service {
        let path = format!("{}/../test/mock/{}", env!("CARGO_MANIFEST_DIR"), filename);
        let yaml = fs::read_to_string(path).expect("path to mock");
        serde_yaml::from_str(&yaml).unwrap()
    }

    #[test]
    fn ready_service_deserializes() {
        let ksvc = read_mock("ready_ksvc.yaml");
        let status = ksvc.status.expect("status is set");
        assert!(status.is_ready());
        assert_eq!(
            status.url.unwrap().as_str(),
            "https://awssnssource-topic.default.example.com/"
        );
        let container = &ksvc.spec.template.spec.pod_spec.containers[0];
        assert_eq!(container.image.as_deref(), Some("gcr.io/sources/awssnssource-adapter:v1"));
        assert_eq!(ksvc.spec.template.spec.container_concurrency, Some(0));
    }

    #[test]
    fn failed_service_reports_message() {
        let ksvc = read_mock("failed_ksvc.yaml");
        let status = ksvc.status.expect("status is set");
        assert!(!status.is_ready());
        let ready = status.ready_condition().unwrap();
        assert!(ready.is_false());
        assert_eq!(ready.reason.as_deref(), Some("RevisionFailed"));
        assert!(ready.message.as_deref().unwrap().contains("ImagePullBackOff"));
    }

    #[test]
    fn revision_spec_is_flat_on_the_wire() {
        let spec = RevisionSpec {
            pod_spec: PodSpec {
                service_account_name: Some("adapter".into()),
                ..Default::default()
            },
            container_concurrency: None,
            timeout_seconds: Some(30),
        };
        let value = serde_json::to_value(&spec).unwrap();
        assert_eq!(value["serviceAccountName"], "adapter");
        assert_eq!(value["timeoutSeconds"], 30);
        assert!(value.get("podSpec").is_none());
    }
}
