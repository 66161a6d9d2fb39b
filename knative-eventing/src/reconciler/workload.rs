//! The workload variants an adapter can run as.
use super::adapter::{AdapterSpec, WorkloadKind};
use super::store::{Labels, StoreObject};
use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::PodTemplateSpec;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use knative::conditions::ConditionStatus;
use knative_serving::apis::serving::v1::service::{RevisionSpec, RevisionTemplateSpec};
use knative_serving::{Service as KnService, ServiceSpec as KnServiceSpec};
use url::Url;

/// Observed readiness of a workload.
#[derive(Clone, Debug, PartialEq)]
pub struct Availability {
    pub status: ConditionStatus,
    pub message: Option<String>,
    /// Where the workload receives requests, if it does.
    pub address: Option<Url>,
}

impl Availability {
    fn unknown() -> Self {
        Availability { status: ConditionStatus::Unknown, message: None, address: None }
    }
}

/// Capabilities the convergence of an adapter needs from its workload object.
pub trait Workload: StoreObject {
    /// Annotations set by the platform that must survive an update.
    const PRESERVED_ANNOTATIONS: &'static [&'static str];

    /// Render the desired workload. `selector` identifies the pods of the workload.
    fn render(meta: ObjectMeta, selector: &Labels, spec: &AdapterSpec) -> Self;

    fn availability(&self) -> Availability;

    /// Take over the status of `current` so that an update leaves it untouched.
    fn carry_status(&mut self, current: &Self);
}

fn parse_status(status: &str) -> ConditionStatus {
    match status {
        "True" => ConditionStatus::True,
        "False" => ConditionStatus::False,
        _ => ConditionStatus::Unknown,
    }
}

fn pod_template(labels: &Labels, spec: &AdapterSpec) -> PodTemplateSpec {
    PodTemplateSpec {
        metadata: Some(ObjectMeta {
            labels: Some(labels.clone()),
            ..Default::default()
        }),
        spec: Some(spec.pod_spec()),
    }
}

impl Workload for Deployment {
    const PRESERVED_ANNOTATIONS: &'static [&'static str] = &["deployment.kubernetes.io/revision"];

    fn render(meta: ObjectMeta, selector: &Labels, spec: &AdapterSpec) -> Self {
        let replicas = match spec.kind {
            WorkloadKind::ReplicaManaged { replicas } => Some(replicas),
            WorkloadKind::RequestDriven => None,
        };
        let labels = meta.labels.clone().unwrap_or_default();
        Deployment {
            metadata: meta,
            spec: Some(DeploymentSpec {
                replicas,
                selector: LabelSelector {
                    match_labels: Some(selector.clone()),
                    ..Default::default()
                },
                template: pod_template(&labels, spec),
                ..Default::default()
            }),
            status: None,
        }
    }

    fn availability(&self) -> Availability {
        let conditions = match self.status.as_ref().and_then(|s| s.conditions.as_ref()) {
            Some(conditions) => conditions,
            None => return Availability::unknown(),
        };
        let status = conditions
            .iter()
            .find(|c| c.type_ == "Available")
            .map(|c| parse_status(&c.status))
            .unwrap_or(ConditionStatus::Unknown);
        let message = match status {
            ConditionStatus::True => None,
            _ => conditions
                .iter()
                .filter_map(|c| c.message.clone())
                .find(|m| !m.is_empty()),
        };
        Availability { status, message, address: None }
    }

    fn carry_status(&mut self, current: &Self) {
        self.status = current.status.clone();
    }
}

impl Workload for KnService {
    const PRESERVED_ANNOTATIONS: &'static [&'static str] =
        &["serving.knative.dev/creator", "serving.knative.dev/lastModifier"];

    fn render(meta: ObjectMeta, _selector: &Labels, spec: &AdapterSpec) -> Self {
        let labels = meta.labels.clone().unwrap_or_default();
        let template = pod_template(&labels, spec);
        KnService {
            metadata: meta,
            spec: KnServiceSpec {
                template: RevisionTemplateSpec {
                    metadata: template.metadata,
                    spec: RevisionSpec {
                        pod_spec: template.spec.unwrap_or_default(),
                        ..Default::default()
                    },
                },
            },
            status: None,
        }
    }

    fn availability(&self) -> Availability {
        let status = match self.status.as_ref() {
            Some(status) => status,
            None => return Availability::unknown(),
        };
        match status.ready_condition() {
            Some(ready) => Availability {
                status: ready.status,
                message: ready.message.clone().filter(|m| !m.is_empty()),
                address: status.url.clone().filter(|_| ready.is_true()),
            },
            None => Availability::unknown(),
        }
    }

    fn carry_status(&mut self, current: &Self) {
        self.status = current.status.clone();
    }
}
