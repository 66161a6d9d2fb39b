//! Desired state of the adapter workload of a Source.
use super::store::Labels;
use k8s_openapi::api::core::v1::{
    Container, ContainerPort, EnvVar, HTTPGetAction, PodSpec, Probe, ResourceRequirements,
};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use knative::CloudEventOverrides;
use url::Url;

pub const ENV_NAMESPACE: &str = "NAMESPACE";
pub const ENV_NAME: &str = "NAME";
pub const ENV_SINK: &str = "K_SINK";
pub const ENV_COMPONENT: &str = "K_COMPONENT";
pub const ENV_CE_OVERRIDES: &str = "K_CE_OVERRIDES";

const CONTAINER_NAME: &str = "adapter";
const DEFAULT_PROBE_PORT: i32 = 8080;

/// Which kind of workload runs the adapter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WorkloadKind {
    /// A long-running `apps/v1` Deployment.
    ReplicaManaged { replicas: i32 },
    /// A `serving.knative.dev/v1` Service, scaled on demand by the platform.
    RequestDriven,
}

/// Runtime description of an adapter, independent of the workload it is rendered into.
#[derive(Clone, Debug, PartialEq)]
pub struct AdapterSpec {
    pub kind: WorkloadKind,
    pub image: String,
    pub env: Vec<EnvVar>,
    pub resources: Option<ResourceRequirements>,
    pub ports: Vec<ContainerPort>,
    /// Path of the HTTP readiness probe, served on the first declared port.
    pub probe_path: Option<String>,
    /// Labels added to the workload on top of the ones owned by the reconciler.
    pub labels: Labels,
    pub service_account: Option<String>,
}

impl AdapterSpec {
    pub fn replica_managed(image: impl Into<String>, replicas: i32) -> Self {
        Self::new(WorkloadKind::ReplicaManaged { replicas }, image.into())
    }

    pub fn request_driven(image: impl Into<String>) -> Self {
        Self::new(WorkloadKind::RequestDriven, image.into())
    }

    fn new(kind: WorkloadKind, image: String) -> Self {
        AdapterSpec {
            kind,
            image,
            env: Vec::new(),
            resources: None,
            ports: Vec::new(),
            probe_path: None,
            labels: Labels::new(),
            service_account: None,
        }
    }

    pub fn with_env(mut self, name: &str, value: impl Into<String>) -> Self {
        self.env.push(EnvVar {
            name: name.to_string(),
            value: Some(value.into()),
            ..Default::default()
        });
        self
    }

    pub fn with_env_vars(mut self, vars: impl IntoIterator<Item = EnvVar>) -> Self {
        self.env.extend(vars);
        self
    }

    pub fn with_port(mut self, name: &str, port: i32) -> Self {
        self.ports.push(ContainerPort {
            name: Some(name.to_string()),
            container_port: port,
            ..Default::default()
        });
        self
    }

    pub fn with_probe_path(mut self, path: impl Into<String>) -> Self {
        self.probe_path = Some(path.into());
        self
    }

    pub fn with_resources(mut self, resources: ResourceRequirements) -> Self {
        self.resources = Some(resources);
        self
    }

    pub fn with_label(mut self, key: &str, value: impl Into<String>) -> Self {
        self.labels.insert(key.to_string(), value.into());
        self
    }

    /// Put `vars` ahead of the variables set by the builder.
    pub(crate) fn prepend_env(&mut self, vars: Vec<EnvVar>) {
        self.env.splice(0..0, vars);
    }

    fn readiness_probe(&self) -> Option<Probe> {
        let path = self.probe_path.as_ref()?;
        let port = self.ports.first().map(|p| p.container_port).unwrap_or(DEFAULT_PROBE_PORT);
        Some(Probe {
            http_get: Some(HTTPGetAction {
                path: Some(path.clone()),
                port: IntOrString::Int(port),
                ..Default::default()
            }),
            ..Default::default()
        })
    }

    pub(crate) fn container(&self) -> Container {
        Container {
            name: CONTAINER_NAME.to_string(),
            image: Some(self.image.clone()),
            env: (!self.env.is_empty()).then(|| self.env.clone()),
            ports: (!self.ports.is_empty()).then(|| self.ports.clone()),
            resources: self.resources.clone(),
            readiness_probe: self.readiness_probe(),
            ..Default::default()
        }
    }

    pub(crate) fn pod_spec(&self) -> PodSpec {
        PodSpec {
            service_account_name: self.service_account.clone(),
            containers: vec![self.container()],
            ..Default::default()
        }
    }
}

/// Environment every adapter receives regardless of its kind.
pub fn common_env(
    namespace: &str,
    name: &str,
    component: &str,
    sink: &Url,
    ce_overrides: Option<&CloudEventOverrides>,
) -> Result<Vec<EnvVar>, serde_json::Error> {
    let mut vars = vec![
        (ENV_NAMESPACE, namespace.to_string()),
        (ENV_NAME, name.to_string()),
        (ENV_SINK, sink.to_string()),
        (ENV_COMPONENT, component.to_string()),
    ];
    if let Some(overrides) = ce_overrides {
        vars.push((ENV_CE_OVERRIDES, serde_json::to_string(overrides)?));
    }

    Ok(vars
        .into_iter()
        .map(|(name, value)| EnvVar {
            name: name.to_string(),
            value: Some(value),
            ..Default::default()
        })
        .collect())
}
