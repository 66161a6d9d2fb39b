//! Kubernetes Events emitted while reconciling a Source.
use async_trait::async_trait;
use k8s_openapi::api::core::v1::ObjectReference;
use kube::runtime::events::{Event, Recorder, Reporter};
use kube::Client;
use tracing::warn;

pub use kube::runtime::events::EventType;

/// Reason codes of the Events attached to a Source.
pub mod reasons {
    pub const ADAPTER_CREATE: &str = "AdapterCreate";
    pub const ADAPTER_UPDATE: &str = "AdapterUpdate";
    pub const FAILED_ADAPTER_CREATE: &str = "FailedAdapterCreate";
    pub const FAILED_ADAPTER_UPDATE: &str = "FailedAdapterUpdate";
    pub const RBAC_CREATE: &str = "RBACCreate";
    pub const RBAC_UPDATE: &str = "RBACUpdate";
    pub const FAILED_RBAC_CREATE: &str = "FailedRBACCreate";
    pub const FAILED_RBAC_UPDATE: &str = "FailedRBACUpdate";
    pub const BAD_SINK_URI: &str = "BadSinkURI";
}

/// Actions reported alongside a reason.
pub mod actions {
    pub const CREATE: &str = "Create";
    pub const UPDATE: &str = "Update";
    pub const RESOLVE: &str = "Resolve";
}

/// Publishes Events about an object.
///
/// Publishing is fire-and-forget: a failure to record an Event never fails the reconciliation
/// that produced it.
#[async_trait]
pub trait EventRecorder: Send + Sync {
    async fn publish(
        &self,
        regarding: &ObjectReference,
        type_: EventType,
        reason: &str,
        action: &str,
        note: String,
    );
}

/// Records Events through the `events.k8s.io` API.
#[derive(Clone)]
pub struct KubeEventRecorder {
    client: Client,
    reporter: Reporter,
}

impl KubeEventRecorder {
    pub fn new(client: Client, controller_name: &str) -> Self {
        KubeEventRecorder {
            client,
            reporter: Reporter {
                controller: controller_name.to_string(),
                instance: std::env::var("POD_NAME").ok(),
            },
        }
    }
}

#[async_trait]
impl EventRecorder for KubeEventRecorder {
    async fn publish(
        &self,
        regarding: &ObjectReference,
        type_: EventType,
        reason: &str,
        action: &str,
        note: String,
    ) {
        let recorder = Recorder::new(self.client.clone(), self.reporter.clone(), regarding.clone());
        let event = Event {
            type_,
            reason: reason.to_string(),
            note: Some(note),
            action: action.to_string(),
            secondary: None,
        };
        if let Err(err) = recorder.publish(event).await {
            warn!(
                reason,
                object = ?regarding.name,
                error = %err,
                "failed to publish event"
            );
        }
    }
}
