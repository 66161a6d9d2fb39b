use super::adapter::AdapterSpec;
use super::store::{Labels, StoreObject};
use crate::apis::sources::v1alpha1::EventSourceStatus;
use knative::{CloudEventAttributes, CloudEventOverrides, Destination};
use url::Url;

pub const LABEL_NAME: &str = "app.kubernetes.io/name";
pub const LABEL_INSTANCE: &str = "app.kubernetes.io/instance";
pub const LABEL_COMPONENT: &str = "app.kubernetes.io/component";
pub const LABEL_PART_OF: &str = "app.kubernetes.io/part-of";
pub const LABEL_MANAGED_BY: &str = "app.kubernetes.io/managed-by";

const COMPONENT_ADAPTER: &str = "adapter";
const PART_OF: &str = "knative-sources";

/// A Source resource whose events are received by an adapter.
pub trait EventSource: StoreObject {
    /// Lowercase kind, used to name the adapter and its shared objects.
    const COMPONENT: &'static str;

    fn sink(&self) -> Option<&Destination>;

    fn ce_overrides(&self) -> Option<&CloudEventOverrides>;

    fn source_status(&self) -> Option<&EventSourceStatus>;

    fn source_status_mut(&mut self) -> &mut Option<EventSourceStatus>;
}

/// Describes the adapter of one Source kind.
///
/// Implementations must be pure: the reconciler calls them on every pass and compares their output
/// to the objects in the cluster.
pub trait AdapterBuilder<S: EventSource>: Send + Sync {
    fn build(&self, source: &S, sink: &Url) -> AdapterSpec;

    /// The CloudEvents the Source emits.
    fn event_types(&self, source: &S) -> Vec<CloudEventAttributes>;

    /// Whether the adapter runs under the shared identity of its kind.
    fn needs_authorization(&self) -> bool {
        false
    }
}

pub fn adapter_name<S: EventSource>(source_name: &str) -> String {
    format!("{}-{source_name}", S::COMPONENT)
}

/// Labels identifying the adapter of the Source named `source_name`.
pub fn adapter_selector<S: EventSource>(source_name: &str) -> Labels {
    Labels::from([
        (LABEL_NAME.to_string(), S::COMPONENT.to_string()),
        (LABEL_INSTANCE.to_string(), source_name.to_string()),
    ])
}

pub fn adapter_labels<S: EventSource>(source_name: &str, controller_name: &str) -> Labels {
    let mut labels = adapter_selector::<S>(source_name);
    labels.extend(common_labels(controller_name));
    labels
}

/// Labels of the objects shared by all Sources of a kind.
pub fn shared_labels<S: EventSource>(controller_name: &str) -> Labels {
    let mut labels = common_labels(controller_name);
    labels.insert(LABEL_NAME.to_string(), S::COMPONENT.to_string());
    labels
}

fn common_labels(controller_name: &str) -> Labels {
    Labels::from([
        (LABEL_COMPONENT.to_string(), COMPONENT_ADAPTER.to_string()),
        (LABEL_PART_OF.to_string(), PART_OF.to_string()),
        (LABEL_MANAGED_BY.to_string(), controller_name.to_string()),
    ])
}
