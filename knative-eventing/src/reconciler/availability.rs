use super::workload::Workload;
use crate::apis::sources::v1alpha1::{AdapterCondition, EventSourceStatus};
use knative::conditions::{ConditionAccessor, ConditionStatus};
use knative::Addressable;

pub const REASON_UNAVAILABLE: &str = "Unavailable";
pub const MESSAGE_UNDETERMINED: &str = "status of the adapter cannot be determined";

/// Reflect the availability of the adapter in the `Deployed` condition.
///
/// `None` means no workload could be observed; this is expected right after creation and is never
/// reported as a failure.
pub fn propagate<W: Workload>(status: &mut EventSourceStatus, workload: Option<&W>) {
    let availability = match workload {
        Some(workload) => workload.availability(),
        None => {
            status.manager().mark_unknown(
                AdapterCondition::Deployed,
                REASON_UNAVAILABLE,
                Some(MESSAGE_UNDETERMINED.to_string()),
            );
            return;
        }
    };

    match availability.status {
        ConditionStatus::True => status.manager().mark_true(AdapterCondition::Deployed),
        ConditionStatus::False => status.manager().mark_false(
            AdapterCondition::Deployed,
            REASON_UNAVAILABLE,
            availability.message,
        ),
        ConditionStatus::Unknown => status.manager().mark_unknown(
            AdapterCondition::Deployed,
            REASON_UNAVAILABLE,
            availability.message,
        ),
    }
    status.address = availability.address.map(Addressable::from);
}

#[cfg(test)]
mod test {
    use super::*;
    use k8s_openapi::api::apps::v1::{Deployment, DeploymentCondition, DeploymentStatus};
    use knative_serving::Service as KnService;

    fn deployment(available: &str, message: &str) -> Deployment {
        Deployment {
            status: Some(DeploymentStatus {
                conditions: Some(vec![DeploymentCondition {
                    type_: "Available".into(),
                    status: available.into(),
                    message: Some(message.into()),
                    ..Default::default()
                }]),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn deployed(status: &mut EventSourceStatus) -> (ConditionStatus, Option<String>, Option<String>) {
        let cond = status.manager().get_condition(AdapterCondition::Deployed).cloned().unwrap();
        (cond.status, cond.reason, cond.message)
    }

    #[test]
    fn absent_workload_is_unknown() {
        let mut status = EventSourceStatus::default();
        propagate::<Deployment>(&mut status, None);
        assert_eq!(
            deployed(&mut status),
            (
                ConditionStatus::Unknown,
                Some(REASON_UNAVAILABLE.to_string()),
                Some(MESSAGE_UNDETERMINED.to_string())
            )
        );
    }

    #[test]
    fn available_deployment() {
        let mut status = EventSourceStatus::default();
        propagate(&mut status, Some(&deployment("True", "has minimum availability")));
        assert_eq!(deployed(&mut status).0, ConditionStatus::True);
        assert!(status.address.is_none());
    }

    #[test]
    fn unavailable_deployment_carries_message() {
        let mut status = EventSourceStatus::default();
        propagate(&mut status, Some(&deployment("False", "Deployment does not have minimum availability.")));
        assert_eq!(
            deployed(&mut status),
            (
                ConditionStatus::False,
                Some(REASON_UNAVAILABLE.to_string()),
                Some("Deployment does not have minimum availability.".to_string())
            )
        );
        assert!(!status.is_ready());
    }

    #[test]
    fn ready_service_sets_address() {
        let mut ksvc = KnService::new("awssnssource-topic", Default::default());
        ksvc.status = Some(serde_json::from_value(serde_json::json!({
            "url": "https://awssnssource-topic.default.example.com",
            "conditions": [{ "type": "Ready", "status": "True" }]
        })).unwrap());

        let mut status = EventSourceStatus::default();
        propagate(&mut status, Some(&ksvc));
        assert_eq!(deployed(&mut status).0, ConditionStatus::True);
        assert_eq!(
            status.address.and_then(|a| a.url).unwrap().as_str(),
            "https://awssnssource-topic.default.example.com/"
        );
    }

    #[test]
    fn unready_service_withdraws_address() {
        let mut ksvc = KnService::new("awssnssource-topic", Default::default());
        ksvc.status = Some(serde_json::from_value(serde_json::json!({
            "url": "https://awssnssource-topic.default.example.com",
            "conditions": [{ "type": "Ready", "status": "Unknown", "message": "Revision is scaling up" }]
        })).unwrap());

        let mut status = EventSourceStatus::default();
        status.address = Some(Addressable::from(
            "https://awssnssource-topic.default.example.com".parse::<url::Url>().unwrap(),
        ));
        propagate(&mut status, Some(&ksvc));
        assert_eq!(deployed(&mut status).0, ConditionStatus::Unknown);
        assert!(status.address.is_none());
    }
}
