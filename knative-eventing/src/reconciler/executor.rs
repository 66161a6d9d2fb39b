//! Create-or-update of the adapter workload owned by a Source.
use super::events::{actions, reasons, EventRecorder, EventType};
use super::semantic::semantic_equal;
use super::store::{kind_of, Labels, Store, StoreError};
use super::workload::Workload;
use k8s_openapi::api::core::v1::ObjectReference;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use tracing::{debug, error, info};

/// Outcome of converging a workload.
#[derive(Debug)]
pub enum Convergence<W> {
    Created(W),
    Updated(W),
    Unchanged(W),
}

impl<W> Convergence<W> {
    /// The workload whose availability may be trusted, i.e. one the platform has already seen
    /// through at least one pass.
    pub fn observed(&self) -> Option<&W> {
        match self {
            Convergence::Created(_) => None,
            Convergence::Updated(w) | Convergence::Unchanged(w) => Some(w),
        }
    }

    pub fn into_inner(self) -> W {
        match self {
            Convergence::Created(w) | Convergence::Updated(w) | Convergence::Unchanged(w) => w,
        }
    }
}

fn is_controlled_by(meta: &ObjectMeta, owner_uid: &str) -> bool {
    meta.owner_references
        .iter()
        .flatten()
        .any(|owner| owner.controller == Some(true) && owner.uid == owner_uid)
}

fn object_name<W: Workload>(w: &W) -> String {
    let meta = w.meta();
    format!(
        "{}/{}",
        meta.namespace.as_deref().unwrap_or_default(),
        meta.name.as_deref().unwrap_or_default()
    )
}

/// Drives the workload of one Source towards its desired state.
pub struct Executor<'a, St, R> {
    store: &'a St,
    recorder: &'a R,
    regarding: &'a ObjectReference,
}

impl<'a, St: Store, R: EventRecorder> Executor<'a, St, R> {
    /// `regarding` is the Source the Events are attached to.
    pub fn new(store: &'a St, recorder: &'a R, regarding: &'a ObjectReference) -> Self {
        Executor { store, recorder, regarding }
    }

    /// Find the workload matching `selector` that is controlled by the owner with `owner_uid`.
    pub async fn locate<W: Workload>(
        &self,
        namespace: &str,
        selector: &Labels,
        owner_uid: &str,
    ) -> Result<Option<W>, StoreError> {
        let mut owned: Vec<W> = self
            .store
            .list::<W>(namespace, selector)
            .await?
            .into_iter()
            .filter(|w| is_controlled_by(w.meta(), owner_uid))
            .collect();

        if owned.len() > 1 {
            let names: Vec<_> = owned.iter().map(object_name).collect();
            error!(
                kind = %kind_of::<W>(),
                owner = owner_uid,
                ?names,
                "more than one adapter is controlled by the same source"
            );
        }
        Ok(if owned.is_empty() { None } else { Some(owned.swap_remove(0)) })
    }

    /// Create `desired` when nothing exists yet, otherwise update `current` if it drifted.
    pub async fn apply<W: Workload>(&self, current: Option<W>, desired: W) -> Result<Convergence<W>, StoreError> {
        match current {
            None => Box::pin(self.create(desired)).await.map(Convergence::Created),
            Some(current) => {
                if semantic_equal(&desired, &current)? {
                    debug!(adapter = %object_name(&current), "adapter is up to date");
                    return Ok(Convergence::Unchanged(current));
                }
                Box::pin(self.update(current, desired)).await.map(Convergence::Updated)
            }
        }
    }

    async fn create<W: Workload>(&self, desired: W) -> Result<W, StoreError> {
        let name = object_name(&desired);
        match self.store.create(&desired).await {
            Ok(created) => {
                info!(adapter = %name, kind = %kind_of::<W>(), "created adapter");
                self.publish(
                    EventType::Normal,
                    reasons::ADAPTER_CREATE,
                    actions::CREATE,
                    format!("Created adapter {} {name}", kind_of::<W>()),
                )
                .await;
                Ok(created)
            }
            Err(err) => {
                self.publish(
                    EventType::Warning,
                    reasons::FAILED_ADAPTER_CREATE,
                    actions::CREATE,
                    format!("Failed to create adapter {} {name}: {err}", kind_of::<W>()),
                )
                .await;
                Err(err)
            }
        }
    }

    async fn update<W: Workload>(&self, current: W, mut desired: W) -> Result<W, StoreError> {
        let name = object_name(&desired);
        let current_meta = current.meta();
        let meta = desired.meta_mut();
        meta.resource_version = current_meta.resource_version.clone();
        for key in W::PRESERVED_ANNOTATIONS {
            if let Some(value) = current_meta.annotations.as_ref().and_then(|a| a.get(*key)) {
                meta.annotations
                    .get_or_insert_with(Default::default)
                    .insert(key.to_string(), value.clone());
            }
        }
        desired.carry_status(&current);

        match self.store.update(&desired).await {
            Ok(updated) => {
                info!(adapter = %name, kind = %kind_of::<W>(), "updated adapter");
                self.publish(
                    EventType::Normal,
                    reasons::ADAPTER_UPDATE,
                    actions::UPDATE,
                    format!("Updated adapter {} {name}", kind_of::<W>()),
                )
                .await;
                Ok(updated)
            }
            Err(err) => {
                self.publish(
                    EventType::Warning,
                    reasons::FAILED_ADAPTER_UPDATE,
                    actions::UPDATE,
                    format!("Failed to update adapter {} {name}: {err}", kind_of::<W>()),
                )
                .await;
                Err(err)
            }
        }
    }

    async fn publish(&self, type_: EventType, reason: &str, action: &str, note: String) {
        self.recorder.publish(self.regarding, type_, reason, action, note).await;
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::reconciler::adapter::AdapterSpec;
    use crate::reconciler::testing::{MemoryRecorder, MemoryStore};
    use k8s_openapi::api::apps::v1::Deployment;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
    use std::collections::BTreeMap;

    const OWNER_UID: &str = "0b5f8a4e-foo";

    fn selector() -> Labels {
        Labels::from([
            ("app.kubernetes.io/name".to_string(), "awssqssource".to_string()),
            ("app.kubernetes.io/instance".to_string(), "foo".to_string()),
        ])
    }

    fn owner(uid: &str) -> OwnerReference {
        OwnerReference {
            api_version: "sources.knative.dev/v1alpha1".into(),
            kind: "AwsSqsSource".into(),
            name: "foo".into(),
            uid: uid.into(),
            controller: Some(true),
            block_owner_deletion: None,
        }
    }

    fn desired(image: &str, owner_uid: &str) -> Deployment {
        let meta = ObjectMeta {
            name: Some("awssqssource-foo".into()),
            namespace: Some("default".into()),
            labels: Some(selector()),
            owner_references: Some(vec![owner(owner_uid)]),
            ..Default::default()
        };
        Deployment::render(meta, &selector(), &AdapterSpec::replica_managed(image, 1))
    }

    fn regarding() -> ObjectReference {
        ObjectReference {
            kind: Some("AwsSqsSource".into()),
            name: Some("foo".into()),
            namespace: Some("default".into()),
            ..Default::default()
        }
    }

    #[async_std::test]
    async fn second_pass_is_a_no_op() {
        let store = MemoryStore::default();
        let recorder = MemoryRecorder::default();
        let regarding = regarding();
        let executor = Executor::new(&store, &recorder, &regarding);

        for _ in 0..2 {
            let current = executor.locate::<Deployment>("default", &selector(), OWNER_UID).await.unwrap();
            executor.apply(current, desired("adapter:v1", OWNER_UID)).await.unwrap();
        }

        assert_eq!(store.writes(), 1);
        assert_eq!(recorder.reasons(), [reasons::ADAPTER_CREATE]);
    }

    #[async_std::test]
    async fn created_workload_is_not_observed() {
        let store = MemoryStore::default();
        let recorder = MemoryRecorder::default();
        let regarding = regarding();
        let executor = Executor::new(&store, &recorder, &regarding);

        let converged = executor.apply(None, desired("adapter:v1", OWNER_UID)).await.unwrap();
        assert!(matches!(converged, Convergence::Created(_)));
        assert!(converged.observed().is_none());
        let created = converged.into_inner();
        assert!(created.metadata.resource_version.is_some());
    }

    #[async_std::test]
    async fn drift_is_updated_with_current_token_and_annotations() {
        let store = MemoryStore::default();
        let recorder = MemoryRecorder::default();
        let regarding = regarding();
        let executor = Executor::new(&store, &recorder, &regarding);

        let mut existing = desired("adapter:v1", OWNER_UID);
        existing.metadata.annotations = Some(BTreeMap::from([(
            "deployment.kubernetes.io/revision".to_string(),
            "3".to_string(),
        )]));
        store.insert(&existing);

        let current = executor.locate::<Deployment>("default", &selector(), OWNER_UID).await.unwrap();
        let converged = executor.apply(current, desired("adapter:v2", OWNER_UID)).await.unwrap();
        let updated = match converged {
            Convergence::Updated(w) => w,
            other => panic!("expected an update, got {other:?}"),
        };

        let container = &updated.spec.unwrap().template.spec.unwrap().containers[0];
        assert_eq!(container.image.as_deref(), Some("adapter:v2"));
        let annotations = updated.metadata.annotations.unwrap();
        assert_eq!(annotations["deployment.kubernetes.io/revision"], "3");
        assert_eq!(recorder.reasons(), [reasons::ADAPTER_UPDATE]);
    }

    #[async_std::test]
    async fn workloads_of_other_owners_are_ignored() {
        let store = MemoryStore::default();
        let recorder = MemoryRecorder::default();
        let regarding = regarding();
        let executor = Executor::new(&store, &recorder, &regarding);

        store.insert(&desired("adapter:v1", "someone-else"));
        let current = executor.locate::<Deployment>("default", &selector(), OWNER_UID).await.unwrap();
        assert!(current.is_none());
    }

    #[async_std::test]
    async fn stale_token_is_retryable() {
        let store = MemoryStore::default();
        let recorder = MemoryRecorder::default();
        let regarding = regarding();
        let executor = Executor::new(&store, &recorder, &regarding);

        store.insert(&desired("adapter:v1", OWNER_UID));
        let current = executor.locate::<Deployment>("default", &selector(), OWNER_UID).await.unwrap();
        store.fail_next("update", 409);

        let err = executor.apply(current, desired("adapter:v2", OWNER_UID)).await.unwrap_err();
        assert!(err.is_conflict());
        assert!(err.is_retryable());
        assert_eq!(recorder.reasons(), [reasons::FAILED_ADAPTER_UPDATE]);
    }

    #[async_std::test]
    async fn failed_create_is_reported() {
        let store = MemoryStore::default();
        let recorder = MemoryRecorder::default();
        let regarding = regarding();
        let executor = Executor::new(&store, &recorder, &regarding);

        store.fail_next("create", 500);
        let err = executor.apply(None, desired("adapter:v1", OWNER_UID)).await.unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(recorder.reasons(), [reasons::FAILED_ADAPTER_CREATE]);
        assert_eq!(store.count::<Deployment>(), 0);
    }

    #[async_std::test]
    async fn first_of_several_controlled_workloads_is_converged() {
        let store = MemoryStore::default();
        let recorder = MemoryRecorder::default();
        let regarding = regarding();
        let executor = Executor::new(&store, &recorder, &regarding);

        store.insert(&desired("adapter:v1", OWNER_UID));
        let mut stray = desired("adapter:v1", OWNER_UID);
        stray.metadata.name = Some("awssqssource-foo-stray".into());
        let stray = store.insert(&stray);

        let current = executor.locate::<Deployment>("default", &selector(), OWNER_UID).await.unwrap();
        let current = current.unwrap();
        assert_eq!(current.metadata.name.as_deref(), Some("awssqssource-foo"));
        executor.apply(Some(current), desired("adapter:v2", OWNER_UID)).await.unwrap();

        let untouched: Deployment = store.get("default", "awssqssource-foo-stray").await.unwrap();
        assert_eq!(untouched.metadata.resource_version, stray.metadata.resource_version);
        let container = &untouched.spec.unwrap().template.spec.unwrap().containers[0];
        assert_eq!(container.image.as_deref(), Some("adapter:v1"));
        assert_eq!(store.count::<Deployment>(), 2);
        assert_eq!(recorder.reasons(), [reasons::ADAPTER_UPDATE]);
    }
}
