//! Identity and permissions shared by every adapter of one Source kind in a namespace.
//!
//! The ServiceAccount and RoleBinding are owned by all Sources of the kind at once. Their owner
//! list is always rewritten from the complete list of current owners, so the store deletes them
//! once the last Source is gone.
use super::events::{actions, reasons, EventRecorder, EventType};
use super::store::{kind_of, Labels, Store, StoreError, StoreObject};
use k8s_openapi::api::core::v1::{ObjectReference, ServiceAccount};
use k8s_openapi::api::rbac::v1::{RoleBinding, RoleRef, Subject};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};
use kube::Resource;
use tracing::{debug, info};

const RBAC_API_GROUP: &str = "rbac.authorization.k8s.io";

/// An object whose reconciled fields are compared with plain equality.
trait SharedObject: StoreObject {
    /// Copy the reconciled fields of `desired` into `self`, returning whether anything changed.
    fn sync_from(&mut self, desired: &Self) -> bool;
}

fn sync_owners(current: &mut ObjectMeta, desired: &ObjectMeta) -> bool {
    if current.owner_references == desired.owner_references {
        return false;
    }
    current.owner_references = desired.owner_references.clone();
    true
}

impl SharedObject for ServiceAccount {
    fn sync_from(&mut self, desired: &Self) -> bool {
        sync_owners(&mut self.metadata, &desired.metadata)
    }
}

impl SharedObject for RoleBinding {
    fn sync_from(&mut self, desired: &Self) -> bool {
        let mut changed = sync_owners(&mut self.metadata, &desired.metadata);
        if self.role_ref != desired.role_ref {
            self.role_ref = desired.role_ref.clone();
            changed = true;
        }
        if self.subjects != desired.subjects {
            self.subjects = desired.subjects.clone();
            changed = true;
        }
        changed
    }
}

/// Name of the identity, binding and ClusterRole of the adapters of `component`.
pub fn identity_name(component: &str) -> String {
    format!("{component}-adapter")
}

/// Owner references for the shared objects: every owner, none of them the controller.
pub fn shared_owner_references(owners: &[OwnerReference]) -> Vec<OwnerReference> {
    let mut refs: Vec<OwnerReference> = owners
        .iter()
        .map(|owner| OwnerReference {
            controller: None,
            block_owner_deletion: None,
            ..owner.clone()
        })
        .collect();
    refs.sort_by(|a, b| (&a.name, &a.uid).cmp(&(&b.name, &b.uid)));
    refs.dedup_by(|a, b| a.uid == b.uid);
    refs
}

/// Reconciles the ServiceAccount and RoleBinding of one Source kind.
pub struct AuthorizationReconciler<'a, St, R> {
    store: &'a St,
    recorder: &'a R,
    regarding: &'a ObjectReference,
}

impl<'a, St: Store, R: EventRecorder> AuthorizationReconciler<'a, St, R> {
    pub fn new(store: &'a St, recorder: &'a R, regarding: &'a ObjectReference) -> Self {
        AuthorizationReconciler { store, recorder, regarding }
    }

    /// Bring the shared objects of `component` in `namespace` in line with `owners`, the complete
    /// list of Sources of that kind.
    pub async fn reconcile(
        &self,
        component: &str,
        namespace: &str,
        labels: &Labels,
        owners: &[OwnerReference],
    ) -> Result<(), StoreError> {
        if owners.is_empty() {
            return Ok(());
        }
        let name = identity_name(component);
        let meta = ObjectMeta {
            name: Some(name.clone()),
            namespace: Some(namespace.to_string()),
            labels: Some(labels.clone()),
            owner_references: Some(shared_owner_references(owners)),
            ..Default::default()
        };

        let account = ServiceAccount {
            metadata: meta.clone(),
            ..Default::default()
        };
        Box::pin(self.ensure(account)).await?;

        let binding = RoleBinding {
            metadata: meta,
            role_ref: RoleRef {
                api_group: RBAC_API_GROUP.to_string(),
                kind: "ClusterRole".to_string(),
                name: name.clone(),
            },
            subjects: Some(vec![Subject {
                kind: "ServiceAccount".to_string(),
                name,
                namespace: Some(namespace.to_string()),
                api_group: None,
            }]),
        };
        Box::pin(self.ensure(binding)).await
    }

    async fn ensure<K: SharedObject>(&self, desired: K) -> Result<(), StoreError> {
        let meta = desired.meta();
        let name = meta.name.clone().unwrap_or_default();
        let namespace = meta.namespace.clone().unwrap_or_default();
        let kind = kind_of::<K>();

        let mut current = match self.store.get::<K>(&namespace, &name).await {
            Ok(current) => current,
            Err(err) if err.is_not_found() => return Box::pin(self.create(desired, &kind, &name)).await,
            Err(err) => return Err(err),
        };

        if !current.sync_from(&desired) {
            debug!(%kind, %name, "shared object is up to date");
            return Ok(());
        }
        match self.store.update(&current).await {
            Ok(_) => {
                info!(%kind, %name, "updated shared object");
                self.publish(
                    EventType::Normal,
                    reasons::RBAC_UPDATE,
                    actions::UPDATE,
                    format!("Updated {kind} {namespace}/{name}"),
                )
                .await;
                Ok(())
            }
            Err(err) => {
                self.publish(
                    EventType::Warning,
                    reasons::FAILED_RBAC_UPDATE,
                    actions::UPDATE,
                    format!("Failed to update {kind} {namespace}/{name}: {err}"),
                )
                .await;
                Err(err)
            }
        }
    }

    async fn create<K: SharedObject>(&self, desired: K, kind: &str, name: &str) -> Result<(), StoreError> {
        match self.store.create(&desired).await {
            Ok(_) => {
                info!(%kind, %name, "created shared object");
                self.publish(
                    EventType::Normal,
                    reasons::RBAC_CREATE,
                    actions::CREATE,
                    format!("Created {kind} {name}"),
                )
                .await;
                Ok(())
            }
            Err(err) => {
                self.publish(
                    EventType::Warning,
                    reasons::FAILED_RBAC_CREATE,
                    actions::CREATE,
                    format!("Failed to create {kind} {name}: {err}"),
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
