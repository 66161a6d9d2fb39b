use super::adapter::{common_env, AdapterSpec, WorkloadKind};
use super::availability::propagate;
use super::config::ReconcilerOptions;
use super::error::{Error, Result};
use super::events::{actions, reasons, EventRecorder, EventType, KubeEventRecorder};
use super::executor::Executor;
use super::rbac::{identity_name, AuthorizationReconciler};
use super::sink::SinkResolver;
use super::source::{adapter_labels, adapter_name, adapter_selector, shared_labels, AdapterBuilder, EventSource};
use super::status::sync_status;
use super::store::{kind_of, KubeStore, Labels, Store, StoreError};
use super::workload::Workload;
use crate::apis::sources::v1alpha1::{AdapterCondition, EventSourceStatus};
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::ObjectReference;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};
use knative::conditions::ConditionAccessor;
use knative::SinkManager;
use knative_serving::Service as KnService;
use kube::Client;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

pub const REASON_AUTHORIZATION_FAILED: &str = "AuthorizationFailed";

/// The Source a pass is working on.
struct Target<'a> {
    namespace: &'a str,
    name: &'a str,
    owner: OwnerReference,
    regarding: ObjectReference,
}

/// Reconciles Sources of kind `S` whose adapters are described by `B`.
///
/// The reconciler keeps no state between passes. The caller must not run two passes for the same
/// Source concurrently.
pub struct Reconciler<S, B, St, R> {
    builder: B,
    store: Arc<St>,
    recorder: Arc<R>,
    options: ReconcilerOptions,
    source: PhantomData<fn() -> S>,
}

impl<S: EventSource, B: AdapterBuilder<S>> Reconciler<S, B, KubeStore, KubeEventRecorder> {
    /// A reconciler talking to the cluster behind `client`.
    pub fn with_client(client: Client, builder: B, options: ReconcilerOptions) -> Self {
        let recorder = KubeEventRecorder::new(client.clone(), &options.controller_name);
        Self::new(builder, Arc::new(KubeStore::new(client)), Arc::new(recorder), options)
    }
}

impl<S, B, St, R> Reconciler<S, B, St, R>
where
    S: EventSource,
    B: AdapterBuilder<S>,
    St: Store,
    R: EventRecorder,
{
    pub fn new(builder: B, store: Arc<St>, recorder: Arc<R>, options: ReconcilerOptions) -> Self {
        Reconciler {
            builder,
            store,
            recorder,
            options,
            source: PhantomData,
        }
    }

    /// Run one pass for `source`: resolve the sink, bind the shared identity, converge the adapter
    /// and persist the resulting status.
    ///
    /// The status is written even when the pass fails, so the conditions always explain the
    /// failure. Errors for which [`Error::is_permanent`] holds should not be retried until the
    /// Source or the objects it references change.
    #[instrument(
        skip_all,
        fields(kind = S::COMPONENT, namespace = ?source.meta().namespace, name = ?source.meta().name)
    )]
    pub async fn reconcile(&self, source: &S) -> Result<()> {
        let meta = source.meta();
        let missing = |field| StoreError::MissingMetadata { kind: kind_of::<S>(), field };
        let target = Target {
            namespace: meta.namespace.as_deref().ok_or_else(|| missing("namespace"))?,
            name: meta.name.as_deref().ok_or_else(|| missing("name"))?,
            owner: source.controller_owner_ref(&()).ok_or_else(|| missing("uid"))?,
            regarding: source.object_ref(&()),
        };

        let mut status = source.source_status().cloned().unwrap_or_default();
        let outcome = Box::pin(self.reconcile_adapter(source, &target, &mut status)).await;

        let mut desired = source.clone();
        *desired.source_status_mut() = Some(status);
        let synced = Box::pin(sync_status(&*self.store, source, &desired)).await;

        let result = match (outcome, synced) {
            (Err(err), Err(status_err)) => {
                warn!(error = %status_err, "failed to update status");
                Err(err)
            }
            (Err(err), Ok(_)) => Err(err),
            (Ok(()), Err(err)) => Err(err.into()),
            (Ok(()), Ok(written)) => {
                info!(status_written = written, "reconciled");
                Ok(())
            }
        };
        if let Err(err) = &result {
            if err.is_permanent() {
                warn!(error = %err, "reconciliation failed permanently");
            } else {
                debug!(error = %err, "reconciliation will be retried");
            }
        }
        result
    }

    async fn reconcile_adapter(&self, source: &S, target: &Target<'_>, status: &mut EventSourceStatus) -> Result<()> {
        status.status.observe(source.meta().generation);
        let event_types = self.builder.event_types(source);
        status.cloud_event_attributes = (!event_types.is_empty()).then(|| event_types);

        let resolver = SinkResolver::new(&*self.store, &self.options.cluster_domain);
        let sink = match Box::pin(resolver.resolve(source.sink(), target.namespace)).await {
            Ok(sink) => sink,
            Err(err) => {
                status.mark_no_sink(err.reason(), Some(err.to_string()));
                self.recorder
                    .publish(
                        &target.regarding,
                        EventType::Warning,
                        reasons::BAD_SINK_URI,
                        actions::RESOLVE,
                        format!("Failed to resolve sink: {err}"),
                    )
                    .await;
                return Err(err.into());
            }
        };
        status.mark_sink(sink.clone());
        debug!(%sink, "resolved sink");

        let mut spec = self.builder.build(source, &sink);
        let env = common_env(target.namespace, target.name, S::COMPONENT, &sink, source.ce_overrides())
            .map_err(|source| Error::Serialization { what: "CloudEvent overrides", source })?;
        spec.prepend_env(env);

        if self.builder.needs_authorization() {
            Box::pin(self.bind_authorization(target, status)).await?;
            spec.service_account = Some(identity_name(S::COMPONENT));
        } else {
            status.manager().mark_true(AdapterCondition::AuthorizationBound);
        }

        let selector = adapter_selector::<S>(target.name);
        let meta = self.adapter_meta(target, &spec);
        match spec.kind {
            WorkloadKind::ReplicaManaged { .. } => {
                let desired = Deployment::render(meta, &selector, &spec);
                Box::pin(self.converge(desired, target, &selector, status)).await
            }
            WorkloadKind::RequestDriven => {
                let desired = KnService::render(meta, &selector, &spec);
                Box::pin(self.converge(desired, target, &selector, status)).await
            }
        }
    }

    fn adapter_meta(&self, target: &Target<'_>, spec: &AdapterSpec) -> ObjectMeta {
        let mut labels = spec.labels.clone();
        labels.extend(adapter_labels::<S>(target.name, &self.options.controller_name));
        ObjectMeta {
            name: Some(adapter_name::<S>(target.name)),
            namespace: Some(target.namespace.to_string()),
            labels: Some(labels),
            owner_references: Some(vec![target.owner.clone()]),
            ..Default::default()
        }
    }

    /// Every Source of kind `S` in the namespace that is not being deleted, and always the one
    /// being reconciled.
    async fn owners(&self, target: &Target<'_>) -> Result<Vec<OwnerReference>, StoreError> {
        let mut owners: Vec<OwnerReference> = self
            .store
            .list::<S>(target.namespace, &Labels::new())
            .await?
            .iter()
            .filter(|s| s.meta().deletion_timestamp.is_none())
            .filter_map(|s| s.controller_owner_ref(&()))
            .collect();
        if !owners.iter().any(|o| o.uid == target.owner.uid) {
            owners.push(target.owner.clone());
        }
        Ok(owners)
    }

    async fn bind_authorization(&self, target: &Target<'_>, status: &mut EventSourceStatus) -> Result<()> {
        let bound = match self.owners(target).await {
            Ok(owners) => {
                let labels = shared_labels::<S>(&self.options.controller_name);
                let authorization =
                    AuthorizationReconciler::new(&*self.store, &*self.recorder, &target.regarding);
                Box::pin(authorization.reconcile(S::COMPONENT, target.namespace, &labels, &owners)).await
            }
            Err(err) => Err(err),
        };

        match bound {
            Ok(()) => {
                status.manager().mark_true(AdapterCondition::AuthorizationBound);
                Ok(())
            }
            // A concurrent pass for another Source of the kind won the write.
            Err(err) if err.is_conflict() => Err(err.into()),
            Err(err) => {
                status.manager().mark_false(
                    AdapterCondition::AuthorizationBound,
                    REASON_AUTHORIZATION_FAILED,
                    Some(err.to_string()),
                );
                Err(err.into())
            }
        }
    }

    async fn converge<W: Workload>(
        &self,
        desired: W,
        target: &Target<'_>,
        selector: &Labels,
        status: &mut EventSourceStatus,
    ) -> Result<()> {
        let executor = Executor::new(&*self.store, &*self.recorder, &target.regarding);
        let current = match Box::pin(executor.locate::<W>(target.namespace, selector, &target.owner.uid)).await {
            Ok(current) => current,
            Err(err) => {
                propagate::<W>(status, None);
                return Err(err.into());
            }
        };
        let converged = Box::pin(executor.apply(current, desired)).await?;
        propagate(status, converged.observed());
        Ok(())
    }
}
