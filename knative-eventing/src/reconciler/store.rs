//! Access to the objects the reconciler reads and writes.
//!
//! The reconciler never talks to the API server directly; everything goes through [`Store`], so
//! the same convergence logic runs against a cluster ([`KubeStore`]) or an in-memory fake.
use async_trait::async_trait;
use kube::api::{Api, ListParams, PostParams};
use kube::core::{ApiResource, DynamicObject};
use kube::{Client, Resource};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Debug;
use thiserror::Error;

/// Equality-based label selector.
pub type Labels = BTreeMap<String, String>;

/// Objects that can be persisted in a [`Store`].
pub trait StoreObject:
    Resource<DynamicType = ()> + Clone + Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
}

impl<K> StoreObject for K where
    K: Resource<DynamicType = ()> + Clone + Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{kind} {name:?} not found")]
    NotFound { kind: String, name: String },
    /// The concurrency token of the written object is stale, or the object already exists.
    #[error("conflict writing {kind} {name:?}: {message}")]
    Conflict { kind: String, name: String, message: String },
    #[error("{kind} is missing metadata.{field}")]
    MissingMetadata { kind: String, field: &'static str },
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("kubernetes error: {0}")]
    Kube(#[from] kube::Error),
}

impl StoreError {
    pub(crate) fn from_kube(err: kube::Error, kind: &str, name: &str) -> Self {
        match err {
            kube::Error::Api(ae) if ae.code == 404 => StoreError::NotFound {
                kind: kind.to_string(),
                name: name.to_string(),
            },
            kube::Error::Api(ae) if ae.code == 409 => StoreError::Conflict {
                kind: kind.to_string(),
                name: name.to_string(),
                message: ae.message,
            },
            err => StoreError::Kube(err),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict { .. })
    }

    /// Whether repeating the call may succeed without any change to the objects involved.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, StoreError::MissingMetadata { .. } | StoreError::Serialization(_))
    }
}

/// Get/list/create/update access to namespaced objects.
///
/// The concurrency token is `metadata.resourceVersion`: [`Store::update`] and
/// [`Store::update_status`] fail with [`StoreError::Conflict`] when it is stale.
#[async_trait]
pub trait Store: Send + Sync {
    async fn get<K: StoreObject>(&self, namespace: &str, name: &str) -> Result<K, StoreError>;

    async fn list<K: StoreObject>(&self, namespace: &str, selector: &Labels) -> Result<Vec<K>, StoreError>;

    async fn create<K: StoreObject>(&self, obj: &K) -> Result<K, StoreError>;

    async fn update<K: StoreObject>(&self, obj: &K) -> Result<K, StoreError>;

    /// Write only the status of an object.
    async fn update_status<K: StoreObject>(&self, obj: &K) -> Result<K, StoreError>;

    /// Get an object whose type is only known at runtime, e.g. the referent of a sink.
    async fn get_dynamic(
        &self,
        resource: &ApiResource,
        namespace: &str,
        name: &str,
    ) -> Result<DynamicObject, StoreError>;
}

pub(crate) fn kind_of<K: StoreObject>() -> String {
    K::kind(&()).to_string()
}

fn name_and_namespace<K: StoreObject>(obj: &K) -> Result<(&str, &str), StoreError> {
    let meta = obj.meta();
    let name = meta.name.as_deref().ok_or_else(|| StoreError::MissingMetadata {
        kind: kind_of::<K>(),
        field: "name",
    })?;
    let namespace = meta.namespace.as_deref().ok_or_else(|| StoreError::MissingMetadata {
        kind: kind_of::<K>(),
        field: "namespace",
    })?;
    Ok((name, namespace))
}

/// Lists are not addressed by name, so failures carry none.
fn list_error<K: StoreObject>(err: kube::Error) -> StoreError {
    StoreError::from_kube(err, &kind_of::<K>(), "")
}

fn selector_string(selector: &Labels) -> String {
    selector
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join(",")
}

/// A [`Store`] backed by the Kubernetes API server.
#[derive(Clone)]
pub struct KubeStore {
    client: Client,
}

impl KubeStore {
    pub fn new(client: Client) -> Self {
        KubeStore { client }
    }

    fn api<K: StoreObject>(&self, namespace: &str) -> Api<K> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

#[async_trait]
impl Store for KubeStore {
    async fn get<K: StoreObject>(&self, namespace: &str, name: &str) -> Result<K, StoreError> {
        self.api::<K>(namespace)
            .get(name)
            .await
            .map_err(|e| StoreError::from_kube(e, &kind_of::<K>(), name))
    }

    async fn list<K: StoreObject>(&self, namespace: &str, selector: &Labels) -> Result<Vec<K>, StoreError> {
        let mut params = ListParams::default();
        if !selector.is_empty() {
            params = params.labels(&selector_string(selector));
        }
        let list = self.api::<K>(namespace).list(&params).await.map_err(list_error::<K>)?;
        Ok(list.items)
    }

    async fn create<K: StoreObject>(&self, obj: &K) -> Result<K, StoreError> {
        let (name, namespace) = name_and_namespace(obj)?;
        self.api::<K>(namespace)
            .create(&PostParams::default(), obj)
            .await
            .map_err(|e| StoreError::from_kube(e, &kind_of::<K>(), name))
    }

    async fn update<K: StoreObject>(&self, obj: &K) -> Result<K, StoreError> {
        let (name, namespace) = name_and_namespace(obj)?;
        self.api::<K>(namespace)
            .replace(name, &PostParams::default(), obj)
            .await
            .map_err(|e| StoreError::from_kube(e, &kind_of::<K>(), name))
    }

    async fn update_status<K: StoreObject>(&self, obj: &K) -> Result<K, StoreError> {
        let (name, namespace) = name_and_namespace(obj)?;
        let data = serde_json::to_vec(obj)?;
        self.api::<K>(namespace)
            .replace_status(name, &PostParams::default(), data)
            .await
            .map_err(|e| StoreError::from_kube(e, &kind_of::<K>(), name))
    }

    async fn get_dynamic(
        &self,
        resource: &ApiResource,
        namespace: &str,
        name: &str,
    ) -> Result<DynamicObject, StoreError> {
        let api: Api<DynamicObject> = Api::namespaced_with(self.client.clone(), namespace, resource);
        api.get(name)
            .await
            .map_err(|e| StoreError::from_kube(e, &resource.kind, name))
    }
}
