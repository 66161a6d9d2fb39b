//! In-memory doubles of the store and the event recorder.
use super::events::{EventRecorder, EventType};
use super::store::{kind_of, Labels, Store, StoreError, StoreObject};
use crate::apis::sources::v1alpha1::{AwsSqsSource, AwsSqsSourceSpec};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::{ObjectReference, Service};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use knative::{Destination, SourceSpec};
use kube::core::{ApiResource, DynamicObject};
use kube::error::ErrorResponse;
use kube::Resource;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Mutex;

type Key = (String, String, String, String);

#[derive(Default)]
struct State {
    objects: BTreeMap<Key, Value>,
    version: u64,
    calls: BTreeMap<&'static str, usize>,
    failures: Vec<(&'static str, u16)>,
}

impl State {
    fn next_version(&mut self) -> String {
        self.version += 1;
        self.version.to_string()
    }

    /// Count a call and fail it if a failure was queued for `verb`.
    fn call(&mut self, verb: &'static str, kind: &str, name: &str) -> Result<(), StoreError> {
        *self.calls.entry(verb).or_default() += 1;
        match self.failures.iter().position(|(v, _)| *v == verb) {
            Some(i) => {
                let (_, code) = self.failures.remove(i);
                Err(StoreError::from_kube(api_error(code), kind, name))
            }
            None => Ok(()),
        }
    }
}

fn api_error(code: u16) -> kube::Error {
    kube::Error::Api(ErrorResponse {
        status: "Failure".into(),
        message: format!("injected failure ({code})"),
        reason: "Injected".into(),
        code,
    })
}

fn str_at<'a>(value: &'a Value, pointer: &str) -> &'a str {
    value.pointer(pointer).and_then(Value::as_str).unwrap_or_default()
}

fn key_of(value: &Value) -> Key {
    (
        str_at(value, "/apiVersion").to_string(),
        str_at(value, "/kind").to_string(),
        str_at(value, "/metadata/namespace").to_string(),
        str_at(value, "/metadata/name").to_string(),
    )
}

fn typed_key<K: StoreObject>(namespace: &str, name: &str) -> Key {
    (
        K::api_version(&()).to_string(),
        K::kind(&()).to_string(),
        namespace.to_string(),
        name.to_string(),
    )
}

fn to_value<K: StoreObject>(obj: &K) -> Result<Value, StoreError> {
    let mut value = serde_json::to_value(obj)?;
    value["apiVersion"] = json!(K::api_version(&()));
    value["kind"] = json!(K::kind(&()));
    Ok(value)
}

fn matches_selector(value: &Value, selector: &Labels) -> bool {
    let labels = &value["metadata"]["labels"];
    selector
        .iter()
        .all(|(k, v)| labels.get(k).and_then(Value::as_str) == Some(v.as_str()))
}

/// A [`Store`] keeping objects in memory, with resource versions, conflict detection, call
/// accounting, injected failures and a garbage collector following owner references.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    /// Put `value` in the store as is, assigning a uid and a resource version when missing.
    pub fn insert_value(&self, mut value: Value) -> Value {
        let mut state = self.state.lock().unwrap();
        if value.pointer("/metadata/uid").is_none() {
            value["metadata"]["uid"] = json!(format!("uid-{}", str_at(&value, "/metadata/name")));
        }
        value["metadata"]["resourceVersion"] = json!(state.next_version());
        state.objects.insert(key_of(&value), value.clone());
        value
    }

    pub fn insert<K: StoreObject>(&self, obj: &K) -> K {
        let value = self.insert_value(to_value(obj).unwrap());
        serde_json::from_value(value).unwrap()
    }

    /// Delete an object the way the API server does: dependents lose their reference to it and
    /// are deleted once they have no owner left.
    pub fn delete<K: Serialize>(&self, obj: &K) {
        let value = serde_json::to_value(obj).unwrap();
        let mut state = self.state.lock().unwrap();
        let mut pending = vec![key_of(&value)];
        while let Some(key) = pending.pop() {
            let deleted = match state.objects.remove(&key) {
                Some(deleted) => deleted,
                None => continue,
            };
            let uid = str_at(&deleted, "/metadata/uid").to_string();
            for (key, object) in state.objects.iter_mut() {
                let owners = match object.pointer_mut("/metadata/ownerReferences").and_then(Value::as_array_mut) {
                    Some(owners) if !owners.is_empty() => owners,
                    _ => continue,
                };
                owners.retain(|o| o["uid"] != json!(uid));
                if owners.is_empty() {
                    pending.push(key.clone());
                }
            }
        }
    }

    /// Fail the next call of `verb` with an API error carrying `code`.
    pub fn fail_next(&self, verb: &'static str, code: u16) {
        self.state.lock().unwrap().failures.push((verb, code));
    }

    /// Replace the status of an object, as the controller owning it would.
    pub fn set_status<K: StoreObject>(&self, namespace: &str, name: &str, status: Value) {
        let mut state = self.state.lock().unwrap();
        let version = state.next_version();
        let object = state.objects.get_mut(&typed_key::<K>(namespace, name)).unwrap();
        object["status"] = status;
        object["metadata"]["resourceVersion"] = json!(version);
    }

    pub fn count<K: StoreObject>(&self) -> usize {
        let state = self.state.lock().unwrap();
        state
            .objects
            .keys()
            .filter(|(api_version, kind, _, _)| api_version == &*K::api_version(&()) && kind == &*K::kind(&()))
            .count()
    }

    pub fn calls(&self, verb: &str) -> usize {
        self.state.lock().unwrap().calls.get(verb).copied().unwrap_or_default()
    }

    /// Create and update calls, excluding status updates.
    pub fn writes(&self) -> usize {
        self.calls("create") + self.calls("update")
    }

    pub fn status_writes(&self) -> usize {
        self.calls("update_status")
    }

    fn read<T: DeserializeOwned>(&self, verb: &'static str, key: Key) -> Result<T, StoreError> {
        let mut state = self.state.lock().unwrap();
        state.call(verb, &key.1, &key.3)?;
        match state.objects.get(&key) {
            Some(value) => Ok(serde_json::from_value(value.clone())?),
            None => Err(StoreError::NotFound { kind: key.1, name: key.3 }),
        }
    }

    /// Replace a stored object with the result of `merge(stored, written)`, checking the
    /// resource version of `written`.
    fn write<K: StoreObject>(
        &self,
        verb: &'static str,
        obj: &K,
        merge: impl FnOnce(&Value, Value) -> Value,
    ) -> Result<K, StoreError> {
        let written = to_value(obj)?;
        let key = key_of(&written);
        let mut state = self.state.lock().unwrap();
        state.call(verb, &key.1, &key.3)?;

        let stored = state.objects.get(&key).cloned().ok_or_else(|| StoreError::NotFound {
            kind: key.1.clone(),
            name: key.3.clone(),
        })?;
        let token = written.pointer("/metadata/resourceVersion").and_then(Value::as_str);
        if token.is_some() && token != stored.pointer("/metadata/resourceVersion").and_then(Value::as_str) {
            return Err(StoreError::Conflict {
                kind: key.1,
                name: key.3,
                message: "the object has been modified".into(),
            });
        }

        let mut value = merge(&stored, written);
        value["metadata"]["uid"] = stored["metadata"]["uid"].clone();
        value["metadata"]["resourceVersion"] = json!(state.next_version());
        state.objects.insert(key, value.clone());
        Ok(serde_json::from_value(value)?)
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get<K: StoreObject>(&self, namespace: &str, name: &str) -> Result<K, StoreError> {
        self.read("get", typed_key::<K>(namespace, name))
    }

    async fn list<K: StoreObject>(&self, namespace: &str, selector: &Labels) -> Result<Vec<K>, StoreError> {
        let mut state = self.state.lock().unwrap();
        state.call("list", &kind_of::<K>(), "")?;
        state
            .objects
            .iter()
            .filter(|((api_version, kind, ns, _), _)| {
                api_version == &*K::api_version(&()) && kind == &*K::kind(&()) && ns == namespace
            })
            .filter(|(_, value)| matches_selector(value, selector))
            .map(|(_, value)| serde_json::from_value(value.clone()).map_err(StoreError::from))
            .collect()
    }

    async fn create<K: StoreObject>(&self, obj: &K) -> Result<K, StoreError> {
        let mut value = to_value(obj)?;
        let key = key_of(&value);
        let mut state = self.state.lock().unwrap();
        state.call("create", &key.1, &key.3)?;
        if state.objects.contains_key(&key) {
            return Err(StoreError::Conflict {
                kind: key.1,
                name: key.3,
                message: "already exists".into(),
            });
        }
        value["metadata"]["uid"] = json!(format!("uid-{}-{}", key.3, state.version));
        value["metadata"]["resourceVersion"] = json!(state.next_version());
        state.objects.insert(key, value.clone());
        Ok(serde_json::from_value(value)?)
    }

    async fn update<K: StoreObject>(&self, obj: &K) -> Result<K, StoreError> {
        self.write("update", obj, |stored, mut written| {
            match stored.get("status") {
                Some(status) => written["status"] = status.clone(),
                None => {
                    if let Some(written) = written.as_object_mut() {
                        written.remove("status");
                    }
                }
            }
            written
        })
    }

    async fn update_status<K: StoreObject>(&self, obj: &K) -> Result<K, StoreError> {
        self.write("update_status", obj, |stored, written| {
            let mut value = stored.clone();
            value["status"] = written.get("status").cloned().unwrap_or(Value::Null);
            value
        })
    }

    async fn get_dynamic(
        &self,
        resource: &ApiResource,
        namespace: &str,
        name: &str,
    ) -> Result<DynamicObject, StoreError> {
        let key = (
            resource.api_version.clone(),
            resource.kind.clone(),
            namespace.to_string(),
            name.to_string(),
        );
        self.read("get", key)
    }
}

/// Records Events in memory.
#[derive(Default)]
pub struct MemoryRecorder {
    events: Mutex<Vec<(EventType, String, String)>>,
}

impl MemoryRecorder {
    pub fn reasons(&self) -> Vec<String> {
        self.events.lock().unwrap().iter().map(|(_, reason, _)| reason.clone()).collect()
    }

    pub fn notes(&self) -> Vec<String> {
        self.events.lock().unwrap().iter().map(|(_, _, note)| note.clone()).collect()
    }

    pub fn warnings(&self) -> usize {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|(type_, _, _)| matches!(type_, EventType::Warning))
            .count()
    }
}

#[async_trait]
impl EventRecorder for MemoryRecorder {
    async fn publish(
        &self,
        _regarding: &ObjectReference,
        type_: EventType,
        reason: &str,
        _action: &str,
        note: String,
    ) {
        self.events.lock().unwrap().push((type_, reason.to_string(), note));
    }
}

pub fn service(namespace: &str, name: &str) -> Service {
    Service {
        metadata: ObjectMeta {
            name: Some(name.into()),
            namespace: Some(namespace.into()),
            ..Default::default()
        },
        ..Default::default()
    }
}

pub fn sqs_source(namespace: &str, name: &str, sink: Option<Destination>) -> AwsSqsSource {
    let mut source = AwsSqsSource::new(
        name,
        AwsSqsSourceSpec {
            arn: format!("arn:aws:sqs:us-west-2:123456789012:{name}"),
            credentials: None,
            source_spec: SourceSpec { sink, ce_overrides: None },
        },
    );
    source.metadata.namespace = Some(namespace.into());
    source.metadata.uid = Some(format!("uid-{name}"));
    source.metadata.generation = Some(1);
    source
}
