use kube::core::DynamicObject;
use kube::{Resource, ResourceExt};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use url::Url;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AddressableErr {
    #[error("{0} ({1}) is not addressable")]
    NotAddressable(String, String),
    #[error("url missing in address of {0}")]
    UrlNotSet(String),
    #[error("object must have a name to be addressable")]
    MissingName,
    #[error("unable to parse url: {0}")]
    UrlParseErr(#[from] url::ParseError),
}

/// Addressable provides a generic mechanism for a custom resource
/// definition to indicate a destination for message delivery.
#[derive(Serialize, Deserialize, Clone, Debug, Default, JsonSchema, PartialEq)]
pub struct Addressable {
    pub url: Option<Url>,
}

impl From<Url> for Addressable {
    fn from(url: Url) -> Self {
        Addressable { url: Some(url) }
    }
}

#[doc(hidden)]
/// Construct the uri from the service metadata
fn build_service_url(name: &str, namespace: &str, cluster_domain: &str) -> Result<Url, AddressableErr> {
    let url = Url::parse(&format!("http://{name}.{namespace}.svc.{cluster_domain}"))?;

    Ok(url)
}

#[doc(hidden)]
/// Parse a url from a &serde_json::Value containing a status. This avoids a clone of data.
fn parse_url_from_obj_data(name: &str, kind: &str, data: &Value) -> Result<Url, AddressableErr> {
    if let Some(data) = data.as_object() {
        if let Some(status) = data.get("status").and_then(Value::as_object) {
            if let Some(address) = status.get("address").and_then(Value::as_object) {
                return match address.get("url").and_then(Value::as_str).filter(|u| !u.is_empty()) {
                    Some(url) => Ok(Url::parse(url)?),
                    None => Err(AddressableErr::UrlNotSet(name.to_string()))
                }
            }
        }
    }
    Err(AddressableErr::NotAddressable(name.to_string(), kind.to_string()))
}

/// Reads the address advertised by an object.
///
/// Kubernetes Services are addressed by their cluster DNS name, everything else must carry a
/// `status.address.url`.
pub trait AddressableTypeExt {
    fn try_get_address(&self, cluster_domain: &str) -> Result<Url, AddressableErr>;
}

impl AddressableTypeExt for DynamicObject {
    fn try_get_address(&self, cluster_domain: &str) -> Result<Url, AddressableErr> {
        let name = self.meta().name.as_ref().ok_or(AddressableErr::MissingName)?;
        let namespace = self.namespace().unwrap_or_else(|| "default".into());

        match &self.types {
            Some(t) => match (t.api_version.as_ref(), t.kind.as_ref()) {
                ("v1", "Service") => build_service_url(name, &namespace, cluster_domain),
                _ => parse_url_from_obj_data(name, t.kind.as_ref(), &self.data)
            }
            None => Err(AddressableErr::NotAddressable(name.to_string(), "unknown".to_string()))
        }
    }
}
