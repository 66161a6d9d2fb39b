mod awssnssource;
mod awssqssource;

pub use awssnssource::{AwsSnsSource, AwsSnsSourceSpec};
pub use awssqssource::{AwsSqsSource, AwsSqsSourceSpec};

use k8s_openapi::api::core::v1::{EnvVar, EnvVarSource, SecretKeySelector};
use knative::derive::ConditionType;
use knative::{SourceConditionType, SourceStatus};
use enumset::EnumSetType;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Conditions of a Source whose events are received by an adapter workload.
#[derive(ConditionType, EnumSetType, Deserialize, Serialize, Debug, JsonSchema)]
pub enum AdapterCondition {
    Ready,
    /// The sink has been resolved to a URI.
    #[dependent]
    SinkResolved,
    /// The identity and permissions required by the adapter are in place.
    #[dependent]
    AuthorizationBound,
    /// The adapter workload is available.
    #[dependent]
    Deployed,
}

impl SourceConditionType for AdapterCondition {
    fn sinkresolved() -> Self {
        AdapterCondition::SinkResolved
    }
}

/// Status shared by all Sources backed by an adapter.
pub type EventSourceStatus = SourceStatus<AdapterCondition>;

/// Credentials used by an adapter to authenticate against AWS.
#[derive(Serialize, Deserialize, Clone, Debug, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AwsCredentials {
    #[serde(rename = "accessKeyID", skip_serializing_if = "Option::is_none")]
    pub access_key_id: Option<ValueFromField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret_access_key: Option<ValueFromField>,
}

impl AwsCredentials {
    /// Environment variables exposing the credentials to the adapter.
    pub fn env_vars(&self) -> Vec<EnvVar> {
        [
            ("AWS_ACCESS_KEY_ID", &self.access_key_id),
            ("AWS_SECRET_ACCESS_KEY", &self.secret_access_key),
        ]
        .into_iter()
        .filter_map(|(name, field)| field.as_ref().map(|f| f.to_env_var(name)))
        .collect()
    }
}

/// A value given either literally or as a reference to a Secret key.
#[derive(Serialize, Deserialize, Clone, Debug, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ValueFromField {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_from_secret: Option<SecretKeySelector>,
}

impl ValueFromField {
    pub fn to_env_var(&self, name: &str) -> EnvVar {
        match &self.value_from_secret {
            Some(secret) => EnvVar {
                name: name.to_string(),
                value_from: Some(EnvVarSource {
                    secret_key_ref: Some(secret.clone()),
                    ..Default::default()
                }),
                ..Default::default()
            },
            None => EnvVar {
                name: name.to_string(),
                value: self.value.clone(),
                ..Default::default()
            },
        }
    }
}
