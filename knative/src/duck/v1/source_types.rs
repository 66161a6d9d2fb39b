use super::{
    addressable_type::Addressable,
    knative_reference::KReference,
    status_types::Status,
};
use crate::derive::ConditionType;
use crate::error::DiscoveryError;
use knative_conditions::{ConditionAccessor, Conditions};
use enumset::EnumSetType;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use url::Url;

#[derive(Serialize, Deserialize, Default, Clone, Debug, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SourceSpec {
    /// Sink is a reference to an object that will resolve to a uri to use as the sink.
    pub sink: Option<Destination>,
    // CloudEventOverrides defines overrides to control the output format and
    // modifications of the event sent to the sink.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ce_overrides: Option<CloudEventOverrides>,
}

/// Destination represents a target of an invocation over HTTP.
#[derive(Deserialize, Serialize, Clone, Debug, Default, JsonSchema, PartialEq)]
pub struct Destination {
    /// Ref points to an Addressable.
    #[serde(rename = "ref", skip_serializing_if = "Option::is_none")]
    pub ref_: Option<KReference>,
    /// URI can be an absolute URL(non-empty scheme and non-empty host) pointing to the target or a relative URI.
    /// Relative URIs will be resolved using the base URI retrieved from Ref.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
}

impl From<KReference> for Destination {
    fn from(reference: KReference) -> Self {
        Destination {
            ref_: Some(KReference {
                // combine the group and api_version, handling the case that this was done already
                api_version: match (reference.api_version, reference.group) {
                    (Some(api_version), _) if api_version.contains('/') => Some(api_version),
                    (Some(api_version), Some(group)) => Some(group + "/" + &api_version),
                    (Some(api_version), None) => Some(api_version),
                    (None, _) => None,
                },
                group: None,
                kind: reference.kind,
                namespace: reference.namespace,
                name: reference.name,
            }),
            uri: None,
        }
    }
}

impl From<Url> for Destination {
    fn from(uri: Url) -> Self {
        Destination {
            ref_: None,
            uri: Some(uri.into()),
        }
    }
}

impl Destination {
    pub fn reference(&self) -> Option<&KReference> {
        self.ref_.as_ref()
    }

    /// Compute the final URI of the destination given the address of its Ref, if any.
    ///
    /// When both are set, `uri` is resolved relative to the Ref's address.
    pub fn resolve_with(&self, ref_address: Option<Url>) -> Result<Url, DiscoveryError> {
        match (ref_address, self.uri.as_deref()) {
            (Some(base), Some(uri)) => base.join(uri).map_err(|source| DiscoveryError::InvalidUri {
                uri: uri.to_string(),
                source,
            }),
            (Some(base), None) => Ok(base),
            (None, Some(uri)) => match Url::parse(uri) {
                Ok(url) => Ok(url),
                Err(url::ParseError::RelativeUrlWithoutBase) => {
                    Err(DiscoveryError::RelativeUriWithoutRef(uri.to_string()))
                }
                Err(source) => Err(DiscoveryError::InvalidUri { uri: uri.to_string(), source }),
            },
            (None, None) => Err(DiscoveryError::EmptyDestination),
        }
    }
}

/// CloudEventOverrides defines arguments for a Source that control the output
/// format of the CloudEvents produced by the Source.
#[derive(Deserialize, Serialize, Clone, Debug, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CloudEventOverrides {
    /// Extensions specify what attribute are added or overridden on the
    /// outbound event. Each `Extensions` key-value pair are set on the event as
    /// an attribute extension independently.
    pub extensions: Option<std::collections::BTreeMap<String, String>>,
}

/// CloudEventAttributes specifies the attributes that a Source
/// uses as part of its CloudEvents.
#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CloudEventAttributes {
    #[serde(rename = "type")]
    pub type_: Option<String>,
    pub source: Option<String>,
}

impl CloudEventAttributes {
    pub fn new(type_: impl Into<String>, source: impl Into<String>) -> Self {
        CloudEventAttributes {
            type_: Some(type_.into()),
            source: Some(source.into()),
        }
    }
}

/// A baseline [`ConditionType`] for [`SourceStatus`].
///
/// Custom conditions should implement [`SourceConditionType`] in order to be used by
/// [`SourceStatus`].
#[derive(ConditionType, EnumSetType, Deserialize, Serialize, Debug, JsonSchema)]
pub enum SourceCondition {
    Ready,
    /// A [`sink_uri`] has been set on the resource.
    ///
    /// [`sink_uri`]:./struct.SourceStatus.html#structfield.sink_uri
    #[dependent]
    SinkResolved
}

/// SourceStatus shows how we expect folks to embed Addressable in
/// their Status field.
#[derive(Deserialize, Serialize, Clone, Debug, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SourceStatus<S: SourceConditionType> {
    /// inherits Status, which currently provides:
    /// * ObservedGeneration - the 'Generation' of the Service that was last
    ///   processed by the controller.
    /// * Conditions - the latest available observations of a resource's current
    ///   state.
    #[serde(flatten)]
    pub status: Status<S>,
    /// SinkURI is the current active sink URI that has been configured for the
    /// Source.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sink_uri: Option<Url>,
    /// CloudEventAttributes are the specific attributes that the Source uses
    /// as part of its CloudEvents.
    #[serde(rename = "ceAttributes", skip_serializing_if = "Option::is_none")]
    pub cloud_event_attributes: Option<Vec<CloudEventAttributes>>,
    /// Address is set when the Source itself can receive events, e.g. a webhook.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<Addressable>,
}

impl<S: SourceConditionType> ConditionAccessor<S> for SourceStatus<S> {
    fn conditions(&mut self) -> &mut Conditions<S> {
        self.status.conditions()
    }
}

/// Provides management `sink_uri` on [`SourceStatus`].
///
/// This traits helps to discourage use of the `*sinkresolved()` methods from
/// [`SourceConditionManager`], which must be disambiguated when using a custom [`ConditionType`]
/// that also has `*sinkresolved()` methods.
pub trait SinkManager<S: SourceConditionType>: SourceConditionManager<S> {
    /// Return the [`SourceStatus`] of your CRD Status type.
    fn source_status(&mut self) -> &mut SourceStatus<S>;

    /// Set the condition that the source has a sink configured
    fn mark_sink(&mut self, uri: Url) {
        self.source_status().sink_uri = Some(uri);
        self.manager().mark_true(S::sinkresolved());
    }

    /// Set the condition that the source has no sink configured
    fn mark_no_sink(&mut self, reason: &str, message: Option<String>) {
        self.source_status().sink_uri = None;
        self.manager().mark_false(S::sinkresolved(), reason, message);
    }
}

impl<S: SourceConditionType> SinkManager<S> for SourceStatus<S> {
    fn source_status(&mut self) -> &mut SourceStatus<S> {
        self
    }
}
