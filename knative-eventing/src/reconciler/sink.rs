use super::store::{Store, StoreError};
use knative::error::{DiscoveryError, Error as KnativeError};
use knative::{AddressableTypeExt, Destination, KReference};
use thiserror::Error;
use tracing::debug;
use url::Url;

pub const REASON_EMPTY_SINK_URI: &str = "EmptySinkURI";
pub const REASON_SINK_NOT_FOUND: &str = "SinkNotFound";

#[derive(Error, Debug)]
pub enum SinkError {
    /// The destination is malformed, or its referent does not advertise an address.
    #[error(transparent)]
    Invalid(#[from] KnativeError),
    #[error("{kind} {namespace}/{name} not found")]
    NotFound {
        kind: String,
        namespace: String,
        name: String,
    },
    #[error("failed to fetch sink: {0}")]
    Lookup(#[source] StoreError),
}

impl SinkError {
    /// Reason of the `SinkResolved` condition describing this failure.
    pub fn reason(&self) -> &'static str {
        match self {
            SinkError::Invalid(KnativeError::Discovery(DiscoveryError::EmptyDestination)) => {
                REASON_EMPTY_SINK_URI
            }
            _ => REASON_SINK_NOT_FOUND,
        }
    }

    /// Only transient failures of the store are worth retrying; everything else waits for the
    /// Source or its referent to change.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SinkError::Lookup(err) if err.is_retryable())
    }
}

impl From<DiscoveryError> for SinkError {
    fn from(err: DiscoveryError) -> Self {
        SinkError::Invalid(err.into())
    }
}

/// Turns the sink of a Source into a URI.
pub struct SinkResolver<'a, St> {
    store: &'a St,
    cluster_domain: &'a str,
}

impl<'a, St: Store> SinkResolver<'a, St> {
    pub fn new(store: &'a St, cluster_domain: &'a str) -> Self {
        SinkResolver { store, cluster_domain }
    }

    /// Resolve `destination` on behalf of a Source living in `namespace`.
    pub async fn resolve(&self, destination: Option<&Destination>, namespace: &str) -> Result<Url, SinkError> {
        let destination = destination.ok_or(DiscoveryError::EmptyDestination)?;
        let address = match destination.reference() {
            Some(reference) => Some(self.address_of(reference, namespace).await?),
            None => None,
        };
        Ok(destination.resolve_with(address)?)
    }

    async fn address_of(&self, reference: &KReference, namespace: &str) -> Result<Url, SinkError> {
        let resource = reference.api_resource()?;
        let namespace = reference.namespace_or(namespace);
        debug!(kind = %reference.kind, %namespace, name = %reference.name, "looking up sink");

        let referent = self
            .store
            .get_dynamic(&resource, namespace, &reference.name)
            .await
            .map_err(|err| match err {
                StoreError::NotFound { .. } => SinkError::NotFound {
                    kind: reference.kind.clone(),
                    namespace: namespace.to_string(),
                    name: reference.name.clone(),
                },
                err => SinkError::Lookup(err),
            })?;

        referent
            .try_get_address(self.cluster_domain)
            .map_err(|err| SinkError::Invalid(err.into()))
    }
}
