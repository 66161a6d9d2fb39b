use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Discovery errors
    #[error("Error from discovery: {0}")]
    Discovery(#[from] DiscoveryError),
    /// The referent does not advertise an address
    #[error("Error from addressable: {0}")]
    Addressable(#[from] crate::AddressableErr),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DiscoveryError {
    #[error("destination missing Ref and URI, expected at least one")]
    EmptyDestination,
    #[error("relative URI {0:?} requires a Ref to resolve against")]
    RelativeUriWithoutRef(String),
    #[error("invalid URI {uri:?}: {source}")]
    InvalidUri {
        uri: String,
        #[source]
        source: url::ParseError,
    },
    #[error("reference to {kind} {name:?} has no apiVersion")]
    MissingApiVersion { kind: String, name: String },
}
