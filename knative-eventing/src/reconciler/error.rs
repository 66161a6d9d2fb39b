use super::sink::SinkError;
use super::store::StoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("sink could not be resolved: {0}")]
    Sink(#[from] SinkError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("failed to serialize {what}: {source}")]
    Serialization {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

impl Error {
    /// Whether the driver should requeue the Source with backoff.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Sink(err) => err.is_retryable(),
            Error::Store(err) => err.is_retryable(),
            Error::Serialization { .. } => false,
        }
    }

    /// The failure is recorded in the Source status and will not go away until the Source or the
    /// objects it references change.
    pub fn is_permanent(&self) -> bool {
        !self.is_retryable()
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
