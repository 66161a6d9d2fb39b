//! Converges the adapter of a Source: resolves its sink, binds the identity its adapter runs as,
//! creates or updates the adapter workload and reports all of it in the Source status.
pub mod adapter;
pub mod availability;
pub mod config;
mod driver;
pub mod error;
pub mod events;
pub mod executor;
pub mod rbac;
pub mod semantic;
pub mod sink;
pub mod source;
pub mod sources;
pub mod status;
pub mod store;
pub mod workload;

#[cfg(test)]
mod testing;

pub use adapter::{common_env, AdapterSpec, WorkloadKind};
pub use availability::propagate;
pub use config::{AdapterImages, ReconcilerOptions};
pub use driver::{Reconciler, REASON_AUTHORIZATION_FAILED};
pub use error::{Error, Result};
pub use events::{EventRecorder, EventType, KubeEventRecorder};
pub use executor::{Convergence, Executor};
pub use rbac::AuthorizationReconciler;
pub use sink::{SinkError, SinkResolver};
pub use source::{AdapterBuilder, EventSource};
pub use sources::{AwsSnsAdapterBuilder, AwsSqsAdapterBuilder};
pub use status::sync_status;
pub use store::{KubeStore, Labels, Store, StoreError, StoreObject};
pub use workload::{Availability, Workload};
