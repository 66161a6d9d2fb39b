//! Knative eventing Sources and the reconciler that runs their receive adapters.
//!
//! Every Source kind only describes how its adapter should look ([`reconciler::AdapterBuilder`]);
//! resolving the sink, deploying the adapter, binding its permissions and reporting status is
//! shared by all kinds through [`reconciler::Reconciler`].
pub mod apis;
pub mod reconciler;
