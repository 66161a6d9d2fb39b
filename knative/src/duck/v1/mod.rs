pub mod addressable_type;
pub mod knative_reference;
pub mod source_types;
pub mod status_types;

pub use addressable_type::{Addressable, AddressableErr, AddressableTypeExt};
pub use knative_reference::KReference;
pub use source_types::{
    CloudEventAttributes, CloudEventOverrides, Destination, SinkManager, SourceCondition,
    SourceConditionType, SourceSpec, SourceStatus,
};
pub use status_types::Status;
