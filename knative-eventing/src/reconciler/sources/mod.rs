//! Adapters of the Source kinds shipped with this crate.
mod awssnssource;
mod awssqssource;

pub use awssnssource::{AwsSnsAdapterBuilder, SNS_NOTIFICATION_EVENT_TYPE};
pub use awssqssource::{AwsSqsAdapterBuilder, SQS_MESSAGE_EVENT_TYPE};
