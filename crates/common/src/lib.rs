//! Shared types and logging for instance-reconciler components.

pub mod logging;
pub mod types;

pub use types::{InstanceId, Port};
