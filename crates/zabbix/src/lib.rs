//! Monitoring-backend gateway: the contract the reconciliation engine
//! programs against, plus the Zabbix JSON-RPC 2.0 adapter.
//!
//! The gateway performs no retries of its own; retry policy lives with
//! the caller. All derived check/alert formats are in [`CheckDescriptor`]
//! and must match the backend byte for byte, since existing installations
//! key off these strings.

pub mod client;
pub mod error;
pub mod gateway;
pub mod types;

pub use client::ZabbixGateway;
pub use error::{GatewayError, Result};
pub use gateway::MonitoringGateway;
pub use types::{CheckDescriptor, CheckRecord, HostRef, check_exists, first_interface_id};
