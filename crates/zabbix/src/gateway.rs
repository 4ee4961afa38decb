//! The engine-facing gateway contract.

use crate::error::Result;
use crate::types::{CheckDescriptor, CheckRecord, HostRef};
use async_trait::async_trait;

/// Operations the reconciliation engine needs from a monitoring backend.
///
/// Every operation is safe to retry at the call site; the gateway itself
/// never retries.
#[async_trait]
pub trait MonitoringGateway: Send + Sync {
    /// Look up the host record for a host name.
    async fn resolve_host(&self, host_name: &str) -> Result<HostRef>;

    /// List all checks registered for a host.
    async fn list_checks(&self, host: &HostRef) -> Result<Vec<CheckRecord>>;

    /// Create the check described by `descriptor`, delivered through the
    /// given network interface.
    async fn create_check(
        &self,
        descriptor: &CheckDescriptor,
        host: &HostRef,
        interface_id: &str,
    ) -> Result<()>;

    /// Delete a check. The full original record is echoed back; the
    /// backend requires the immutable delivery fields alongside the id.
    async fn delete_check(&self, record: &CheckRecord) -> Result<()>;

    /// Whether an alert rule with exactly this expression exists on the host.
    async fn alert_rule_exists(&self, host: &HostRef, expression: &str) -> Result<bool>;

    /// Create an alert rule.
    async fn create_alert_rule(&self, description: &str, expression: &str) -> Result<()>;
}
