//! Reconciliation passes: scan, diff, converge.

use crate::config::{DiffMode, FailurePolicy};
use crate::registry::Registry;
use common::{InstanceId, Port};
use dashmap::DashMap;
use instance::ReadSettings;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};
use zabbix::{
    CheckDescriptor, GatewayError, HostRef, MonitoringGateway, check_exists, first_interface_id,
};

#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error("instance discovery failed: {0}")]
    Discovery(#[source] instance::InstanceError),

    #[error("instance config error: {0}")]
    Instance(#[from] instance::InstanceError),

    #[error("gateway error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("convergence task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Everything one pass needs to know.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub root_dir: PathBuf,
    pub dir_prefix: String,
    pub read: ReadSettings,
    pub host_name: String,
    pub diff_mode: DiffMode,
    pub failure_policy: FailurePolicy,
}

/// Outcome counts for one pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PassSummary {
    pub discovered: usize,
    pub added: usize,
    pub removed: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl PassSummary {
    pub fn changed(&self) -> bool {
        self.added + self.removed + self.failed > 0
    }
}

enum Action {
    Added,
    Removed,
}

/// Drives convergence between discovered instances and registered checks.
///
/// States per instance are never stored; they are inferred each pass from
/// set membership: present-but-unregistered instances get an addition
/// convergence, registered-but-absent ones a removal convergence.
pub struct ReconciliationEngine {
    gateway: Arc<dyn MonitoringGateway>,
    registry: Arc<Registry>,
    settings: Arc<EngineSettings>,
    in_flight: Arc<DashMap<InstanceId, ()>>,
}

/// Removes the in-flight reservation when a convergence unit finishes,
/// whichever way it finishes.
struct InFlightGuard {
    map: Arc<DashMap<InstanceId, ()>>,
    id: InstanceId,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.map.remove(&self.id);
    }
}

impl ReconciliationEngine {
    pub fn new(
        gateway: Arc<dyn MonitoringGateway>,
        registry: Arc<Registry>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            gateway,
            registry,
            settings: Arc::new(settings),
            in_flight: Arc::new(DashMap::new()),
        }
    }

    /// One reconciliation pass.
    ///
    /// Convergence units run concurrently and are all joined before this
    /// returns; passes never overlap. In resilient mode a unit's failure
    /// is counted and logged, and the instance stays in its prior state;
    /// in fail-fast mode the first failure aborts the pass with an error.
    pub async fn run_pass(&self) -> Result<PassSummary, ReconcileError> {
        let snapshot = instance::scan(&self.settings.root_dir, &self.settings.dir_prefix)
            .map_err(ReconcileError::Discovery)?;

        let host = self.gateway.resolve_host(&self.settings.host_name).await?;

        let (to_add, to_remove) = self.diff(&snapshot);
        let mut summary = PassSummary {
            discovered: snapshot.len(),
            ..PassSummary::default()
        };

        if to_add.is_empty() && to_remove.is_empty() {
            debug!(discovered = snapshot.len(), "nothing to converge");
            return Ok(summary);
        }

        info!(
            discovered = snapshot.len(),
            registered = self.registry.len(),
            add = to_add.len(),
            remove = to_remove.len(),
            "reconciliation pass"
        );

        let mut tasks: JoinSet<(InstanceId, Result<Action, ReconcileError>)> = JoinSet::new();

        for id in to_add {
            let Some(guard) = self.reserve(&id) else {
                summary.skipped += 1;
                continue;
            };
            let gateway = Arc::clone(&self.gateway);
            let registry = Arc::clone(&self.registry);
            let settings = Arc::clone(&self.settings);
            let host = host.clone();
            tasks.spawn(async move {
                let _guard = guard;
                let result = converge_add(gateway, registry, settings, host, id.clone()).await;
                (id, result)
            });
        }

        for (id, port) in to_remove {
            let Some(guard) = self.reserve(&id) else {
                summary.skipped += 1;
                continue;
            };
            let gateway = Arc::clone(&self.gateway);
            let registry = Arc::clone(&self.registry);
            let host = host.clone();
            tasks.spawn(async move {
                let _guard = guard;
                let result = converge_remove(gateway, registry, host, id.clone(), port).await;
                (id, result)
            });
        }

        let mut first_error = None;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((id, Ok(Action::Added))) => {
                    summary.added += 1;
                    debug!(instance = %id, "addition convergence complete");
                }
                Ok((id, Ok(Action::Removed))) => {
                    summary.removed += 1;
                    debug!(instance = %id, "removal convergence complete");
                }
                Ok((id, Err(e))) => {
                    summary.failed += 1;
                    if self.settings.failure_policy == FailurePolicy::FailFast
                        && first_error.is_none()
                    {
                        warn!(instance = %id, error = %e, "convergence failed, aborting pass");
                        first_error = Some(e);
                        tasks.abort_all();
                    } else {
                        warn!(
                            instance = %id,
                            error = %e,
                            "convergence failed; instance left in prior state"
                        );
                    }
                }
                Err(join_error) if join_error.is_cancelled() => {}
                Err(join_error) => return Err(ReconcileError::Join(join_error)),
            }
        }

        if let Some(e) = first_error {
            return Err(e);
        }
        Ok(summary)
    }

    /// Reserve an instance for convergence. None when a unit for the same
    /// instance is already in flight.
    fn reserve(&self, id: &InstanceId) -> Option<InFlightGuard> {
        if self.in_flight.insert(id.clone(), ()).is_some() {
            warn!(instance = %id, "convergence already in flight, skipping");
            return None;
        }
        Some(InFlightGuard {
            map: Arc::clone(&self.in_flight),
            id: id.clone(),
        })
    }

    /// Compute which instances to add and which to remove this pass.
    fn diff(&self, snapshot: &[InstanceId]) -> (Vec<InstanceId>, Vec<(InstanceId, Port)>) {
        let registered = self.registry.snapshot();

        let additions = || {
            snapshot
                .iter()
                .filter(|id| !registered.contains_key(*id))
                .cloned()
                .collect::<Vec<_>>()
        };
        let removals = || {
            let present: HashSet<&InstanceId> = snapshot.iter().collect();
            registered
                .iter()
                .filter(|(id, _)| !present.contains(id))
                .map(|(id, port)| (id.clone(), port.clone()))
                .collect::<Vec<_>>()
        };

        match self.settings.diff_mode {
            DiffMode::Symmetric => (additions(), removals()),
            DiffMode::Cardinality => {
                // Legacy gate: one direction per pass. Equal sizes with
                // different membership converge nothing; that blind spot is
                // part of the compatibility contract.
                if snapshot.len() > registered.len() {
                    (additions(), Vec::new())
                } else if snapshot.len() < registered.len() {
                    (Vec::new(), removals())
                } else {
                    (Vec::new(), Vec::new())
                }
            }
        }
    }
}

/// Bring one discovered instance under monitoring.
///
/// Idempotent against a backend that already holds the check: creation is
/// skipped but the alert rule is still ensured, covering a backend that
/// got the check but lost the rule.
async fn converge_add(
    gateway: Arc<dyn MonitoringGateway>,
    registry: Arc<Registry>,
    settings: Arc<EngineSettings>,
    host: HostRef,
    id: InstanceId,
) -> Result<Action, ReconcileError> {
    let port = instance::read_port(&settings.root_dir, &id, &settings.read).await?;
    let descriptor = CheckDescriptor::derive(&id, &host.name, &port);

    let records = gateway.list_checks(&host).await?;

    if check_exists(&records, &host.id, &descriptor.key) {
        debug!(instance = %id, key = %descriptor.key, "check already present");
        if !gateway
            .alert_rule_exists(&host, &descriptor.trigger_expression)
            .await?
        {
            info!(
                instance = %id,
                expression = %descriptor.trigger_expression,
                "alert rule missing for existing check, creating"
            );
            gateway
                .create_alert_rule(&descriptor.trigger_description, &descriptor.trigger_expression)
                .await?;
        }
        registry.insert(id, port);
        return Ok(Action::Added);
    }

    let interface_id = first_interface_id(&records, &host.id)
        .ok_or_else(|| GatewayError::NoInterface(host.name.clone()))?
        .to_string();

    info!(instance = %id, key = %descriptor.key, port = %port, "creating check and alert rule");
    gateway.create_check(&descriptor, &host, &interface_id).await?;
    gateway
        .create_alert_rule(&descriptor.trigger_description, &descriptor.trigger_expression)
        .await?;

    registry.insert(id, port);
    Ok(Action::Added)
}

/// Take one stale instance out of monitoring.
///
/// A check already absent from the backend counts as success; the
/// registry entry is dropped either way.
async fn converge_remove(
    gateway: Arc<dyn MonitoringGateway>,
    registry: Arc<Registry>,
    host: HostRef,
    id: InstanceId,
    port: Port,
) -> Result<Action, ReconcileError> {
    let key = CheckDescriptor::check_key(&port);
    let records = gateway.list_checks(&host).await?;

    match records.iter().find(|r| r.host_id == host.id && r.key == key) {
        Some(record) => {
            info!(instance = %id, key = %key, "deleting check");
            gateway.delete_check(record).await?;
        }
        None => {
            debug!(instance = %id, key = %key, "check already absent");
        }
    }

    registry.remove(&id);
    Ok(Action::Removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use mockall::mock;
    use std::path::Path;
    use std::time::Duration;
    use zabbix::{CheckRecord, Result as GatewayResult};

    mock! {
        Gateway {}

        #[async_trait]
        impl MonitoringGateway for Gateway {
            async fn resolve_host(&self, host_name: &str) -> GatewayResult<HostRef>;
            async fn list_checks(&self, host: &HostRef) -> GatewayResult<Vec<CheckRecord>>;
            async fn create_check(
                &self,
                descriptor: &CheckDescriptor,
                host: &HostRef,
                interface_id: &str,
            ) -> GatewayResult<()>;
            async fn delete_check(&self, record: &CheckRecord) -> GatewayResult<()>;
            async fn alert_rule_exists(&self, host: &HostRef, expression: &str) -> GatewayResult<bool>;
            async fn create_alert_rule(&self, description: &str, expression: &str) -> GatewayResult<()>;
        }
    }

    fn test_settings(root: &Path, diff_mode: DiffMode) -> EngineSettings {
        EngineSettings {
            root_dir: root.to_path_buf(),
            dir_prefix: "game".to_string(),
            read: ReadSettings {
                poll_attempts: 1,
                poll_delay: Duration::from_millis(1),
                ..ReadSettings::default()
            },
            host_name: "test-host".to_string(),
            diff_mode,
            failure_policy: FailurePolicy::Resilient,
        }
    }

    fn engine_with(
        gateway: MockGateway,
        registry: Arc<Registry>,
        root: &Path,
        diff_mode: DiffMode,
    ) -> ReconciliationEngine {
        ReconciliationEngine::new(Arc::new(gateway), registry, test_settings(root, diff_mode))
    }

    #[test]
    fn symmetric_diff_computes_both_directions() {
        let registry = Arc::new(Registry::new());
        registry.insert(InstanceId::new("gameA"), Port::new("4001"));
        registry.insert(InstanceId::new("gameB"), Port::new("4002"));

        let root = tempfile::tempdir().unwrap();
        let engine = engine_with(
            MockGateway::new(),
            registry,
            root.path(),
            DiffMode::Symmetric,
        );

        let snapshot = vec![InstanceId::new("gameA"), InstanceId::new("gameC")];
        let (to_add, to_remove) = engine.diff(&snapshot);

        assert_eq!(to_add, vec![InstanceId::new("gameC")]);
        assert_eq!(to_remove, vec![(InstanceId::new("gameB"), Port::new("4002"))]);
    }

    #[test]
    fn cardinality_diff_does_nothing_on_equal_sizes() {
        let registry = Arc::new(Registry::new());
        registry.insert(InstanceId::new("gameA"), Port::new("4001"));
        registry.insert(InstanceId::new("gameB"), Port::new("4002"));

        let root = tempfile::tempdir().unwrap();
        let engine = engine_with(
            MockGateway::new(),
            registry,
            root.path(),
            DiffMode::Cardinality,
        );

        // Same size, different membership: the legacy gate converges nothing.
        let snapshot = vec![InstanceId::new("gameA"), InstanceId::new("gameC")];
        let (to_add, to_remove) = engine.diff(&snapshot);

        assert!(to_add.is_empty());
        assert!(to_remove.is_empty());
    }

    #[test]
    fn cardinality_diff_single_direction() {
        let registry = Arc::new(Registry::new());
        registry.insert(InstanceId::new("gameA"), Port::new("4001"));

        let root = tempfile::tempdir().unwrap();
        let engine = engine_with(
            MockGateway::new(),
            registry,
            root.path(),
            DiffMode::Cardinality,
        );

        let snapshot = vec![InstanceId::new("gameA"), InstanceId::new("gameB")];
        let (to_add, to_remove) = engine.diff(&snapshot);
        assert_eq!(to_add, vec![InstanceId::new("gameB")]);
        assert!(to_remove.is_empty());

        let (to_add, to_remove) = engine.diff(&[]);
        assert!(to_add.is_empty());
        assert_eq!(to_remove.len(), 1);
    }

    #[tokio::test]
    async fn pass_fails_when_discovery_fails() {
        let root = tempfile::tempdir().unwrap();
        let missing = root.path().join("does-not-exist");

        let engine = engine_with(
            MockGateway::new(),
            Arc::new(Registry::new()),
            &missing,
            DiffMode::Symmetric,
        );

        let err = engine.run_pass().await.unwrap_err();
        assert!(matches!(err, ReconcileError::Discovery(_)));
    }

    #[tokio::test]
    async fn pass_fails_when_host_cannot_be_resolved() {
        let root = tempfile::tempdir().unwrap();
        std::fs::create_dir(root.path().join("game01")).unwrap();

        let mut gateway = MockGateway::new();
        gateway
            .expect_resolve_host()
            .returning(|name| Err(GatewayError::HostNotFound(name.to_string())));

        let engine = engine_with(
            gateway,
            Arc::new(Registry::new()),
            root.path(),
            DiffMode::Symmetric,
        );

        let err = engine.run_pass().await.unwrap_err();
        assert!(matches!(
            err,
            ReconcileError::Gateway(GatewayError::HostNotFound(_))
        ));
    }

    #[tokio::test]
    async fn addition_without_any_interface_fails_that_instance_only() {
        let root = tempfile::tempdir().unwrap();
        std::fs::create_dir(root.path().join("game01")).unwrap();
        std::fs::write(
            root.path().join("game01/configuration.property"),
            "port=4001\n",
        )
        .unwrap();

        let mut gateway = MockGateway::new();
        gateway.expect_resolve_host().returning(|_| {
            Ok(HostRef {
                id: "100".to_string(),
                name: "test-host".to_string(),
            })
        });
        // No existing checks at all, so no interface to deliver through.
        gateway.expect_list_checks().returning(|_| Ok(Vec::new()));

        let registry = Arc::new(Registry::new());
        let engine = engine_with(gateway, Arc::clone(&registry), root.path(), DiffMode::Symmetric);

        let summary = engine.run_pass().await.unwrap();
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.added, 0);
        assert!(registry.is_empty());
    }
}
