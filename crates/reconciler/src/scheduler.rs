//! Fixed-interval driver for reconciliation passes.

use crate::config::FailurePolicy;
use crate::engine::{ReconcileError, ReconciliationEngine};
use std::time::Duration;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{error, info, warn};

/// Runs the engine once immediately, then on every interval tick, forever.
///
/// Passes never overlap: the engine joins its convergence tasks before
/// returning, and a pass that outlives the interval just delays the next
/// tick.
pub struct Scheduler {
    engine: ReconciliationEngine,
    scan_interval: Duration,
    failure_policy: FailurePolicy,
}

impl Scheduler {
    pub fn new(
        engine: ReconciliationEngine,
        scan_interval: Duration,
        failure_policy: FailurePolicy,
    ) -> Self {
        Self {
            engine,
            scan_interval,
            failure_policy,
        }
    }

    /// Run forever. Returns only on a fatal error in fail-fast mode.
    pub async fn run(self) -> Result<(), ReconcileError> {
        let mut ticker = interval(self.scan_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            // First tick fires immediately.
            ticker.tick().await;

            match self.engine.run_pass().await {
                Ok(summary) => {
                    if summary.changed() {
                        info!(
                            discovered = summary.discovered,
                            added = summary.added,
                            removed = summary.removed,
                            failed = summary.failed,
                            "pass complete"
                        );
                    }
                }
                Err(e) => match self.failure_policy {
                    FailurePolicy::FailFast => {
                        error!(error = %e, "reconciliation failed");
                        return Err(e);
                    }
                    FailurePolicy::Resilient => {
                        warn!(error = %e, "reconciliation pass failed; retrying next interval");
                    }
                },
            }
        }
    }
}
