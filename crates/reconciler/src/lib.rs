//! Game-instance monitoring reconciler.
//!
//! Keeps a Zabbix backend's TCP-listen checks synchronized with the set
//! of game-server instance directories present on the local host.
//!
//! # Components
//!
//! - **Registry**: the `instance -> port` table the process believes is
//!   currently monitored
//! - **ReconciliationEngine**: one pass of scan, diff, and concurrent
//!   per-instance convergence
//! - **Scheduler**: drives the engine on a fixed interval, forever

pub mod config;
pub mod engine;
pub mod registry;
pub mod scheduler;

pub use config::{Config, ConfigError, DiffMode, FailurePolicy};
pub use engine::{EngineSettings, PassSummary, ReconcileError, ReconciliationEngine};
pub use registry::Registry;
pub use scheduler::Scheduler;
