//! Instance reconciler binary.

use anyhow::Context;
use reconciler::{Config, ReconciliationEngine, Registry, Scheduler};
use std::sync::Arc;
use zabbix::ZabbixGateway;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = match Config::load() {
        Ok(cfg) => cfg,
        Err(e) => {
            // Can't use tracing yet - not initialized
            eprintln!("Configuration error: {e}");
            eprintln!("Using default configuration");
            Config::default()
        }
    };

    common::logging::init_with(
        config.logging.level.as_deref().unwrap_or("info"),
        config.logging.format.as_deref() == Some("json"),
    );

    tracing::info!("Instance reconciler starting");

    let host_name = match config.engine.host_name.clone() {
        Some(name) => name,
        None => nix::unistd::gethostname()
            .context("failed to read local host name")?
            .into_string()
            .map_err(|_| anyhow::anyhow!("local host name is not valid UTF-8"))?,
    };

    let gateway = Arc::new(ZabbixGateway::new(
        &config.zabbix.api_url,
        &config.zabbix.username,
        &config.zabbix.password,
        config.zabbix.request_timeout,
    )?);
    let registry = Arc::new(Registry::new());
    let engine =
        ReconciliationEngine::new(gateway, registry, config.to_engine_settings(host_name));
    let scheduler = Scheduler::new(engine, config.engine.scan_interval, config.engine.failure_policy);

    tracing::info!(
        root_dir = %config.instances.root_dir,
        interval = ?config.engine.scan_interval,
        "entering reconciliation loop"
    );

    scheduler.run().await?;
    Ok(())
}
