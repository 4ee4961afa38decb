//! Per-instance configuration reading.
//!
//! An instance directory that was just created may not have its config
//! file yet; another process writes it while the instance starts. Reading
//! is therefore split into a bounded existence poll (`wait_for_config`)
//! and a pure parse over the file text (`parse_port`), composed by
//! `read_port`.

use crate::error::{InstanceError, Result};
use common::{InstanceId, Port};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Where the config lives and how long to wait for it.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadSettings {
    /// Config file name inside each instance directory.
    pub filename: String,

    /// Key of the port entry, matched as a line prefix.
    pub port_key: String,

    /// Separator between key and value.
    pub separator: String,

    /// Maximum number of existence checks before reading anyway.
    pub poll_attempts: u32,

    /// Delay between existence checks.
    pub poll_delay: Duration,
}

impl Default for ReadSettings {
    fn default() -> Self {
        Self {
            filename: "configuration.property".to_string(),
            port_key: "port".to_string(),
            separator: "=".to_string(),
            poll_attempts: 6,
            poll_delay: Duration::from_secs(10),
        }
    }
}

/// Expected config path for one instance.
pub fn config_path(root: &Path, id: &InstanceId, settings: &ReadSettings) -> PathBuf {
    root.join(id.as_str()).join(&settings.filename)
}

/// Poll for the config file to exist, making at most `attempts` checks
/// with `delay` between them.
///
/// Returns true as soon as the file exists. A file that never shows up is
/// not an error here: the caller reads anyway so the filesystem's own
/// error is the one surfaced.
pub async fn wait_for_config(path: &Path, attempts: u32, delay: Duration) -> bool {
    for attempt in 1..=attempts {
        if path.exists() {
            return true;
        }
        debug!(path = %path.display(), attempt, "config file not present yet");
        if attempt < attempts {
            tokio::time::sleep(delay).await;
        }
    }
    false
}

/// Extract the port from config file text.
///
/// The first line starting with `key` is split on `separator`; the second
/// field is the port. Pure function over the text.
pub fn parse_port(content: &str, key: &str, separator: &str, path: &Path) -> Result<Port> {
    for line in content.lines() {
        if line.starts_with(key) {
            if let Some(value) = line.split(separator).nth(1) {
                return Ok(Port::new(value));
            }
            break;
        }
    }
    Err(InstanceError::PortKeyMissing {
        key: key.to_string(),
        path: path.to_path_buf(),
    })
}

/// Read the listen port for one instance, waiting for its config file to
/// appear first.
///
/// May block its own task for up to `poll_attempts * poll_delay`; callers
/// must not run it on a path that serializes a whole reconciliation pass.
pub async fn read_port(root: &Path, id: &InstanceId, settings: &ReadSettings) -> Result<Port> {
    let path = config_path(root, id, settings);

    if !wait_for_config(&path, settings.poll_attempts, settings.poll_delay).await {
        info!(path = %path.display(), "config file still absent after polling, reading anyway");
    }

    let content = tokio::fs::read_to_string(&path)
        .await
        .map_err(|e| InstanceError::io(&path, e))?;

    parse_port(&content, &settings.port_key, &settings.separator, &path)
}
