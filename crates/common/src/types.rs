//! Identifiers shared across the workspace.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of a discovered instance directory.
///
/// Unique within one scan and stable across scans for the same running
/// instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstanceId(String);

impl InstanceId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for InstanceId {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

/// TCP listen port of an instance.
///
/// Kept as text end-to-end: it only ever feeds check-key templating,
/// never arithmetic.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Port(String);

impl Port {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Port {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instance_id_display_matches_directory_name() {
        let id = InstanceId::new("game01");
        assert_eq!(id.to_string(), "game01");
        assert_eq!(id.as_str(), "game01");
    }

    #[test]
    fn port_stays_textual() {
        let port = Port::new("4007");
        assert_eq!(format!("net.tcp.listen[{port}]"), "net.tcp.listen[4007]");
    }
}
