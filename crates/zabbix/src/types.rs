//! Gateway data types and derived check formats.

use common::{InstanceId, Port};
use serde::{Deserialize, Serialize};

/// A monitored host as the backend resolves it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostRef {
    #[serde(rename = "hostid")]
    pub id: String,

    #[serde(rename = "host")]
    pub name: String,
}

/// One check (item) as the backend reports it.
///
/// Deletion echoes all of these fields back to the backend, so a listing
/// keeps everything it returns, not just the key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CheckRecord {
    #[serde(rename = "itemid")]
    pub id: String,

    #[serde(rename = "hostid")]
    pub host_id: String,

    #[serde(rename = "key_")]
    pub key: String,

    #[serde(rename = "interfaceid", default)]
    pub interface_id: String,

    #[serde(default)]
    pub name: String,

    #[serde(rename = "type", default)]
    pub item_type: String,

    #[serde(default)]
    pub value_type: String,

    #[serde(default)]
    pub data_type: String,

    #[serde(default)]
    pub delta: String,

    #[serde(default)]
    pub delay: String,

    #[serde(default)]
    pub history: String,

    #[serde(default)]
    pub trends: String,
}

/// Derived naming for one instance's check and alert rule.
///
/// Computed at the moment of convergence from `(instance, host, port)`,
/// never stored.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckDescriptor {
    pub name: String,
    pub key: String,
    pub trigger_description: String,
    pub trigger_expression: String,
}

impl CheckDescriptor {
    pub fn derive(id: &InstanceId, host_name: &str, port: &Port) -> Self {
        Self {
            name: format!("{id} game posts {port}"),
            key: Self::check_key(port),
            trigger_description: format!("{{HOST.NAME}} {id} game posts {port} is Down"),
            trigger_expression: format!("{{{host_name}:net.tcp.listen[{port}].last()}}=0"),
        }
    }

    /// The check key for a port, independent of the rest of the descriptor.
    pub fn check_key(port: &Port) -> String {
        format!("net.tcp.listen[{port}]")
    }
}

/// Exact `(host, key)` match over a listing.
pub fn check_exists(records: &[CheckRecord], host_id: &str, key: &str) -> bool {
    records.iter().any(|r| r.host_id == host_id && r.key == key)
}

/// First interface reference the host's existing checks deliver through.
pub fn first_interface_id<'a>(records: &'a [CheckRecord], host_id: &str) -> Option<&'a str> {
    records
        .iter()
        .find(|r| r.host_id == host_id && !r.interface_id.is_empty())
        .map(|r| r.interface_id.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(host_id: &str, key: &str, interface_id: &str) -> CheckRecord {
        CheckRecord {
            id: "10001".to_string(),
            host_id: host_id.to_string(),
            key: key.to_string(),
            interface_id: interface_id.to_string(),
            ..CheckRecord::default()
        }
    }

    #[test]
    fn descriptor_formats_are_exact() {
        let descriptor = CheckDescriptor::derive(
            &InstanceId::new("game01"),
            "app-host-3",
            &Port::new("4007"),
        );

        assert_eq!(descriptor.name, "game01 game posts 4007");
        assert_eq!(descriptor.key, "net.tcp.listen[4007]");
        assert_eq!(
            descriptor.trigger_description,
            "{HOST.NAME} game01 game posts 4007 is Down"
        );
        assert_eq!(
            descriptor.trigger_expression,
            "{app-host-3:net.tcp.listen[4007].last()}=0"
        );
    }

    #[test]
    fn check_exists_matches_host_and_key_exactly() {
        let records = vec![
            record("100", "net.tcp.listen[4001]", "1"),
            record("200", "net.tcp.listen[4002]", "1"),
        ];

        assert!(check_exists(&records, "100", "net.tcp.listen[4001]"));
        // Same key, different host.
        assert!(!check_exists(&records, "100", "net.tcp.listen[4002]"));
        assert!(!check_exists(&records, "300", "net.tcp.listen[4001]"));
    }

    #[test]
    fn first_interface_skips_records_without_one() {
        let records = vec![
            record("100", "agent.ping", ""),
            record("100", "net.tcp.listen[4001]", "7"),
            record("100", "net.tcp.listen[4002]", "8"),
        ];

        assert_eq!(first_interface_id(&records, "100"), Some("7"));
        assert_eq!(first_interface_id(&records, "999"), None);
    }

    #[test]
    fn check_record_round_trips_backend_field_names() {
        let body = r#"{
            "itemid": "23296",
            "hostid": "10084",
            "key_": "net.tcp.listen[4007]",
            "interfaceid": "1",
            "name": "game01 game posts 4007",
            "type": "0",
            "value_type": "3",
            "data_type": "0",
            "delta": "0",
            "delay": "120",
            "history": "7",
            "trends": "365"
        }"#;

        let parsed: CheckRecord = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.id, "23296");
        assert_eq!(parsed.key, "net.tcp.listen[4007]");
        assert_eq!(parsed.interface_id, "1");

        let echoed = serde_json::to_value(&parsed).unwrap();
        assert_eq!(echoed["itemid"], "23296");
        assert_eq!(echoed["key_"], "net.tcp.listen[4007]");
        assert_eq!(echoed["type"], "0");
    }
}
