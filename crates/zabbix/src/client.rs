//! Zabbix JSON-RPC 2.0 adapter.

use crate::error::{GatewayError, Result};
use crate::gateway::MonitoringGateway;
use crate::types::{CheckDescriptor, CheckRecord, HostRef};
use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info};

// Item and trigger constants the existing installations expect.
const ITEM_TYPE_ZABBIX_AGENT: u32 = 0;
const ITEM_VALUE_TYPE_UNSIGNED: u32 = 3;
const ITEM_DATA_TYPE_DECIMAL: u32 = 0;
const ITEM_DELAY_SECS: u32 = 120;
const ITEM_HISTORY_DAYS: u32 = 7;
const ITEM_TRENDS_DAYS: u32 = 365;
const TRIGGER_PRIORITY_HIGH: u32 = 4;

/// Zabbix API gateway.
///
/// Authenticates lazily, once per gateway session; the token is cached
/// for the lifetime of the value.
pub struct ZabbixGateway {
    client: reqwest::Client,
    api_url: String,
    username: String,
    password: String,
    token: Mutex<Option<String>>,
    next_id: AtomicU64,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
    #[serde(default)]
    data: String,
}

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct TriggerRecord {
    #[serde(default)]
    expression: String,
}

impl ZabbixGateway {
    pub fn new(
        api_url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            api_url: api_url.into(),
            username: username.into(),
            password: password.into(),
            token: Mutex::new(None),
            next_id: AtomicU64::new(1),
        })
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
        auth: Option<&str>,
    ) -> Result<T> {
        let mut body = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": self.next_id.fetch_add(1, Ordering::Relaxed),
        });
        if let Some(token) = auth {
            body["auth"] = json!(token);
        }

        debug!(method, "zabbix rpc call");
        let response: RpcResponse<T> = self
            .client
            .post(&self.api_url)
            .json(&body)
            .send()
            .await?
            .json()
            .await?;

        if let Some(error) = response.error {
            return Err(GatewayError::Rpc {
                method: method.to_string(),
                code: error.code,
                message: error.message,
                data: error.data,
            });
        }
        response.result.ok_or_else(|| GatewayError::Rpc {
            method: method.to_string(),
            code: 0,
            message: "response carried neither result nor error".to_string(),
            data: String::new(),
        })
    }

    async fn token(&self) -> Result<String> {
        let mut guard = self.token.lock().await;
        if let Some(token) = guard.as_ref() {
            return Ok(token.clone());
        }

        let token: String = self
            .call(
                "user.login",
                json!({"user": self.username, "password": self.password}),
                None,
            )
            .await
            .map_err(|e| GatewayError::Auth(e.to_string()))?;

        info!(url = %self.api_url, "authenticated zabbix api session");
        *guard = Some(token.clone());
        Ok(token)
    }

    async fn authed<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T> {
        let token = self.token().await?;
        self.call(method, params, Some(&token)).await
    }
}

fn create_check_params(descriptor: &CheckDescriptor, host: &HostRef, interface_id: &str) -> Value {
    json!([{
        "name": descriptor.name,
        "key_": descriptor.key,
        "hostid": host.id,
        "interfaceid": interface_id,
        "type": ITEM_TYPE_ZABBIX_AGENT,
        "value_type": ITEM_VALUE_TYPE_UNSIGNED,
        "data_type": ITEM_DATA_TYPE_DECIMAL,
        "delay": ITEM_DELAY_SECS,
        "history": ITEM_HISTORY_DAYS,
        "trends": ITEM_TRENDS_DAYS,
    }])
}

#[async_trait]
impl MonitoringGateway for ZabbixGateway {
    async fn resolve_host(&self, host_name: &str) -> Result<HostRef> {
        let hosts: Vec<HostRef> = self
            .authed(
                "host.get",
                json!({
                    "filter": {"host": [host_name]},
                    "output": ["hostid", "host"],
                }),
            )
            .await?;

        hosts
            .into_iter()
            .next()
            .ok_or_else(|| GatewayError::HostNotFound(host_name.to_string()))
    }

    async fn list_checks(&self, host: &HostRef) -> Result<Vec<CheckRecord>> {
        self.authed(
            "item.get",
            json!({
                "hostids": [host.id],
                "output": [
                    "itemid", "hostid", "key_", "interfaceid", "name", "type",
                    "value_type", "data_type", "delta", "delay", "history", "trends",
                ],
            }),
        )
        .await
    }

    async fn create_check(
        &self,
        descriptor: &CheckDescriptor,
        host: &HostRef,
        interface_id: &str,
    ) -> Result<()> {
        info!(key = %descriptor.key, name = %descriptor.name, host = %host.name, "creating check");
        let params = create_check_params(descriptor, host, interface_id);
        let _: Value = self.authed("item.create", params).await?;
        Ok(())
    }

    async fn delete_check(&self, record: &CheckRecord) -> Result<()> {
        info!(key = %record.key, name = %record.name, "deleting check");
        // The backend wants the full record echoed back, not just the id.
        let params = serde_json::to_value(std::slice::from_ref(record))?;
        let _: Value = self.authed("item.delete", params).await?;
        Ok(())
    }

    async fn alert_rule_exists(&self, host: &HostRef, expression: &str) -> Result<bool> {
        let triggers: Vec<TriggerRecord> = self
            .authed(
                "trigger.get",
                json!({
                    "hostids": [host.id],
                    "output": ["triggerid", "expression"],
                    "expandExpression": true,
                }),
            )
            .await?;

        Ok(triggers.iter().any(|t| t.expression == expression))
    }

    async fn create_alert_rule(&self, description: &str, expression: &str) -> Result<()> {
        info!(expression, "creating alert rule");
        let _: Value = self
            .authed(
                "trigger.create",
                json!([{
                    "description": description,
                    "expression": expression,
                    "priority": TRIGGER_PRIORITY_HIGH,
                }]),
            )
            .await?;
        Ok(())
    }
}
