use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::{core::SupervisorConfig, mqtt::client::MqttSettings};

/// Runtime configuration of the bridge.
///
/// Every field has a default, so a TOML file only needs the keys it changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// MQTT broker host
    pub broker_host: String,
    /// MQTT broker port
    pub broker_port: u16,
    /// MQTT client id; a random one is generated when absent
    pub client_id: Option<String>,
    /// MQTT keepalive interval in seconds
    pub keep_alive_secs: u64,
    /// Deobfuscate device reports (disable for plaintext firmware)
    pub decode_data: bool,
    /// Timeout of one device read in milliseconds
    pub read_timeout_ms: u64,
    /// Delay between retries in milliseconds
    pub retry_interval_ms: u64,
    /// Also append log lines to this file
    pub log_file: Option<String>,
    /// Log publications instead of connecting to a broker
    pub dry_run: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            broker_host: "127.0.0.1".to_string(),
            broker_port: 1883,
            client_id: None,
            keep_alive_secs: 5,
            decode_data: true,
            read_timeout_ms: 5000,
            retry_interval_ms: 1000,
            log_file: None,
            dry_run: false,
        }
    }
}

impl BridgeConfig {
    /// Parse configuration from a TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str).context("Invalid configuration")
    }

    /// Read configuration from a TOML file
    pub fn from_file(file_path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(file_path)
            .with_context(|| format!("Failed to read config file {file_path}"))?;
        Self::from_toml(&content).with_context(|| format!("in {file_path}"))
    }

    /// Client id to present to the broker.
    pub fn resolved_client_id(&self) -> String {
        self.client_id.clone().unwrap_or_else(|| {
            let id = uuid::Uuid::new_v4().simple().to_string();
            format!("co2mon-{}", &id[..8])
        })
    }

    pub fn mqtt_settings(&self) -> MqttSettings {
        MqttSettings {
            host: self.broker_host.clone(),
            port: self.broker_port,
            client_id: self.resolved_client_id(),
            keep_alive: Duration::from_secs(self.keep_alive_secs),
        }
    }

    pub fn supervisor_config(&self) -> SupervisorConfig {
        SupervisorConfig {
            decode_data: self.decode_data,
            read_timeout: Duration::from_millis(self.read_timeout_ms),
            retry_interval: Duration::from_millis(self.retry_interval_ms),
        }
    }
}
