use anyhow::Result;
use serde::Serialize;

use super::{PublishSink, QOS_EXACTLY_ONCE};
use crate::protocol::Channel;

/// Base of every state and error topic.
pub const TOPIC_BASE: &str = "homeassistant/sensor/co2mon";

/// State topic of a channel, e.g. `homeassistant/sensor/co2mon/temp`.
pub fn state_topic(channel: Channel) -> String {
    format!("{TOPIC_BASE}/{channel}")
}

/// Error topic of a channel, e.g. `homeassistant/sensor/co2mon/co2/error`.
pub fn error_topic(channel: Channel) -> String {
    format!("{TOPIC_BASE}/{channel}/error")
}

/// Discovery config topic of a channel.
pub fn discovery_topic(channel: Channel) -> &'static str {
    match channel {
        Channel::Co2 => "homeassistant/sensor/co2monC/config",
        Channel::Temp => "homeassistant/sensor/co2monT/config",
    }
}

/// Device registry entry shared by both sensors.
#[derive(Debug, Clone, Serialize)]
pub struct DeviceInfo {
    pub identifiers: Vec<String>,
    pub name: String,
    pub model: String,
    pub manufacturer: String,
    pub sw_version: String,
}

impl Default for DeviceInfo {
    fn default() -> Self {
        Self {
            identifiers: vec!["mt8057".to_string(), "co2mon".to_string()],
            name: "DaDget MT8057".to_string(),
            model: "MT8057".to_string(),
            manufacturer: "DaDget".to_string(),
            sw_version: "1.x".to_string(),
        }
    }
}

/// Home Assistant MQTT discovery document (abbreviated keys).
#[derive(Debug, Clone, Serialize)]
pub struct DiscoveryConfig {
    pub device: DeviceInfo,
    pub obj_id: String,
    pub unique_id: String,
    #[serde(rename = "~")]
    pub base_topic: String,
    pub dev_cla: String,
    pub name: String,
    pub unit_of_meas: String,
    pub stat_t: String,
    pub err_t: String,
}

impl DiscoveryConfig {
    pub fn for_channel(channel: Channel) -> Self {
        let (dev_cla, name, unit) = match channel {
            Channel::Co2 => ("carbon_dioxide", "DaDget CO2", "ppm"),
            Channel::Temp => ("temperature", "DaDget Temp", "°C"),
        };
        Self {
            device: DeviceInfo::default(),
            obj_id: format!("co2mon_{channel}"),
            unique_id: format!("co2mon_{channel}_sensor"),
            base_topic: TOPIC_BASE.to_string(),
            dev_cla: dev_cla.to_string(),
            name: name.to_string(),
            unit_of_meas: unit.to_string(),
            stat_t: format!("~/{channel}"),
            err_t: format!("~/{channel}/error"),
        }
    }
}

/// Publish the retained discovery documents for both channels.
pub fn publish_discovery<S: PublishSink + ?Sized>(sink: &S) -> Result<()> {
    for channel in [Channel::Co2, Channel::Temp] {
        let payload = serde_json::to_vec(&DiscoveryConfig::for_channel(channel))?;
        sink.publish(discovery_topic(channel), &payload, QOS_EXACTLY_ONCE, true)?;
        log::info!("Published discovery config for {channel}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mqtt::FlumeSink;

    #[test]
    fn test_topic_layout() {
        assert_eq!(state_topic(Channel::Temp), "homeassistant/sensor/co2mon/temp");
        assert_eq!(state_topic(Channel::Co2), "homeassistant/sensor/co2mon/co2");
        assert_eq!(
            error_topic(Channel::Co2),
            "homeassistant/sensor/co2mon/co2/error"
        );
        assert_eq!(
            error_topic(Channel::Temp),
            "homeassistant/sensor/co2mon/temp/error"
        );
    }

    #[test]
    fn test_discovery_document_fields() {
        let value = serde_json::to_value(DiscoveryConfig::for_channel(Channel::Temp)).unwrap();
        assert_eq!(value["~"], "homeassistant/sensor/co2mon");
        assert_eq!(value["stat_t"], "~/temp");
        assert_eq!(value["err_t"], "~/temp/error");
        assert_eq!(value["unit_of_meas"], "°C");
        assert_eq!(value["dev_cla"], "temperature");
        assert_eq!(value["device"]["model"], "MT8057");
        assert_eq!(value["device"]["identifiers"][1], "co2mon");
    }

    #[test]
    fn test_discovery_ids_distinct_per_channel() {
        let co2 = DiscoveryConfig::for_channel(Channel::Co2);
        let temp = DiscoveryConfig::for_channel(Channel::Temp);
        assert_eq!(co2.obj_id, "co2mon_co2");
        assert_eq!(co2.unique_id, "co2mon_co2_sensor");
        assert_eq!(temp.obj_id, "co2mon_temp");
        assert_eq!(temp.unique_id, "co2mon_temp_sensor");
    }

    #[test]
    fn test_publish_discovery_sends_both_configs() {
        let (sink, rx) = FlumeSink::new();
        publish_discovery(&sink).unwrap();

        let published: Vec<_> = rx.try_iter().collect();
        assert_eq!(published.len(), 2);
        assert_eq!(published[0].topic, "homeassistant/sensor/co2monC/config");
        assert_eq!(published[1].topic, "homeassistant/sensor/co2monT/config");
        for p in &published {
            assert_eq!(p.qos, 2);
            assert!(p.retain);
        }

        let co2: serde_json::Value = serde_json::from_slice(&published[0].payload).unwrap();
        assert_eq!(co2["unit_of_meas"], "ppm");
        assert_eq!(co2["stat_t"], "~/co2");
    }
}
