//! Publish side of the bridge: sink abstraction, MQTT client, topic layout.

pub mod client;
pub mod flume_sink;
pub mod topics;

use anyhow::Result;
use std::sync::Arc;

pub use client::MqttSink;
pub use flume_sink::{FlumeSink, Publication};
pub use topics::{error_topic, publish_discovery, state_topic, DiscoveryConfig};

/// QoS level used for every message the bridge sends.
pub const QOS_EXACTLY_ONCE: u8 = 2;

/// Destination for retained telemetry messages.
///
/// Implementations must not wait for network acknowledgment.
pub trait PublishSink: Send + Sync {
    fn publish(&self, topic: &str, payload: &[u8], qos: u8, retain: bool) -> Result<()>;
}

impl<T: PublishSink + ?Sized> PublishSink for Arc<T> {
    fn publish(&self, topic: &str, payload: &[u8], qos: u8, retain: bool) -> Result<()> {
        (**self).publish(topic, payload, qos, retain)
    }
}

/// Sink that only logs; useful when running without a broker.
pub struct LoggingSink;

impl PublishSink for LoggingSink {
    fn publish(&self, topic: &str, payload: &[u8], qos: u8, retain: bool) -> Result<()> {
        log::info!(
            "publish {} (qos={}, retain={}): {}",
            topic,
            qos,
            retain,
            String::from_utf8_lossy(payload)
        );
        Ok(())
    }
}
