use anyhow::{anyhow, Result};
use std::time::Duration;

use rumqttc::{Client, Connection, ConnectionError, Event, MqttOptions, Packet, QoS};

use super::PublishSink;

/// Capacity of the client's outgoing request queue.
const REQUEST_QUEUE_CAP: usize = 64;

/// Connection parameters for [`MqttSink::connect`].
#[derive(Debug, Clone)]
pub struct MqttSettings {
    pub host: String,
    pub port: u16,
    pub client_id: String,
    pub keep_alive: Duration,
}

/// Publish sink backed by a rumqttc client.
///
/// The network event loop runs on its own thread; `publish` only enqueues.
#[derive(Clone)]
pub struct MqttSink {
    client: Client,
}

impl MqttSink {
    /// Connect to the broker and wait for its ConnAck, then hand the
    /// connection to a background thread that keeps it alive.
    pub fn connect(settings: &MqttSettings) -> Result<Self> {
        log::info!(
            "MQTT: connecting to {}:{} as {}",
            settings.host,
            settings.port,
            settings.client_id
        );

        let mut options =
            MqttOptions::new(settings.client_id.clone(), settings.host.clone(), settings.port);
        options.set_keep_alive(settings.keep_alive);
        options.set_clean_session(true);

        let (client, mut connection) = Client::new(options, REQUEST_QUEUE_CAP);

        wait_for_connack(&mut connection)?;
        log::info!("MQTT: connected");

        std::thread::Builder::new()
            .name("mqtt-eventloop".to_string())
            .spawn(move || drive_connection(connection))
            .map_err(|e| anyhow!("Failed to spawn MQTT event loop thread: {e}"))?;

        Ok(Self { client })
    }

    /// Send DISCONNECT; the event loop thread exits afterwards.
    pub fn disconnect(&self) {
        if let Err(e) = self.client.try_disconnect() {
            log::warn!("MQTT: disconnect failed: {e}");
        }
    }
}

impl PublishSink for MqttSink {
    fn publish(&self, topic: &str, payload: &[u8], qos: u8, retain: bool) -> Result<()> {
        self.client
            .try_publish(topic.to_string(), qos_from_u8(qos), retain, payload.to_vec())
            .map_err(|e| anyhow!("Failed to publish to {topic}: {e}"))
    }
}

/// Map a numeric QoS level; values above 2 are clamped.
pub fn qos_from_u8(level: u8) -> QoS {
    match level {
        0 => QoS::AtMostOnce,
        1 => QoS::AtLeastOnce,
        _ => QoS::ExactlyOnce,
    }
}

fn wait_for_connack(connection: &mut Connection) -> Result<()> {
    for event in connection.iter() {
        match event {
            Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                log::debug!("MQTT: ConnAck {:?}", ack.code);
                return Ok(());
            }
            Ok(other) => log::trace!("MQTT: {other:?}"),
            Err(e) => return Err(anyhow!("Cannot connect to MQTT broker: {e}")),
        }
    }
    Err(anyhow!("MQTT connection closed before ConnAck"))
}

fn drive_connection(mut connection: Connection) {
    for event in connection.iter() {
        match event {
            Ok(Event::Incoming(Packet::ConnAck(_))) => log::info!("MQTT: reconnected"),
            Ok(Event::Outgoing(rumqttc::Outgoing::Disconnect)) => {
                log::info!("MQTT: disconnected");
                break;
            }
            Ok(other) => log::trace!("MQTT: {other:?}"),
            Err(ConnectionError::RequestsDone) => break,
            Err(e) => {
                log::warn!("MQTT connection error: {e}, will retry...");
                std::thread::sleep(Duration::from_secs(1));
            }
        }
    }
    log::debug!("MQTT event loop stopped");
}
