/// Channel-backed publish sink.
///
/// Every publish is forwarded as a [`Publication`] over a flume channel, so
/// an embedding application (or a test) can consume the telemetry stream
/// without a broker.
use anyhow::Result;
use bytes::Bytes;

use super::PublishSink;

/// One message handed to a sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Publication {
    pub topic: String,
    pub payload: Bytes,
    pub qos: u8,
    pub retain: bool,
}

impl Publication {
    /// Payload as text; empty for cleared error topics.
    pub fn payload_str(&self) -> String {
        String::from_utf8_lossy(&self.payload).into_owned()
    }
}

/// Flume-based sink that sends publications through a channel
pub struct FlumeSink {
    sender: flume::Sender<Publication>,
}

impl FlumeSink {
    /// Create a new sink with an unbounded channel
    pub fn new() -> (Self, flume::Receiver<Publication>) {
        let (sender, receiver) = flume::unbounded();
        (Self { sender }, receiver)
    }

    /// Create a new sink with a bounded channel
    pub fn with_capacity(cap: usize) -> (Self, flume::Receiver<Publication>) {
        let (sender, receiver) = flume::bounded(cap);
        (Self { sender }, receiver)
    }
}

impl PublishSink for FlumeSink {
    fn publish(&self, topic: &str, payload: &[u8], qos: u8, retain: bool) -> Result<()> {
        self.sender
            .try_send(Publication {
                topic: topic.to_string(),
                payload: Bytes::copy_from_slice(payload),
                qos,
                retain,
            })
            .map_err(|e| anyhow::anyhow!("Failed to send publication: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publications_arrive_in_order() {
        let (sink, rx) = FlumeSink::new();
        sink.publish("a", b"1", 2, true).unwrap();
        sink.publish("b", b"", 2, true).unwrap();

        let first = rx.try_recv().unwrap();
        assert_eq!(first.topic, "a");
        assert_eq!(first.payload_str(), "1");
        let second = rx.try_recv().unwrap();
        assert_eq!(second.topic, "b");
        assert!(second.payload.is_empty());
    }

    #[test]
    fn test_full_channel_reports_error() {
        let (sink, _rx) = FlumeSink::with_capacity(1);
        sink.publish("a", b"1", 2, true).unwrap();
        assert!(sink.publish("a", b"2", 2, true).is_err());
    }

    #[test]
    fn test_dropped_receiver_reports_error() {
        let (sink, rx) = FlumeSink::new();
        drop(rx);
        assert!(sink.publish("a", b"1", 2, true).is_err());
    }
}
