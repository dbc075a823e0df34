//! Delivery of measurements and error transitions to the publish sink.
use anyhow::Result;
use strum::IntoEnumIterator;

use super::error_state::{ErrorStateTracker, NotificationEvent};
use crate::{
    mqtt::{error_topic, state_topic, PublishSink, QOS_EXACTLY_ONCE},
    protocol::{Channel, Measurement},
};

/// Error string announced for any acquisition, read or validation failure.
pub const READ_ERROR: &str = "r";

/// Routes measurements and error transitions to a publish sink.
///
/// Sink failures are logged and swallowed; the polling loop never stops
/// because the broker is unavailable. An error transition that could not be
/// published is not recorded, so the next report of the same condition
/// announces it again.
pub struct Reporter<S> {
    sink: S,
    errors: ErrorStateTracker,
}

impl<S: PublishSink> Reporter<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            errors: ErrorStateTracker::new(),
        }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn errors(&self) -> &ErrorStateTracker {
        &self.errors
    }

    /// Publish a measurement on its channel and clear that channel's error.
    /// Measurements without a channel are dropped.
    pub fn publish_measurement(&mut self, measurement: &Measurement) -> bool {
        let Some(channel) = measurement.channel() else {
            log::debug!("Not publishing {measurement:?}");
            return false;
        };

        let payload = measurement.payload();
        log::debug!("{channel} = {payload}");
        if let Err(e) = self.send(&state_topic(channel), payload.as_bytes()) {
            log::warn!("{e:#}");
        }
        self.set_error(channel, None);
        true
    }

    /// Feed one channel's condition through the dedup tracker.
    pub fn set_error(&mut self, channel: Channel, error: Option<&str>) {
        let previous = self.errors.last_error(channel).map(str::to_owned);
        if let Some(event) = self.errors.report(channel, error) {
            if let Err(e) = self.announce(&event) {
                log::warn!("{e:#}");
                self.errors.restore(channel, previous);
            }
        }
    }

    /// Set the same error on every channel.
    pub fn set_errors(&mut self, error: &str) {
        for channel in Channel::iter() {
            self.set_error(channel, Some(error));
        }
    }

    fn announce(&self, event: &NotificationEvent) -> Result<()> {
        match &event.error {
            Some(error) => log::debug!("{} error set: {error}", event.channel),
            None => log::debug!("{} error cleared", event.channel),
        }
        self.send(&error_topic(event.channel), event.payload())
    }

    fn send(&self, topic: &str, payload: &[u8]) -> Result<()> {
        self.sink.publish(topic, payload, QOS_EXACTLY_ONCE, true)
    }
}
