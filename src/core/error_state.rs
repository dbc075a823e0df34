//! Per-channel error state with change detection.
use std::collections::HashMap;

use crate::protocol::Channel;

/// Announcement produced by an error state transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationEvent {
    pub channel: Channel,
    /// `None` announces that the condition cleared.
    pub error: Option<String>,
}

impl NotificationEvent {
    /// Payload for the channel's error topic; empty when cleared.
    pub fn payload(&self) -> &[u8] {
        self.error.as_deref().unwrap_or("").as_bytes()
    }
}

/// Per-channel error deduplication.
///
/// An event is produced only when the stored error for a channel changes, so
/// a device failing on every poll cycle announces its fault once.
#[derive(Debug, Default)]
pub struct ErrorStateTracker {
    last_error: HashMap<Channel, String>,
}

impl ErrorStateTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the current condition of `channel`; `None` means success.
    /// An empty error string counts as success.
    pub fn report(&mut self, channel: Channel, error: Option<&str>) -> Option<NotificationEvent> {
        match error.filter(|e| !e.is_empty()) {
            Some(error) => {
                if self.last_error.get(&channel).map(String::as_str) == Some(error) {
                    return None;
                }
                self.last_error.insert(channel, error.to_string());
                Some(NotificationEvent {
                    channel,
                    error: Some(error.to_string()),
                })
            }
            None => self.last_error.remove(&channel).map(|_| NotificationEvent {
                channel,
                error: None,
            }),
        }
    }

    /// Put back a previously stored condition, e.g. after a transition
    /// could not be announced. The next `report` compares against it again.
    pub fn restore(&mut self, channel: Channel, error: Option<String>) {
        match error {
            Some(error) => {
                self.last_error.insert(channel, error);
            }
            None => {
                self.last_error.remove(&channel);
            }
        }
    }

    /// Currently stored error of `channel`, if any.
    pub fn last_error(&self, channel: Channel) -> Option<&str> {
        self.last_error.get(&channel).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeated_error_reported_once() {
        let mut tracker = ErrorStateTracker::new();
        let first = tracker.report(Channel::Co2, Some("r"));
        assert_eq!(
            first,
            Some(NotificationEvent {
                channel: Channel::Co2,
                error: Some("r".to_string())
            })
        );
        assert_eq!(tracker.report(Channel::Co2, Some("r")), None);
        assert_eq!(tracker.last_error(Channel::Co2), Some("r"));
    }

    #[test]
    fn test_recovery_announced_once() {
        let mut tracker = ErrorStateTracker::new();
        tracker.report(Channel::Co2, Some("r"));

        let cleared = tracker.report(Channel::Co2, None).unwrap();
        assert_eq!(cleared.error, None);
        assert!(cleared.payload().is_empty());
        assert_eq!(tracker.report(Channel::Co2, None), None);
        assert_eq!(tracker.last_error(Channel::Co2), None);
    }

    #[test]
    fn test_success_without_prior_error_is_silent() {
        let mut tracker = ErrorStateTracker::new();
        assert_eq!(tracker.report(Channel::Temp, None), None);
    }

    #[test]
    fn test_changed_error_is_reannounced() {
        let mut tracker = ErrorStateTracker::new();
        tracker.report(Channel::Temp, Some("r"));
        let changed = tracker.report(Channel::Temp, Some("timeout")).unwrap();
        assert_eq!(changed.payload(), b"timeout");
    }

    #[test]
    fn test_channels_are_independent() {
        let mut tracker = ErrorStateTracker::new();
        assert!(tracker.report(Channel::Temp, Some("r")).is_some());
        assert!(tracker.report(Channel::Co2, Some("r")).is_some());
        assert!(tracker.report(Channel::Temp, None).is_some());
        assert_eq!(tracker.last_error(Channel::Co2), Some("r"));
    }

    #[test]
    fn test_empty_error_counts_as_success() {
        let mut tracker = ErrorStateTracker::new();
        assert_eq!(tracker.report(Channel::Co2, Some("")), None);
        tracker.report(Channel::Co2, Some("r"));
        let cleared = tracker.report(Channel::Co2, Some("")).unwrap();
        assert_eq!(cleared.error, None);
    }

    #[test]
    fn test_restore_rearms_transition() {
        let mut tracker = ErrorStateTracker::new();
        assert!(tracker.report(Channel::Co2, Some("r")).is_some());
        tracker.restore(Channel::Co2, None);
        assert!(tracker.report(Channel::Co2, Some("r")).is_some());

        assert!(tracker.report(Channel::Co2, None).is_some());
        tracker.restore(Channel::Co2, Some("r".to_string()));
        assert!(tracker.report(Channel::Co2, None).is_some());
    }
}
