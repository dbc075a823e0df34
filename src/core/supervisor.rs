//! Polling supervisor: the control loop tying device access, the wire
//! protocol and the publish sink together.
//!
//! ```text
//! NoDevice -> DeviceOpen -> Negotiated -> Polling -> DeviceLost -> NoDevice
//!                  \             (stop) \-> Closing -> NoDevice
//!                   \-> Closing (handshake failed)
//! ```
//!
//! The loop never terminates on its own; clearing the running flag is the
//! only way out.
use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use super::reporter::{Reporter, READ_ERROR};
use crate::{
    device::{DeviceProvider, DeviceSession},
    mqtt::PublishSink,
    protocol::{
        cipher, decode, negotiate, validate, Decoded, FrameError, MagicTable, Measurement,
    },
    utils::sleep_while_running,
};

/// Supervisor timing and decoding options.
#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    /// Deobfuscate reports with the magic table before validation.
    pub decode_data: bool,
    /// Upper bound of one blocking report read.
    pub read_timeout: Duration,
    /// Pause after a failed acquisition, a released device or a read failure.
    pub retry_interval: Duration,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            decode_data: true,
            read_timeout: Duration::from_millis(5000),
            retry_interval: Duration::from_millis(1000),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorState {
    NoDevice,
    DeviceOpen,
    Negotiated,
    Polling,
    DeviceLost,
    Closing,
}

/// Result of a single frame read.
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    /// Measurement sent to its channel.
    Published(Measurement),
    /// Valid frame that is not published (humidity, out of range, unknown code).
    Ignored(Decoded),
    InvalidFrame(FrameError),
    /// Timeout, short read or other transient failure.
    ReadFailed,
    DeviceLost,
}

/// Why a device session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    NegotiationFailed,
    DeviceLost,
    Stopped,
}

pub struct Supervisor<P, S> {
    provider: P,
    reporter: Reporter<S>,
    config: SupervisorConfig,
    running: Arc<AtomicBool>,
    state: SupervisorState,
    show_no_device: bool,
    no_device_reports: usize,
}

impl<P, S> Supervisor<P, S>
where
    P: DeviceProvider,
    S: PublishSink,
{
    pub fn new(provider: P, sink: S, config: SupervisorConfig) -> Self {
        Self {
            provider,
            reporter: Reporter::new(sink),
            config,
            running: Arc::new(AtomicBool::new(true)),
            state: SupervisorState::NoDevice,
            show_no_device: true,
            no_device_reports: 0,
        }
    }

    /// Share an externally owned running flag (e.g. one cleared by Ctrl-C).
    pub fn with_running_flag(mut self, running: Arc<AtomicBool>) -> Self {
        self.running = running;
        self
    }

    /// Handle to stop the supervisor from another thread.
    pub fn running_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    pub fn state(&self) -> SupervisorState {
        self.state
    }

    pub fn reporter(&self) -> &Reporter<S> {
        &self.reporter
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// How many times the missing device was logged. Repeated failed
    /// acquisitions count once until a device is opened again.
    pub fn no_device_reports(&self) -> usize {
        self.no_device_reports
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn transition(&mut self, next: SupervisorState) {
        if self.state != next {
            log::trace!("supervisor: {:?} -> {:?}", self.state, next);
            self.state = next;
        }
    }

    /// Run until the running flag is cleared.
    pub fn run(&mut self) {
        log::info!("Starting CO2 monitor loop");
        while self.is_running() {
            self.acquire_once();
            if !sleep_while_running(self.config.retry_interval, &self.running) {
                break;
            }
        }
        log::info!("CO2 monitor loop stopped");
    }

    /// One acquisition attempt. When a device is found, its whole session
    /// runs before this returns.
    pub fn acquire_once(&mut self) -> Option<SessionEnd> {
        let mut session = match self.provider.open() {
            Ok(session) => session,
            Err(err) => {
                if self.show_no_device {
                    log::error!("Unable to open CO2 device: {err:#}");
                    self.show_no_device = false;
                    self.no_device_reports += 1;
                }
                self.reporter.set_errors(READ_ERROR);
                return None;
            }
        };

        self.show_no_device = true;
        self.transition(SupervisorState::DeviceOpen);
        match session.path() {
            Ok(path) => log::info!("Path: {path}"),
            Err(_) => log::info!("Path: (error)"),
        }

        let end = self.run_session(&mut session);
        if end != SessionEnd::DeviceLost {
            self.transition(SupervisorState::Closing);
        }
        session.close();
        self.transition(SupervisorState::NoDevice);
        Some(end)
    }

    fn run_session(&mut self, session: &mut P::Session) -> SessionEnd {
        let table = match negotiate(session) {
            Ok(table) => table,
            Err(err) => {
                log::error!("{err:#}");
                self.reporter.set_errors(READ_ERROR);
                return SessionEnd::NegotiationFailed;
            }
        };
        self.transition(SupervisorState::Negotiated);
        log::info!("Sending values to MQTT...");
        self.transition(SupervisorState::Polling);

        loop {
            if !self.is_running() {
                return SessionEnd::Stopped;
            }
            match self.poll_once(session, &table) {
                PollOutcome::DeviceLost => return SessionEnd::DeviceLost,
                PollOutcome::ReadFailed => {
                    if !sleep_while_running(self.config.retry_interval, &self.running) {
                        return SessionEnd::Stopped;
                    }
                }
                _ => {}
            }
        }
    }

    /// Read, validate and dispatch one frame.
    pub fn poll_once(&mut self, session: &mut P::Session, table: &MagicTable) -> PollOutcome {
        let report = match session.read_frame(self.config.read_timeout) {
            Ok(report) => report,
            Err(err) if err.is_removal() => {
                log::error!("Device has been disconnected");
                self.transition(SupervisorState::DeviceLost);
                self.reporter.set_errors(READ_ERROR);
                return PollOutcome::DeviceLost;
            }
            Err(err) => {
                log::debug!("{err}");
                self.reporter.set_errors(READ_ERROR);
                return PollOutcome::ReadFailed;
            }
        };

        let frame = if self.config.decode_data {
            cipher::deobfuscate(&report, table)
        } else {
            report
        };

        let fields = match validate(&frame) {
            Ok(fields) => fields,
            Err(err) => {
                log::warn!("{err}");
                self.reporter.set_errors(READ_ERROR);
                return PollOutcome::InvalidFrame(err);
            }
        };

        match decode(fields) {
            Decoded::Measurement(measurement) => {
                if self.reporter.publish_measurement(&measurement) {
                    PollOutcome::Published(measurement)
                } else {
                    PollOutcome::Ignored(Decoded::Measurement(measurement))
                }
            }
            other @ Decoded::OutOfRange(kind, value) => {
                log::debug!("Discarding implausible {kind:?} reading {value}");
                PollOutcome::Ignored(other)
            }
            other @ Decoded::Unrecognized(_) => PollOutcome::Ignored(other),
        }
    }
}
