//! Device access layer.
//!
//! The supervisor only talks to the sensor through [`DeviceProvider`] and
//! [`DeviceSession`]; the hidraw backend is the production implementation.

#[cfg(target_os = "linux")]
mod hidraw;
#[cfg(target_os = "linux")]
pub use hidraw::{HidrawProvider, HidrawSession};

use anyhow::Result;
use std::time::Duration;

use crate::protocol::frame::RawFrame;

/// USB vendor id of the MT8057 sensor.
pub const SENSOR_VENDOR_ID: u16 = 0x04d9;
/// USB product id of the MT8057 sensor.
pub const SENSOR_PRODUCT_ID: u16 = 0xa052;

/// Outcome of a failed report read.
#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum ReadError {
    #[display("read timed out")]
    Timeout,
    #[display("short read ({len} bytes)")]
    ShortRead { len: usize },
    #[display("device has been disconnected")]
    Removed,
    #[display("read failed: {_0}")]
    Io(std::io::Error),
}

impl ReadError {
    /// True when the device is gone and the session must be released.
    pub fn is_removal(&self) -> bool {
        matches!(self, ReadError::Removed)
    }
}

/// An open connection to one sensor.
pub trait DeviceSession {
    /// Send a HID feature report (report id 0 is implied).
    fn send_feature_report(&mut self, data: &[u8]) -> Result<()>;

    /// Block until one report arrives or `timeout` elapses.
    fn read_frame(&mut self, timeout: Duration) -> Result<RawFrame, ReadError>;

    /// Device node path, for display only.
    fn path(&self) -> Result<String>;

    /// Release the device.
    fn close(self);
}

/// Source of sensor sessions.
pub trait DeviceProvider {
    type Session: DeviceSession;

    /// Try to open the sensor. An error means no usable device right now.
    fn open(&mut self) -> Result<Self::Session>;
}

/// Default provider for the current platform.
#[cfg(target_os = "linux")]
pub fn default_provider() -> HidrawProvider {
    HidrawProvider::new(SENSOR_VENDOR_ID, SENSOR_PRODUCT_ID)
}

/// Provider for platforms without a device backend; never finds a sensor.
#[cfg(not(target_os = "linux"))]
pub struct UnsupportedProvider;

#[cfg(not(target_os = "linux"))]
pub struct UnsupportedSession;

#[cfg(not(target_os = "linux"))]
impl DeviceSession for UnsupportedSession {
    fn send_feature_report(&mut self, _data: &[u8]) -> Result<()> {
        Err(anyhow::anyhow!("no device backend on this platform"))
    }

    fn read_frame(&mut self, _timeout: Duration) -> Result<RawFrame, ReadError> {
        Err(ReadError::Removed)
    }

    fn path(&self) -> Result<String> {
        Err(anyhow::anyhow!("no device backend on this platform"))
    }

    fn close(self) {}
}

#[cfg(not(target_os = "linux"))]
impl DeviceProvider for UnsupportedProvider {
    type Session = UnsupportedSession;

    fn open(&mut self) -> Result<Self::Session> {
        Err(anyhow::anyhow!(
            "hidraw device access is only available on Linux"
        ))
    }
}

#[cfg(not(target_os = "linux"))]
pub fn default_provider() -> UnsupportedProvider {
    UnsupportedProvider
}
