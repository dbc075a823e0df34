//! co2mon-bridge — publish MT8057 USB CO2 monitor readings to MQTT
//!
//! The crate reads 8-byte reports from the sensor, validates and decodes
//! them, and publishes temperature and CO2 values as retained MQTT messages
//! laid out for Home Assistant discovery. Read failures are announced on
//! per-channel error topics, deduplicated so a missing device does not flood
//! the broker.
//!
//! The polling loop lives in [`core::Supervisor`]; device access and the
//! publish side are behind the [`device::DeviceProvider`] and
//! [`mqtt::PublishSink`] traits so either end can be replaced.

#[doc(hidden)]
pub mod boot;
pub mod cli;
pub mod core;
pub mod device;
pub mod mqtt;
pub mod protocol;
#[doc(hidden)]
pub mod utils;
