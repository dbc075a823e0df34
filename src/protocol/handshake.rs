//! Session handshake that hands the device its report key.
use anyhow::{Context, Result};

use crate::device::DeviceSession;

/// Key sent to the device at session start. The device scrambles its
/// reports with it; [`super::cipher::deobfuscate`] reverses that.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MagicTable([u8; 8]);

impl MagicTable {
    pub fn from_bytes(bytes: [u8; 8]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 8] {
        &self.0
    }
}

/// Send a zeroed magic table to the device.
///
/// Failure leaves the session unusable; the caller releases it rather than
/// retrying in place.
pub fn negotiate<S: DeviceSession>(session: &mut S) -> Result<MagicTable> {
    let table = MagicTable::default();
    session
        .send_feature_report(table.as_bytes())
        .context("Unable to send magic table to CO2 device")?;
    log::debug!("Magic table sent");
    Ok(table)
}
