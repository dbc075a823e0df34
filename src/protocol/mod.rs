//! Sensor wire protocol: handshake, deobfuscation, validation and decoding.

pub mod cipher;
pub mod frame;
pub mod handshake;
pub mod measurement;

pub use frame::{validate, FrameError, FrameFields, RawFrame, FRAME_LEN, FRAME_TERMINATOR};
pub use handshake::{negotiate, MagicTable};
pub use measurement::{decode, Channel, Decoded, Measurement, MeasurementKind, CO2_MAX_PPM};
