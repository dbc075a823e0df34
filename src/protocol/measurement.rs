//! Measurement decoding: code byte to kind, raw word to physical value.
use num_enum::TryFromPrimitive;
use strum::{AsRefStr, Display, EnumIter};

use super::frame::FrameFields;

/// Highest CO2 reading accepted; larger words are spurious start-up data.
pub const CO2_MAX_PPM: u16 = 3000;

/// Measurement kinds, keyed by the frame's code byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive)]
#[repr(u8)]
pub enum MeasurementKind {
    Humidity = 0x41,
    Temperature = 0x42,
    CarbonDioxide = 0x50,
}

/// Named measurement stream with its own state and error topics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, AsRefStr, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Channel {
    Temp,
    Co2,
}

/// A decoded, range-checked physical reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Measurement {
    /// Degrees Celsius.
    Temperature(f64),
    /// Parts per million.
    CarbonDioxide(u16),
    /// Relative humidity in percent. Decoded but never published.
    Humidity(f64),
}

impl Measurement {
    pub fn kind(&self) -> MeasurementKind {
        match self {
            Measurement::Temperature(_) => MeasurementKind::Temperature,
            Measurement::CarbonDioxide(_) => MeasurementKind::CarbonDioxide,
            Measurement::Humidity(_) => MeasurementKind::Humidity,
        }
    }

    /// Channel this measurement is published on, if any.
    pub fn channel(&self) -> Option<Channel> {
        match self {
            Measurement::Temperature(_) => Some(Channel::Temp),
            Measurement::CarbonDioxide(_) => Some(Channel::Co2),
            Measurement::Humidity(_) => None,
        }
    }

    /// Decimal string sent as the state payload.
    pub fn payload(&self) -> String {
        match self {
            Measurement::Temperature(celsius) => format!("{celsius:2.1}"),
            Measurement::CarbonDioxide(ppm) => ppm.to_string(),
            Measurement::Humidity(percent) => format!("{percent:.2}"),
        }
    }
}

/// Result of decoding a validated frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Decoded {
    Measurement(Measurement),
    /// Code byte does not name a known measurement.
    Unrecognized(u8),
    /// Known kind, implausible value.
    OutOfRange(MeasurementKind, u16),
}

/// Convert a raw temperature word (1/16 K) to degrees Celsius.
pub fn decode_temperature(word: u16) -> f64 {
    f64::from(word) * 0.0625 - 273.15
}

/// Map a validated frame to a physical measurement.
pub fn decode(fields: FrameFields) -> Decoded {
    let Ok(kind) = MeasurementKind::try_from(fields.code) else {
        return Decoded::Unrecognized(fields.code);
    };

    match kind {
        MeasurementKind::Temperature => {
            Decoded::Measurement(Measurement::Temperature(decode_temperature(fields.value)))
        }
        MeasurementKind::CarbonDioxide if fields.value > CO2_MAX_PPM => {
            Decoded::OutOfRange(kind, fields.value)
        }
        MeasurementKind::CarbonDioxide => {
            Decoded::Measurement(Measurement::CarbonDioxide(fields.value))
        }
        MeasurementKind::Humidity => {
            Decoded::Measurement(Measurement::Humidity(f64::from(fields.value) / 100.0))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    fn fields(code: u8, value: u16) -> FrameFields {
        FrameFields { code, value }
    }

    #[test]
    fn test_temperature_decode_is_exact() {
        let Decoded::Measurement(Measurement::Temperature(celsius)) = decode(fields(0x42, 0x1000))
        else {
            panic!("expected a temperature");
        };
        assert!((celsius - (-17.15)).abs() < 1e-9);
    }

    #[test]
    fn test_temperature_has_no_range_check() {
        assert!(matches!(
            decode(fields(0x42, 0)),
            Decoded::Measurement(Measurement::Temperature(_))
        ));
        assert!(matches!(
            decode(fields(0x42, u16::MAX)),
            Decoded::Measurement(Measurement::Temperature(_))
        ));
    }

    #[test]
    fn test_co2_upper_bound() {
        assert_eq!(
            decode(fields(0x50, 3000)),
            Decoded::Measurement(Measurement::CarbonDioxide(3000))
        );
        assert_eq!(
            decode(fields(0x50, 3001)),
            Decoded::OutOfRange(MeasurementKind::CarbonDioxide, 3001)
        );
    }

    #[test]
    fn test_humidity_decoded_without_channel() {
        let Decoded::Measurement(m) = decode(fields(0x41, 4250)) else {
            panic!("expected a humidity reading");
        };
        assert_eq!(m.kind(), MeasurementKind::Humidity);
        assert_eq!(m.channel(), None);
    }

    #[test]
    fn test_unknown_code_unrecognized() {
        assert_eq!(decode(fields(0x6e, 1234)), Decoded::Unrecognized(0x6e));
    }

    #[test]
    fn test_payload_formatting() {
        assert_eq!(
            Measurement::Temperature(decode_temperature(4740)).payload(),
            "23.1"
        );
        assert_eq!(Measurement::Temperature(-5.0).payload(), "-5.0");
        assert_eq!(Measurement::CarbonDioxide(415).payload(), "415");
    }

    #[test]
    fn test_channel_names() {
        let names: Vec<String> = Channel::iter().map(|c| c.to_string()).collect();
        assert_eq!(names, vec!["temp", "co2"]);
        assert_eq!(Channel::Co2.as_ref(), "co2");
    }
}
