//! Environmental Sensing attribute layout and fixed-point codecs.
//!
//! ```text
//! Primary service 0x181A
//! ├── Temperature 0x2A6E  read | notify   sint16, 0.01 °C
//! │   ├── CCC      0x2902
//! │   └── Format   0x2904  {0x0E, -2, 0x272F, 0x01, 0x0106}
//! └── Humidity    0x2A6F  read | notify   uint16, 0.01 %
//!     ├── CCC      0x2902
//!     └── Format   0x2904  {0x06, -2, 0x27AD, 0x01, 0x0106}
//! ```
//!
//! Range validation lives here and is applied at the write boundary only.

use core::fmt;
use core::sync::atomic::{AtomicBool, Ordering};

use crate::error::ServiceError;

pub const ENVIRONMENTAL_SENSING_SERVICE: u16 = 0x181A;
pub const TEMPERATURE_UUID: u16 = 0x2A6E;
pub const HUMIDITY_UUID: u16 = 0x2A6F;
pub const CLIENT_CONFIG_UUID: u16 = 0x2902;
pub const PRESENTATION_FORMAT_UUID: u16 = 0x2904;

/// Client-configuration bit enabling notifications.
pub const CCC_NOTIFY: u16 = 0x0001;

pub const TEMPERATURE_MIN_C: f32 = -20.0;
pub const TEMPERATURE_MAX_C: f32 = 125.0;
pub const HUMIDITY_MIN_PCT: f32 = 0.0;
pub const HUMIDITY_MAX_PCT: f32 = 100.0;

/// The two readable/notifiable characteristics of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Characteristic {
    Temperature,
    Humidity,
}

impl Characteristic {
    pub const ALL: [Self; 2] = [Self::Temperature, Self::Humidity];

    pub fn uuid(self) -> u16 {
        match self {
            Self::Temperature => TEMPERATURE_UUID,
            Self::Humidity => HUMIDITY_UUID,
        }
    }

    pub fn from_uuid(uuid: u16) -> Option<Self> {
        match uuid {
            TEMPERATURE_UUID => Some(Self::Temperature),
            HUMIDITY_UUID => Some(Self::Humidity),
            _ => None,
        }
    }

    pub fn presentation_format(self) -> PresentationFormat {
        match self {
            Self::Temperature => TEMPERATURE_FORMAT,
            Self::Humidity => HUMIDITY_FORMAT,
        }
    }
}

impl fmt::Display for Characteristic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Temperature => write!(f, "temperature"),
            Self::Humidity => write!(f, "humidity"),
        }
    }
}

// ── Presentation format descriptor ───────────────────────────

/// Characteristic Presentation Format descriptor value (0x2904).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PresentationFormat {
    pub format: u8,
    pub exponent: i8,
    pub unit: u16,
    pub namespace: u8,
    pub description: u16,
}

const FORMAT_SINT16: u8 = 0x0E;
const FORMAT_UINT16: u8 = 0x06;
const UNIT_DEGREE_CELSIUS: u16 = 0x272F;
const UNIT_PERCENTAGE: u16 = 0x27AD;
const NAMESPACE_SIG: u8 = 0x01;
const DESCRIPTION_INTERNAL: u16 = 0x0106;

pub const TEMPERATURE_FORMAT: PresentationFormat = PresentationFormat {
    format: FORMAT_SINT16,
    exponent: -2,
    unit: UNIT_DEGREE_CELSIUS,
    namespace: NAMESPACE_SIG,
    description: DESCRIPTION_INTERNAL,
};

pub const HUMIDITY_FORMAT: PresentationFormat = PresentationFormat {
    format: FORMAT_UINT16,
    exponent: -2,
    unit: UNIT_PERCENTAGE,
    namespace: NAMESPACE_SIG,
    description: DESCRIPTION_INTERNAL,
};

impl PresentationFormat {
    /// Descriptor value as stored in the attribute table (little-endian).
    pub fn to_bytes(&self) -> [u8; 7] {
        let unit = self.unit.to_le_bytes();
        let desc = self.description.to_le_bytes();
        [
            self.format,
            self.exponent as u8,
            unit[0],
            unit[1],
            self.namespace,
            desc[0],
            desc[1],
        ]
    }
}

// ── Codecs ───────────────────────────────────────────────────

/// °C to 0.01 °C units. Rejects NaN and anything outside [-20, 125].
pub fn encode_temperature(celsius: f32) -> Result<i16, ServiceError> {
    if !(TEMPERATURE_MIN_C..=TEMPERATURE_MAX_C).contains(&celsius) {
        return Err(ServiceError::OutOfRange);
    }
    Ok((celsius * 100.0).round() as i16)
}

pub fn decode_temperature(raw: i16) -> f32 {
    f32::from(raw) / 100.0
}

/// %RH to 0.01 % units. Rejects NaN and anything outside [0, 100].
pub fn encode_humidity(percent: f32) -> Result<u16, ServiceError> {
    if !(HUMIDITY_MIN_PCT..=HUMIDITY_MAX_PCT).contains(&percent) {
        return Err(ServiceError::OutOfRange);
    }
    Ok((percent * 100.0).round() as u16)
}

pub fn decode_humidity(raw: u16) -> f32 {
    f32::from(raw) / 100.0
}

// ── Notification subscriptions ───────────────────────────────

/// Per-characteristic notification enable, written by the peer through
/// the client-configuration descriptor.
#[derive(Debug, Default)]
pub struct Subscriptions {
    temperature: AtomicBool,
    humidity: AtomicBool,
}

impl Subscriptions {
    pub const fn new() -> Self {
        Self {
            temperature: AtomicBool::new(false),
            humidity: AtomicBool::new(false),
        }
    }

    fn flag(&self, characteristic: Characteristic) -> &AtomicBool {
        match characteristic {
            Characteristic::Temperature => &self.temperature,
            Characteristic::Humidity => &self.humidity,
        }
    }

    /// Apply a client-configuration write. Returns the new enable state.
    pub fn set(&self, characteristic: Characteristic, ccc_value: u16) -> bool {
        let enabled = ccc_value & CCC_NOTIFY != 0;
        self.flag(characteristic).store(enabled, Ordering::Release);
        enabled
    }

    pub fn is_enabled(&self, characteristic: Characteristic) -> bool {
        self.flag(characteristic).load(Ordering::Acquire)
    }

    /// Link dropped: the peer must subscribe again on the next connection.
    pub fn clear(&self) {
        self.temperature.store(false, Ordering::Release);
        self.humidity.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presentation_format_bytes() {
        assert_eq!(
            TEMPERATURE_FORMAT.to_bytes(),
            [0x0E, 0xFE, 0x2F, 0x27, 0x01, 0x06, 0x01]
        );
        assert_eq!(
            HUMIDITY_FORMAT.to_bytes(),
            [0x06, 0xFE, 0xAD, 0x27, 0x01, 0x06, 0x01]
        );
    }

    #[test]
    fn temperature_rounds_to_nearest_hundredth() {
        assert_eq!(encode_temperature(23.456), Ok(2346));
        assert_eq!(encode_temperature(-20.0), Ok(-2000));
        assert_eq!(encode_temperature(125.0), Ok(12500));
        assert_eq!(encode_temperature(-0.004), Ok(0));
    }

    #[test]
    fn rejects_out_of_range_and_nan() {
        assert_eq!(encode_temperature(-20.01), Err(ServiceError::OutOfRange));
        assert_eq!(encode_temperature(f32::NAN), Err(ServiceError::OutOfRange));
        assert_eq!(encode_humidity(-1.0), Err(ServiceError::OutOfRange));
        assert_eq!(encode_humidity(100.5), Err(ServiceError::OutOfRange));
        assert_eq!(encode_humidity(f32::INFINITY), Err(ServiceError::OutOfRange));
    }

    #[test]
    fn humidity_bounds() {
        assert_eq!(encode_humidity(0.0), Ok(0));
        assert_eq!(encode_humidity(45.0), Ok(4500));
        assert_eq!(encode_humidity(100.0), Ok(10000));
    }

    #[test]
    fn subscriptions_follow_ccc_writes() {
        let subs = Subscriptions::new();
        assert!(!subs.is_enabled(Characteristic::Temperature));

        assert!(subs.set(Characteristic::Temperature, CCC_NOTIFY));
        assert!(subs.is_enabled(Characteristic::Temperature));
        assert!(!subs.is_enabled(Characteristic::Humidity));

        // Indicate-only does not enable notifications.
        assert!(!subs.set(Characteristic::Humidity, 0x0002));

        subs.clear();
        assert!(!subs.is_enabled(Characteristic::Temperature));
    }

    #[test]
    fn uuid_lookup() {
        for c in Characteristic::ALL {
            assert_eq!(Characteristic::from_uuid(c.uuid()), Some(c));
        }
        assert_eq!(Characteristic::from_uuid(0x2A19), None);
    }
}
