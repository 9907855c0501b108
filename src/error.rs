//! Unified error types for the EnvNode firmware.
//!
//! Every subsystem has its own small `Copy` error enum; the top-level
//! [`Error`] wraps them so startup code can propagate any of them with `?`.
//! Only initialisation failures are allowed to abort startup; everything
//! at runtime is logged or returned to the immediate caller.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A characteristic update was rejected or could not be delivered.
    Service(ServiceError),
    /// The wireless stack refused an operation.
    Link(LinkError),
    /// The humidity/temperature sensor failed.
    Sensor(SensorError),
    /// The advertising payload could not be assembled.
    Advertising(AdvertisingError),
    /// The configured device address is invalid.
    Identity(IdentityError),
    /// Configuration is invalid or could not be loaded.
    Config(&'static str),
    /// A worker thread could not be spawned.
    Spawn,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Service(e) => write!(f, "service: {e}"),
            Self::Link(e) => write!(f, "link: {e}"),
            Self::Sensor(e) => write!(f, "sensor: {e}"),
            Self::Advertising(e) => write!(f, "advertising: {e}"),
            Self::Identity(e) => write!(f, "identity: {e}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::Spawn => write!(f, "failed to spawn worker thread"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Characteristic update errors
// ---------------------------------------------------------------------------

/// Returned by `update_temperature` / `update_humidity`.
///
/// "No peer connected" is deliberately absent: the value is still cached
/// for the next read, so it is not a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceError {
    /// Input lies outside the physical range of the characteristic.
    OutOfRange,
    /// The stack failed to deliver the notification.
    Link(LinkError),
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfRange => write!(f, "value out of range"),
            Self::Link(e) => write!(f, "notification failed: {e}"),
        }
    }
}

impl std::error::Error for ServiceError {}

impl From<ServiceError> for Error {
    fn from(e: ServiceError) -> Self {
        Self::Service(e)
    }
}

// ---------------------------------------------------------------------------
// Wireless stack errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkError {
    /// No peer on the addressed connection.
    NotConnected,
    /// The stack has not been enabled yet.
    NotEnabled,
    /// The stack is busy with a previous request.
    Busy,
    /// No transmit buffers available.
    NoBuffers,
    /// The stack rejected a parameter.
    InvalidParam,
    /// Raw error code from the vendor stack.
    Stack(i32),
}

impl fmt::Display for LinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotConnected => write!(f, "not connected"),
            Self::NotEnabled => write!(f, "stack not enabled"),
            Self::Busy => write!(f, "stack busy"),
            Self::NoBuffers => write!(f, "no buffers"),
            Self::InvalidParam => write!(f, "invalid parameter"),
            Self::Stack(rc) => write!(f, "stack error {rc}"),
        }
    }
}

impl std::error::Error for LinkError {}

impl From<LinkError> for Error {
    fn from(e: LinkError) -> Self {
        Self::Link(e)
    }
}

// ---------------------------------------------------------------------------
// Sensor errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// Device did not answer at initialisation.
    DeviceNotReady,
    /// Bus transaction failed.
    Bus,
    /// Checksum mismatch in the returned data.
    Crc,
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DeviceNotReady => write!(f, "device not ready"),
            Self::Bus => write!(f, "bus transaction failed"),
            Self::Crc => write!(f, "CRC mismatch"),
        }
    }
}

impl std::error::Error for SensorError {}

impl From<SensorError> for Error {
    fn from(e: SensorError) -> Self {
        Self::Sensor(e)
    }
}

// ---------------------------------------------------------------------------
// Advertising payload errors
// ---------------------------------------------------------------------------

/// Which of the two broadcast payloads an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    Advertising,
    ScanResponse,
}

impl fmt::Display for PayloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Advertising => write!(f, "advertising"),
            Self::ScanResponse => write!(f, "scan response"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvertisingError {
    /// Encoded payload exceeds the 31-byte link-layer limit.
    PayloadTooLarge { payload: PayloadKind, size: usize },
    /// A single element does not fit in one AD structure.
    ElementTooLong,
    /// URI does not start with a scheme we can compress.
    UnsupportedUriScheme,
}

impl fmt::Display for AdvertisingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PayloadTooLarge { payload, size } => {
                write!(f, "{payload} payload is {size} bytes (max 31)")
            }
            Self::ElementTooLong => write!(f, "AD element too long"),
            Self::UnsupportedUriScheme => write!(f, "unsupported URI scheme"),
        }
    }
}

impl std::error::Error for AdvertisingError {}

impl From<AdvertisingError> for Error {
    fn from(e: AdvertisingError) -> Self {
        Self::Advertising(e)
    }
}

// ---------------------------------------------------------------------------
// Identity errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityError {
    /// Not six colon-separated hex octets.
    Malformed,
    /// Two most significant bits are not `0b11`.
    NotStaticRandom,
}

impl fmt::Display for IdentityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed => write!(f, "malformed address"),
            Self::NotStaticRandom => write!(f, "not a static random address"),
        }
    }
}

impl std::error::Error for IdentityError {}

impl From<IdentityError> for Error {
    fn from(e: IdentityError) -> Self {
        Self::Identity(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
