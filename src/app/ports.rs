//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ domain (service, monitor, scheduler)
//!   domain  ──▶ Callback trait ──▶ registered with the radio adapter
//! ```
//!
//! Driven adapters (radio, sensor, timer) implement the port traits. The
//! radio adapter calls back into the domain through [`ConnectionCallbacks`]
//! and [`GattCallbacks`], which replace registration by function pointer.
//!
//! ## Execution contexts
//!
//! - Callback traits are invoked from the wireless stack's own context and
//!   must never block beyond a short critical section.
//! - [`GattPort::notify`] is invoked from the scheduler worker.
//! - [`AdvertiserPort`] is only driven from the single application context
//!   that owns the advertising payload.

use core::fmt;
use core::time::Duration;
use std::sync::Arc;
use std::time::Instant;

use crate::error::{LinkError, SensorError};
use crate::gatt::Characteristic;
use crate::identity::StaticAddress;

// ───────────────────────────────────────────────────────────────
// Link-layer value types
// ───────────────────────────────────────────────────────────────

/// Opaque identifier of the current peer link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnHandle(pub u16);

impl fmt::Display for ConnHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressKind {
    Public,
    Random,
}

/// Peer device address, most significant octet first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeerAddress {
    pub kind: AddressKind,
    pub octets: [u8; 6],
}

impl fmt::Display for PeerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let o = &self.octets;
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X} ({})",
            o[0],
            o[1],
            o[2],
            o[3],
            o[4],
            o[5],
            match self.kind {
                AddressKind::Public => "public",
                AddressKind::Random => "random",
            }
        )
    }
}

/// Negotiated parameters of an established connection, in link-layer units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnInfo {
    pub peer: PeerAddress,
    /// Connection interval, 1.25 ms units.
    pub interval: u16,
    /// Peripheral latency, connection events.
    pub latency: u16,
    /// Supervision timeout, 10 ms units.
    pub timeout: u16,
}

impl ConnInfo {
    pub fn interval_ms(&self) -> f32 {
        interval_to_ms(self.interval)
    }

    pub fn timeout_ms(&self) -> u32 {
        timeout_to_ms(self.timeout)
    }
}

/// Connection interval units (1.25 ms) to milliseconds.
pub fn interval_to_ms(units: u16) -> f32 {
    f32::from(units) * 1.25
}

/// Supervision timeout units (10 ms) to milliseconds.
pub fn timeout_to_ms(units: u16) -> u32 {
    u32::from(units) * 10
}

/// Connection-parameter update proposed by the peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnParams {
    pub interval_min: u16,
    pub interval_max: u16,
    pub latency: u16,
    pub timeout: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phy {
    Le1M,
    Le2M,
    Coded,
}

impl fmt::Display for Phy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Le1M => write!(f, "1M"),
            Self::Le2M => write!(f, "2M"),
            Self::Coded => write!(f, "Long Range"),
        }
    }
}

/// PHY selection, requested or reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhyPair {
    pub tx: Phy,
    pub rx: Phy,
}

/// Symmetric 2 Mbps, requested right after connecting.
pub const PREFERRED_PHY: PhyPair = PhyPair {
    tx: Phy::Le2M,
    rx: Phy::Le2M,
};

/// Link-layer data length request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataLength {
    /// Payload octets per PDU.
    pub tx_max_len: u16,
    /// Air time per PDU, microseconds.
    pub tx_max_time: u16,
}

/// Largest data length the link layer supports.
pub const MAX_DATA_LENGTH: DataLength = DataLength {
    tx_max_len: 251,
    tx_max_time: 2120,
};

/// Data length in effect after the peer answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataLengthInfo {
    pub tx_max_len: u16,
    pub tx_max_time: u16,
    pub rx_max_len: u16,
    pub rx_max_time: u16,
}

/// Advertising parameters, interval in 0.625 ms units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdvParams {
    pub connectable: bool,
    pub interval_min: u16,
    pub interval_max: u16,
}

impl AdvParams {
    /// Connectable undirected advertising between `min_ms` and `max_ms`.
    pub fn connectable_ms(min_ms: u16, max_ms: u16) -> Self {
        Self {
            connectable: true,
            interval_min: ms_to_adv_units(min_ms),
            interval_max: ms_to_adv_units(max_ms),
        }
    }
}

/// Milliseconds to advertising interval units (0.625 ms).
fn ms_to_adv_units(ms: u16) -> u16 {
    (u32::from(ms) * 8 / 5).min(u32::from(u16::MAX)) as u16
}

// ───────────────────────────────────────────────────────────────
// Radio ports (driven adapter: domain → wireless stack)
// ───────────────────────────────────────────────────────────────

/// Notification delivery to a connected peer.
pub trait GattPort: Send + Sync {
    /// Push `value` for `characteristic` to the peer on `conn`.
    ///
    /// Returns [`LinkError::NotConnected`] when the link is gone.
    fn notify(
        &self,
        conn: ConnHandle,
        characteristic: Characteristic,
        value: &[u8],
    ) -> Result<(), LinkError>;
}

/// Per-connection queries and link-parameter requests.
pub trait LinkPort: Send + Sync {
    /// Peer address and negotiated parameters, if the stack knows them.
    fn conn_info(&self, conn: ConnHandle) -> Option<ConnInfo>;

    /// Ask the controller to switch PHY. Completion arrives asynchronously.
    fn update_phy(&self, conn: ConnHandle, preferred: PhyPair) -> Result<(), LinkError>;

    /// Ask the controller to raise the data length.
    fn update_data_length(&self, conn: ConnHandle, params: DataLength) -> Result<(), LinkError>;
}

/// Identity, stack enablement and advertising control.
pub trait AdvertiserPort {
    /// Install the static random identity. Must precede [`enable`](Self::enable).
    fn create_identity(&mut self, address: StaticAddress) -> Result<(), LinkError>;

    /// Bring up the wireless stack.
    fn enable(&mut self) -> Result<(), LinkError>;

    /// Start advertising the encoded payloads.
    fn start_advertising(
        &mut self,
        params: &AdvParams,
        advertising: &[u8],
        scan_response: &[u8],
    ) -> Result<(), LinkError>;

    /// Replace the payloads of a running advertising set.
    fn update_advertising_data(
        &mut self,
        advertising: &[u8],
        scan_response: &[u8],
    ) -> Result<(), LinkError>;
}

/// Where the radio adapter delivers stack callbacks.
pub trait CallbackRegistry {
    fn register_connection_callbacks(&mut self, callbacks: Arc<dyn ConnectionCallbacks>);
    fn register_gatt_callbacks(&mut self, callbacks: Arc<dyn GattCallbacks>);
}

// ───────────────────────────────────────────────────────────────
// Callback capabilities (wireless stack → domain)
// ───────────────────────────────────────────────────────────────

/// Connection lifecycle notifications from the wireless stack.
pub trait ConnectionCallbacks: Send + Sync {
    /// `status` is zero on success, the HCI error code otherwise.
    fn on_connected(&self, conn: ConnHandle, status: u8);
    fn on_disconnected(&self, conn: ConnHandle, reason: u8);
    /// Return `true` to accept the proposed parameters.
    fn on_param_request(&self, conn: ConnHandle, params: &ConnParams) -> bool;
    fn on_param_updated(&self, conn: ConnHandle, interval: u16, latency: u16, timeout: u16);
    fn on_phy_updated(&self, conn: ConnHandle, phy: PhyPair);
    fn on_data_length_updated(&self, conn: ConnHandle, info: DataLengthInfo);
    fn on_mtu_updated(&self, conn: ConnHandle, tx: u16, rx: u16);
}

/// Attribute access from the peer.
pub trait GattCallbacks: Send + Sync {
    /// Little-endian wire value of `characteristic`.
    fn on_read(&self, characteristic: Characteristic) -> [u8; 2];
    /// The peer wrote the client-configuration descriptor.
    fn on_subscription_changed(&self, characteristic: Characteristic, ccc_value: u16);
}

// ───────────────────────────────────────────────────────────────
// Sensor port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// One combined temperature/humidity reading in physical units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    pub temperature_c: f32,
    pub humidity_pct: f32,
}

/// Trigger-and-fetch access to the humidity/temperature sensor.
pub trait SensorPort: Send {
    fn measure(&mut self) -> Result<Reading, SensorError>;
}

// ───────────────────────────────────────────────────────────────
// Timer port (driven adapter: runtime → scheduler)
// ───────────────────────────────────────────────────────────────

/// Observable state of a cancellable periodic task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Scheduled(Instant),
    Running,
}

impl SchedulerState {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }
}

/// A single cancellable delayed task with a fixed re-arm period.
///
/// At most one firing is ever pending: re-arming replaces the due time.
pub trait WorkTimer: Send {
    /// (Re)arm: fire after `delay`, then every `period`.
    fn arm(&self, delay: Duration, period: Duration);

    /// Disarm. Blocks until an in-flight firing has returned.
    /// A no-op when already idle. Must not be called from the work itself.
    fn cancel(&self);

    fn state(&self) -> SchedulerState;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_conversions() {
        assert!((interval_to_ms(24) - 30.0).abs() < f32::EPSILON);
        assert_eq!(timeout_to_ms(400), 4000);
        let p = AdvParams::connectable_ms(100, 150);
        assert_eq!((p.interval_min, p.interval_max), (160, 240));
    }

    #[test]
    fn peer_address_display() {
        let a = PeerAddress {
            kind: AddressKind::Random,
            octets: [0xF0, 0xF1, 0xF2, 0xF3, 0xF4, 0xF5],
        };
        assert_eq!(a.to_string(), "F0:F1:F2:F3:F4:F5 (random)");
    }
}
