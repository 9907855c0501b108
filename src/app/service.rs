//! Peripheral service: the temperature and humidity characteristics.
//!
//! [`PeripheralService`] validates readings at the write boundary, stores
//! the encoded value in the [`SampleStore`] and pushes a notification when
//! a peer is connected and has subscribed. Peer reads are served straight
//! from the store and never fail.
//!
//! ```text
//!  MeasurementCycle ──▶ ┌──────────────────────┐ ──▶ GattPort::notify
//!                       │  PeripheralService   │
//!  peer read / CCC  ──▶ │  validate · encode   │ ◀─▶ SampleStore
//!                       └──────────────────────┘
//! ```

use std::sync::Arc;

use log::{debug, info, warn};

use crate::error::{LinkError, ServiceError};
use crate::gatt::{self, Characteristic, Subscriptions};
use crate::store::SampleStore;

use super::ports::{ConnHandle, GattCallbacks, GattPort};

/// Read/notify service over the shared sample store.
pub struct PeripheralService<G: GattPort> {
    store: Arc<SampleStore>,
    subscriptions: Arc<Subscriptions>,
    gatt: G,
}

impl<G: GattPort> PeripheralService<G> {
    pub fn new(store: Arc<SampleStore>, gatt: G) -> Self {
        Self {
            store,
            subscriptions: Arc::new(Subscriptions::new()),
            gatt,
        }
    }

    /// Shared with the lifecycle monitor, which clears it on disconnect.
    pub fn subscriptions(&self) -> Arc<Subscriptions> {
        Arc::clone(&self.subscriptions)
    }

    pub fn store(&self) -> &Arc<SampleStore> {
        &self.store
    }

    // ── Write path ────────────────────────────────────────────

    /// Accept a temperature in °C, cache it and notify the peer.
    ///
    /// Out-of-range input leaves the store untouched. Having no peer is
    /// not an error; the value is served on the next read.
    pub fn update_temperature(&self, celsius: f32) -> Result<(), ServiceError> {
        let raw = gatt::encode_temperature(celsius).inspect_err(|_| {
            warn!("temperature {celsius} °C out of range");
        })?;
        let conn = self.store.store_temperature(raw);
        self.notify(conn, Characteristic::Temperature, &raw.to_le_bytes())
    }

    /// Accept a relative humidity in %, cache it and notify the peer.
    pub fn update_humidity(&self, percent: f32) -> Result<(), ServiceError> {
        let raw = gatt::encode_humidity(percent).inspect_err(|_| {
            warn!("humidity {percent} % out of range");
        })?;
        let conn = self.store.store_humidity(raw);
        self.notify(conn, Characteristic::Humidity, &raw.to_le_bytes())
    }

    fn notify(
        &self,
        conn: Option<ConnHandle>,
        characteristic: Characteristic,
        value: &[u8],
    ) -> Result<(), ServiceError> {
        let Some(conn) = conn else {
            debug!("no peer, {characteristic} cached only");
            return Ok(());
        };
        if !self.subscriptions.is_enabled(characteristic) {
            debug!("{characteristic} notifications not enabled by peer");
            return Ok(());
        }
        match self.gatt.notify(conn, characteristic, value) {
            // Link dropped between the store read and the send.
            Ok(()) | Err(LinkError::NotConnected) => Ok(()),
            Err(e) => {
                warn!("{characteristic} notification on {conn} failed: {e}");
                Err(ServiceError::Link(e))
            }
        }
    }

    // ── Read path ─────────────────────────────────────────────

    pub fn read_temperature(&self) -> i16 {
        self.store.read_sample().temperature
    }

    pub fn read_humidity(&self) -> u16 {
        self.store.read_sample().humidity
    }

    /// Wire value served to the peer.
    pub fn read_temperature_le(&self) -> [u8; 2] {
        self.read_temperature().to_le_bytes()
    }

    pub fn read_humidity_le(&self) -> [u8; 2] {
        self.read_humidity().to_le_bytes()
    }

    // ── Peer configuration ────────────────────────────────────

    pub fn on_subscription_changed(&self, characteristic: Characteristic, ccc_value: u16) {
        let enabled = self.subscriptions.set(characteristic, ccc_value);
        info!(
            "{characteristic} notifications {}",
            if enabled { "enabled" } else { "disabled" }
        );
    }
}

impl<G: GattPort> GattCallbacks for PeripheralService<G> {
    fn on_read(&self, characteristic: Characteristic) -> [u8; 2] {
        match characteristic {
            Characteristic::Temperature => self.read_temperature_le(),
            Characteristic::Humidity => self.read_humidity_le(),
        }
    }

    fn on_subscription_changed(&self, characteristic: Characteristic, ccc_value: u16) {
        PeripheralService::on_subscription_changed(self, characteristic, ccc_value);
    }
}
