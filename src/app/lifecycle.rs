//! Connection lifecycle monitor.
//!
//! Runs in the wireless stack's callback context. It keeps the
//! [`SampleStore`]'s connection handle current, asks for the preferred link
//! parameters once a peer is in, and forwards connect/disconnect to the
//! main loop through the [`EventBus`]. Nothing here blocks.

use std::sync::Arc;

use log::{debug, info, warn};

use crate::events::EventBus;
use crate::gatt::Subscriptions;
use crate::store::SampleStore;

use super::events::LifecycleEvent;
use super::ports::{
    ConnHandle, ConnParams, ConnectionCallbacks, DataLengthInfo, LinkPort, MAX_DATA_LENGTH,
    PREFERRED_PHY, PhyPair, interval_to_ms, timeout_to_ms,
};

pub struct ConnectionLifecycleMonitor<L: LinkPort> {
    store: Arc<SampleStore>,
    bus: Arc<EventBus>,
    subscriptions: Arc<Subscriptions>,
    link: L,
}

impl<L: LinkPort> ConnectionLifecycleMonitor<L> {
    pub fn new(
        store: Arc<SampleStore>,
        bus: Arc<EventBus>,
        subscriptions: Arc<Subscriptions>,
        link: L,
    ) -> Self {
        Self {
            store,
            bus,
            subscriptions,
            link,
        }
    }

    fn log_connection(&self, conn: ConnHandle) {
        match self.link.conn_info(conn) {
            Some(info) => info!(
                "connected to {}: interval {:.2} ms, latency {}, timeout {} ms",
                info.peer,
                info.interval_ms(),
                info.latency,
                info.timeout_ms()
            ),
            None => warn!("connected on {conn}, connection info unavailable"),
        }
    }

    /// Best effort: the peer or controller may refuse either request.
    fn request_link_preferences(&self, conn: ConnHandle) {
        if let Err(e) = self.link.update_phy(conn, PREFERRED_PHY) {
            warn!("PHY update request failed: {e}");
        }
        if let Err(e) = self.link.update_data_length(conn, MAX_DATA_LENGTH) {
            warn!("data length update request failed: {e}");
        }
    }
}

impl<L: LinkPort> ConnectionCallbacks for ConnectionLifecycleMonitor<L> {
    fn on_connected(&self, conn: ConnHandle, status: u8) {
        // Recorded even on failure; the stack releases the handle with a
        // disconnect if the link never came up.
        self.store.set_connection(Some(conn));

        if status != 0 {
            warn!("connection failed (err 0x{status:02x})");
            return;
        }

        self.log_connection(conn);
        self.request_link_preferences(conn);
        self.bus.publish(LifecycleEvent::Connected);
    }

    fn on_disconnected(&self, conn: ConnHandle, reason: u8) {
        info!("disconnected from {conn} (reason 0x{reason:02x})");
        self.store.set_connection(None);
        self.subscriptions.clear();
        self.bus.publish(LifecycleEvent::Disconnected(reason));
    }

    fn on_param_request(&self, conn: ConnHandle, params: &ConnParams) -> bool {
        debug!(
            "{conn} parameter request: interval {:.2}..{:.2} ms, latency {}, timeout {} ms",
            interval_to_ms(params.interval_min),
            interval_to_ms(params.interval_max),
            params.latency,
            timeout_to_ms(params.timeout)
        );
        true
    }

    fn on_param_updated(&self, conn: ConnHandle, interval: u16, latency: u16, timeout: u16) {
        info!(
            "{conn} parameters updated: interval {:.2} ms, latency {latency}, timeout {} ms",
            interval_to_ms(interval),
            timeout_to_ms(timeout)
        );
    }

    fn on_phy_updated(&self, conn: ConnHandle, phy: PhyPair) {
        info!("{conn} PHY updated: TX {}, RX {}", phy.tx, phy.rx);
    }

    fn on_data_length_updated(&self, conn: ConnHandle, info: DataLengthInfo) {
        info!(
            "{conn} data length updated: TX {} bytes / {} us, RX {} bytes / {} us",
            info.tx_max_len, info.tx_max_time, info.rx_max_len, info.rx_max_time
        );
    }

    fn on_mtu_updated(&self, conn: ConnHandle, tx: u16, rx: u16) {
        info!("{conn} ATT MTU updated: TX {tx}, RX {rx}");
    }
}
