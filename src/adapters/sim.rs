//! In-process radio for host builds.
//!
//! [`SimRadio`] implements every radio port and records what the node asked
//! of it. It also plays the peer: [`connect`](SimRadio::connect),
//! [`subscribe`](SimRadio::subscribe), [`read`](SimRadio::read) and
//! [`disconnect`](SimRadio::disconnect) invoke the registered callbacks the
//! way the wireless stack would. Callbacks always run with the radio's own
//! lock released.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::info;

use crate::app::ports::{
    AddressKind, AdvParams, AdvertiserPort, CallbackRegistry, ConnHandle, ConnInfo,
    ConnectionCallbacks, DataLength, DataLengthInfo, GattCallbacks, GattPort, LinkPort,
    PREFERRED_PHY, PeerAddress, PhyPair,
};
use crate::error::LinkError;
use crate::gatt::{CCC_NOTIFY, Characteristic};
use crate::identity::StaticAddress;

/// A notification as seen by the simulated peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub conn: ConnHandle,
    pub characteristic: Characteristic,
    pub value: Vec<u8>,
}

#[derive(Default)]
struct State {
    identity: Option<StaticAddress>,
    enabled: bool,
    adv_params: Option<AdvParams>,
    advertising: Vec<u8>,
    scan_response: Vec<u8>,
    adv_updates: u32,
    conn: Option<ConnHandle>,
    next_handle: u16,
    notifications: Vec<Notification>,
    phy_requests: Vec<PhyPair>,
    data_length_requests: Vec<DataLength>,
    notify_failure: Option<LinkError>,
    connection_cb: Option<Arc<dyn ConnectionCallbacks>>,
    gatt_cb: Option<Arc<dyn GattCallbacks>>,
}

/// Cloneable handle; all clones drive the same simulated stack.
#[derive(Clone, Default)]
pub struct SimRadio {
    state: Arc<Mutex<State>>,
}

const SIM_PEER: PeerAddress = PeerAddress {
    kind: AddressKind::Random,
    octets: [0xC0, 0xFF, 0xEE, 0x00, 0x00, 0x01],
};

impl SimRadio {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn connection_callbacks(&self) -> Option<Arc<dyn ConnectionCallbacks>> {
        self.lock().connection_cb.clone()
    }

    fn gatt_callbacks(&self) -> Option<Arc<dyn GattCallbacks>> {
        self.lock().gatt_cb.clone()
    }

    // ── Peer simulation ───────────────────────────────────────

    /// A peer connects. Returns the new handle.
    pub fn connect(&self) -> ConnHandle {
        let conn = {
            let mut s = self.lock();
            s.next_handle = s.next_handle.wrapping_add(1);
            let conn = ConnHandle(s.next_handle);
            s.conn = Some(conn);
            conn
        };
        info!("sim: peer connected on {conn}");
        if let Some(cb) = self.connection_callbacks() {
            cb.on_connected(conn, 0);
            cb.on_phy_updated(conn, PREFERRED_PHY);
            cb.on_data_length_updated(
                conn,
                DataLengthInfo {
                    tx_max_len: 251,
                    tx_max_time: 2120,
                    rx_max_len: 251,
                    rx_max_time: 2120,
                },
            );
            cb.on_mtu_updated(conn, 247, 247);
        }
        conn
    }

    /// A connection attempt that fails with HCI `status`.
    pub fn fail_connect(&self, status: u8) -> ConnHandle {
        let conn = {
            let mut s = self.lock();
            s.next_handle = s.next_handle.wrapping_add(1);
            ConnHandle(s.next_handle)
        };
        if let Some(cb) = self.connection_callbacks() {
            cb.on_connected(conn, status);
        }
        conn
    }

    pub fn disconnect(&self, reason: u8) {
        let Some(conn) = self.lock().conn.take() else {
            return;
        };
        info!("sim: peer disconnected from {conn}");
        if let Some(cb) = self.connection_callbacks() {
            cb.on_disconnected(conn, reason);
        }
    }

    /// The peer writes a client-configuration descriptor.
    pub fn write_ccc(&self, characteristic: Characteristic, value: u16) {
        if let Some(cb) = self.gatt_callbacks() {
            cb.on_subscription_changed(characteristic, value);
        }
    }

    /// The peer enables notifications.
    pub fn subscribe(&self, characteristic: Characteristic) {
        self.write_ccc(characteristic, CCC_NOTIFY);
    }

    /// The peer reads a characteristic value.
    pub fn read(&self, characteristic: Characteristic) -> Option<[u8; 2]> {
        self.gatt_callbacks().map(|cb| cb.on_read(characteristic))
    }

    // ── Inspection ────────────────────────────────────────────

    pub fn notifications(&self) -> Vec<Notification> {
        self.lock().notifications.clone()
    }

    pub fn take_notifications(&self) -> Vec<Notification> {
        core::mem::take(&mut self.lock().notifications)
    }

    pub fn identity(&self) -> Option<StaticAddress> {
        self.lock().identity
    }

    pub fn is_enabled(&self) -> bool {
        self.lock().enabled
    }

    pub fn adv_params(&self) -> Option<AdvParams> {
        self.lock().adv_params
    }

    /// Payloads currently on air.
    pub fn advertising_data(&self) -> (Vec<u8>, Vec<u8>) {
        let s = self.lock();
        (s.advertising.clone(), s.scan_response.clone())
    }

    pub fn advertising_updates(&self) -> u32 {
        self.lock().adv_updates
    }

    pub fn phy_requests(&self) -> Vec<PhyPair> {
        self.lock().phy_requests.clone()
    }

    pub fn data_length_requests(&self) -> Vec<DataLength> {
        self.lock().data_length_requests.clone()
    }

    pub fn current_connection(&self) -> Option<ConnHandle> {
        self.lock().conn
    }

    /// Make every following notify fail with `error` (None to recover).
    pub fn set_notify_failure(&self, error: Option<LinkError>) {
        self.lock().notify_failure = error;
    }
}

impl GattPort for SimRadio {
    fn notify(
        &self,
        conn: ConnHandle,
        characteristic: Characteristic,
        value: &[u8],
    ) -> Result<(), LinkError> {
        let mut s = self.lock();
        if s.conn != Some(conn) {
            return Err(LinkError::NotConnected);
        }
        if let Some(e) = s.notify_failure {
            return Err(e);
        }
        s.notifications.push(Notification {
            conn,
            characteristic,
            value: value.to_vec(),
        });
        Ok(())
    }
}

impl LinkPort for SimRadio {
    fn conn_info(&self, conn: ConnHandle) -> Option<ConnInfo> {
        (self.lock().conn == Some(conn)).then_some(ConnInfo {
            peer: SIM_PEER,
            interval: 24,
            latency: 0,
            timeout: 400,
        })
    }

    fn update_phy(&self, conn: ConnHandle, preferred: PhyPair) -> Result<(), LinkError> {
        let mut s = self.lock();
        if s.conn != Some(conn) {
            return Err(LinkError::NotConnected);
        }
        s.phy_requests.push(preferred);
        Ok(())
    }

    fn update_data_length(&self, conn: ConnHandle, params: DataLength) -> Result<(), LinkError> {
        let mut s = self.lock();
        if s.conn != Some(conn) {
            return Err(LinkError::NotConnected);
        }
        s.data_length_requests.push(params);
        Ok(())
    }
}

impl AdvertiserPort for SimRadio {
    fn create_identity(&mut self, address: StaticAddress) -> Result<(), LinkError> {
        let mut s = self.lock();
        if s.enabled {
            return Err(LinkError::InvalidParam);
        }
        s.identity = Some(address);
        Ok(())
    }

    fn enable(&mut self) -> Result<(), LinkError> {
        self.lock().enabled = true;
        Ok(())
    }

    fn start_advertising(
        &mut self,
        params: &AdvParams,
        advertising: &[u8],
        scan_response: &[u8],
    ) -> Result<(), LinkError> {
        let mut s = self.lock();
        if !s.enabled {
            return Err(LinkError::NotEnabled);
        }
        s.adv_params = Some(*params);
        s.advertising = advertising.to_vec();
        s.scan_response = scan_response.to_vec();
        Ok(())
    }

    fn update_advertising_data(
        &mut self,
        advertising: &[u8],
        scan_response: &[u8],
    ) -> Result<(), LinkError> {
        let mut s = self.lock();
        if !s.enabled {
            return Err(LinkError::NotEnabled);
        }
        s.advertising = advertising.to_vec();
        s.scan_response = scan_response.to_vec();
        s.adv_updates += 1;
        Ok(())
    }
}

impl CallbackRegistry for SimRadio {
    fn register_connection_callbacks(&mut self, callbacks: Arc<dyn ConnectionCallbacks>) {
        self.lock().connection_cb = Some(callbacks);
    }

    fn register_gatt_callbacks(&mut self, callbacks: Arc<dyn GattCallbacks>) {
        self.lock().gatt_cb = Some(callbacks);
    }
}
