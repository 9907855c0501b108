//! Bluedroid radio adapter (ESP-IDF only).
//!
//! Implements every radio port over the raw `esp_ble_gap_*` / `esp_ble_gatts_*`
//! API. Bluedroid callbacks are C function pointers that cannot capture
//! Rust closures, so static atomics and mutexes bridge the callback context
//! to [`EspRadio`] and to the registered domain callbacks.
//!
//! ## Attribute table
//!
//! | Attribute            | UUID     | Perms      | Response |
//! |----------------------|----------|------------|----------|
//! | ESS service          | `0x181A` |            |          |
//! | Temperature          | `0x2A6E` | Read+Notify| by app   |
//! | ├ CCC                | `0x2902` | Read+Write | auto     |
//! | └ Presentation fmt   | `0x2904` | Read       | auto     |
//! | Humidity             | `0x2A6F` | Read+Notify| by app   |
//! | ├ CCC                | `0x2902` | Read+Write | auto     |
//! | └ Presentation fmt   | `0x2904` | Read       | auto     |
//!
//! Attributes are added one at a time; each `ADD_*_EVT` advances
//! `ATTR_STEP` and issues the next request.

use core::sync::atomic::{AtomicBool, AtomicU8, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use esp_idf_svc::sys::*;
use log::{debug, error, info, warn};

use crate::app::ports::{
    AddressKind, AdvParams, AdvertiserPort, CallbackRegistry, ConnHandle, ConnInfo,
    ConnectionCallbacks, DataLength, DataLengthInfo, GattCallbacks, GattPort, LinkPort,
    PeerAddress, Phy, PhyPair,
};
use crate::error::LinkError;
use crate::gatt::{
    CLIENT_CONFIG_UUID, Characteristic, ENVIRONMENTAL_SENSING_SERVICE, PRESENTATION_FORMAT_UUID,
};
use crate::identity::StaticAddress;

/// Service declaration + 2 × (declaration, value, CCC, format).
const SERVICE_HANDLE_COUNT: u16 = 1 + 2 * 4;

// ── Static bridge state ──────────────────────────────────────

static GATTS_IF: AtomicU32 = AtomicU32::new(ESP_GATT_IF_NONE as u32);
static SVC_HANDLE: AtomicU32 = AtomicU32::new(0);
static TEMP_VALUE_HANDLE: AtomicU32 = AtomicU32::new(0);
static TEMP_CCC_HANDLE: AtomicU32 = AtomicU32::new(0);
static HUM_VALUE_HANDLE: AtomicU32 = AtomicU32::new(0);
static HUM_CCC_HANDLE: AtomicU32 = AtomicU32::new(0);
static ATTR_STEP: AtomicU8 = AtomicU8::new(0);

static CONNECTED: AtomicBool = AtomicBool::new(false);
static CONN_ID: AtomicU32 = AtomicU32::new(0);
/// Interval (1.25 ms) | latency | timeout (10 ms), as reported by the stack.
static CONN_PARAMS: Mutex<(u16, u16, u16)> = Mutex::new((0, 0, 0));
static PEER: Mutex<Option<PeerAddress>> = Mutex::new(None);

static ADV_PARAMS: Mutex<Option<esp_ble_adv_params_t>> = Mutex::new(None);
static ADV_ACTIVE: AtomicBool = AtomicBool::new(false);
/// Bit 0: advertising data set, bit 1: scan response set.
static ADV_CONFIG_DONE: AtomicU8 = AtomicU8::new(0);
const ADV_CONFIG_ADV: u8 = 0b01;
const ADV_CONFIG_SCAN: u8 = 0b10;

static IDENTITY: Mutex<Option<StaticAddress>> = Mutex::new(None);
static ENABLED: AtomicBool = AtomicBool::new(false);

static CONNECTION_CB: Mutex<Option<Arc<dyn ConnectionCallbacks>>> = Mutex::new(None);
static GATT_CB: Mutex<Option<Arc<dyn GattCallbacks>>> = Mutex::new(None);

fn connection_cb() -> Option<Arc<dyn ConnectionCallbacks>> {
    CONNECTION_CB.lock().ok().and_then(|cb| cb.clone())
}

fn gatt_cb() -> Option<Arc<dyn GattCallbacks>> {
    GATT_CB.lock().ok().and_then(|cb| cb.clone())
}

fn check(ret: esp_err_t) -> Result<(), LinkError> {
    match ret {
        r if r == ESP_OK as i32 => Ok(()),
        r if r == ESP_ERR_INVALID_STATE as i32 => Err(LinkError::NotEnabled),
        r if r == ESP_ERR_INVALID_ARG as i32 => Err(LinkError::InvalidParam),
        r if r == ESP_ERR_NO_MEM as i32 => Err(LinkError::NoBuffers),
        r if r == ESP_FAIL => Err(LinkError::Busy),
        r => Err(LinkError::Stack(r)),
    }
}

fn uuid16(uuid: u16) -> esp_bt_uuid_t {
    // SAFETY: plain C struct, all-zero is a valid bit pattern.
    let mut t: esp_bt_uuid_t = unsafe { core::mem::zeroed() };
    t.len = 2;
    t.uuid.uuid16 = uuid;
    t
}

fn phy_from_esp(phy: u8) -> Phy {
    match u32::from(phy) {
        ESP_BLE_GAP_PHY_2M => Phy::Le2M,
        ESP_BLE_GAP_PHY_CODED => Phy::Coded,
        _ => Phy::Le1M,
    }
}

fn phy_mask(phy: Phy) -> u8 {
    (match phy {
        Phy::Le1M => ESP_BLE_GAP_PHY_1M_PREF_MASK,
        Phy::Le2M => ESP_BLE_GAP_PHY_2M_PREF_MASK,
        Phy::Coded => ESP_BLE_GAP_PHY_CODED_PREF_MASK,
    }) as u8
}

fn characteristic_for_value(handle: u16) -> Option<Characteristic> {
    let h = u32::from(handle);
    if h == TEMP_VALUE_HANDLE.load(Ordering::Relaxed) {
        Some(Characteristic::Temperature)
    } else if h == HUM_VALUE_HANDLE.load(Ordering::Relaxed) {
        Some(Characteristic::Humidity)
    } else {
        None
    }
}

fn characteristic_for_ccc(handle: u16) -> Option<Characteristic> {
    let h = u32::from(handle);
    if h == TEMP_CCC_HANDLE.load(Ordering::Relaxed) {
        Some(Characteristic::Temperature)
    } else if h == HUM_CCC_HANDLE.load(Ordering::Relaxed) {
        Some(Characteristic::Humidity)
    } else {
        None
    }
}

fn value_handle(c: Characteristic) -> u16 {
    (match c {
        Characteristic::Temperature => TEMP_VALUE_HANDLE.load(Ordering::Relaxed),
        Characteristic::Humidity => HUM_VALUE_HANDLE.load(Ordering::Relaxed),
    }) as u16
}

// ── Attribute registration ───────────────────────────────────

unsafe fn add_value_char(svc_handle: u16, c: Characteristic) {
    let mut uuid = uuid16(c.uuid());
    // Null control: reads are answered by the application.
    let ret = unsafe {
        esp_ble_gatts_add_char(
            svc_handle,
            &mut uuid,
            ESP_GATT_PERM_READ as esp_gatt_perm_t,
            (ESP_GATT_CHAR_PROP_BIT_READ | ESP_GATT_CHAR_PROP_BIT_NOTIFY) as esp_gatt_char_prop_t,
            core::ptr::null_mut(),
            core::ptr::null_mut(),
        )
    };
    if ret != ESP_OK as i32 {
        error!("BLE GATTS: add {c} characteristic failed ({ret})");
    }
}

unsafe fn add_auto_descr(svc_handle: u16, uuid: u16, perm: u32, value: &mut [u8]) {
    let mut uuid = uuid16(uuid);
    let mut attr = esp_attr_value_t {
        attr_max_len: value.len() as u16,
        attr_len: value.len() as u16,
        attr_value: value.as_mut_ptr(),
    };
    let mut control = esp_attr_control_t {
        auto_rsp: ESP_GATT_AUTO_RSP as u8,
    };
    let ret = unsafe {
        esp_ble_gatts_add_char_descr(
            svc_handle,
            &mut uuid,
            perm as esp_gatt_perm_t,
            &mut attr,
            &mut control,
        )
    };
    if ret != ESP_OK as i32 {
        error!("BLE GATTS: add descriptor 0x{:04x} failed ({ret})", uuid.uuid.uuid16);
    }
}

unsafe fn add_ccc(svc_handle: u16) {
    let mut initial = [0u8; 2];
    unsafe {
        add_auto_descr(
            svc_handle,
            CLIENT_CONFIG_UUID,
            ESP_GATT_PERM_READ | ESP_GATT_PERM_WRITE,
            &mut initial,
        );
    }
}

unsafe fn add_format(svc_handle: u16, c: Characteristic) {
    let mut cpf = c.presentation_format().to_bytes();
    unsafe {
        add_auto_descr(svc_handle, PRESENTATION_FORMAT_UUID, ESP_GATT_PERM_READ, &mut cpf);
    }
}

/// Next step of the attribute sequence, keyed on the step just completed.
unsafe fn advance_attr_table(completed_handle: u16) {
    let svc = SVC_HANDLE.load(Ordering::Relaxed) as u16;
    let step = ATTR_STEP.fetch_add(1, Ordering::Relaxed);
    let h = u32::from(completed_handle);
    unsafe {
        match step {
            0 => add_value_char(svc, Characteristic::Temperature),
            1 => {
                TEMP_VALUE_HANDLE.store(h, Ordering::Relaxed);
                add_ccc(svc);
            }
            2 => {
                TEMP_CCC_HANDLE.store(h, Ordering::Relaxed);
                add_format(svc, Characteristic::Temperature);
            }
            3 => add_value_char(svc, Characteristic::Humidity),
            4 => {
                HUM_VALUE_HANDLE.store(h, Ordering::Relaxed);
                add_ccc(svc);
            }
            5 => {
                HUM_CCC_HANDLE.store(h, Ordering::Relaxed);
                add_format(svc, Characteristic::Humidity);
            }
            6 => {
                esp_ble_gatts_start_service(svc);
                info!("BLE GATTS: environmental sensing service started");
            }
            _ => {}
        }
    }
}

// ── Advertising ──────────────────────────────────────────────

unsafe fn start_advertising_if_ready() {
    if ADV_CONFIG_DONE.load(Ordering::Acquire) != ADV_CONFIG_ADV | ADV_CONFIG_SCAN
        || ADV_ACTIVE.load(Ordering::Acquire)
        || CONNECTED.load(Ordering::Acquire)
    {
        return;
    }
    let Some(mut params) = ADV_PARAMS.lock().ok().and_then(|p| *p) else {
        return;
    };
    let ret = unsafe { esp_ble_gap_start_advertising(&mut params) };
    if ret != ESP_OK as i32 {
        warn!("BLE GAP: start advertising failed ({ret})");
    }
}

unsafe fn configure_payloads(advertising: &[u8], scan_response: &[u8]) -> Result<(), LinkError> {
    ADV_CONFIG_DONE.store(0, Ordering::Release);
    // Bluedroid copies both buffers before returning.
    unsafe {
        check(esp_ble_gap_config_adv_data_raw(
            advertising.as_ptr().cast_mut(),
            advertising.len() as u32,
        ))?;
        check(esp_ble_gap_config_scan_rsp_data_raw(
            scan_response.as_ptr().cast_mut(),
            scan_response.len() as u32,
        ))
    }
}

// ── Stack callbacks ──────────────────────────────────────────

unsafe extern "C" fn ble_gap_event_handler(
    event: esp_gap_ble_cb_event_t,
    param: *mut esp_ble_gap_cb_param_t,
) {
    // SAFETY: Bluedroid passes a valid param block for the event's lifetime.
    let param = unsafe { &*param };
    #[allow(non_upper_case_globals)]
    match event {
        esp_gap_ble_cb_event_t_ESP_GAP_BLE_ADV_DATA_RAW_SET_COMPLETE_EVT => {
            ADV_CONFIG_DONE.fetch_or(ADV_CONFIG_ADV, Ordering::AcqRel);
            unsafe { start_advertising_if_ready() };
        }
        esp_gap_ble_cb_event_t_ESP_GAP_BLE_SCAN_RSP_DATA_RAW_SET_COMPLETE_EVT => {
            ADV_CONFIG_DONE.fetch_or(ADV_CONFIG_SCAN, Ordering::AcqRel);
            unsafe { start_advertising_if_ready() };
        }
        esp_gap_ble_cb_event_t_ESP_GAP_BLE_ADV_START_COMPLETE_EVT => {
            let status = unsafe { param.adv_start_cmpl.status };
            if status == esp_bt_status_t_ESP_BT_STATUS_SUCCESS {
                ADV_ACTIVE.store(true, Ordering::Release);
                info!("Advertising successfully started");
            } else {
                error!("Advertising failed to start ({status})");
            }
        }
        esp_gap_ble_cb_event_t_ESP_GAP_BLE_ADV_STOP_COMPLETE_EVT => {
            ADV_ACTIVE.store(false, Ordering::Release);
            debug!("BLE GAP: advertising stopped");
        }
        esp_gap_ble_cb_event_t_ESP_GAP_BLE_UPDATE_CONN_PARAMS_EVT => {
            let p = unsafe { &param.update_conn_params };
            if let Ok(mut cp) = CONN_PARAMS.lock() {
                *cp = (p.conn_int, p.latency, p.timeout);
            }
            if let Some(cb) = connection_cb() {
                cb.on_param_updated(
                    ConnHandle(CONN_ID.load(Ordering::Relaxed) as u16),
                    p.conn_int,
                    p.latency,
                    p.timeout,
                );
            }
        }
        esp_gap_ble_cb_event_t_ESP_GAP_BLE_PHY_UPDATE_COMPLETE_EVT => {
            let p = unsafe { &param.phy_update };
            if let Some(cb) = connection_cb() {
                cb.on_phy_updated(
                    ConnHandle(CONN_ID.load(Ordering::Relaxed) as u16),
                    PhyPair {
                        tx: phy_from_esp(p.tx_phy),
                        rx: phy_from_esp(p.rx_phy),
                    },
                );
            }
        }
        esp_gap_ble_cb_event_t_ESP_GAP_BLE_SET_PKT_LENGTH_COMPLETE_EVT => {
            let p = unsafe { &param.pkt_data_length_cmpl };
            if let Some(cb) = connection_cb() {
                cb.on_data_length_updated(
                    ConnHandle(CONN_ID.load(Ordering::Relaxed) as u16),
                    DataLengthInfo {
                        tx_max_len: p.params.tx_len,
                        tx_max_time: 0,
                        rx_max_len: p.params.rx_len,
                        rx_max_time: 0,
                    },
                );
            }
        }
        esp_gap_ble_cb_event_t_ESP_GAP_BLE_SET_STATIC_RAND_ADDR_EVT => {
            debug!("BLE GAP: static random address set");
        }
        _ => {}
    }
}

unsafe extern "C" fn ble_gatts_event_handler(
    event: esp_gatts_cb_event_t,
    gatts_if: esp_gatt_if_t,
    param: *mut esp_ble_gatts_cb_param_t,
) {
    // SAFETY: Bluedroid passes a valid param block for the event's lifetime.
    let param = unsafe { &*param };
    #[allow(non_upper_case_globals)]
    match event {
        esp_gatts_cb_event_t_ESP_GATTS_REG_EVT => {
            GATTS_IF.store(u32::from(gatts_if), Ordering::Relaxed);
            info!("BLE GATTS: app registered (if={gatts_if})");
            let mut svc_id = esp_gatt_srvc_id_t {
                id: esp_gatt_id_t {
                    uuid: uuid16(ENVIRONMENTAL_SENSING_SERVICE),
                    inst_id: 0,
                },
                is_primary: true,
            };
            unsafe { esp_ble_gatts_create_service(gatts_if, &mut svc_id, SERVICE_HANDLE_COUNT) };
        }
        esp_gatts_cb_event_t_ESP_GATTS_CREATE_EVT => {
            let svc = unsafe { param.create.service_handle };
            SVC_HANDLE.store(u32::from(svc), Ordering::Relaxed);
            ATTR_STEP.store(0, Ordering::Relaxed);
            unsafe { advance_attr_table(svc) };
        }
        esp_gatts_cb_event_t_ESP_GATTS_ADD_CHAR_EVT => {
            let handle = unsafe { param.add_char.attr_handle };
            unsafe { advance_attr_table(handle) };
        }
        esp_gatts_cb_event_t_ESP_GATTS_ADD_CHAR_DESCR_EVT => {
            let handle = unsafe { param.add_char_descr.attr_handle };
            unsafe { advance_attr_table(handle) };
        }
        esp_gatts_cb_event_t_ESP_GATTS_CONNECT_EVT => {
            let p = unsafe { &param.connect };
            CONN_ID.store(u32::from(p.conn_id), Ordering::Relaxed);
            CONNECTED.store(true, Ordering::Release);
            ADV_ACTIVE.store(false, Ordering::Release);
            if let Ok(mut cp) = CONN_PARAMS.lock() {
                *cp = (p.conn_params.interval, p.conn_params.latency, p.conn_params.timeout);
            }
            let octets = p.remote_bda;
            if let Ok(mut peer) = PEER.lock() {
                *peer = Some(PeerAddress {
                    kind: if u32::from(p.ble_addr_type) == esp_ble_addr_type_t_BLE_ADDR_TYPE_PUBLIC {
                        AddressKind::Public
                    } else {
                        AddressKind::Random
                    },
                    octets,
                });
            }
            if let Some(cb) = connection_cb() {
                cb.on_connected(ConnHandle(p.conn_id), 0);
            }
        }
        esp_gatts_cb_event_t_ESP_GATTS_DISCONNECT_EVT => {
            let p = unsafe { &param.disconnect };
            CONNECTED.store(false, Ordering::Release);
            if let Ok(mut peer) = PEER.lock() {
                *peer = None;
            }
            if let Some(cb) = connection_cb() {
                cb.on_disconnected(ConnHandle(p.conn_id), p.reason as u8);
            }
            // Connectable advertising resumes once the link is gone.
            unsafe { start_advertising_if_ready() };
        }
        esp_gatts_cb_event_t_ESP_GATTS_MTU_EVT => {
            let p = unsafe { &param.mtu };
            if let Some(cb) = connection_cb() {
                cb.on_mtu_updated(ConnHandle(p.conn_id), p.mtu, p.mtu);
            }
        }
        esp_gatts_cb_event_t_ESP_GATTS_READ_EVT => {
            let p = unsafe { &param.read };
            if !p.need_rsp {
                return;
            }
            let Some(c) = characteristic_for_value(p.handle) else {
                return;
            };
            let value = gatt_cb().map_or([0; 2], |cb| cb.on_read(c));
            // SAFETY: plain C struct, all-zero is a valid bit pattern.
            let mut rsp: esp_gatt_rsp_t = unsafe { core::mem::zeroed() };
            unsafe {
                rsp.attr_value.handle = p.handle;
                rsp.attr_value.len = value.len() as u16;
                rsp.attr_value.value[..value.len()].copy_from_slice(&value);
                esp_ble_gatts_send_response(
                    gatts_if,
                    p.conn_id,
                    p.trans_id,
                    esp_gatt_status_t_ESP_GATT_OK,
                    &mut rsp,
                );
            }
        }
        esp_gatts_cb_event_t_ESP_GATTS_WRITE_EVT => {
            let p = unsafe { &param.write };
            let Some(c) = characteristic_for_ccc(p.handle) else {
                return;
            };
            if p.len == 2 {
                // SAFETY: Bluedroid guarantees `len` readable bytes at `value`.
                let data = unsafe { core::slice::from_raw_parts(p.value, 2) };
                if let Some(cb) = gatt_cb() {
                    cb.on_subscription_changed(c, u16::from_le_bytes([data[0], data[1]]));
                }
            }
        }
        _ => {}
    }
}

// ── Adapter ──────────────────────────────────────────────────

/// Handle onto the process-wide Bluedroid instance.
#[derive(Debug, Clone, Default)]
pub struct EspRadio {
    _private: (),
}

impl EspRadio {
    pub fn new() -> Self {
        Self::default()
    }

    fn peer_octets(conn: ConnHandle) -> Result<[u8; 6], LinkError> {
        if !CONNECTED.load(Ordering::Acquire) || CONN_ID.load(Ordering::Relaxed) != u32::from(conn.0)
        {
            return Err(LinkError::NotConnected);
        }
        PEER.lock()
            .ok()
            .and_then(|p| p.map(|p| p.octets))
            .ok_or(LinkError::NotConnected)
    }
}

impl GattPort for EspRadio {
    fn notify(
        &self,
        conn: ConnHandle,
        characteristic: Characteristic,
        value: &[u8],
    ) -> Result<(), LinkError> {
        if !CONNECTED.load(Ordering::Acquire) || CONN_ID.load(Ordering::Relaxed) != u32::from(conn.0)
        {
            return Err(LinkError::NotConnected);
        }
        let mut buf = heapless::Vec::<u8, 2>::new();
        buf.extend_from_slice(value)
            .map_err(|()| LinkError::InvalidParam)?;
        // SAFETY: the stack copies the value before returning.
        check(unsafe {
            esp_ble_gatts_send_indicate(
                GATTS_IF.load(Ordering::Relaxed) as esp_gatt_if_t,
                conn.0,
                value_handle(characteristic),
                buf.len() as u16,
                buf.as_mut_ptr(),
                false,
            )
        })
    }
}

impl LinkPort for EspRadio {
    fn conn_info(&self, conn: ConnHandle) -> Option<ConnInfo> {
        let octets = Self::peer_octets(conn).ok()?;
        let kind = PEER.lock().ok().and_then(|p| p.map(|p| p.kind))?;
        let (interval, latency, timeout) = *CONN_PARAMS.lock().ok()?;
        Some(ConnInfo {
            peer: PeerAddress { kind, octets },
            interval,
            latency,
            timeout,
        })
    }

    fn update_phy(&self, conn: ConnHandle, preferred: PhyPair) -> Result<(), LinkError> {
        let mut bda = Self::peer_octets(conn)?;
        // SAFETY: `bda` outlives the call; the stack copies it.
        check(unsafe {
            esp_ble_gap_set_preferred_phy(
                bda.as_mut_ptr(),
                0,
                phy_mask(preferred.tx),
                phy_mask(preferred.rx),
                ESP_BLE_GAP_PHY_OPTIONS_NO_PREF as u16,
            )
        })
    }

    fn update_data_length(&self, conn: ConnHandle, params: DataLength) -> Result<(), LinkError> {
        let mut bda = Self::peer_octets(conn)?;
        // Bluedroid derives the PDU time from the length.
        check(unsafe { esp_ble_gap_set_pkt_data_len(bda.as_mut_ptr(), params.tx_max_len) })
    }
}

impl AdvertiserPort for EspRadio {
    fn create_identity(&mut self, address: StaticAddress) -> Result<(), LinkError> {
        if ENABLED.load(Ordering::Acquire) {
            return Err(LinkError::InvalidParam);
        }
        *IDENTITY.lock().map_err(|_| LinkError::Busy)? = Some(address);
        Ok(())
    }

    fn enable(&mut self) -> Result<(), LinkError> {
        unsafe {
            // BLE only: release classic BT memory.
            esp_bt_controller_mem_release(esp_bt_mode_t_ESP_BT_MODE_CLASSIC_BT);

            let mut bt_cfg = esp_bt_controller_config_t::default();
            check(esp_bt_controller_init(&mut bt_cfg))
                .inspect_err(|e| error!("BLE: bt_controller_init failed ({e})"))?;
            check(esp_bt_controller_enable(esp_bt_mode_t_ESP_BT_MODE_BLE))
                .inspect_err(|e| error!("BLE: bt_controller_enable failed ({e})"))?;
            check(esp_bluedroid_init()).inspect_err(|e| error!("BLE: bluedroid_init failed ({e})"))?;
            check(esp_bluedroid_enable())
                .inspect_err(|e| error!("BLE: bluedroid_enable failed ({e})"))?;

            if let Some(identity) = IDENTITY.lock().ok().and_then(|i| *i) {
                let mut addr = identity.octets();
                check(esp_ble_gap_set_rand_addr(addr.as_mut_ptr()))
                    .inspect_err(|e| error!("Invalid BT address ({e})"))?;
            }

            check(esp_ble_gap_register_callback(Some(ble_gap_event_handler)))?;
            check(esp_ble_gatts_register_callback(Some(ble_gatts_event_handler)))?;
            check(esp_ble_gatts_app_register(0))?;
        }
        ENABLED.store(true, Ordering::Release);
        info!("BLE(espidf): Bluedroid stack enabled");
        Ok(())
    }

    fn start_advertising(
        &mut self,
        params: &AdvParams,
        advertising: &[u8],
        scan_response: &[u8],
    ) -> Result<(), LinkError> {
        if !ENABLED.load(Ordering::Acquire) {
            return Err(LinkError::NotEnabled);
        }
        // SAFETY: plain C struct, all-zero is a valid bit pattern.
        let esp_params = esp_ble_adv_params_t {
            adv_int_min: params.interval_min,
            adv_int_max: params.interval_max,
            adv_type: if params.connectable {
                esp_ble_adv_type_t_ADV_TYPE_IND
            } else {
                esp_ble_adv_type_t_ADV_TYPE_NONCONN_IND
            },
            own_addr_type: esp_ble_addr_type_t_BLE_ADDR_TYPE_RANDOM,
            channel_map: esp_ble_adv_channel_t_ADV_CHNL_ALL,
            adv_filter_policy: esp_ble_adv_filter_t_ADV_FILTER_ALLOW_SCAN_ANY_CON_ANY,
            ..unsafe { core::mem::zeroed() }
        };
        *ADV_PARAMS.lock().map_err(|_| LinkError::Busy)? = Some(esp_params);
        // Advertising starts from the GAP handler once both payloads are set.
        unsafe { configure_payloads(advertising, scan_response) }
    }

    fn update_advertising_data(
        &mut self,
        advertising: &[u8],
        scan_response: &[u8],
    ) -> Result<(), LinkError> {
        if !ENABLED.load(Ordering::Acquire) {
            return Err(LinkError::NotEnabled);
        }
        unsafe { configure_payloads(advertising, scan_response) }
    }
}

impl CallbackRegistry for EspRadio {
    fn register_connection_callbacks(&mut self, callbacks: Arc<dyn ConnectionCallbacks>) {
        if let Ok(mut cb) = CONNECTION_CB.lock() {
            *cb = Some(callbacks);
        }
    }

    fn register_gatt_callbacks(&mut self, callbacks: Arc<dyn GattCallbacks>) {
        if let Ok(mut cb) = GATT_CB.lock() {
            *cb = Some(callbacks);
        }
    }
}
