//! BLE link adapter.
//!
//! Implements [`LinkTransport`], the outgoing half of the controller link,
//! and turns Bluedroid callbacks into [`LinkEvent`]s on the event queue.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: Bluedroid BLE GATT server via `esp_idf_svc::sys`.
//! - **all other targets**: recording simulation for host-side tests.
//!
//! ## GATT Service Layout
//!
//! Service `4ac6a418-d0eb-4016-a8a7-090467c9cf1c`:
//!
//! | Characteristic       | UUID                     | Perms              |
//! |----------------------|--------------------------|--------------------|
//! | Alert-Policy-Config  | `154456ac-…-3ebf0055262d`| Read+Write+Notify  |
//! | Make-Alert           | `e75b30ba-…-02a8a7877a1d`| Write              |
//! | PIN-Auth             | `d25822e9-…-179a03e588ab`| Write              |
//!
//! Reads and writes are answered by the adapter (not auto-response) so a
//! rejected write never changes what the controller reads back.  Long
//! writes arrive as prepared fragments and are reassembled by
//! [`PreparedWrite`] before the core sees them.

use core::fmt;
use log::info;

use crate::app::link::{Characteristic, LinkEvent, Payload};
use crate::app::ports::LinkTransport;
use crate::config::TagConfig;

#[cfg(not(target_os = "espidf"))]
use crate::app::link::SERVICE_UUID;

/// Largest readable characteristic value.
pub const MAX_VALUE_LEN: usize = 64;

type Value = heapless::Vec<u8, MAX_VALUE_LEN>;

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkError {
    /// Controller or Bluedroid bring-up failed.  Carries the ESP-IDF code.
    StackInitFailed(i32),
    /// GATT application or callback registration failed.
    RegistrationFailed(i32),
}

impl fmt::Display for LinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StackInitFailed(code) => write!(f, "BLE stack initialisation failed ({code})"),
            Self::RegistrationFailed(code) => write!(f, "GATT registration failed ({code})"),
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Long writes
// ───────────────────────────────────────────────────────────────

/// Why a prepared-write fragment was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrepareError {
    /// Fragment does not continue the queued bytes, or targets another
    /// characteristic than the queued ones.
    InvalidOffset,
    /// Reassembled value would exceed the largest accepted write.
    TooLong,
}

/// Reassembly queue for one ATT long write (prepare + execute).
///
/// Fragments must arrive in order and target a single characteristic.
/// A refused fragment discards the whole queue.
#[derive(Debug)]
pub struct PreparedWrite {
    target: Option<Characteristic>,
    data: Payload,
}

impl PreparedWrite {
    pub const fn new() -> Self {
        Self {
            target: None,
            data: heapless::Vec::new(),
        }
    }

    pub fn append(
        &mut self,
        characteristic: Characteristic,
        offset: usize,
        fragment: &[u8],
    ) -> Result<(), PrepareError> {
        if self.target.is_some_and(|t| t != characteristic) || offset != self.data.len() {
            self.cancel();
            return Err(PrepareError::InvalidOffset);
        }
        if self.data.extend_from_slice(fragment).is_err() {
            self.cancel();
            return Err(PrepareError::TooLong);
        }
        self.target = Some(characteristic);
        Ok(())
    }

    /// Complete the long write.  `None` when nothing was queued.
    pub fn execute(&mut self) -> Option<LinkEvent> {
        let target = self.target.take()?;
        let event = LinkEvent::written(target, &self.data);
        self.data.clear();
        event
    }

    pub fn cancel(&mut self) {
        self.target = None;
        self.data.clear();
    }
}

impl Default for PreparedWrite {
    fn default() -> Self {
        Self::new()
    }
}

// ───────────────────────────────────────────────────────────────
// BLE state
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BleState {
    Idle,
    Advertising,
    Connected,
    Failed,
}

// ── ESP-IDF BLE static state ──────────────────────────────────
//
// Bluedroid callbacks are C function pointers that cannot capture Rust
// closures. These statics bridge the callback context to the adapter.

#[cfg(target_os = "espidf")]
mod stack {
    use core::sync::atomic::{AtomicBool, AtomicU8, AtomicU32, Ordering};
    use std::sync::Mutex;

    use esp_idf_svc::sys::*;
    use log::{info, warn};

    use super::{MAX_VALUE_LEN, PrepareError, PreparedWrite, Value};
    use crate::app::link::{
        ALERT_POLICY_CONFIG_UUID, Characteristic, LinkEvent, MAKE_ALERT_UUID, MAX_WRITE_LEN,
        PIN_AUTH_UUID, SERVICE_UUID,
    };

    pub static GATTS_IF: AtomicU32 = AtomicU32::new(ESP_GATT_IF_NONE as u32);
    pub static CONN_ID: AtomicU32 = AtomicU32::new(0);
    pub static CONNECTED: AtomicBool = AtomicBool::new(false);
    static SVC_HANDLE: AtomicU32 = AtomicU32::new(0);
    static CHAR_STEP: AtomicU8 = AtomicU8::new(0);
    pub static POLICY_HANDLE: AtomicU32 = AtomicU32::new(0);
    static MAKE_ALERT_HANDLE: AtomicU32 = AtomicU32::new(0);
    static PIN_AUTH_HANDLE: AtomicU32 = AtomicU32::new(0);

    // Advertising starts once both adv and scan-response data are set
    // and the core asked for it, in whichever order those happen.
    const ADV_DATA_SET: u8 = 1 << 0;
    const SCAN_RSP_SET: u8 = 1 << 1;
    const ADV_REQUESTED: u8 = 1 << 2;
    const ADV_READY: u8 = ADV_DATA_SET | SCAN_RSP_SET;
    static ADV_STATE: AtomicU8 = AtomicU8::new(0);

    /// Readable value of Alert-Policy-Config, served on READ_EVT.
    pub static POLICY_VALUE: Mutex<Value> = Mutex::new(heapless::Vec::new());

    /// Fragments of the long write in progress.
    static PREPARED: Mutex<PreparedWrite> = Mutex::new(PreparedWrite::new());

    /// ATT MTU requested at bring-up: the largest write fits one packet.
    pub const LOCAL_MTU: u16 = MAX_WRITE_LEN as u16 + 3;

    /// Device name, NUL-terminated, set before the stack starts.
    pub static DEVICE_NAME: Mutex<heapless::Vec<u8, 32>> = Mutex::new(heapless::Vec::new());

    const NUM_HANDLES: u16 = 10;

    fn uuid128_to_esp(uuid: u128) -> esp_bt_uuid_t {
        let mut t: esp_bt_uuid_t = unsafe { core::mem::zeroed() };
        t.len = 16;
        t.uuid.uuid128 = uuid.to_le_bytes();
        t
    }

    fn handle_to_characteristic(handle: u32) -> Option<Characteristic> {
        if handle == 0 {
            None
        } else if handle == POLICY_HANDLE.load(Ordering::Relaxed) {
            Some(Characteristic::AlertPolicyConfig)
        } else if handle == MAKE_ALERT_HANDLE.load(Ordering::Relaxed) {
            Some(Characteristic::MakeAlert)
        } else if handle == PIN_AUTH_HANDLE.load(Ordering::Relaxed) {
            Some(Characteristic::PinAuth)
        } else {
            None
        }
    }

    unsafe fn add_char(svc_handle: u16, uuid: u128, perm: u32, prop: u32) {
        let mut char_uuid = uuid128_to_esp(uuid);
        let mut control = esp_attr_control_t {
            auto_rsp: ESP_GATT_RSP_BY_APP as u8,
        };
        unsafe {
            esp_ble_gatts_add_char(
                svc_handle,
                &mut char_uuid,
                perm as esp_gatt_perm_t,
                prop as esp_gatt_char_prop_t,
                core::ptr::null_mut(),
                &mut control,
            );
        }
    }

    unsafe fn add_cccd(svc_handle: u16) {
        let mut uuid: esp_bt_uuid_t = unsafe { core::mem::zeroed() };
        uuid.len = 2;
        uuid.uuid.uuid16 = ESP_GATT_UUID_CHAR_CLIENT_CONFIG as u16;
        let mut control = esp_attr_control_t {
            auto_rsp: ESP_GATT_AUTO_RSP as u8,
        };
        unsafe {
            esp_ble_gatts_add_char_descr(
                svc_handle,
                &mut uuid,
                (ESP_GATT_PERM_READ | ESP_GATT_PERM_WRITE) as esp_gatt_perm_t,
                core::ptr::null_mut(),
                &mut control,
            );
        }
    }

    unsafe fn configure_advertising() {
        let mut service_uuid = SERVICE_UUID.to_le_bytes();
        let mut adv = esp_ble_adv_data_t {
            set_scan_rsp: false,
            include_name: true,
            include_txpower: false,
            min_interval: 0x06,
            max_interval: 0x12,
            service_uuid_len: service_uuid.len() as u16,
            p_service_uuid: service_uuid.as_mut_ptr(),
            flag: (ESP_BLE_ADV_FLAG_GEN_DISC | ESP_BLE_ADV_FLAG_BREDR_NOT_SPT) as u8,
            ..unsafe { core::mem::zeroed() }
        };
        let mut scan_rsp = esp_ble_adv_data_t {
            set_scan_rsp: true,
            include_name: true,
            include_txpower: true,
            service_uuid_len: service_uuid.len() as u16,
            p_service_uuid: service_uuid.as_mut_ptr(),
            ..unsafe { core::mem::zeroed() }
        };
        unsafe {
            esp_ble_gap_config_adv_data(&mut adv);
            esp_ble_gap_config_adv_data(&mut scan_rsp);
        }
    }

    fn start_advertising_now() {
        let mut adv_params = esp_ble_adv_params_t {
            adv_int_min: 0x20,
            adv_int_max: 0x40,
            adv_type: esp_ble_adv_type_t_ADV_TYPE_IND,
            own_addr_type: esp_ble_addr_type_t_BLE_ADDR_TYPE_PUBLIC,
            channel_map: esp_ble_adv_channel_t_ADV_CHNL_ALL,
            adv_filter_policy: esp_ble_adv_filter_t_ADV_FILTER_ALLOW_SCAN_ANY_CON_ANY,
            ..unsafe { core::mem::zeroed() }
        };
        unsafe {
            esp_ble_gap_start_advertising(&mut adv_params);
        }
    }

    fn mark_adv(bit: u8) {
        let state = ADV_STATE.fetch_or(bit, Ordering::AcqRel) | bit;
        if state & (ADV_READY | ADV_REQUESTED) == ADV_READY | ADV_REQUESTED {
            start_advertising_now();
        }
    }

    pub fn request_advertising() {
        mark_adv(ADV_REQUESTED);
    }

    pub fn cancel_advertising() {
        ADV_STATE.fetch_and(!ADV_REQUESTED, Ordering::AcqRel);
        unsafe {
            esp_ble_gap_stop_advertising();
        }
    }

    pub unsafe extern "C" fn gap_event_handler(
        event: esp_gap_ble_cb_event_t,
        _param: *mut esp_ble_gap_cb_param_t,
    ) {
        match event {
            esp_gap_ble_cb_event_t_ESP_GAP_BLE_ADV_DATA_SET_COMPLETE_EVT => mark_adv(ADV_DATA_SET),
            esp_gap_ble_cb_event_t_ESP_GAP_BLE_SCAN_RSP_DATA_SET_COMPLETE_EVT => {
                mark_adv(SCAN_RSP_SET);
            }
            esp_gap_ble_cb_event_t_ESP_GAP_BLE_ADV_START_COMPLETE_EVT => {
                info!("BLE GAP: advertising started");
            }
            esp_gap_ble_cb_event_t_ESP_GAP_BLE_ADV_STOP_COMPLETE_EVT => {
                info!("BLE GAP: advertising stopped");
            }
            _ => {}
        }
    }

    unsafe fn respond(
        gatts_if: esp_gatt_if_t,
        conn_id: u16,
        trans_id: u32,
        status: esp_gatt_status_t,
        rsp: *mut esp_gatt_rsp_t,
    ) {
        unsafe {
            esp_ble_gatts_send_response(gatts_if, conn_id, trans_id, status, rsp);
        }
    }

    fn prepare_status(result: Result<(), PrepareError>) -> esp_gatt_status_t {
        match result {
            Ok(()) => esp_gatt_status_t_ESP_GATT_OK,
            Err(PrepareError::InvalidOffset) => esp_gatt_status_t_ESP_GATT_INVALID_OFFSET,
            Err(PrepareError::TooLong) => esp_gatt_status_t_ESP_GATT_INVALID_ATTR_LEN,
        }
    }

    pub unsafe extern "C" fn gatts_event_handler(
        event: esp_gatts_cb_event_t,
        gatts_if: esp_gatt_if_t,
        param: *mut esp_ble_gatts_cb_param_t,
    ) {
        match event {
            esp_gatts_cb_event_t_ESP_GATTS_REG_EVT => {
                GATTS_IF.store(gatts_if as u32, Ordering::Relaxed);
                info!("BLE GATTS: app registered (if={})", gatts_if);
                if let Ok(name) = DEVICE_NAME.lock() {
                    unsafe {
                        esp_ble_gap_set_device_name(name.as_ptr().cast());
                    }
                }
                unsafe {
                    configure_advertising();
                }
                let mut svc_id = esp_gatt_srvc_id_t {
                    id: esp_gatt_id_t {
                        uuid: uuid128_to_esp(SERVICE_UUID),
                        inst_id: 0,
                    },
                    is_primary: true,
                };
                unsafe {
                    esp_ble_gatts_create_service(gatts_if, &mut svc_id, NUM_HANDLES);
                }
            }
            esp_gatts_cb_event_t_ESP_GATTS_CREATE_EVT => {
                let svc_handle = unsafe { (*param).create.service_handle };
                SVC_HANDLE.store(svc_handle as u32, Ordering::Relaxed);
                info!("BLE GATTS: service created (handle={})", svc_handle);
                CHAR_STEP.store(1, Ordering::Relaxed);
                unsafe {
                    esp_ble_gatts_start_service(svc_handle);
                    add_char(
                        svc_handle,
                        ALERT_POLICY_CONFIG_UUID,
                        ESP_GATT_PERM_READ | ESP_GATT_PERM_WRITE,
                        ESP_GATT_CHAR_PROP_BIT_READ
                            | ESP_GATT_CHAR_PROP_BIT_WRITE
                            | ESP_GATT_CHAR_PROP_BIT_NOTIFY,
                    );
                }
            }
            esp_gatts_cb_event_t_ESP_GATTS_ADD_CHAR_EVT => {
                let handle = unsafe { (*param).add_char.attr_handle } as u32;
                let svc_handle = SVC_HANDLE.load(Ordering::Relaxed) as u16;
                match CHAR_STEP.load(Ordering::Relaxed) {
                    1 => {
                        POLICY_HANDLE.store(handle, Ordering::Relaxed);
                        info!("BLE GATTS: alert-policy-config char (handle={})", handle);
                        CHAR_STEP.store(2, Ordering::Relaxed);
                        unsafe {
                            add_cccd(svc_handle);
                        }
                    }
                    3 => {
                        MAKE_ALERT_HANDLE.store(handle, Ordering::Relaxed);
                        info!("BLE GATTS: make-alert char (handle={})", handle);
                        CHAR_STEP.store(4, Ordering::Relaxed);
                        unsafe {
                            add_char(
                                svc_handle,
                                PIN_AUTH_UUID,
                                ESP_GATT_PERM_WRITE,
                                ESP_GATT_CHAR_PROP_BIT_WRITE,
                            );
                        }
                    }
                    4 => {
                        PIN_AUTH_HANDLE.store(handle, Ordering::Relaxed);
                        CHAR_STEP.store(5, Ordering::Relaxed);
                        info!("BLE GATTS: pin-auth char (handle={}), all registered", handle);
                    }
                    _ => {}
                }
            }
            esp_gatts_cb_event_t_ESP_GATTS_ADD_CHAR_DESCR_EVT => {
                if CHAR_STEP.load(Ordering::Relaxed) == 2 {
                    CHAR_STEP.store(3, Ordering::Relaxed);
                    let svc_handle = SVC_HANDLE.load(Ordering::Relaxed) as u16;
                    unsafe {
                        add_char(
                            svc_handle,
                            MAKE_ALERT_UUID,
                            ESP_GATT_PERM_WRITE,
                            ESP_GATT_CHAR_PROP_BIT_WRITE,
                        );
                    }
                }
            }
            esp_gatts_cb_event_t_ESP_GATTS_CONNECT_EVT => {
                let p = unsafe { &(*param).connect };
                CONN_ID.store(p.conn_id as u32, Ordering::Relaxed);
                CONNECTED.store(true, Ordering::Release);
                crate::events::push_event(LinkEvent::Connected { peer: p.remote_bda });
            }
            esp_gatts_cb_event_t_ESP_GATTS_DISCONNECT_EVT => {
                CONNECTED.store(false, Ordering::Release);
                if let Ok(mut prepared) = PREPARED.lock() {
                    prepared.cancel();
                }
                crate::events::push_event(LinkEvent::Disconnected);
            }
            esp_gatts_cb_event_t_ESP_GATTS_MTU_EVT => {
                info!("BLE GATTS: MTU {}", unsafe { (*param).mtu.mtu });
            }
            esp_gatts_cb_event_t_ESP_GATTS_READ_EVT => {
                let p = unsafe { &(*param).read };
                if handle_to_characteristic(p.handle as u32)
                    != Some(Characteristic::AlertPolicyConfig)
                    || !p.need_rsp
                {
                    return;
                }
                let mut rsp: esp_gatt_rsp_t = unsafe { core::mem::zeroed() };
                unsafe {
                    rsp.attr_value.handle = p.handle;
                    if let Ok(value) = POLICY_VALUE.lock() {
                        let offset = (p.offset as usize).min(value.len());
                        let tail = &value[offset..];
                        rsp.attr_value.value[..tail.len()].copy_from_slice(tail);
                        rsp.attr_value.len = tail.len() as u16;
                        rsp.attr_value.offset = p.offset;
                    }
                    respond(
                        gatts_if,
                        p.conn_id,
                        p.trans_id,
                        esp_gatt_status_t_ESP_GATT_OK,
                        &mut rsp,
                    );
                }
            }
            esp_gatts_cb_event_t_ESP_GATTS_WRITE_EVT => {
                let p = unsafe { &(*param).write };
                let Some(characteristic) = handle_to_characteristic(p.handle as u32) else {
                    return;
                };
                let data = unsafe { core::slice::from_raw_parts(p.value, p.len as usize) };
                if p.is_prep {
                    let status = match PREPARED.lock() {
                        Ok(mut prepared) => {
                            prepare_status(prepared.append(characteristic, p.offset as usize, data))
                        }
                        Err(_) => esp_gatt_status_t_ESP_GATT_ERROR,
                    };
                    if status != esp_gatt_status_t_ESP_GATT_OK {
                        warn!(
                            "BLE: {} long write refused at offset {} (status {})",
                            characteristic.name(),
                            p.offset,
                            status
                        );
                    }
                    if p.need_rsp {
                        // A prepare response echoes the fragment back.
                        let mut rsp: esp_gatt_rsp_t = unsafe { core::mem::zeroed() };
                        unsafe {
                            rsp.attr_value.handle = p.handle;
                            rsp.attr_value.offset = p.offset;
                            rsp.attr_value.len = p.len;
                            rsp.attr_value.value[..data.len()].copy_from_slice(data);
                            respond(gatts_if, p.conn_id, p.trans_id, status, &mut rsp);
                        }
                    }
                    return;
                }
                if p.need_rsp {
                    unsafe {
                        respond(
                            gatts_if,
                            p.conn_id,
                            p.trans_id,
                            esp_gatt_status_t_ESP_GATT_OK,
                            core::ptr::null_mut(),
                        );
                    }
                }
                match LinkEvent::written(characteristic, data) {
                    Some(event) => {
                        crate::events::push_event(event);
                    }
                    None => warn!(
                        "BLE: {} write of {} bytes dropped",
                        characteristic.name(),
                        data.len()
                    ),
                }
            }
            esp_gatts_cb_event_t_ESP_GATTS_EXEC_WRITE_EVT => {
                let p = unsafe { &(*param).exec_write };
                unsafe {
                    respond(
                        gatts_if,
                        p.conn_id,
                        p.trans_id,
                        esp_gatt_status_t_ESP_GATT_OK,
                        core::ptr::null_mut(),
                    );
                }
                let Ok(mut prepared) = PREPARED.lock() else {
                    return;
                };
                if p.exec_write_flag != ESP_GATT_PREP_WRITE_EXEC as u8 {
                    prepared.cancel();
                    return;
                }
                if let Some(event) = prepared.execute() {
                    crate::events::push_event(event);
                }
            }
            _ => {}
        }
    }

    pub fn store_policy_value(value: &[u8]) {
        if let Ok(mut stored) = POLICY_VALUE.lock() {
            stored.clear();
            let len = value.len().min(MAX_VALUE_LEN);
            let _ = stored.extend_from_slice(&value[..len]);
        }
    }
}

// ───────────────────────────────────────────────────────────────
// BLE adapter
// ───────────────────────────────────────────────────────────────

pub struct BleLink {
    state: BleState,
    device_name: &'static str,
    #[cfg_attr(not(target_os = "espidf"), allow(dead_code))]
    notify_settle_ms: u32,
    policy_value: Value,
    /// Simulation: every notification sent, in order.
    #[cfg(not(target_os = "espidf"))]
    sim_notified: Vec<(Characteristic, Value)>,
}

impl BleLink {
    pub fn new(config: &TagConfig) -> Self {
        Self {
            state: BleState::Idle,
            device_name: config.device_name,
            notify_settle_ms: config.notify_settle_ms,
            policy_value: Value::new(),
            #[cfg(not(target_os = "espidf"))]
            sim_notified: Vec::new(),
        }
    }

    pub fn state(&self) -> BleState {
        self.state
    }

    /// Bring up the radio and register the GATT service.  Advertising
    /// waits for [`LinkTransport::start_advertising`].
    pub fn start(&mut self) -> Result<(), LinkError> {
        info!("BLE: starting stack as '{}'", self.device_name);
        if let Err(e) = self.platform_start() {
            self.state = BleState::Failed;
            return Err(e);
        }
        Ok(())
    }

    /// Current readable value of `characteristic`.
    pub fn value(&self, characteristic: Characteristic) -> &[u8] {
        match characteristic {
            Characteristic::AlertPolicyConfig => &self.policy_value,
            Characteristic::MakeAlert | Characteristic::PinAuth => &[],
        }
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn sim_notified(&self) -> &[(Characteristic, Value)] {
        &self.sim_notified
    }

    // ── Platform-specific ─────────────────────────────────────

    #[cfg(target_os = "espidf")]
    fn platform_start(&mut self) -> Result<(), LinkError> {
        use esp_idf_svc::sys::*;

        if let Ok(mut name) = stack::DEVICE_NAME.lock() {
            name.clear();
            let bytes = self.device_name.as_bytes();
            let len = bytes.len().min(name.capacity() - 1);
            let _ = name.extend_from_slice(&bytes[..len]);
            let _ = name.push(0);
        }

        let ok = ESP_OK as esp_err_t;
        unsafe {
            // Release classic BT memory (BLE-only mode saves ~30 KB).
            esp_bt_controller_mem_release(esp_bt_mode_t_ESP_BT_MODE_CLASSIC_BT);

            let mut bt_cfg = esp_bt_controller_config_t::default();
            let ret = esp_bt_controller_init(&mut bt_cfg);
            if ret != ok {
                return Err(LinkError::StackInitFailed(ret));
            }
            let ret = esp_bt_controller_enable(esp_bt_mode_t_ESP_BT_MODE_BLE);
            if ret != ok {
                return Err(LinkError::StackInitFailed(ret));
            }
            let ret = esp_bluedroid_init();
            if ret != ok {
                return Err(LinkError::StackInitFailed(ret));
            }
            let ret = esp_bluedroid_enable();
            if ret != ok {
                return Err(LinkError::StackInitFailed(ret));
            }

            let ret = esp_ble_gap_register_callback(Some(stack::gap_event_handler));
            if ret != ok {
                return Err(LinkError::RegistrationFailed(ret));
            }
            let ret = esp_ble_gatts_register_callback(Some(stack::gatts_event_handler));
            if ret != ok {
                return Err(LinkError::RegistrationFailed(ret));
            }
            let ret = esp_ble_gatts_app_register(0);
            if ret != ok {
                return Err(LinkError::RegistrationFailed(ret));
            }

            let ret = esp_ble_gatt_set_local_mtu(stack::LOCAL_MTU);
            if ret != ok {
                log::warn!("BLE: local MTU {} rejected ({})", stack::LOCAL_MTU, ret);
            }
        }
        info!("BLE(espidf): Bluedroid stack initialized");
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_start(&mut self) -> Result<(), LinkError> {
        info!(
            "BLE(sim): GATT server '{}' (service {:032x})",
            self.device_name, SERVICE_UUID
        );
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn platform_notify(&mut self, characteristic: Characteristic) {
        use core::sync::atomic::Ordering;
        use esp_idf_svc::sys::*;

        if characteristic != Characteristic::AlertPolicyConfig
            || !stack::CONNECTED.load(Ordering::Acquire)
        {
            return;
        }
        let handle = stack::POLICY_HANDLE.load(Ordering::Relaxed);
        if handle == 0 {
            return;
        }
        unsafe {
            esp_ble_gatts_send_indicate(
                stack::GATTS_IF.load(Ordering::Relaxed) as esp_gatt_if_t,
                stack::CONN_ID.load(Ordering::Relaxed) as u16,
                handle as u16,
                self.policy_value.len() as u16,
                self.policy_value.as_ptr().cast_mut(),
                false,
            );
        }
        esp_idf_hal::delay::FreeRtos::delay_ms(self.notify_settle_ms);
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_notify(&mut self, characteristic: Characteristic) {
        let value = Value::from_slice(self.value(characteristic)).unwrap_or_default();
        self.sim_notified.push((characteristic, value));
    }
}

// ───────────────────────────────────────────────────────────────
// LinkTransport implementation
// ───────────────────────────────────────────────────────────────

impl LinkTransport for BleLink {
    fn set_value(&mut self, characteristic: Characteristic, value: &[u8]) {
        if characteristic != Characteristic::AlertPolicyConfig {
            log::warn!("BLE: {} has no readable value", characteristic.name());
            return;
        }
        let len = value.len().min(MAX_VALUE_LEN);
        self.policy_value.clear();
        let _ = self.policy_value.extend_from_slice(&value[..len]);
        #[cfg(target_os = "espidf")]
        stack::store_policy_value(&self.policy_value);
    }

    fn notify(&mut self, characteristic: Characteristic) {
        if !characteristic.access().notify {
            log::warn!("BLE: {} does not notify", characteristic.name());
            return;
        }
        self.platform_notify(characteristic);
    }

    fn start_advertising(&mut self) {
        if self.state == BleState::Failed {
            return;
        }
        #[cfg(target_os = "espidf")]
        stack::request_advertising();
        self.state = BleState::Advertising;
        info!("BLE: advertising as '{}'", self.device_name);
    }

    fn stop_advertising(&mut self) {
        if self.state == BleState::Failed {
            return;
        }
        #[cfg(target_os = "espidf")]
        stack::cancel_advertising();
        self.state = BleState::Connected;
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────
