//! Mock port adapters for integration tests.
//!
//! Each mock records every call so tests can assert on the full history
//! without a radio, GPIO or flash.

use std::collections::HashMap;

use alarmtag::app::events::AppEvent;
use alarmtag::app::link::Characteristic;
use alarmtag::app::ports::{
    AlertActuator, EventSink, LinkIndicator, LinkTransport, PolicyStore, StorageError,
};

// ── In-memory policy store ────────────────────────────────────

#[derive(Default)]
pub struct MemStore {
    pub u64s: HashMap<String, u64>,
    pub blobs: HashMap<String, Vec<u8>>,
    /// Writes to this key fail with `IoError`.
    pub failing_key: Option<&'static str>,
    pub writes: Vec<String>,
}

#[allow(dead_code)]
impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_flags(bits: u64) -> Self {
        let mut store = Self::new();
        store.u64s.insert("flags".into(), bits);
        store
    }

    pub fn with_secret(mut self, secret: &[u8]) -> Self {
        self.blobs.insert("device-pin".into(), secret.to_vec());
        self
    }

    pub fn flags(&self) -> Option<u64> {
        self.u64s.get("flags").copied()
    }

    pub fn secret(&self) -> Option<&[u8]> {
        self.blobs.get("device-pin").map(Vec::as_slice)
    }

    fn write(&mut self, key: &str) -> Result<(), StorageError> {
        if self.failing_key == Some(key) {
            return Err(StorageError::IoError);
        }
        self.writes.push(key.to_string());
        Ok(())
    }
}

impl PolicyStore for MemStore {
    fn get_u64(&self, key: &str) -> Result<Option<u64>, StorageError> {
        Ok(self.u64s.get(key).copied())
    }

    fn put_u64(&mut self, key: &str, value: u64) -> Result<(), StorageError> {
        self.write(key)?;
        self.u64s.insert(key.to_string(), value);
        Ok(())
    }

    fn get_bytes(&self, key: &str, buf: &mut [u8]) -> Result<Option<usize>, StorageError> {
        match self.blobs.get(key) {
            Some(v) if v.len() > buf.len() => Err(StorageError::InvalidValue),
            Some(v) => {
                buf[..v.len()].copy_from_slice(v);
                Ok(Some(v.len()))
            }
            None => Ok(None),
        }
    }

    fn put_bytes(&mut self, key: &str, value: &[u8]) -> Result<(), StorageError> {
        self.write(key)?;
        self.blobs.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        self.write(key)?;
        self.u64s.remove(key);
        self.blobs.remove(key);
        Ok(())
    }

    fn contains(&self, key: &str) -> bool {
        self.u64s.contains_key(key) || self.blobs.contains_key(key)
    }
}

// ── Recording link transport ──────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkCall {
    SetValue(Characteristic, String),
    Notify(Characteristic),
    StartAdvertising,
    StopAdvertising,
}

#[derive(Default)]
pub struct RecordingLink {
    pub calls: Vec<LinkCall>,
}

#[allow(dead_code)]
impl RecordingLink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notifications(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, LinkCall::Notify(_)))
            .count()
    }

    /// Last value set on Alert-Policy-Config.
    pub fn policy_value(&self) -> Option<&str> {
        self.calls.iter().rev().find_map(|c| match c {
            LinkCall::SetValue(Characteristic::AlertPolicyConfig, v) => Some(v.as_str()),
            _ => None,
        })
    }

    pub fn advertising(&self) -> bool {
        self.calls
            .iter()
            .rev()
            .find_map(|c| match c {
                LinkCall::StartAdvertising => Some(true),
                LinkCall::StopAdvertising => Some(false),
                _ => None,
            })
            .unwrap_or(false)
    }
}

impl LinkTransport for RecordingLink {
    fn set_value(&mut self, characteristic: Characteristic, value: &[u8]) {
        self.calls.push(LinkCall::SetValue(
            characteristic,
            String::from_utf8_lossy(value).into_owned(),
        ));
    }

    fn notify(&mut self, characteristic: Characteristic) {
        self.calls.push(LinkCall::Notify(characteristic));
    }

    fn start_advertising(&mut self) {
        self.calls.push(LinkCall::StartAdvertising);
    }

    fn stop_advertising(&mut self) {
        self.calls.push(LinkCall::StopAdvertising);
    }
}

// ── Recording actuator ────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertCall {
    Arm,
    Disarm,
    Indicator(LinkIndicator),
    Boot(bool),
}

#[derive(Default)]
pub struct RecordingAlert {
    pub calls: Vec<AlertCall>,
}

#[allow(dead_code)]
impl RecordingAlert {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn armed(&self) -> bool {
        self.calls
            .iter()
            .rev()
            .find_map(|c| match c {
                AlertCall::Arm => Some(true),
                AlertCall::Disarm => Some(false),
                _ => None,
            })
            .unwrap_or(false)
    }

    pub fn arm_count(&self) -> usize {
        self.calls.iter().filter(|c| **c == AlertCall::Arm).count()
    }
}

impl AlertActuator for RecordingAlert {
    fn arm_alarm(&mut self) {
        self.calls.push(AlertCall::Arm);
    }

    fn disarm_alarm(&mut self) {
        self.calls.push(AlertCall::Disarm);
    }

    fn set_link_indicator(&mut self, indicator: LinkIndicator) {
        self.calls.push(AlertCall::Indicator(indicator));
    }

    fn set_boot_indicator(&mut self, on: bool) {
        self.calls.push(AlertCall::Boot(on));
    }
}

// ── Collecting event sink ─────────────────────────────────────

#[derive(Default)]
pub struct CollectingSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, event: &AppEvent) -> bool {
        self.events.contains(event)
    }
}

impl EventSink for CollectingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}

// ── Rig ───────────────────────────────────────────────────────

/// All four mock ports, wired for `AppService::dispatch`.
#[derive(Default)]
pub struct Rig {
    pub store: MemStore,
    pub link: RecordingLink,
    pub alert: RecordingAlert,
    pub sink: CollectingSink,
}

#[allow(dead_code)]
impl Rig {
    pub fn with_store(store: MemStore) -> Self {
        Self {
            store,
            ..Self::default()
        }
    }
}
