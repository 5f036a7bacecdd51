//! NVS (Non-Volatile Storage) adapter.
//!
//! Implements [`PolicyStore`] for the tag: the flags word as an NVS `u64`
//! and the device secret as a blob, both in one namespace (`alarmtag`).
//!
//! # Security
//!
//! - Encrypted NVS: on production boards the namespace lives on the
//!   encrypted NVS partition.  The simulation backend is plaintext
//!   (dev/test only).
//! - Atomic writes: ESP-IDF NVS commits are atomic per nvs_commit().
//!
//! Secrets written by older firmware as NVS strings are still readable;
//! the next write replaces them with a blob.

use crate::app::ports::{PolicyStore, StorageError};
use log::info;

#[cfg(not(target_os = "espidf"))]
use std::collections::HashMap;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
use log::warn;

#[cfg(target_os = "espidf")]
use crate::auth::MAX_SECRET_LEN;

/// NVS keys and namespaces are at most 15 characters plus NUL.
#[cfg(target_os = "espidf")]
const NVS_NAME_BUF: usize = 16;

#[cfg(target_os = "espidf")]
const OK: esp_err_t = ESP_OK as esp_err_t;
#[cfg(target_os = "espidf")]
const NOT_FOUND: esp_err_t = ESP_ERR_NVS_NOT_FOUND as esp_err_t;
#[cfg(target_os = "espidf")]
const NO_FREE_PAGES: esp_err_t = ESP_ERR_NVS_NO_FREE_PAGES as esp_err_t;
#[cfg(target_os = "espidf")]
const NEW_VERSION_FOUND: esp_err_t = ESP_ERR_NVS_NEW_VERSION_FOUND as esp_err_t;
#[cfg(target_os = "espidf")]
const NOT_ENOUGH_SPACE: esp_err_t = ESP_ERR_NVS_NOT_ENOUGH_SPACE as esp_err_t;
#[cfg(target_os = "espidf")]
const INVALID_LENGTH: esp_err_t = ESP_ERR_NVS_INVALID_LENGTH as esp_err_t;
#[cfg(target_os = "espidf")]
const TYPE_MISMATCH: esp_err_t = ESP_ERR_NVS_TYPE_MISMATCH as esp_err_t;

/// Typed value as the simulation stores it, mirroring NVS entry types.
#[cfg(not(target_os = "espidf"))]
#[derive(Debug, Clone, PartialEq, Eq)]
enum SimEntry {
    U64(u64),
    Blob(Vec<u8>),
}

pub struct NvsPolicyStore {
    namespace: &'static str,
    #[cfg(not(target_os = "espidf"))]
    store: HashMap<String, SimEntry>,
}

impl NvsPolicyStore {
    /// Create the store and initialise NVS flash.
    ///
    /// On first boot or after a version mismatch the NVS partition is
    /// erased and re-initialised automatically.
    pub fn new(namespace: &'static str) -> Result<Self, StorageError> {
        #[cfg(target_os = "espidf")]
        {
            // SAFETY: nvs_flash_init / nvs_flash_erase are called from the
            // single main-task context before any concurrent NVS access.
            let ret = unsafe { nvs_flash_init() };
            if ret == NO_FREE_PAGES || ret == NEW_VERSION_FOUND {
                warn!("NVS: erasing and re-initialising flash partition");
                if unsafe { nvs_flash_erase() } != OK {
                    return Err(StorageError::IoError);
                }
                if unsafe { nvs_flash_init() } != OK {
                    return Err(StorageError::IoError);
                }
            } else if ret != OK {
                return Err(StorageError::IoError);
            }
            info!("NvsPolicyStore: ESP-IDF NVS initialised ({})", namespace);
        }

        #[cfg(not(target_os = "espidf"))]
        info!("NvsPolicyStore: simulation backend ({})", namespace);

        Ok(Self {
            namespace,
            #[cfg(not(target_os = "espidf"))]
            store: HashMap::new(),
        })
    }

    pub fn namespace(&self) -> &'static str {
        self.namespace
    }
}

// ── ESP-IDF helpers ───────────────────────────────────────────

#[cfg(target_os = "espidf")]
fn c_name(name: &str) -> [u8; NVS_NAME_BUF] {
    let mut buf = [0u8; NVS_NAME_BUF];
    let bytes = name.as_bytes();
    let len = bytes.len().min(NVS_NAME_BUF - 1);
    buf[..len].copy_from_slice(&bytes[..len]);
    buf
}

#[cfg(target_os = "espidf")]
fn map_err(ret: esp_err_t) -> StorageError {
    match ret {
        NOT_FOUND => StorageError::NotFound,
        NOT_ENOUGH_SPACE => StorageError::Full,
        INVALID_LENGTH | TYPE_MISMATCH => StorageError::InvalidValue,
        _ => StorageError::IoError,
    }
}

#[cfg(target_os = "espidf")]
impl NvsPolicyStore {
    /// Open the namespace, execute a closure with the handle, then close.
    /// Write handles are committed after a successful closure.
    fn with_handle<T>(
        &self,
        write: bool,
        f: impl FnOnce(nvs_handle_t) -> Result<T, esp_err_t>,
    ) -> Result<T, esp_err_t> {
        let ns = c_name(self.namespace);
        let mode = if write {
            nvs_open_mode_t_NVS_READWRITE
        } else {
            nvs_open_mode_t_NVS_READONLY
        };

        let mut handle: nvs_handle_t = 0;
        let ret = unsafe { nvs_open(ns.as_ptr().cast(), mode, &mut handle) };
        if ret != OK {
            return Err(ret);
        }

        let result = f(handle).and_then(|value| {
            if write {
                let ret = unsafe { nvs_commit(handle) };
                if ret != OK {
                    return Err(ret);
                }
            }
            Ok(value)
        });
        unsafe {
            nvs_close(handle);
        }
        result
    }

    /// Legacy string entry: copy it without the trailing NUL.
    fn get_legacy_str(&self, key: &str, buf: &mut [u8]) -> Result<Option<usize>, StorageError> {
        let key = c_name(key);
        let result = self.with_handle(false, |handle| {
            let mut tmp = [0u8; MAX_SECRET_LEN + 1];
            let mut size = tmp.len();
            let ret =
                unsafe { nvs_get_str(handle, key.as_ptr().cast(), tmp.as_mut_ptr().cast(), &mut size) };
            if ret != OK {
                return Err(ret);
            }
            let len = size.saturating_sub(1);
            if len > buf.len() {
                return Err(INVALID_LENGTH);
            }
            buf[..len].copy_from_slice(&tmp[..len]);
            Ok(len)
        });
        match result {
            Ok(len) => Ok(Some(len)),
            Err(NOT_FOUND) => Ok(None),
            Err(e) => Err(map_err(e)),
        }
    }
}

// ── PolicyStore ───────────────────────────────────────────────

impl PolicyStore for NvsPolicyStore {
    fn get_u64(&self, key: &str) -> Result<Option<u64>, StorageError> {
        #[cfg(not(target_os = "espidf"))]
        {
            match self.store.get(key) {
                Some(SimEntry::U64(v)) => Ok(Some(*v)),
                Some(SimEntry::Blob(_)) => Err(StorageError::InvalidValue),
                None => Ok(None),
            }
        }

        #[cfg(target_os = "espidf")]
        {
            let key = c_name(key);
            let result = self.with_handle(false, |handle| {
                let mut value: u64 = 0;
                let ret = unsafe { nvs_get_u64(handle, key.as_ptr().cast(), &mut value) };
                if ret != OK {
                    return Err(ret);
                }
                Ok(value)
            });
            match result {
                Ok(v) => Ok(Some(v)),
                // A namespace that was never written cannot be opened read-only.
                Err(NOT_FOUND) => Ok(None),
                Err(e) => Err(map_err(e)),
            }
        }
    }

    fn put_u64(&mut self, key: &str, value: u64) -> Result<(), StorageError> {
        #[cfg(not(target_os = "espidf"))]
        {
            self.store.insert(key.to_owned(), SimEntry::U64(value));
            Ok(())
        }

        #[cfg(target_os = "espidf")]
        {
            let key = c_name(key);
            self.with_handle(true, |handle| {
                let ret = unsafe { nvs_set_u64(handle, key.as_ptr().cast(), value) };
                if ret != OK {
                    return Err(ret);
                }
                Ok(())
            })
            .map_err(map_err)
        }
    }

    fn get_bytes(&self, key: &str, buf: &mut [u8]) -> Result<Option<usize>, StorageError> {
        #[cfg(not(target_os = "espidf"))]
        {
            match self.store.get(key) {
                Some(SimEntry::Blob(data)) if data.len() <= buf.len() => {
                    buf[..data.len()].copy_from_slice(data);
                    Ok(Some(data.len()))
                }
                Some(_) => Err(StorageError::InvalidValue),
                None => Ok(None),
            }
        }

        #[cfg(target_os = "espidf")]
        {
            let c_key = c_name(key);
            let result = self.with_handle(false, |handle| {
                let mut size = buf.len();
                let ret = unsafe {
                    nvs_get_blob(handle, c_key.as_ptr().cast(), buf.as_mut_ptr().cast(), &mut size)
                };
                if ret != OK {
                    return Err(ret);
                }
                Ok(size)
            });
            match result {
                Ok(size) => Ok(Some(size)),
                Err(NOT_FOUND) => self.get_legacy_str(key, buf),
                Err(e) => Err(map_err(e)),
            }
        }
    }

    fn put_bytes(&mut self, key: &str, value: &[u8]) -> Result<(), StorageError> {
        #[cfg(not(target_os = "espidf"))]
        {
            self.store.insert(key.to_owned(), SimEntry::Blob(value.to_vec()));
            Ok(())
        }

        #[cfg(target_os = "espidf")]
        {
            let key = c_name(key);
            self.with_handle(true, |handle| {
                let mut kind: nvs_type_t = nvs_type_t_NVS_TYPE_ANY;
                let found = unsafe { nvs_find_key(handle, key.as_ptr().cast(), &mut kind) };
                if found == OK && kind != nvs_type_t_NVS_TYPE_BLOB {
                    let ret = unsafe { nvs_erase_key(handle, key.as_ptr().cast()) };
                    if ret != OK {
                        return Err(ret);
                    }
                }
                let ret = unsafe {
                    nvs_set_blob(handle, key.as_ptr().cast(), value.as_ptr().cast(), value.len())
                };
                if ret != OK {
                    return Err(ret);
                }
                Ok(())
            })
            .map_err(map_err)
        }
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        #[cfg(not(target_os = "espidf"))]
        {
            self.store.remove(key);
            Ok(())
        }

        #[cfg(target_os = "espidf")]
        {
            let key = c_name(key);
            self.with_handle(true, |handle| {
                let ret = unsafe { nvs_erase_key(handle, key.as_ptr().cast()) };
                if ret != OK && ret != NOT_FOUND {
                    return Err(ret);
                }
                Ok(())
            })
            .map_err(map_err)
        }
    }

    fn contains(&self, key: &str) -> bool {
        #[cfg(not(target_os = "espidf"))]
        {
            self.store.contains_key(key)
        }

        #[cfg(target_os = "espidf")]
        {
            let key = c_name(key);
            self.with_handle(false, |handle| {
                let ret =
                    unsafe { nvs_find_key(handle, key.as_ptr().cast(), core::ptr::null_mut()) };
                Ok(ret == OK)
            })
            .unwrap_or(false)
        }
    }
}
