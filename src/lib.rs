//! AlarmTag firmware library.
//!
//! Exposes the pure-logic modules for integration testing and external
//! inspection. All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod alarm;
pub mod app;
pub mod auth;
pub mod config;
pub mod error;
pub mod events;
pub mod fsm;
pub mod pins;
pub mod policy;

// The adapters and drivers carry their own simulation backends, so the
// whole stack builds on the host.
pub mod adapters;
pub mod drivers;
