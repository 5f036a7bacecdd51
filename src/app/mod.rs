//! Application core: pure domain logic, zero I/O.
//!
//! Session tracking, policy writes, PIN checks and the alarm are
//! orchestrated by [`service::AppService`].  All interaction with the radio,
//! flash and GPIO happens through the **port traits** in [`ports`], keeping
//! this layer fully testable without real peripherals.

pub mod effects;
pub mod events;
pub mod link;
pub mod ports;
pub mod service;
