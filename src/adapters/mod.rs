//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter    | Implements     | Connects to                 |
//! |------------|----------------|-----------------------------|
//! | `ble`      | LinkTransport  | Bluedroid GATT server       |
//! | `hardware` | AlertActuator  | Buzzer + RGB LED GPIO       |
//! | `log_sink` | EventSink      | Serial log output           |
//! | `nvs`      | PolicyStore    | NVS / in-memory store       |

pub mod ble;
pub mod hardware;
pub mod log_sink;
pub mod nvs;
