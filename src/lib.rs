//! pilight bridge library.
//!
//! Keeps the state of pilight devices in sync over the pilight WebSocket API
//! and exposes each device as a typed accessory (switch, lamp, dimmer or
//! temperature sensor).

pub mod accessory;
pub mod config;
pub mod connection;
pub mod device;
pub mod error;
pub mod protocol;
