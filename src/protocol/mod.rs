//! pilight WebSocket protocol: inbound frame classification, outbound
//! commands and dim level conversion.

pub mod command;
pub mod dimlevel;
pub mod frame;

pub use command::OutboundFrame;
pub use frame::{DeviceGroup, ProtocolFrame, classify};
