//! Capability profile of a bound pilight device.

use log::warn;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Device type chosen at configuration time.
///
/// Governs which state fields are tracked, which commands may be sent and
/// which services are exposed to the accessory host.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, Serialize, Deserialize,
)]
pub enum DeviceType {
    #[default]
    Switch,
    Lamp,
    Dimmer,
    TemperatureSensor,
}

impl DeviceType {
    /// Parse a configured type name, falling back to `Switch` for unknown names.
    pub fn parse_or_default(name: &str) -> Self {
        name.parse().unwrap_or_else(|_| {
            warn!("Unknown device type \"{}\", using Switch", name);
            DeviceType::Switch
        })
    }
}
