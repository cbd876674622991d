//! Outbound pilight frames.
//!
//! All builders are pure; sending is the connection's job.

use super::dimlevel;
use crate::error::{BridgeError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    #[serde(rename = "control")]
    Control,
    #[serde(rename = "request values")]
    RequestValues,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PowerState {
    On,
    Off,
}

impl From<bool> for PowerState {
    fn from(on: bool) -> Self {
        if on { PowerState::On } else { PowerState::Off }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlValues {
    pub dimlevel: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlCode {
    pub device: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<PowerState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<ControlValues>,
}

/// A frame sent to the pilight daemon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundFrame {
    pub action: Action,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<ControlCode>,
}

impl OutboundFrame {
    /// Serialize to the JSON text sent on the wire.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// `{"action":"request values"}`
pub fn request_values() -> OutboundFrame {
    OutboundFrame {
        action: Action::RequestValues,
        code: None,
    }
}

/// `{"action":"control","code":{"device":..,"state":"on"|"off"}}`
pub fn set_power(device_id: &str, on: bool) -> OutboundFrame {
    OutboundFrame {
        action: Action::Control,
        code: Some(ControlCode {
            device: device_id.to_string(),
            state: Some(on.into()),
            values: None,
        }),
    }
}

/// `{"action":"control","code":{"device":..,"values":{"dimlevel":n}}}`
pub fn set_dim_level(device_id: &str, dim_level: u8) -> OutboundFrame {
    OutboundFrame {
        action: Action::Control,
        code: Some(ControlCode {
            device: device_id.to_string(),
            state: None,
            values: Some(ControlValues {
                dimlevel: dim_level,
            }),
        }),
    }
}

/// Build the dim command for a host-supplied brightness percentage.
///
/// Returns `Ok(None)` for a brightness of 0: pilight has no dim level below 1,
/// so the request is accepted and nothing is sent.
pub fn set_brightness(device_id: &str, brightness: &Value) -> Result<Option<OutboundFrame>> {
    let percent = brightness.as_f64().ok_or_else(|| {
        BridgeError::InvalidArgument(format!("not a brightness value: {}", brightness))
    })?;

    if !(0.0..=f64::from(dimlevel::BRIGHTNESS_MAX)).contains(&percent) {
        return Err(BridgeError::InvalidArgument(format!(
            "brightness {} outside 0..={}",
            percent,
            dimlevel::BRIGHTNESS_MAX
        )));
    }

    if percent == 0.0 {
        return Ok(None);
    }

    let dim_level = dimlevel::to_dim_level((percent.round() as u8).max(1))?;
    Ok(Some(set_dim_level(device_id, dim_level)))
}
