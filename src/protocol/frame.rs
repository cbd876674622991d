//! Inbound pilight frames and their classification.
//!
//! pilight pushes two kinds of device frames over its WebSocket API:
//!
//! - a value snapshot, the reply to `request values`: an array of groups
//!   `[{"devices":["lamp"],"values":{"state":"on"}}, ...]`
//! - an update, sent whenever a device changes: a single group
//!   `{"devices":["lamp"],"values":{"state":"off"}}`
//!
//! Everything else is a classification failure, reported to the caller and
//! never fatal.

use crate::error::{BridgeError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A set of devices sharing one set of values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceGroup {
    pub devices: Vec<String>,
    pub values: Map<String, Value>,
}

impl DeviceGroup {
    /// Whether this group reports values for `device_id`.
    pub fn contains(&self, device_id: &str) -> bool {
        self.devices.iter().any(|d| d == device_id)
    }

    /// The reported `state` value, if it is a string.
    pub fn state(&self) -> Option<&str> {
        self.values.get("state").and_then(Value::as_str)
    }

    /// Power flag derived from `state`. Anything other than `"on"` is off.
    pub fn is_on(&self) -> bool {
        self.state() == Some("on")
    }

    /// The reported `dimlevel`, if present and a small positive integer.
    ///
    /// pilight uses 0 for a device with no level yet, so it counts as absent.
    pub fn dim_level(&self) -> Option<u8> {
        self.values
            .get("dimlevel")
            .and_then(Value::as_u64)
            .and_then(|level| u8::try_from(level).ok())
            .filter(|level| *level != 0)
    }

    /// The reported `temperature`, if numeric.
    pub fn temperature(&self) -> Option<f64> {
        self.values.get("temperature").and_then(Value::as_f64)
    }
}

/// A classified inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum ProtocolFrame {
    /// Current values of all known devices.
    ValueSnapshot(Vec<DeviceGroup>),
    /// A change shared by one or more devices.
    Update(DeviceGroup),
}

/// Classify a decoded JSON frame.
pub fn classify(raw: &Value) -> Result<ProtocolFrame> {
    match raw {
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(index, item)| {
                device_group(item).map_err(|e| {
                    BridgeError::Classification(format!("snapshot element {}: {}", index, e))
                })
            })
            .collect::<Result<Vec<_>>>()
            .map(ProtocolFrame::ValueSnapshot),
        Value::Object(_) => device_group(raw).map(ProtocolFrame::Update),
        other => Err(BridgeError::Classification(format!(
            "expected an array or object, got {}",
            shape_name(other)
        ))),
    }
}

fn device_group(value: &Value) -> Result<DeviceGroup> {
    if !value.is_object() {
        return Err(BridgeError::Classification(format!(
            "expected an object, got {}",
            shape_name(value)
        )));
    }
    DeviceGroup::deserialize(value).map_err(|e| BridgeError::Classification(e.to_string()))
}

fn shape_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_classify_snapshot() {
        let raw = json!([
            {"devices": ["lamp"], "values": {"state": "on"}},
            {"devices": ["sensor1", "sensor2"], "values": {"temperature": 21.5}}
        ]);

        match classify(&raw).unwrap() {
            ProtocolFrame::ValueSnapshot(groups) => {
                assert_eq!(groups.len(), 2);
                assert!(groups[0].contains("lamp"));
                assert!(groups[1].contains("sensor2"));
            }
            other => panic!("expected snapshot, got {:?}", other),
        }
    }

    #[test]
    fn test_classify_update() {
        let raw = json!({
            "origin": "update",
            "type": 1,
            "devices": ["lamp"],
            "values": {"state": "off", "timestamp": 1}
        });

        match classify(&raw).unwrap() {
            ProtocolFrame::Update(group) => {
                assert!(group.contains("lamp"));
                assert_eq!(group.state(), Some("off"));
                assert!(!group.is_on());
            }
            other => panic!("expected update, got {:?}", other),
        }
    }

    #[test]
    fn test_classify_empty_snapshot() {
        assert_eq!(
            classify(&json!([])).unwrap(),
            ProtocolFrame::ValueSnapshot(vec![])
        );
    }

    #[test]
    fn test_classify_rejects_other_shapes() {
        for raw in [
            json!({"status": "success"}),
            json!({"devices": ["lamp"]}),
            json!({"devices": "lamp", "values": {}}),
            json!([{"devices": ["lamp"], "values": {}}, 3]),
            json!("request values"),
            json!(42),
            Value::Null,
        ] {
            assert!(
                matches!(classify(&raw), Err(BridgeError::Classification(_))),
                "{} should not classify",
                raw
            );
        }
    }

    #[test]
    fn test_group_accessors() {
        let group = DeviceGroup::deserialize(&json!({
            "devices": ["dimmer"],
            "values": {"state": "on", "dimlevel": 8, "temperature": "warm"}
        }))
        .unwrap();

        assert!(group.is_on());
        assert_eq!(group.dim_level(), Some(8));
        assert_eq!(group.temperature(), None);
        assert!(!group.contains("lamp"));
    }
}
