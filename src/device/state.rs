//! Canonical state of a bound device and the two paths that populate it.
//!
//! [`resolve`] extracts the initial state from a value snapshot.
//! [`DeviceState::apply`] folds an update into existing state. Both read the
//! same fields for a given [`DeviceType`] and ignore groups that do not name
//! the configured device.

use super::DeviceType;
use crate::error::{BridgeError, Result};
use crate::protocol::DeviceGroup;

/// Last known state of the bound device.
///
/// Every field stays `None` until a snapshot or update reports it, and only
/// the fields relevant to the device type are ever written.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DeviceState {
    pub power: Option<bool>,
    pub dim_level: Option<u8>,
    pub temperature: Option<f64>,
}

/// Field values written by one snapshot group or update.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StateChange {
    pub power: Option<bool>,
    pub dim_level: Option<u8>,
    pub temperature: Option<f64>,
}

impl StateChange {
    fn read(group: &DeviceGroup, device_type: DeviceType) -> Self {
        match device_type {
            DeviceType::Switch | DeviceType::Lamp => StateChange {
                power: Some(group.is_on()),
                ..Default::default()
            },
            DeviceType::Dimmer => StateChange {
                power: Some(group.is_on()),
                dim_level: group.dim_level(),
                ..Default::default()
            },
            DeviceType::TemperatureSensor => StateChange {
                temperature: group.temperature(),
                ..Default::default()
            },
        }
    }

    pub fn is_empty(&self) -> bool {
        self.power.is_none() && self.dim_level.is_none() && self.temperature.is_none()
    }
}

/// Result of offering an update to a device binding.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SyncOutcome {
    /// The update was for other devices; state untouched.
    NoOp,
    /// The update named this device; these fields were written.
    Changed(StateChange),
}

impl DeviceState {
    /// Whether any field has been reported yet.
    pub fn is_populated(&self) -> bool {
        self.power.is_some() || self.dim_level.is_some() || self.temperature.is_some()
    }

    pub fn power(&self) -> Result<bool> {
        self.power
            .ok_or_else(|| BridgeError::NotFound("power state".to_string()))
    }

    pub fn dim_level(&self) -> Result<u8> {
        self.dim_level
            .ok_or_else(|| BridgeError::NotFound("dim level".to_string()))
    }

    pub fn temperature(&self) -> Result<f64> {
        self.temperature
            .ok_or_else(|| BridgeError::NotFound("temperature".to_string()))
    }

    /// Overwrite the fields `resolved` carries, keeping the rest.
    ///
    /// Used for snapshots received after the first one (e.g. on reconnect).
    pub fn merge(&mut self, resolved: DeviceState) {
        self.power = resolved.power.or(self.power);
        self.dim_level = resolved.dim_level.or(self.dim_level);
        self.temperature = resolved.temperature.or(self.temperature);
    }

    /// Apply an update for `device_id`.
    ///
    /// Fields the update does not carry keep their previous value, so a
    /// power-only dimmer update leaves the known dim level in place.
    pub fn apply(
        &mut self,
        update: &DeviceGroup,
        device_id: &str,
        device_type: DeviceType,
    ) -> SyncOutcome {
        if !update.contains(device_id) {
            return SyncOutcome::NoOp;
        }

        let change = StateChange::read(update, device_type);
        if let Some(power) = change.power {
            self.power = Some(power);
        }
        if let Some(dim_level) = change.dim_level {
            self.dim_level = Some(dim_level);
        }
        if let Some(temperature) = change.temperature {
            self.temperature = Some(temperature);
        }
        SyncOutcome::Changed(change)
    }
}

/// Extract the state of `device_id` from a value snapshot.
///
/// The first group naming the device wins. Returns `None` when no group
/// names it, which is normal before pilight knows the device.
pub fn resolve(
    snapshot: &[DeviceGroup],
    device_id: &str,
    device_type: DeviceType,
) -> Option<DeviceState> {
    let group = snapshot.iter().find(|group| group.contains(device_id))?;
    let change = StateChange::read(group, device_type);
    Some(DeviceState {
        power: change.power,
        dim_level: change.dim_level,
        temperature: change.temperature,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{ProtocolFrame, classify};
    use serde_json::json;

    fn snapshot(raw: serde_json::Value) -> Vec<DeviceGroup> {
        match classify(&raw).unwrap() {
            ProtocolFrame::ValueSnapshot(groups) => groups,
            other => panic!("expected snapshot, got {:?}", other),
        }
    }

    fn update(raw: serde_json::Value) -> DeviceGroup {
        match classify(&raw).unwrap() {
            ProtocolFrame::Update(group) => group,
            other => panic!("expected update, got {:?}", other),
        }
    }

    #[test]
    fn test_resolve_dimmer_at_startup() {
        let groups = snapshot(json!([
            {"devices": ["lamp"], "values": {"state": "on", "dimlevel": 8}}
        ]));

        let state = resolve(&groups, "lamp", DeviceType::Dimmer).unwrap();
        assert_eq!(
            state,
            DeviceState {
                power: Some(true),
                dim_level: Some(8),
                temperature: None,
            }
        );
    }

    #[test]
    fn test_resolve_temperature_sensor() {
        let groups = snapshot(json!([
            {"devices": ["lamp"], "values": {"state": "on"}},
            {"devices": ["sensor1"], "values": {"temperature": 21.5}}
        ]));

        let state = resolve(&groups, "sensor1", DeviceType::TemperatureSensor).unwrap();
        assert_eq!(state.temperature, Some(21.5));
        assert_eq!(state.power, None);
        assert_eq!(state.dim_level, None);
    }

    #[test]
    fn test_resolve_switch_ignores_dimlevel() {
        let groups = snapshot(json!([
            {"devices": ["lamp"], "values": {"state": "off", "dimlevel": 3}}
        ]));

        for device_type in [DeviceType::Switch, DeviceType::Lamp] {
            let state = resolve(&groups, "lamp", device_type).unwrap();
            assert_eq!(state.power, Some(false));
            assert_eq!(state.dim_level, None);
            assert_eq!(state.temperature, None);
        }
    }

    #[test]
    fn test_resolve_dimmer_without_level() {
        let groups = snapshot(json!([{"devices": ["lamp"], "values": {"state": "on"}}]));
        let state = resolve(&groups, "lamp", DeviceType::Dimmer).unwrap();
        assert_eq!(state.power, Some(true));
        assert!(matches!(state.dim_level(), Err(BridgeError::NotFound(_))));
    }

    #[test]
    fn test_resolve_dimlevel_zero_is_unknown() {
        let groups = snapshot(json!([
            {"devices": ["lamp"], "values": {"state": "on", "dimlevel": 0}}
        ]));
        let state = resolve(&groups, "lamp", DeviceType::Dimmer).unwrap();
        assert_eq!(state.power, Some(true));
        assert_eq!(state.dim_level, None);
        assert!(matches!(state.dim_level(), Err(BridgeError::NotFound(_))));
    }

    #[test]
    fn test_resolve_first_match_wins() {
        let groups = snapshot(json!([
            {"devices": ["other", "lamp"], "values": {"state": "on"}},
            {"devices": ["lamp"], "values": {"state": "off"}}
        ]));

        let state = resolve(&groups, "lamp", DeviceType::Switch).unwrap();
        assert_eq!(state.power, Some(true));
    }

    #[test]
    fn test_resolve_missing_device() {
        let groups = snapshot(json!([
            {"devices": ["kitchen"], "values": {"state": "on"}}
        ]));
        assert_eq!(resolve(&groups, "lamp", DeviceType::Switch), None);
        assert_eq!(resolve(&[], "lamp", DeviceType::Switch), None);
    }

    #[test]
    fn test_apply_switch_update() {
        let mut state = DeviceState {
            power: Some(false),
            ..Default::default()
        };

        let outcome = state.apply(
            &update(json!({"devices": ["lamp"], "values": {"state": "on"}})),
            "lamp",
            DeviceType::Switch,
        );

        assert_eq!(state.power, Some(true));
        assert_eq!(
            outcome,
            SyncOutcome::Changed(StateChange {
                power: Some(true),
                ..Default::default()
            })
        );
    }

    #[test]
    fn test_apply_unmatched_update_is_noop() {
        let mut state = DeviceState {
            power: Some(true),
            dim_level: Some(8),
            temperature: None,
        };
        let before = state;

        let outcome = state.apply(
            &update(json!({"devices": ["kitchen"], "values": {"state": "off", "dimlevel": 2}})),
            "lamp",
            DeviceType::Dimmer,
        );

        assert_eq!(outcome, SyncOutcome::NoOp);
        assert_eq!(state, before);
    }

    #[test]
    fn test_apply_power_only_keeps_dim_level() {
        let mut state = DeviceState {
            power: Some(true),
            dim_level: Some(8),
            temperature: None,
        };

        state.apply(
            &update(json!({"devices": ["lamp"], "values": {"state": "off"}})),
            "lamp",
            DeviceType::Dimmer,
        );
        assert_eq!(state.power, Some(false));
        assert_eq!(state.dim_level, Some(8));

        state.apply(
            &update(json!({"devices": ["lamp"], "values": {"state": "on", "dimlevel": 12}})),
            "lamp",
            DeviceType::Dimmer,
        );
        assert_eq!(state.power, Some(true));
        assert_eq!(state.dim_level, Some(12));
    }

    #[test]
    fn test_apply_dimlevel_zero_keeps_dim_level() {
        let mut state = resolve(
            &snapshot(json!([
                {"devices": ["lamp"], "values": {"state": "on", "dimlevel": 8}}
            ])),
            "lamp",
            DeviceType::Dimmer,
        )
        .unwrap();

        state.apply(
            &update(json!({"devices": ["lamp"], "values": {"state": "on", "dimlevel": 0}})),
            "lamp",
            DeviceType::Dimmer,
        );
        assert_eq!(state.dim_level, Some(8));
        assert_eq!(state.dim_level().unwrap(), 8);
    }

    #[test]
    fn test_apply_is_idempotent() {
        let frame = update(json!({
            "devices": ["lamp", "hall"],
            "values": {"state": "on", "dimlevel": 5}
        }));

        let mut once = DeviceState::default();
        once.apply(&frame, "hall", DeviceType::Dimmer);

        let mut twice = DeviceState::default();
        twice.apply(&frame, "hall", DeviceType::Dimmer);
        twice.apply(&frame, "hall", DeviceType::Dimmer);

        assert_eq!(once, twice);
    }

    #[test]
    fn test_apply_temperature_without_reading_keeps_value() {
        let mut state = DeviceState {
            temperature: Some(19.0),
            ..Default::default()
        };

        let outcome = state.apply(
            &update(json!({"devices": ["sensor1"], "values": {"humidity": 40}})),
            "sensor1",
            DeviceType::TemperatureSensor,
        );

        assert_eq!(state.temperature, Some(19.0));
        match outcome {
            SyncOutcome::Changed(change) => assert!(change.is_empty()),
            SyncOutcome::NoOp => panic!("update named the device"),
        }
    }

    #[test]
    fn test_merge_keeps_missing_fields() {
        let mut state = DeviceState {
            power: Some(true),
            dim_level: Some(8),
            temperature: None,
        };
        state.merge(DeviceState {
            power: Some(false),
            ..Default::default()
        });
        assert_eq!(state.power, Some(false));
        assert_eq!(state.dim_level, Some(8));

        let mut empty = DeviceState::default();
        let resolved = DeviceState {
            power: Some(true),
            dim_level: Some(3),
            temperature: None,
        };
        empty.merge(resolved);
        assert_eq!(empty, resolved);
    }

    #[test]
    fn test_getters_before_population() {
        let state = DeviceState::default();
        assert!(!state.is_populated());
        assert!(matches!(state.power(), Err(BridgeError::NotFound(_))));
        assert!(matches!(state.dim_level(), Err(BridgeError::NotFound(_))));
        assert!(matches!(state.temperature(), Err(BridgeError::NotFound(_))));
    }
}
