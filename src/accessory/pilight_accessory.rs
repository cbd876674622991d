//! Accessory bound to a single pilight device.
//!
//! Wires connection events into the classifier and the device state, and
//! host get/set calls into outbound pilight commands.
//!
//! Startup:
//! 1. the connection reports `Ready`; the accessory sends `request values`
//! 2. the snapshot reply populates the device state
//! 3. every update naming the device mutates the state and is pushed to the
//!    exposed characteristics

use super::characteristic::{
    Characteristic, CharacteristicEvent, CharacteristicKind, CharacteristicNotifier,
};
use super::service::{Service, services_for};
use crate::config::DeviceConfig;
use crate::connection::{Connection, ConnectionEvent};
use crate::device::{DeviceState, DeviceType, StateChange, SyncOutcome, resolve};
use crate::error::{BridgeError, Result};
use crate::protocol::{DeviceGroup, ProtocolFrame, classify, command, dimlevel};
use log::{debug, info, warn};
use parking_lot::Mutex;
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

pub struct PilightAccessory {
    config: DeviceConfig,
    id: String,
    connection: Connection,
    state: Mutex<DeviceState>,
    services: Vec<Service>,
}

impl PilightAccessory {
    pub fn new(config: DeviceConfig, connection: Connection) -> Self {
        let id = config.accessory_id();
        let services = services_for(&config);
        Self {
            config,
            id,
            connection,
            state: Mutex::new(DeviceState::default()),
            services,
        }
    }

    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Services exposed to the host, information service first.
    pub fn services(&self) -> &[Service] {
        &self.services
    }

    /// Copy of the current device state.
    pub fn state(&self) -> DeviceState {
        *self.state.lock()
    }

    /// Forward characteristic changes of this accessory to `tx`.
    pub fn set_notifier(&self, tx: broadcast::Sender<CharacteristicEvent>) {
        let notifier = CharacteristicNotifier::new(self.id.clone(), tx);
        for service in &self.services {
            for characteristic in service.characteristics() {
                characteristic.set_notifier(notifier.clone());
            }
        }
    }

    fn characteristic(&self, kind: CharacteristicKind) -> Option<&Arc<Characteristic>> {
        self.services.iter().find_map(|s| s.characteristic(kind))
    }

    fn ensure_exposed(&self, kind: CharacteristicKind) -> Result<&Arc<Characteristic>> {
        self.characteristic(kind)
            .ok_or_else(|| BridgeError::UnsupportedCharacteristic(kind.to_string()))
    }

    fn ensure_connected(&self) -> Result<()> {
        if self.connection.is_connected() {
            Ok(())
        } else {
            Err(BridgeError::NotConnected)
        }
    }

    /// Subscribe to the connection, connect it and spawn the event loop.
    ///
    /// A shared connection may already be up; in that case the initial
    /// values are requested right away since `Ready` has already fired.
    pub fn start(self: Arc<Self>) -> JoinHandle<()> {
        let events = self.connection.subscribe();
        info!("[{}] Option sharedWS = {}", self.name(), self.config.shared_ws);
        self.connection.connect();

        if self.connection.is_connected() {
            self.request_initial_states();
        }

        tokio::spawn(self.run(events))
    }

    /// Process connection events in delivery order until the connection is dropped.
    pub async fn run(self: Arc<Self>, mut events: broadcast::Receiver<ConnectionEvent>) {
        loop {
            match events.recv().await {
                Ok(event) => self.handle_event(event),
                Err(RecvError::Lagged(missed)) => {
                    warn!(
                        "[{}] Missed {} connection events, re-requesting values",
                        self.name(),
                        missed
                    );
                    self.request_initial_states();
                }
                Err(RecvError::Closed) => break,
            }
        }
    }

    pub fn handle_event(&self, event: ConnectionEvent) {
        match event {
            ConnectionEvent::Ready => self.request_initial_states(),
            ConnectionEvent::Error(error) => {
                warn!("[{}] Connection error: {}", self.name(), error);
            }
            ConnectionEvent::Frame(raw) => self.handle_message(&raw),
            ConnectionEvent::FrameError(error) => {
                warn!(
                    "[{}] Something went wrong, cannot parse message. Error: {}",
                    self.name(),
                    error
                );
            }
        }
    }

    fn request_initial_states(&self) {
        info!("[{}] Requesting initial states...", self.name());
        if let Err(e) = self.connection.send(command::request_values()) {
            warn!("[{}] Failed to request initial states: {}", self.name(), e);
        }
    }

    /// Classify a decoded frame and fold it into the device state.
    pub fn handle_message(&self, raw: &Value) {
        match classify(raw) {
            Ok(ProtocolFrame::ValueSnapshot(groups)) => self.handle_snapshot(&groups),
            Ok(ProtocolFrame::Update(group)) => self.handle_update(&group),
            // pilight acknowledges every control with {"status": ...}
            Err(_) if raw.get("status").is_some() => {
                debug!("[{}] pilight status: {}", self.name(), raw);
            }
            Err(e) => warn!("[{}] {}", self.name(), e),
        }
    }

    fn handle_snapshot(&self, groups: &[DeviceGroup]) {
        let device_id = &self.config.device_id;
        let Some(resolved) = resolve(groups, device_id, self.config.device_type) else {
            info!(
                "[{}] Could not find device with id \"{}\"",
                self.name(),
                device_id
            );
            return;
        };

        let refreshed = {
            let mut state = self.state.lock();
            let refreshed = state.is_populated();
            state.merge(resolved);
            refreshed
        };

        if refreshed {
            debug!("[{}] Refreshed state from snapshot: {:?}", self.name(), resolved);
        } else {
            self.log_initialized(&resolved);
        }

        self.push(StateChange {
            power: resolved.power,
            dim_level: resolved.dim_level,
            temperature: resolved.temperature,
        });
    }

    fn log_initialized(&self, resolved: &DeviceState) {
        match self.config.device_type {
            DeviceType::Switch | DeviceType::Lamp => info!(
                "[{}] Initialized device with state {:?}",
                self.name(),
                resolved.power
            ),
            DeviceType::Dimmer => info!(
                "[{}] Initialized dimmer with state {:?} and dim level {:?}",
                self.name(),
                resolved.power,
                resolved.dim_level
            ),
            DeviceType::TemperatureSensor => info!(
                "[{}] Initialized temp sensor with temperature {:?}",
                self.name(),
                resolved.temperature
            ),
        }
    }

    fn handle_update(&self, group: &DeviceGroup) {
        let outcome = self.state.lock().apply(
            group,
            &self.config.device_id,
            self.config.device_type,
        );

        match outcome {
            SyncOutcome::NoOp => {
                debug!("[{}] Ignoring update for {:?}", self.name(), group.devices);
            }
            SyncOutcome::Changed(change) if change.is_empty() => {
                debug!("[{}] Update carried no tracked fields", self.name());
            }
            SyncOutcome::Changed(change) => {
                if let Some(power) = change.power {
                    info!("[{}] Updated internal state to {}", self.name(), power);
                }
                if let Some(dim_level) = change.dim_level {
                    info!("[{}] Updated internal dim level to {}", self.name(), dim_level);
                }
                if let Some(temperature) = change.temperature {
                    info!(
                        "[{}] Updated internal temperature to {}",
                        self.name(),
                        temperature
                    );
                }
                self.push(change);
            }
        }
    }

    /// Push written fields into the exposed characteristics.
    fn push(&self, change: StateChange) {
        if let (Some(power), Some(on)) =
            (change.power, self.characteristic(CharacteristicKind::On))
        {
            on.set_value(json!(power));
        }

        if let (Some(dim_level), Some(brightness)) = (
            change.dim_level,
            self.characteristic(CharacteristicKind::Brightness),
        ) {
            match dimlevel::to_brightness(dim_level) {
                Ok(percent) => brightness.set_value(json!(percent)),
                Err(e) => warn!("[{}] {}", self.name(), e),
            }
        }

        if let (Some(temperature), Some(current)) = (
            change.temperature,
            self.characteristic(CharacteristicKind::CurrentTemperature),
        ) {
            current.set_value(json!(temperature));
        }
    }

    pub fn get_power(&self) -> Result<bool> {
        self.ensure_exposed(CharacteristicKind::On)?;
        self.state.lock().power().inspect_err(|_| {
            info!("[{}] No power state found", self.name());
        })
    }

    pub fn set_power(&self, on: bool) -> Result<()> {
        self.ensure_exposed(CharacteristicKind::On)?;
        self.ensure_connected()?;

        info!(
            "[{}] Try to set powerstate to \"{}\"",
            self.name(),
            if on { "on" } else { "off" }
        );
        self.connection
            .send(command::set_power(&self.config.device_id, on))
    }

    /// Current brightness percentage derived from the dim level.
    pub fn get_brightness(&self) -> Result<u8> {
        self.ensure_exposed(CharacteristicKind::Brightness)?;
        let dim_level = self.state.lock().dim_level().inspect_err(|_| {
            info!("[{}] No dim level found", self.name());
        })?;
        debug!("[{}] Current dim level {}", self.name(), dim_level);
        dimlevel::to_brightness(dim_level)
    }

    /// Set the brightness from a host-supplied percentage. A brightness of 0
    /// succeeds without sending anything.
    pub fn set_brightness(&self, brightness: &Value) -> Result<()> {
        self.ensure_exposed(CharacteristicKind::Brightness)?;
        self.ensure_connected()?;

        let Some(frame) = command::set_brightness(&self.config.device_id, brightness)? else {
            return Ok(());
        };
        if let Some(code) = frame.code.as_ref().and_then(|code| code.values.as_ref()) {
            info!(
                "[{}] Try to set dim level to {} for {}%",
                self.name(),
                code.dimlevel,
                brightness
            );
        }
        self.connection.send(frame)
    }

    pub fn get_temperature(&self) -> Result<f64> {
        self.ensure_exposed(CharacteristicKind::CurrentTemperature)?;
        self.state.lock().temperature().inspect_err(|_| {
            info!("[{}] No temperature found", self.name());
        })
    }

    pub fn identify(&self) -> Result<()> {
        info!("[{}] Identify requested!", self.name());
        Ok(())
    }

    /// Read a characteristic by kind.
    pub fn read(&self, kind: CharacteristicKind) -> Result<Value> {
        let characteristic = self.ensure_exposed(kind)?;
        match kind {
            CharacteristicKind::On => self.get_power().map(Value::from),
            CharacteristicKind::Brightness => self.get_brightness().map(Value::from),
            CharacteristicKind::CurrentTemperature => self.get_temperature().map(Value::from),
            CharacteristicKind::Name
            | CharacteristicKind::Manufacturer
            | CharacteristicKind::Model
            | CharacteristicKind::SerialNumber => characteristic
                .value()
                .ok_or_else(|| BridgeError::NotFound(kind.to_string())),
        }
    }

    /// Write a characteristic by kind.
    pub fn write(&self, kind: CharacteristicKind, value: &Value) -> Result<()> {
        self.ensure_exposed(kind)?;
        if !kind.is_writable() {
            return Err(BridgeError::UnsupportedCharacteristic(format!(
                "{} is read-only",
                kind
            )));
        }

        match kind {
            CharacteristicKind::On => {
                let on = value.as_bool().ok_or_else(|| {
                    BridgeError::InvalidArgument(format!("not a power state: {}", value))
                })?;
                self.set_power(on)
            }
            CharacteristicKind::Brightness => self.set_brightness(value),
            _ => Err(BridgeError::UnsupportedCharacteristic(kind.to_string())),
        }
    }
}
