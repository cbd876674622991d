//! Characteristics exposed to the accessory host.
//!
//! A characteristic holds the last value the bridge pushed for it, a version
//! counter for change detection, and an optional notifier that forwards
//! changes to the host as they happen.

use parking_lot::RwLock;
use serde_json::Value;
use std::sync::atomic::{AtomicU32, Ordering};
use strum::Display;
use tokio::sync::broadcast;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum CharacteristicKind {
    Name,
    Manufacturer,
    Model,
    SerialNumber,
    On,
    Brightness,
    CurrentTemperature,
}

impl CharacteristicKind {
    /// Whether the host may write this characteristic.
    pub fn is_writable(self) -> bool {
        matches!(self, CharacteristicKind::On | CharacteristicKind::Brightness)
    }
}

/// Value constraints advertised to the host.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CharacteristicProps {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub unit: Option<&'static str>,
}

/// A value change pushed to the host.
#[derive(Debug, Clone, PartialEq)]
pub struct CharacteristicEvent {
    pub accessory: String,
    pub kind: CharacteristicKind,
    pub value: Value,
}

/// Forwards characteristic changes of one accessory to the host.
#[derive(Clone)]
pub struct CharacteristicNotifier {
    accessory: String,
    tx: broadcast::Sender<CharacteristicEvent>,
}

impl CharacteristicNotifier {
    pub fn new(accessory: impl Into<String>, tx: broadcast::Sender<CharacteristicEvent>) -> Self {
        Self {
            accessory: accessory.into(),
            tx,
        }
    }

    /// Non-blocking; a host that is not listening misses the event.
    pub fn notify(&self, kind: CharacteristicKind, value: Value) {
        let _ = self.tx.send(CharacteristicEvent {
            accessory: self.accessory.clone(),
            kind,
            value,
        });
    }
}

pub struct Characteristic {
    kind: CharacteristicKind,
    props: CharacteristicProps,
    value: RwLock<Option<Value>>,
    version: AtomicU32,
    notifier: RwLock<Option<CharacteristicNotifier>>,
}

impl Characteristic {
    pub fn new(kind: CharacteristicKind) -> Self {
        Self {
            kind,
            props: CharacteristicProps::default(),
            value: RwLock::new(None),
            version: AtomicU32::new(0),
            notifier: RwLock::new(None),
        }
    }

    pub fn with_props(mut self, props: CharacteristicProps) -> Self {
        self.props = props;
        self
    }

    /// Set a fixed initial value, e.g. for information characteristics.
    pub fn with_value(self, value: impl Into<Value>) -> Self {
        *self.value.write() = Some(value.into());
        self
    }

    pub fn kind(&self) -> CharacteristicKind {
        self.kind
    }

    pub fn props(&self) -> CharacteristicProps {
        self.props
    }

    /// Last pushed value, `None` until the device reported one.
    pub fn value(&self) -> Option<Value> {
        self.value.read().clone()
    }

    pub fn version(&self) -> u32 {
        self.version.load(Ordering::SeqCst)
    }

    pub fn set_notifier(&self, notifier: CharacteristicNotifier) {
        *self.notifier.write() = Some(notifier);
    }

    /// Push a new value. Increments the version and notifies the host only
    /// if the value differs from the previous one.
    pub fn set_value(&self, value: Value) {
        {
            let mut current = self.value.write();
            if current.as_ref() == Some(&value) {
                return;
            }
            *current = Some(value.clone());
        }

        self.version.fetch_add(1, Ordering::SeqCst);
        if let Some(notifier) = self.notifier.read().as_ref() {
            notifier.notify(self.kind, value);
        }
    }
}
