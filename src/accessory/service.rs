//! Services exposed for each device type.
//!
//! The service list is built once from the binding's [`DeviceType`]:
//!
//! | Device type         | Service            | Characteristics         |
//! |---------------------|--------------------|-------------------------|
//! | `Switch`            | Switch             | On                      |
//! | `Lamp`              | Lightbulb          | On                      |
//! | `Dimmer`            | Lightbulb          | On, Brightness (0-100%) |
//! | `TemperatureSensor` | TemperatureSensor  | CurrentTemperature      |
//!
//! Every accessory also carries an AccessoryInformation service first.

use super::characteristic::{Characteristic, CharacteristicKind, CharacteristicProps};
use crate::config::DeviceConfig;
use crate::device::DeviceType;
use crate::protocol::dimlevel;
use std::sync::Arc;
use strum::Display;

pub const MANUFACTURER: &str = "pilight";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ServiceKind {
    AccessoryInformation,
    Switch,
    Lightbulb,
    TemperatureSensor,
}

pub struct Service {
    kind: ServiceKind,
    display_name: String,
    characteristics: Vec<Arc<Characteristic>>,
}

impl Service {
    pub fn new(kind: ServiceKind, display_name: impl Into<String>) -> Self {
        Self {
            kind,
            display_name: display_name.into(),
            characteristics: Vec::new(),
        }
    }

    pub fn with_characteristic(mut self, characteristic: Characteristic) -> Self {
        self.characteristics.push(Arc::new(characteristic));
        self
    }

    pub fn kind(&self) -> ServiceKind {
        self.kind
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn characteristics(&self) -> &[Arc<Characteristic>] {
        &self.characteristics
    }

    pub fn characteristic(&self, kind: CharacteristicKind) -> Option<&Arc<Characteristic>> {
        self.characteristics.iter().find(|c| c.kind() == kind)
    }
}

fn information_service(config: &DeviceConfig) -> Service {
    Service::new(ServiceKind::AccessoryInformation, &config.name)
        .with_characteristic(
            Characteristic::new(CharacteristicKind::Name).with_value(config.name.as_str()),
        )
        .with_characteristic(
            Characteristic::new(CharacteristicKind::Manufacturer).with_value(MANUFACTURER),
        )
        .with_characteristic(
            Characteristic::new(CharacteristicKind::Model)
                .with_value(config.device_type.to_string()),
        )
        .with_characteristic(
            Characteristic::new(CharacteristicKind::SerialNumber)
                .with_value(config.device_id.as_str()),
        )
}

fn brightness() -> Characteristic {
    Characteristic::new(CharacteristicKind::Brightness).with_props(CharacteristicProps {
        min: Some(0.0),
        max: Some(f64::from(dimlevel::BRIGHTNESS_MAX)),
        unit: Some("percentage"),
    })
}

fn current_temperature() -> Characteristic {
    Characteristic::new(CharacteristicKind::CurrentTemperature).with_props(CharacteristicProps {
        min: Some(-100.0),
        max: Some(100.0),
        unit: Some("celsius"),
    })
}

/// Build the services for a device binding.
pub fn services_for(config: &DeviceConfig) -> Vec<Service> {
    let device_service = match config.device_type {
        DeviceType::Switch => Service::new(ServiceKind::Switch, &config.name)
            .with_characteristic(Characteristic::new(CharacteristicKind::On)),
        DeviceType::Lamp => Service::new(ServiceKind::Lightbulb, &config.name)
            .with_characteristic(Characteristic::new(CharacteristicKind::On)),
        DeviceType::Dimmer => Service::new(ServiceKind::Lightbulb, &config.name)
            .with_characteristic(Characteristic::new(CharacteristicKind::On))
            .with_characteristic(brightness()),
        DeviceType::TemperatureSensor => {
            Service::new(ServiceKind::TemperatureSensor, &config.name)
                .with_characteristic(current_temperature())
        }
    };

    vec![information_service(config), device_service]
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config(device_type: DeviceType) -> DeviceConfig {
        DeviceConfig {
            name: "Desk".to_string(),
            device_type,
            ..Default::default()
        }
    }

    fn kinds(service: &Service) -> Vec<CharacteristicKind> {
        service.characteristics().iter().map(|c| c.kind()).collect()
    }

    #[test]
    fn test_information_first() {
        let services = services_for(&config(DeviceType::Lamp));
        assert_eq!(services.len(), 2);
        assert_eq!(services[0].kind(), ServiceKind::AccessoryInformation);
        assert_eq!(
            services[0]
                .characteristic(CharacteristicKind::Model)
                .unwrap()
                .value(),
            Some(json!("Lamp"))
        );
        assert_eq!(
            services[0]
                .characteristic(CharacteristicKind::SerialNumber)
                .unwrap()
                .value(),
            Some(json!("lamp"))
        );
    }

    #[test]
    fn test_service_per_type() {
        let switch = services_for(&config(DeviceType::Switch));
        assert_eq!(switch[1].kind(), ServiceKind::Switch);
        assert_eq!(kinds(&switch[1]), vec![CharacteristicKind::On]);

        let lamp = services_for(&config(DeviceType::Lamp));
        assert_eq!(lamp[1].kind(), ServiceKind::Lightbulb);
        assert_eq!(kinds(&lamp[1]), vec![CharacteristicKind::On]);

        let dimmer = services_for(&config(DeviceType::Dimmer));
        assert_eq!(dimmer[1].kind(), ServiceKind::Lightbulb);
        assert_eq!(
            kinds(&dimmer[1]),
            vec![CharacteristicKind::On, CharacteristicKind::Brightness]
        );
        assert_eq!(dimmer[1].display_name(), "Desk");

        let sensor = services_for(&config(DeviceType::TemperatureSensor));
        assert_eq!(sensor[1].kind(), ServiceKind::TemperatureSensor);
        assert_eq!(
            kinds(&sensor[1]),
            vec![CharacteristicKind::CurrentTemperature]
        );
    }

    #[test]
    fn test_brightness_props() {
        let dimmer = services_for(&config(DeviceType::Dimmer));
        let props = dimmer[1]
            .characteristic(CharacteristicKind::Brightness)
            .unwrap()
            .props();
        assert_eq!(props.min, Some(0.0));
        assert_eq!(props.max, Some(100.0));
        assert_eq!(props.unit, Some("percentage"));
    }
}
