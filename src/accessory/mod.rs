//! Accessory exposition: services, characteristics and the pilight-backed
//! accessory that keeps them in sync.

pub mod characteristic;
mod pilight_accessory;
pub mod service;

pub use characteristic::{
    Characteristic, CharacteristicEvent, CharacteristicKind, CharacteristicNotifier,
    CharacteristicProps,
};
pub use pilight_accessory::PilightAccessory;
pub use service::{Service, ServiceKind};
