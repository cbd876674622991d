//! Device binding: type profile and synchronized state.

mod device_type;
pub mod state;

pub use device_type::DeviceType;
pub use state::{DeviceState, StateChange, SyncOutcome, resolve};
