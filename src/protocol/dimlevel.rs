//! Conversion between pilight dim levels and percentage brightness.
//!
//! pilight dimmers report an integer dim level in `1..=16`. Accessory hosts
//! work with a brightness percentage in `0..=100`. Both directions round to
//! the nearest step, so every dim level survives a round trip exactly.

use crate::error::{BridgeError, Result};

/// Lowest dim level a pilight dimmer accepts.
pub const DIM_LEVEL_MIN: u8 = 1;

/// Highest dim level a pilight dimmer accepts.
pub const DIM_LEVEL_MAX: u8 = 16;

/// Upper bound of the brightness percentage scale.
pub const BRIGHTNESS_MAX: u8 = 100;

/// Convert a dim level into a brightness percentage.
pub fn to_brightness(dim_level: u8) -> Result<u8> {
    if !(DIM_LEVEL_MIN..=DIM_LEVEL_MAX).contains(&dim_level) {
        return Err(BridgeError::Conversion(format!(
            "dim level {} outside {}..={}",
            dim_level, DIM_LEVEL_MIN, DIM_LEVEL_MAX
        )));
    }

    let max = u16::from(DIM_LEVEL_MAX);
    let scaled = u16::from(dim_level) * u16::from(BRIGHTNESS_MAX);
    Ok(((scaled + max / 2) / max) as u8)
}

/// Convert a brightness percentage into a dim level.
///
/// A brightness of 0 has no dim level and is rejected; callers that want to
/// treat it as "nothing to do" must check for it first.
pub fn to_dim_level(brightness: u8) -> Result<u8> {
    if brightness == 0 || brightness > BRIGHTNESS_MAX {
        return Err(BridgeError::Conversion(format!(
            "brightness {}% outside 1..={}",
            brightness, BRIGHTNESS_MAX
        )));
    }

    let hundred = u16::from(BRIGHTNESS_MAX);
    let scaled = u16::from(brightness) * u16::from(DIM_LEVEL_MAX);
    // Low percentages round to 0, which is not a level; 1 is the floor.
    Ok((((scaled + hundred / 2) / hundred) as u8).max(DIM_LEVEL_MIN))
}
