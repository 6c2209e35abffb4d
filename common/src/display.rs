use serde::Serialize;

use crate::types::{Appliance, ApplianceState, OperatingMode};

pub const COLOR_HEAT: u32 = 0xE0_4A_1F;
pub const COLOR_COOL: u32 = 0x08_A2_B0;
pub const COLOR_FAN: u32 = 0x4C_AF_50;
pub const COLOR_INACTIVE: u32 = 0xA0_A0_A0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ApplianceColors {
    pub heat: u32,
    pub cool: u32,
    pub fan: u32,
}

impl ApplianceColors {
    pub fn for_state(state: &ApplianceState) -> Self {
        let pick = |appliance: Appliance, active: u32| {
            if state.is_on(appliance) {
                active
            } else {
                COLOR_INACTIVE
            }
        };
        Self {
            heat: pick(Appliance::Heat, COLOR_HEAT),
            cool: pick(Appliance::Cool, COLOR_COOL),
            fan: pick(Appliance::Fan, COLOR_FAN),
        }
    }
}

/// Everything the renderer needs for one redraw. `actual` is already clamped
/// to the display range; unit conversion is left to the renderer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayState {
    pub mode: OperatingMode,
    pub action_label: &'static str,
    pub target: f32,
    pub actual: f32,
    pub colors: ApplianceColors,
    pub blink_pending: bool,
}

/// A running appliance is always shown, even in `Off` while the cycle guard
/// holds back the shutdown.
pub fn action_label(mode: OperatingMode, state: &ApplianceState) -> &'static str {
    match state.active() {
        Some(Appliance::Heat) => "Heating",
        Some(Appliance::Cool) => "Cooling",
        Some(Appliance::Fan) => "Fan",
        None if mode == OperatingMode::Off => "Off",
        None => "Idle",
    }
}
