//! Pure decision rules. Nothing here mutates engine state; the engine feeds
//! the current mode, setpoint and appliance flags in and applies whatever
//! single [`Action`] comes back.

use crate::types::{Action, ApplianceState, ControlSetpoint, ManualCommand, OperatingMode};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tolerances {
    pub cold: f32,
    pub heat: f32,
}

/// Hysteresis rules for every mode except `Manual`. Turn-on rules are checked
/// before turn-off rules and the first match wins.
pub fn decide(
    mode: OperatingMode,
    setpoint: ControlSetpoint,
    appliances: &ApplianceState,
    tolerances: Tolerances,
) -> Action {
    use OperatingMode::{Auto, Cool, Fan, Heat, Off};

    let ControlSetpoint { target, actual } = setpoint;
    let too_cold = actual <= target - tolerances.cold;
    let too_hot = actual >= target + tolerances.heat;

    if too_cold && !appliances.heating() && matches!(mode, Auto | Heat) {
        return Action::HeatOn;
    }
    if too_hot && !appliances.cooling() && matches!(mode, Auto | Cool) {
        return Action::CoolOn;
    }
    if too_hot && !appliances.fan() && mode == Fan {
        return Action::FanOn;
    }

    if appliances.heating() && (actual >= target || matches!(mode, Off | Cool | Fan)) {
        return Action::HeatOff;
    }
    if appliances.cooling() && (actual <= target || matches!(mode, Off | Heat | Fan)) {
        return Action::CoolOff;
    }
    if appliances.fan() && (actual <= target || matches!(mode, Off | Heat | Cool)) {
        return Action::FanOff;
    }

    Action::None
}

/// Manual mode: each appliance is toggled directly. A command asking for the
/// state the appliance is already in yields `Action::None`.
pub fn arbitrate_manual(command: Option<ManualCommand>, appliances: &ApplianceState) -> Action {
    match command {
        Some(ManualCommand { appliance, on }) if appliances.is_on(appliance) != on => {
            Action::switch(appliance, on)
        }
        _ => Action::None,
    }
}
