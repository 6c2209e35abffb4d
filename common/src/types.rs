use serde::{Deserialize, Serialize};

use crate::topics::{
    TOPIC_AC_STATE, TOPIC_FAN_STATE, TOPIC_HEATER_STATE, TOPIC_RELAY_COOL, TOPIC_RELAY_FAN,
    TOPIC_RELAY_HEAT,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperatingMode {
    Off,
    Auto,
    Manual,
    Heat,
    Cool,
    #[serde(rename = "fan_only")]
    Fan,
}

impl OperatingMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::Auto => "auto",
            Self::Manual => "manual",
            Self::Heat => "heat",
            Self::Cool => "cool",
            Self::Fan => "fan_only",
        }
    }

    /// Parses a hub mode name. The hub calls the fan mode `fan_only`; the
    /// local shorthand `fan` is accepted as well.
    pub fn from_hub(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "off" => Some(Self::Off),
            "auto" => Some(Self::Auto),
            "manual" => Some(Self::Manual),
            "heat" => Some(Self::Heat),
            "cool" => Some(Self::Cool),
            "fan_only" | "fan" => Some(Self::Fan),
            _ => None,
        }
    }

    /// Name reported on the hub's climate mode state topic. The hub has no
    /// manual mode, so manual control is reported as `off`; the switch and
    /// action topics still show what is running.
    pub fn hub_name(self) -> &'static str {
        match self {
            Self::Manual => "off",
            mode => mode.as_str(),
        }
    }

    /// Whether decisions in this mode read the room temperature.
    pub fn uses_temperature(self) -> bool {
        matches!(self, Self::Auto | Self::Heat | Self::Cool | Self::Fan)
    }

    /// Successor used by the local mode button: Off, Auto, Manual, Heat,
    /// Cool, Fan, then back to Off.
    pub fn next(self) -> Self {
        match self {
            Self::Off => Self::Auto,
            Self::Auto => Self::Manual,
            Self::Manual => Self::Heat,
            Self::Heat => Self::Cool,
            Self::Cool => Self::Fan,
            Self::Fan => Self::Off,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Appliance {
    Heat,
    Cool,
    Fan,
}

impl Appliance {
    pub const ALL: [Self; 3] = [Self::Heat, Self::Cool, Self::Fan];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Heat => "heat",
            Self::Cool => "cool",
            Self::Fan => "fan",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "heat" | "heater" => Some(Self::Heat),
            "cool" | "ac" => Some(Self::Cool),
            "fan" => Some(Self::Fan),
            _ => None,
        }
    }

    /// Action state reported to the hub while this appliance runs.
    pub fn running_action(self) -> HvacAction {
        match self {
            Self::Heat => HvacAction::Heating,
            Self::Cool => HvacAction::Cooling,
            Self::Fan => HvacAction::Fan,
        }
    }

    pub fn relay_topic(self) -> &'static str {
        match self {
            Self::Heat => TOPIC_RELAY_HEAT,
            Self::Cool => TOPIC_RELAY_COOL,
            Self::Fan => TOPIC_RELAY_FAN,
        }
    }

    pub fn state_topic(self) -> &'static str {
        match self {
            Self::Heat => TOPIC_HEATER_STATE,
            Self::Cool => TOPIC_AC_STATE,
            Self::Fan => TOPIC_FAN_STATE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HvacAction {
    Idle,
    Heating,
    Cooling,
    Fan,
}

impl HvacAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Heating => "heating",
            Self::Cooling => "cooling",
            Self::Fan => "fan",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    HeatOn,
    HeatOff,
    CoolOn,
    CoolOff,
    FanOn,
    FanOff,
    None,
}

impl Action {
    pub fn switch(appliance: Appliance, on: bool) -> Self {
        match (appliance, on) {
            (Appliance::Heat, true) => Self::HeatOn,
            (Appliance::Heat, false) => Self::HeatOff,
            (Appliance::Cool, true) => Self::CoolOn,
            (Appliance::Cool, false) => Self::CoolOff,
            (Appliance::Fan, true) => Self::FanOn,
            (Appliance::Fan, false) => Self::FanOff,
        }
    }

    /// The appliance and requested level, or `None` for the no-op action.
    pub fn target(self) -> Option<(Appliance, bool)> {
        match self {
            Self::HeatOn => Some((Appliance::Heat, true)),
            Self::HeatOff => Some((Appliance::Heat, false)),
            Self::CoolOn => Some((Appliance::Cool, true)),
            Self::CoolOff => Some((Appliance::Cool, false)),
            Self::FanOn => Some((Appliance::Fan, true)),
            Self::FanOff => Some((Appliance::Fan, false)),
            Self::None => None,
        }
    }
}

/// Heat, cool and fan flags. At most one is ever set; only the engine can
/// change them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplianceState {
    heating: bool,
    cooling: bool,
    fan: bool,
}

impl ApplianceState {
    pub fn heating(&self) -> bool {
        self.heating
    }

    pub fn cooling(&self) -> bool {
        self.cooling
    }

    pub fn fan(&self) -> bool {
        self.fan
    }

    pub fn is_on(&self, appliance: Appliance) -> bool {
        match appliance {
            Appliance::Heat => self.heating,
            Appliance::Cool => self.cooling,
            Appliance::Fan => self.fan,
        }
    }

    pub fn active(&self) -> Option<Appliance> {
        Appliance::ALL
            .into_iter()
            .find(|appliance| self.is_on(*appliance))
    }

    pub fn hvac_action(&self) -> HvacAction {
        self.active()
            .map(Appliance::running_action)
            .unwrap_or(HvacAction::Idle)
    }

    pub(crate) fn set(&mut self, appliance: Appliance, on: bool) {
        match appliance {
            Appliance::Heat => self.heating = on,
            Appliance::Cool => self.cooling = on,
            Appliance::Fan => self.fan = on,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManualCommand {
    pub appliance: Appliance,
    pub on: bool,
}

impl ManualCommand {
    pub fn as_str(self) -> &'static str {
        match (self.appliance, self.on) {
            (Appliance::Heat, true) => "heat-on",
            (Appliance::Heat, false) => "heat-off",
            (Appliance::Cool, true) => "cool-on",
            (Appliance::Cool, false) => "cool-off",
            (Appliance::Fan, true) => "fan-on",
            (Appliance::Fan, false) => "fan-off",
        }
    }
}

/// Temperatures in Celsius.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlSetpoint {
    pub target: f32,
    pub actual: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleGuard {
    pub remaining_secs: u32,
    pub change_was_suppressed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AvailabilityChannel {
    Hvac,
    Sensors,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    pub temperature: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub humidity: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pressure: Option<f32>,
}

/// Combined state published to the hub on every update tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateSnapshot {
    pub temperature: f32,
    pub humidity: Option<f32>,
    pub pressure: Option<f32>,
    pub target: f32,
    pub mode: OperatingMode,
    pub action: HvacAction,
    pub heating: bool,
    pub cooling: bool,
    pub fan: bool,
}
