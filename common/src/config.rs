use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Engine constants. Temperatures are Celsius.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClimateConfig {
    pub min_target: f32,
    pub max_target: f32,
    pub default_target: f32,
    pub min_temp: f32,
    pub max_temp: f32,
    pub min_cycle_secs: u32,
    pub cold_tolerance: f32,
    pub heat_tolerance: f32,
    pub update_frequency_secs: u32,
    pub sensor_stale_timeout_secs: u64,
}

impl Default for ClimateConfig {
    fn default() -> Self {
        Self {
            min_target: 15.0,
            max_target: 25.0,
            default_target: 20.0,
            min_temp: 5.0,
            max_temp: 35.0,
            min_cycle_secs: 300,
            cold_tolerance: 0.5,
            heat_tolerance: 0.5,
            update_frequency_secs: 20,
            sensor_stale_timeout_secs: 300,
        }
    }
}

impl ClimateConfig {
    pub fn sanitize(&mut self) {
        let defaults = Self::default();

        if !self.min_target.is_finite() || !self.max_target.is_finite() {
            self.min_target = defaults.min_target;
            self.max_target = defaults.max_target;
        }
        if self.min_target > self.max_target {
            std::mem::swap(&mut self.min_target, &mut self.max_target);
        }

        if !self.min_temp.is_finite() || !self.max_temp.is_finite() {
            self.min_temp = defaults.min_temp;
            self.max_temp = defaults.max_temp;
        }
        if self.min_temp > self.max_temp {
            std::mem::swap(&mut self.min_temp, &mut self.max_temp);
        }

        if !self.default_target.is_finite() {
            self.default_target = defaults.default_target;
        }
        self.default_target = self.clamp_target(self.default_target);

        self.cold_tolerance = sanitize_tolerance(self.cold_tolerance);
        self.heat_tolerance = sanitize_tolerance(self.heat_tolerance);
        self.update_frequency_secs = self.update_frequency_secs.max(1);
    }

    /// Rounds to a whole degree and clamps into the target range.
    pub fn clamp_target(&self, value: f32) -> f32 {
        value.round().clamp(self.min_target, self.max_target)
    }
}

fn sanitize_tolerance(value: f32) -> f32 {
    if value.is_finite() {
        value.max(0.0)
    } else {
        0.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub mqtt_host: String,
    pub mqtt_port: u16,
    pub mqtt_user: String,
    pub mqtt_pass: String,
    pub mqtt_client_id: String,
    pub keep_alive_secs: u64,
    pub http_port: u16,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            mqtt_host: "127.0.0.1".to_string(),
            mqtt_port: 1883,
            mqtt_user: String::new(),
            mqtt_pass: String::new(),
            mqtt_client_id: "Thermostat".to_string(),
            keep_alive_secs: 300,
            http_port: 8080,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub climate: ClimateConfig,
    pub network: NetworkConfig,
}

impl RuntimeConfig {
    pub fn from_json(raw: &[u8]) -> Result<Self, ConfigError> {
        let mut runtime: Self = serde_json::from_slice(raw)?;
        runtime.sanitize();
        Ok(runtime)
    }

    pub fn sanitize(&mut self) {
        self.climate.sanitize();
        self.network.keep_alive_secs = self.network.keep_alive_secs.max(5);
    }
}
