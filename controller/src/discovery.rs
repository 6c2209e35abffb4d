//! Home Assistant MQTT discovery payloads, using the abbreviated key names
//! the hub accepts.

use serde_json::{json, Value};

use climate_common::{
    ClimateConfig, PAYLOAD_AVAILABLE, PAYLOAD_NOT_AVAILABLE, PAYLOAD_OFF, PAYLOAD_ON,
    TOPIC_AC_STATE, TOPIC_CMD_AC, TOPIC_CMD_HEATER, TOPIC_CMD_MODE, TOPIC_CMD_TARGET,
    TOPIC_DISCOVERY_PREFIX, TOPIC_HEATER_STATE, TOPIC_HVAC_ACTION, TOPIC_HVAC_STATUS,
    TOPIC_MODE_STATE, TOPIC_SENSOR_STATUS, TOPIC_STATE, TOPIC_TARGET_STATE,
};

const DEVICE_ID: &str = "core2-thermostat";
const DEVICE_NAME: &str = "Core 2 Thermostat";
const DEVICE_MODEL: &str = "Core 2";
const DEVICE_MANUFACTURER: &str = "M5Stack";

#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveryMessage {
    pub topic: String,
    pub payload: Value,
}

pub fn registration_messages(climate: &ClimateConfig) -> Vec<DiscoveryMessage> {
    let mut messages = vec![
        sensor("core2-temp", "Core2 Temperature", "temperature", "°C", "temperature"),
        sensor("core2-humid", "Core2 Humidity", "humidity", "%", "humidity"),
        sensor("core2-pressure", "Core2 Pressure", "pressure", "hPa", "pressure"),
        climate_entity(climate),
    ];
    messages.push(switch("core2-heater", "Core2 Heater", TOPIC_CMD_HEATER, TOPIC_HEATER_STATE));
    messages.push(switch("core2-ac", "Core2 AC", TOPIC_CMD_AC, TOPIC_AC_STATE));
    messages
}

fn device() -> Value {
    json!({
        "ids": [DEVICE_ID],
        "name": DEVICE_NAME,
        "mdl": DEVICE_MODEL,
        "mf": DEVICE_MANUFACTURER,
    })
}

fn sensor(
    object_id: &str,
    name: &str,
    device_class: &str,
    unit: &str,
    field: &str,
) -> DiscoveryMessage {
    DiscoveryMessage {
        topic: format!("{TOPIC_DISCOVERY_PREFIX}/sensor/core2/{object_id}/config"),
        payload: json!({
            "name": name,
            "uniq_id": object_id,
            "dev_cla": device_class,
            "unit_of_meas": unit,
            "stat_t": TOPIC_STATE,
            "val_tpl": format!("{{{{value_json.{field}}}}}"),
            "avty_t": TOPIC_SENSOR_STATUS,
            "pl_avail": PAYLOAD_AVAILABLE,
            "pl_not_avail": PAYLOAD_NOT_AVAILABLE,
            "dev": device(),
        }),
    }
}

fn climate_entity(climate: &ClimateConfig) -> DiscoveryMessage {
    DiscoveryMessage {
        topic: format!("{TOPIC_DISCOVERY_PREFIX}/climate/core2/core2-hvac/config"),
        payload: json!({
            "name": DEVICE_NAME,
            "uniq_id": "core2-hvac",
            "modes": ["off", "auto", "heat", "cool", "fan_only"],
            "mode_cmd_t": TOPIC_CMD_MODE,
            "mode_stat_t": TOPIC_MODE_STATE,
            "temp_cmd_t": TOPIC_CMD_TARGET,
            "temp_stat_t": TOPIC_TARGET_STATE,
            "curr_temp_t": TOPIC_STATE,
            "curr_temp_tpl": "{{value_json.temperature}}",
            "act_t": TOPIC_HVAC_ACTION,
            "min_temp": climate.min_target,
            "max_temp": climate.max_target,
            "temp_step": 1,
            "temp_unit": "C",
            "avty_t": TOPIC_HVAC_STATUS,
            "pl_avail": PAYLOAD_AVAILABLE,
            "pl_not_avail": PAYLOAD_NOT_AVAILABLE,
            "dev": device(),
        }),
    }
}

fn switch(object_id: &str, name: &str, command_topic: &str, state_topic: &str) -> DiscoveryMessage {
    DiscoveryMessage {
        topic: format!("{TOPIC_DISCOVERY_PREFIX}/switch/core2/{object_id}/config"),
        payload: json!({
            "name": name,
            "uniq_id": object_id,
            "cmd_t": command_topic,
            "stat_t": state_topic,
            "pl_on": PAYLOAD_ON,
            "pl_off": PAYLOAD_OFF,
            "avty_t": TOPIC_HVAC_STATUS,
            "pl_avail": PAYLOAD_AVAILABLE,
            "pl_not_avail": PAYLOAD_NOT_AVAILABLE,
            "dev": device(),
        }),
    }
}
