pub const TOPIC_DISCOVERY_PREFIX: &str = "homeassistant";
pub const TOPIC_HUB_STATUS: &str = "homeassistant/status";

pub const TOPIC_SENSOR_READING: &str = "core2/env2/reading";
pub const TOPIC_SENSOR_STATUS: &str = "core2/env2/status";
pub const TOPIC_SENSOR_NODE_STATUS: &str = "core2/env2/node";

pub const TOPIC_STATE: &str = "core2/hvac/state";
pub const TOPIC_HVAC_STATUS: &str = "core2/hvac/status";
pub const TOPIC_HVAC_ACTION: &str = "core2/hvac/action";
pub const TOPIC_MODE_STATE: &str = "core2/hvac/mode/state";
pub const TOPIC_TARGET_STATE: &str = "core2/hvac/target/state";
pub const TOPIC_HEATER_STATE: &str = "core2/hvac/heater/state";
pub const TOPIC_AC_STATE: &str = "core2/hvac/ac/state";
pub const TOPIC_FAN_STATE: &str = "core2/hvac/fan/state";

pub const TOPIC_CMD_MODE: &str = "core2/hvac/mode/set";
pub const TOPIC_CMD_TARGET: &str = "core2/hvac/target/set";
pub const TOPIC_CMD_HEATER: &str = "core2/hvac/heater/set";
pub const TOPIC_CMD_AC: &str = "core2/hvac/ac/set";
pub const TOPIC_CMD_MASTER: &str = "core2/hvac/master/set";

pub const TOPIC_RELAY_HEAT: &str = "core2/relay/heat/set";
pub const TOPIC_RELAY_COOL: &str = "core2/relay/cool/set";
pub const TOPIC_RELAY_FAN: &str = "core2/relay/fan/set";

pub const PAYLOAD_AVAILABLE: &str = "on";
pub const PAYLOAD_NOT_AVAILABLE: &str = "off";
pub const PAYLOAD_HUB_ONLINE: &str = "online";
pub const PAYLOAD_ON: &str = "ON";
pub const PAYLOAD_OFF: &str = "OFF";
