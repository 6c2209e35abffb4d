//! Hub wire codec: inbound topic/payload pairs become typed commands, and
//! sensor readings are decoded from their JSON payloads.

use crate::{
    error::{DecodeError, SensorError},
    topics::{
        PAYLOAD_HUB_ONLINE, TOPIC_CMD_AC, TOPIC_CMD_HEATER, TOPIC_CMD_MASTER, TOPIC_CMD_MODE,
        TOPIC_CMD_TARGET, TOPIC_HUB_STATUS,
    },
    types::{Appliance, OperatingMode, SensorReading},
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InboundCommand {
    SetMode(OperatingMode),
    SetTarget(f32),
    ManualSwitch { appliance: Appliance, on: bool },
    ForceOff,
    Resync,
}

/// Decodes one hub message. `Ok(None)` means the topic is known but the
/// payload asks for nothing (hub going offline, master switch turned on).
pub fn decode(topic: &str, payload: &[u8]) -> Result<Option<InboundCommand>, DecodeError> {
    let text = std::str::from_utf8(payload).map_err(|_| DecodeError::NotUtf8)?;
    let text = text.trim();

    match topic {
        TOPIC_CMD_MODE => OperatingMode::from_hub(text)
            .map(|mode| Some(InboundCommand::SetMode(mode)))
            .ok_or_else(|| DecodeError::UnknownMode(text.to_string())),
        TOPIC_CMD_TARGET => parse_target(text).map(|value| Some(InboundCommand::SetTarget(value))),
        TOPIC_CMD_HEATER => parse_switch(text).map(|on| {
            Some(InboundCommand::ManualSwitch {
                appliance: Appliance::Heat,
                on,
            })
        }),
        TOPIC_CMD_AC => parse_switch(text).map(|on| {
            Some(InboundCommand::ManualSwitch {
                appliance: Appliance::Cool,
                on,
            })
        }),
        TOPIC_CMD_MASTER => {
            let on = parse_switch(text)?;
            Ok((!on).then_some(InboundCommand::ForceOff))
        }
        TOPIC_HUB_STATUS => Ok(text
            .eq_ignore_ascii_case(PAYLOAD_HUB_ONLINE)
            .then_some(InboundCommand::Resync)),
        other => Err(DecodeError::UnknownTopic(other.to_string())),
    }
}

/// Parses an "ON"/"OFF" payload (case-insensitive, whitespace trimmed).
pub fn parse_switch(text: &str) -> Result<bool, DecodeError> {
    match text.trim().to_ascii_uppercase().as_str() {
        "ON" => Ok(true),
        "OFF" => Ok(false),
        _ => Err(DecodeError::InvalidSwitch(text.trim().to_string())),
    }
}

fn parse_target(text: &str) -> Result<f32, DecodeError> {
    text.parse::<f32>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| DecodeError::InvalidTarget(text.to_string()))
}

pub fn decode_reading(payload: &[u8]) -> Result<SensorReading, SensorError> {
    let reading: SensorReading =
        serde_json::from_slice(payload).map_err(|err| SensorError::Invalid(err.to_string()))?;
    if !reading.temperature.is_finite() {
        return Err(SensorError::Invalid("temperature is not finite".to_string()));
    }
    Ok(reading)
}
