use std::{
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

use chrono::{DateTime, Utc};
use rumqttc::{AsyncClient, QoS};
use tracing::{debug, warn};

use climate_common::{
    dispatch, Appliance, AvailabilityChannel, ClimateConfig, DisplayRenderer, DisplayState,
    EngineOutput, HubPublisher, HvacAction, OperatingMode, RelaySink, SensorError, SensorReading,
    SensorSource, StateSnapshot, PAYLOAD_AVAILABLE, PAYLOAD_NOT_AVAILABLE, PAYLOAD_OFF,
    PAYLOAD_ON, TOPIC_HVAC_ACTION, TOPIC_HVAC_STATUS, TOPIC_MODE_STATE, TOPIC_SENSOR_STATUS,
    TOPIC_STATE, TOPIC_TARGET_STATE,
};

use crate::discovery::registration_messages;

#[derive(Debug, Clone)]
struct Sample {
    reading: SensorReading,
    received_at: Instant,
    received_wall: DateTime<Utc>,
}

/// Latest reading from the sensor node, shared between the MQTT loop that
/// fills it and the engine that samples it.
#[derive(Debug, Clone)]
pub struct SharedSensor {
    latest: Arc<Mutex<Option<Sample>>>,
    stale_after: Duration,
}

impl SharedSensor {
    /// A zero `stale_after` disables the staleness check.
    pub fn new(stale_after: Duration) -> Self {
        Self {
            latest: Arc::new(Mutex::new(None)),
            stale_after,
        }
    }

    pub fn update(&self, reading: SensorReading) {
        let sample = Sample {
            reading,
            received_at: Instant::now(),
            received_wall: Utc::now(),
        };
        match self.latest.lock() {
            Ok(mut latest) => *latest = Some(sample),
            Err(err) => warn!("sensor cache poisoned, dropping reading: {err}"),
        }
    }

    pub fn last_received_at(&self) -> Option<DateTime<Utc>> {
        self.latest
            .lock()
            .ok()
            .and_then(|latest| latest.as_ref().map(|sample| sample.received_wall))
    }
}

impl SensorSource for SharedSensor {
    fn read(&mut self) -> Result<SensorReading, SensorError> {
        let latest = self
            .latest
            .lock()
            .map_err(|_| SensorError::Unavailable("sensor cache poisoned".to_string()))?;
        let sample = latest.as_ref().ok_or(SensorError::NoReading)?;

        let age = sample.received_at.elapsed();
        if !self.stale_after.is_zero() && age > self.stale_after {
            return Err(SensorError::Stale {
                age_secs: age.as_secs(),
            });
        }
        Ok(sample.reading.clone())
    }
}

/// Relays are driven over MQTT.
#[derive(Clone)]
pub struct MqttRelay {
    mqtt: AsyncClient,
}

impl RelaySink for MqttRelay {
    fn switch(&mut self, appliance: Appliance, on: bool) {
        let topic = appliance.relay_topic();
        if let Err(err) = self.mqtt.try_publish(topic, QoS::AtLeastOnce, false, on_off(on)) {
            warn!("relay command on {topic} failed: {err}");
        }
    }
}

#[derive(Clone)]
pub struct MqttHub {
    mqtt: AsyncClient,
    climate: ClimateConfig,
}

impl MqttHub {
    fn send(&self, topic: &str, payload: impl Into<Vec<u8>>) {
        if let Err(err) = self
            .mqtt
            .try_publish(topic, QoS::AtLeastOnce, true, payload)
        {
            warn!("hub publish on {topic} failed: {err}");
        }
    }
}

impl HubPublisher for MqttHub {
    fn publish_appliance_action(&mut self, appliance: Appliance, on: bool) {
        self.send(appliance.state_topic(), on_off(on));
    }

    fn publish_hvac_action(&mut self, action: HvacAction) {
        self.send(TOPIC_HVAC_ACTION, action.as_str());
    }

    fn publish_mode(&mut self, mode: OperatingMode) {
        self.send(TOPIC_MODE_STATE, mode.hub_name());
    }

    fn publish_target(&mut self, target: f32) {
        self.send(TOPIC_TARGET_STATE, format!("{target:.1}"));
    }

    fn publish_full_state(&mut self, state: &StateSnapshot) {
        match serde_json::to_vec(state) {
            Ok(body) => self.send(TOPIC_STATE, body),
            Err(err) => warn!("state serialization failed: {err}"),
        }
    }

    fn publish_availability(&mut self, channel: AvailabilityChannel, online: bool) {
        let topic = match channel {
            AvailabilityChannel::Hvac => TOPIC_HVAC_STATUS,
            AvailabilityChannel::Sensors => TOPIC_SENSOR_STATUS,
        };
        let payload = if online {
            PAYLOAD_AVAILABLE
        } else {
            PAYLOAD_NOT_AVAILABLE
        };
        self.send(topic, payload);
    }

    fn publish_registration(&mut self) {
        for message in registration_messages(&self.climate) {
            match serde_json::to_vec(&message.payload) {
                Ok(body) => self.send(&message.topic, body),
                Err(err) => warn!("discovery serialization for {} failed: {err}", message.topic),
            }
        }
    }
}

/// The on-device screen is not driven from the host build; redraw requests
/// are traced instead.
#[derive(Debug, Default, Clone)]
pub struct TracingDisplay {
    last: Option<DisplayState>,
}

impl DisplayRenderer for TracingDisplay {
    fn on_display_state_changed(&mut self, state: &DisplayState) {
        if self.last.as_ref() == Some(state) {
            return;
        }
        debug!(
            mode = state.mode.as_str(),
            action = state.action_label,
            target = state.target,
            actual = state.actual,
            blink = state.blink_pending,
            "display update"
        );
        self.last = Some(state.clone());
    }
}

/// All outbound sinks, driven in engine output order.
#[derive(Clone)]
pub struct Outbound {
    relay: MqttRelay,
    hub: MqttHub,
    display: TracingDisplay,
}

impl Outbound {
    pub fn new(mqtt: AsyncClient, climate: ClimateConfig) -> Self {
        Self {
            relay: MqttRelay { mqtt: mqtt.clone() },
            hub: MqttHub { mqtt, climate },
            display: TracingDisplay::default(),
        }
    }

    pub fn dispatch(&mut self, outputs: &[EngineOutput]) {
        dispatch(outputs, &mut self.relay, &mut self.hub, &mut self.display);
    }
}

fn on_off(on: bool) -> &'static str {
    if on {
        PAYLOAD_ON
    } else {
        PAYLOAD_OFF
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(temperature: f32) -> SensorReading {
        SensorReading {
            temperature,
            humidity: Some(40.0),
            pressure: None,
        }
    }

    #[test]
    fn empty_cache_reports_no_reading() {
        let mut sensor = SharedSensor::new(Duration::from_secs(60));
        assert_eq!(sensor.read(), Err(SensorError::NoReading));
        assert_eq!(sensor.last_received_at(), None);
    }

    #[test]
    fn latest_reading_wins() {
        let mut sensor = SharedSensor::new(Duration::from_secs(60));
        sensor.update(reading(19.0));
        sensor.update(reading(21.5));

        assert_eq!(sensor.read(), Ok(reading(21.5)));
        assert!(sensor.last_received_at().is_some());
    }

    #[test]
    fn old_reading_goes_stale() {
        let mut sensor = SharedSensor::new(Duration::from_millis(1));
        sensor.update(reading(19.0));
        std::thread::sleep(Duration::from_millis(20));

        assert!(matches!(sensor.read(), Err(SensorError::Stale { .. })));
    }

    #[test]
    fn zero_timeout_never_goes_stale() {
        let mut sensor = SharedSensor::new(Duration::ZERO);
        sensor.update(reading(19.0));
        std::thread::sleep(Duration::from_millis(5));

        assert_eq!(sensor.read(), Ok(reading(19.0)));
    }

    #[test]
    fn clones_share_the_cache() {
        let writer = SharedSensor::new(Duration::from_secs(60));
        let mut reader = writer.clone();
        writer.update(reading(22.0));

        assert_eq!(reader.read(), Ok(reading(22.0)));
    }
}
