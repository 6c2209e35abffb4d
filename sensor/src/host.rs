use std::time::Duration;

use anyhow::Context;
use rumqttc::{AsyncClient, LastWill, MqttOptions, QoS};
use tracing::{debug, info, warn};

use climate_common::{SensorReading, TOPIC_SENSOR_NODE_STATUS, TOPIC_SENSOR_READING};

const NODE_ONLINE: &str = "online";
const NODE_OFFLINE: &str = "offline";

pub async fn run() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let mqtt_host = std::env::var("MQTT_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let mqtt_port = env_parse::<u16>("MQTT_PORT").unwrap_or(1883);
    let interval_secs = env_parse::<u64>("SENSOR_INTERVAL_SECS")
        .unwrap_or(10)
        .max(1);

    let mut mqtt_options = MqttOptions::new("climate-sensor", mqtt_host, mqtt_port);
    mqtt_options.set_last_will(LastWill::new(
        TOPIC_SENSOR_NODE_STATUS,
        NODE_OFFLINE,
        QoS::AtLeastOnce,
        true,
    ));

    if let Ok(user) = std::env::var("MQTT_USER") {
        let pass = std::env::var("MQTT_PASS").unwrap_or_default();
        mqtt_options.set_credentials(user, pass);
    }

    let (mqtt, mut eventloop) = AsyncClient::new(mqtt_options, 32);

    mqtt.publish(TOPIC_SENSOR_NODE_STATUS, QoS::AtLeastOnce, true, NODE_ONLINE)
        .await
        .context("failed to publish sensor online status")?;

    tokio::spawn(async move {
        loop {
            if let Err(err) = eventloop.poll().await {
                warn!("sensor mqtt poll error: {err}");
                tokio::time::sleep(Duration::from_secs(2)).await;
            }
        }
    });

    info!("sensor publisher started, every {interval_secs}s");

    let mut tick: u64 = 0;
    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));

    loop {
        interval.tick().await;
        tick = tick.saturating_add(1);

        // Simulated values; a board build reads the ENV II unit here.
        let reading = simulated_reading(tick);
        let payload = serde_json::to_vec(&reading).context("failed to encode sensor reading")?;

        mqtt.publish(TOPIC_SENSOR_READING, QoS::AtLeastOnce, false, payload)
            .await
            .context("failed to publish sensor reading")?;

        debug!(
            temperature = reading.temperature,
            humidity = reading.humidity,
            "published reading"
        );
    }
}

fn simulated_reading(tick: u64) -> SensorReading {
    SensorReading {
        temperature: 19.0 + (tick % 8) as f32 * 0.25,
        humidity: Some(42.0 + (tick % 6) as f32 * 0.5),
        pressure: Some(1013.0 + (tick % 4) as f32 * 0.1),
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key)
        .ok()
        .and_then(|value| value.parse::<T>().ok())
}
