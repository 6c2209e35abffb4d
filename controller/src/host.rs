use std::{
    collections::HashMap, io::ErrorKind, net::SocketAddr, path::PathBuf, sync::Arc,
    time::Duration,
};

use anyhow::Context;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use rumqttc::{AsyncClient, Event, Incoming, LastWill, MqttOptions, QoS};
use serde::Serialize;
use tokio::{net::TcpListener, sync::Mutex};
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use climate_common::{
    sync, Appliance, ClimateEngine, EngineOutput, NetworkConfig, OperatingMode, RuntimeConfig,
    StateSnapshot, PAYLOAD_NOT_AVAILABLE, TOPIC_CMD_AC, TOPIC_CMD_HEATER, TOPIC_CMD_MASTER,
    TOPIC_CMD_MODE, TOPIC_CMD_TARGET, TOPIC_HUB_STATUS, TOPIC_HVAC_STATUS, TOPIC_SENSOR_READING,
};

use crate::adapters::{Outbound, SharedSensor};

type Engine = ClimateEngine<SharedSensor>;

/// Engine plus its output sinks behind one lock: every entry point runs and
/// publishes under the same guard, so decision steps never interleave.
struct Controller {
    engine: Engine,
    outbound: Outbound,
}

impl Controller {
    fn drive<F>(&mut self, step: F)
    where
        F: FnOnce(&mut Engine) -> Vec<EngineOutput>,
    {
        let outputs = step(&mut self.engine);
        self.outbound.dispatch(&outputs);
    }
}

#[derive(Clone)]
struct AppState {
    controller: Arc<Mutex<Controller>>,
    sensor: SharedSensor,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug, Serialize)]
struct StatusView {
    #[serde(flatten)]
    state: StateSnapshot,
    #[serde(rename = "cycleRemainingSecs")]
    cycle_remaining_secs: u32,
    #[serde(rename = "changePending")]
    change_pending: bool,
    #[serde(rename = "pendingManual")]
    pending_manual: Option<&'static str>,
    #[serde(rename = "lastReadingAt")]
    last_reading_at: Option<DateTime<Utc>>,
}

const MAX_MQTT_PAYLOAD_BYTES: usize = 512;

pub async fn run() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let runtime = load_runtime_config().await.unwrap_or_else(|err| {
        warn!("failed to load runtime config: {err:#}");
        RuntimeConfig::default()
    });
    let network = apply_env_overrides(runtime.network);
    let climate = runtime.climate;

    let mut mqtt_options = MqttOptions::new(
        network.mqtt_client_id.clone(),
        network.mqtt_host.clone(),
        network.mqtt_port,
    );
    mqtt_options.set_keep_alive(Duration::from_secs(network.keep_alive_secs));
    mqtt_options.set_last_will(LastWill::new(
        TOPIC_HVAC_STATUS,
        PAYLOAD_NOT_AVAILABLE,
        QoS::AtLeastOnce,
        true,
    ));
    if !network.mqtt_user.is_empty() {
        mqtt_options.set_credentials(network.mqtt_user.clone(), network.mqtt_pass.clone());
    }

    let (mqtt, eventloop) = AsyncClient::new(mqtt_options, 64);

    let sensor = SharedSensor::new(Duration::from_secs(climate.sensor_stale_timeout_secs));
    let engine = ClimateEngine::new(climate.clone(), sensor.clone());
    let update_every = Duration::from_secs(u64::from(engine.config().update_frequency_secs));

    let app_state = AppState {
        controller: Arc::new(Mutex::new(Controller {
            engine,
            outbound: Outbound::new(mqtt.clone(), climate),
        })),
        sensor,
    };

    subscribe_topics(&mqtt).await?;
    spawn_mqtt_loop(app_state.clone(), eventloop);
    spawn_cycle_clock(app_state.clone());
    spawn_update_loop(app_state.clone(), update_every);

    let app = Router::new()
        .route("/api/status", get(handle_get_status))
        .route("/api/mode", post(handle_set_mode))
        .route("/api/mode/advance", post(handle_advance_mode))
        .route("/api/target", post(handle_set_target))
        .route("/api/manual/{appliance}", post(handle_manual_button))
        .route("/api/off", post(handle_force_off))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], network.http_port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind controller server at {addr}"))?;

    info!("controller listening on http://{addr}");
    axum::serve(listener, app).await?;
    Ok(())
}

async fn load_runtime_config() -> anyhow::Result<RuntimeConfig> {
    let path = std::env::var("CLIMATE_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("./climate.json"));

    match tokio::fs::read(&path).await {
        Ok(raw) => RuntimeConfig::from_json(&raw)
            .with_context(|| format!("failed to parse {}", path.display())),
        Err(err) if err.kind() == ErrorKind::NotFound => {
            info!("no config at {}, using defaults", path.display());
            Ok(RuntimeConfig::default())
        }
        Err(err) => Err(err).with_context(|| format!("failed to read {}", path.display())),
    }
}

fn apply_env_overrides(mut network: NetworkConfig) -> NetworkConfig {
    if let Ok(host) = std::env::var("MQTT_HOST") {
        network.mqtt_host = host;
    }
    if let Some(port) = env_parse::<u16>("MQTT_PORT") {
        network.mqtt_port = port;
    }
    if let Ok(user) = std::env::var("MQTT_USER") {
        network.mqtt_user = user;
    }
    if let Ok(pass) = std::env::var("MQTT_PASS") {
        network.mqtt_pass = pass;
    }
    if let Some(port) = env_parse::<u16>("CONTROLLER_HTTP_PORT") {
        network.http_port = port;
    }
    network
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key)
        .ok()
        .and_then(|value| value.parse::<T>().ok())
}

async fn subscribe_topics(mqtt: &AsyncClient) -> anyhow::Result<()> {
    let topics = [
        TOPIC_SENSOR_READING,
        TOPIC_CMD_MODE,
        TOPIC_CMD_TARGET,
        TOPIC_CMD_HEATER,
        TOPIC_CMD_AC,
        TOPIC_CMD_MASTER,
        TOPIC_HUB_STATUS,
    ];

    for topic in topics {
        mqtt.subscribe(topic, QoS::AtMostOnce)
            .await
            .with_context(|| format!("failed to subscribe to {topic}"))?;
    }
    Ok(())
}

fn spawn_mqtt_loop(app_state: AppState, mut eventloop: rumqttc::EventLoop) {
    tokio::spawn(async move {
        loop {
            match eventloop.poll().await {
                Ok(Event::Incoming(Incoming::Publish(message))) => {
                    if let Err(err) =
                        handle_mqtt_message(&app_state, &message.topic, &message.payload).await
                    {
                        warn!("mqtt message handling error: {err:#}");
                    }
                }
                Ok(Event::Incoming(Incoming::ConnAck(_))) => {
                    info!("mqtt connected, publishing registration and state");
                    let mut controller = app_state.controller.lock().await;
                    controller.drive(|engine| engine.request_resync());
                }
                Ok(_) => {}
                Err(err) => {
                    warn!("mqtt poll error: {err}");
                    tokio::time::sleep(Duration::from_secs(2)).await;
                }
            }
        }
    });
}

fn spawn_cycle_clock(app_state: AppState) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(1));
        loop {
            interval.tick().await;
            let mut controller = app_state.controller.lock().await;
            controller.drive(|engine| engine.tick_second());
        }
    });
}

fn spawn_update_loop(app_state: AppState, every: Duration) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;
            let mut controller = app_state.controller.lock().await;
            controller.drive(|engine| engine.periodic_update());
        }
    });
}

async fn handle_mqtt_message(
    app_state: &AppState,
    topic: &str,
    payload: &[u8],
) -> anyhow::Result<()> {
    if payload.len() > MAX_MQTT_PAYLOAD_BYTES {
        warn!(
            "dropping oversized MQTT payload on topic {} ({} bytes)",
            topic,
            payload.len()
        );
        return Ok(());
    }

    if topic == TOPIC_SENSOR_READING {
        let reading = sync::decode_reading(payload).context("invalid sensor reading")?;
        app_state.sensor.update(reading);
        return Ok(());
    }

    match sync::decode(topic, payload) {
        Ok(Some(command)) => {
            debug!(?command, "hub command");
            let mut controller = app_state.controller.lock().await;
            controller.drive(|engine| engine.handle_command(command));
        }
        Ok(None) => debug!("no-op hub message on {topic}"),
        Err(err) => warn!("ignoring hub message on {topic}: {err}"),
    }
    Ok(())
}

async fn status_view(state: &AppState) -> StatusView {
    let last_reading_at = state.sensor.last_received_at();
    let controller = state.controller.lock().await;
    let engine = &controller.engine;
    let guard = engine.cycle_guard();

    StatusView {
        state: engine.snapshot(),
        cycle_remaining_secs: guard.remaining_secs,
        change_pending: guard.change_was_suppressed,
        pending_manual: engine.pending_manual().map(|command| command.as_str()),
        last_reading_at,
    }
}

async fn handle_get_status(State(state): State<AppState>) -> impl IntoResponse {
    Json(status_view(&state).await)
}

async fn handle_set_mode(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    let Some(value) = params.get("value") else {
        return error_response(StatusCode::BAD_REQUEST, "Missing 'value' parameter");
    };
    let Some(mode) = OperatingMode::from_hub(value) else {
        return error_response(
            StatusCode::BAD_REQUEST,
            "Invalid mode. Use off, auto, manual, heat, cool or fan_only",
        );
    };

    state
        .controller
        .lock()
        .await
        .drive(|engine| engine.set_mode(mode));
    handle_get_status(State(state)).await.into_response()
}

async fn handle_advance_mode(State(state): State<AppState>) -> impl IntoResponse {
    state
        .controller
        .lock()
        .await
        .drive(|engine| engine.advance_mode());
    handle_get_status(State(state)).await.into_response()
}

async fn handle_set_target(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    let Some(value) = params.get("value") else {
        return error_response(StatusCode::BAD_REQUEST, "Missing 'value' parameter");
    };
    let Some(target) = value.parse::<f32>().ok().filter(|target| target.is_finite()) else {
        return error_response(StatusCode::BAD_REQUEST, "Invalid temperature value");
    };

    state
        .controller
        .lock()
        .await
        .drive(|engine| engine.set_target_from_ui(target));
    handle_get_status(State(state)).await.into_response()
}

async fn handle_manual_button(
    State(state): State<AppState>,
    Path(appliance): Path<String>,
) -> impl IntoResponse {
    let Some(appliance) = Appliance::parse(&appliance) else {
        return error_response(
            StatusCode::BAD_REQUEST,
            "Unknown appliance. Use heat, cool or fan",
        );
    };

    {
        let mut controller = state.controller.lock().await;
        if controller.engine.mode() != OperatingMode::Manual {
            return error_response(
                StatusCode::CONFLICT,
                "Manual control requires manual mode",
            );
        }
        controller.drive(|engine| engine.manual_button_pressed(appliance));
    }
    handle_get_status(State(state)).await.into_response()
}

async fn handle_force_off(State(state): State<AppState>) -> impl IntoResponse {
    state
        .controller
        .lock()
        .await
        .drive(|engine| engine.force_off());
    handle_get_status(State(state)).await.into_response()
}

fn error_response(status: StatusCode, message: &str) -> axum::response::Response {
    (
        status,
        Json(ErrorBody {
            error: message.to_string(),
        }),
    )
        .into_response()
}
