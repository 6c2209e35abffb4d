pub mod config;
pub mod display;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod ports;
pub mod sync;
pub mod topics;
pub mod types;

pub use config::{ClimateConfig, NetworkConfig, RuntimeConfig};
pub use display::{ApplianceColors, DisplayState};
pub use engine::{ClimateEngine, EngineOutput};
pub use error::{ConfigError, DecodeError, SensorError};
pub use ports::{dispatch, DisplayRenderer, HubPublisher, RelaySink, SensorSource};
pub use sync::InboundCommand;
pub use topics::*;
pub use types::{
    Action, Appliance, ApplianceState, AvailabilityChannel, ControlSetpoint, CycleGuard,
    HvacAction, ManualCommand, OperatingMode, SensorReading, StateSnapshot,
};
