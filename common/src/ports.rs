//! Boundary traits between the engine and the outside world. Adapters
//! implement these; [`dispatch`] routes engine outputs to them in order.

use crate::{
    display::DisplayState,
    engine::EngineOutput,
    error::SensorError,
    types::{Appliance, AvailabilityChannel, HvacAction, OperatingMode, SensorReading, StateSnapshot},
};

pub trait SensorSource {
    fn read(&mut self) -> Result<SensorReading, SensorError>;
}

/// Physical appliance switching.
pub trait RelaySink {
    fn switch(&mut self, appliance: Appliance, on: bool);
}

/// Outbound half of the hub sync channel. Sends are fire-and-forget;
/// implementations log failures and never block.
pub trait HubPublisher {
    fn publish_appliance_action(&mut self, appliance: Appliance, on: bool);
    fn publish_hvac_action(&mut self, action: HvacAction);
    fn publish_mode(&mut self, mode: OperatingMode);
    fn publish_target(&mut self, target: f32);
    fn publish_full_state(&mut self, state: &StateSnapshot);
    fn publish_availability(&mut self, channel: AvailabilityChannel, online: bool);
    fn publish_registration(&mut self);
}

pub trait DisplayRenderer {
    fn on_display_state_changed(&mut self, state: &DisplayState);
}

pub fn dispatch<R, H, D>(outputs: &[EngineOutput], relay: &mut R, hub: &mut H, display: &mut D)
where
    R: RelaySink + ?Sized,
    H: HubPublisher + ?Sized,
    D: DisplayRenderer + ?Sized,
{
    for output in outputs {
        match output {
            EngineOutput::Relay { appliance, on } => relay.switch(*appliance, *on),
            EngineOutput::ApplianceAction { appliance, on } => {
                hub.publish_appliance_action(*appliance, *on)
            }
            EngineOutput::HvacAction(action) => hub.publish_hvac_action(*action),
            EngineOutput::ModeState(mode) => hub.publish_mode(*mode),
            EngineOutput::TargetState(target) => hub.publish_target(*target),
            EngineOutput::FullState(state) => hub.publish_full_state(state),
            EngineOutput::Availability { channel, online } => {
                hub.publish_availability(*channel, *online)
            }
            EngineOutput::Registration => hub.publish_registration(),
            EngineOutput::Display(state) => display.on_display_state_changed(state),
        }
    }
}
