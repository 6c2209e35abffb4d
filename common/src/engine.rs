use tracing::{debug, info, warn};

use crate::{
    config::ClimateConfig,
    display::{action_label, ApplianceColors, DisplayState},
    error::SensorError,
    evaluator::{arbitrate_manual, decide, Tolerances},
    ports::SensorSource,
    sync::InboundCommand,
    types::{
        Action, Appliance, ApplianceState, AvailabilityChannel, ControlSetpoint, CycleGuard,
        HvacAction, ManualCommand, OperatingMode, StateSnapshot,
    },
};

/// Side effects produced by the engine, in the order they must be emitted.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineOutput {
    Relay { appliance: Appliance, on: bool },
    ApplianceAction { appliance: Appliance, on: bool },
    HvacAction(HvacAction),
    ModeState(OperatingMode),
    TargetState(f32),
    FullState(StateSnapshot),
    Availability {
        channel: AvailabilityChannel,
        online: bool,
    },
    Registration,
    Display(DisplayState),
}

/// Single-zone decision engine. Owns every piece of control state; callers
/// serialize access to it and route the returned outputs to their sinks.
#[derive(Debug)]
pub struct ClimateEngine<S> {
    config: ClimateConfig,
    sensor: S,

    mode: OperatingMode,
    appliances: ApplianceState,
    setpoint: ControlSetpoint,
    guard: CycleGuard,
    manual: Option<ManualCommand>,

    humidity: Option<f32>,
    pressure: Option<f32>,
    sensor_online: Option<bool>,
    has_reading: bool,
}

impl<S: SensorSource> ClimateEngine<S> {
    pub fn new(mut config: ClimateConfig, sensor: S) -> Self {
        config.sanitize();
        let target = config.default_target;
        Self {
            config,
            sensor,
            mode: OperatingMode::Off,
            appliances: ApplianceState::default(),
            setpoint: ControlSetpoint {
                target,
                actual: 0.0,
            },
            guard: CycleGuard::default(),
            manual: None,
            humidity: None,
            pressure: None,
            sensor_online: None,
            has_reading: false,
        }
    }

    pub fn config(&self) -> &ClimateConfig {
        &self.config
    }

    pub fn mode(&self) -> OperatingMode {
        self.mode
    }

    pub fn appliances(&self) -> ApplianceState {
        self.appliances
    }

    pub fn setpoint(&self) -> ControlSetpoint {
        self.setpoint
    }

    pub fn cycle_guard(&self) -> CycleGuard {
        self.guard
    }

    pub fn pending_manual(&self) -> Option<ManualCommand> {
        self.manual
    }

    pub fn hvac_action(&self) -> HvacAction {
        self.appliances.hvac_action()
    }

    pub fn sensor_mut(&mut self) -> &mut S {
        &mut self.sensor
    }

    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            temperature: self.setpoint.actual,
            humidity: self.humidity,
            pressure: self.pressure,
            target: self.setpoint.target,
            mode: self.mode,
            action: self.hvac_action(),
            heating: self.appliances.heating(),
            cooling: self.appliances.cooling(),
            fan: self.appliances.fan(),
        }
    }

    pub fn display_state(&self) -> DisplayState {
        DisplayState {
            mode: self.mode,
            action_label: action_label(self.mode, &self.appliances),
            target: self.setpoint.target,
            actual: self
                .setpoint
                .actual
                .clamp(self.config.min_temp, self.config.max_temp),
            colors: ApplianceColors::for_state(&self.appliances),
            blink_pending: self.guard.change_was_suppressed,
        }
    }

    /// Decides the next action from the current state without sampling the
    /// sensor. In `Manual` mode the queued command is consumed.
    pub fn evaluate(&mut self) -> Action {
        match self.mode {
            OperatingMode::Manual => arbitrate_manual(self.manual.take(), &self.appliances),
            mode => decide(
                mode,
                self.setpoint,
                &self.appliances,
                Tolerances {
                    cold: self.config.cold_tolerance,
                    heat: self.config.heat_tolerance,
                },
            ),
        }
    }

    /// Applies one action, unless the cycle guard is running, in which case
    /// the change is recorded as suppressed and the display told to blink.
    pub fn apply_action(&mut self, action: Action) -> Vec<EngineOutput> {
        let mut outputs = Vec::new();
        let Some((appliance, on)) = action.target() else {
            return outputs;
        };

        if self.guard_active() {
            self.guard.change_was_suppressed = true;
            debug!(
                ?action,
                remaining_secs = self.guard.remaining_secs,
                "cycle guard active, deferring change"
            );
            outputs.push(EngineOutput::Display(self.display_state()));
            return outputs;
        }

        self.guard.change_was_suppressed = false;

        if on {
            for other in Appliance::ALL {
                if other != appliance {
                    self.switch_appliance(other, false, &mut outputs);
                }
            }
        }
        self.switch_appliance(appliance, on, &mut outputs);

        if !outputs.is_empty() {
            info!(?action, mode = self.mode.as_str(), "applied action");
            self.guard.remaining_secs = self.config.min_cycle_secs;
        }

        outputs.push(EngineOutput::Display(self.display_state()));
        outputs
    }

    /// One-second clock. Re-evaluates only when the countdown hits zero with
    /// a deferred change waiting.
    pub fn tick_second(&mut self) -> Vec<EngineOutput> {
        if self.guard.remaining_secs == 0 {
            return Vec::new();
        }
        self.guard.remaining_secs -= 1;
        if self.guard.remaining_secs > 0 {
            return Vec::new();
        }
        if !std::mem::take(&mut self.guard.change_was_suppressed) {
            return Vec::new();
        }

        info!("cycle guard expired with a deferred change, re-evaluating");
        let mut outputs = self.run_evaluation();
        self.notify_display(&mut outputs);
        outputs
    }

    /// Update tick: resample, re-evaluate and publish the combined state.
    /// The combined state is held back until a first reading has arrived.
    pub fn periodic_update(&mut self) -> Vec<EngineOutput> {
        let mut outputs = self.run_evaluation();
        self.push_full_state(&mut outputs);
        self.notify_display(&mut outputs);
        outputs
    }

    /// Samples the sensor, then decides and applies at most one action. A
    /// failed read keeps the last known temperature and skips the decision in
    /// modes that need it; `Off` and `Manual` still act.
    pub fn run_evaluation(&mut self) -> Vec<EngineOutput> {
        let mut outputs = Vec::new();

        let sampled = self.sample_sensor();
        let online = sampled.is_ok();
        if self.sensor_online != Some(online) {
            self.sensor_online = Some(online);
            outputs.push(EngineOutput::Availability {
                channel: AvailabilityChannel::Sensors,
                online,
            });
        }
        if let Err(err) = sampled {
            if self.mode.uses_temperature() {
                warn!("sensor read failed, skipping evaluation: {err}");
                return outputs;
            }
            warn!(mode = self.mode.as_str(), "sensor read failed: {err}");
        }

        let queued = self.manual;
        let action = self.evaluate();
        if action == Action::None {
            return outputs;
        }

        outputs.extend(self.apply_action(action));

        // A manual command held back by the guard is retried on expiry.
        if self.guard.change_was_suppressed && self.mode == OperatingMode::Manual {
            self.manual = queued;
        }
        outputs
    }

    pub fn handle_command(&mut self, command: InboundCommand) -> Vec<EngineOutput> {
        match command {
            InboundCommand::SetMode(mode) => self.set_mode(mode),
            InboundCommand::SetTarget(value) => self.set_target(value),
            InboundCommand::ManualSwitch { appliance, on } => {
                self.set_manual_switch(appliance, on)
            }
            InboundCommand::ForceOff => self.force_off(),
            InboundCommand::Resync => self.request_resync(),
        }
    }

    pub fn set_mode(&mut self, mode: OperatingMode) -> Vec<EngineOutput> {
        if self.mode != mode {
            info!(from = self.mode.as_str(), to = mode.as_str(), "mode changed");
        }
        self.mode = mode;
        if mode != OperatingMode::Manual {
            self.manual = None;
        }

        let mut outputs = vec![EngineOutput::ModeState(mode)];
        outputs.extend(self.run_evaluation());
        self.notify_display(&mut outputs);
        outputs
    }

    pub fn advance_mode(&mut self) -> Vec<EngineOutput> {
        self.set_mode(self.mode.next())
    }

    /// Non-finite values are dropped without touching state.
    pub fn set_target(&mut self, value: f32) -> Vec<EngineOutput> {
        if !value.is_finite() {
            warn!("ignoring non-finite target {value}");
            return Vec::new();
        }

        let target = self.config.clamp_target(value);
        self.setpoint.target = target;

        let mut outputs = vec![EngineOutput::TargetState(target)];
        outputs.extend(self.run_evaluation());
        self.notify_display(&mut outputs);
        outputs
    }

    pub fn set_target_from_ui(&mut self, value: f32) -> Vec<EngineOutput> {
        self.set_target(value)
    }

    /// A direct appliance command always promotes the engine into `Manual`.
    pub fn set_manual_switch(&mut self, appliance: Appliance, on: bool) -> Vec<EngineOutput> {
        let mut outputs = Vec::new();
        if self.mode != OperatingMode::Manual {
            info!(from = self.mode.as_str(), "switch command, entering manual mode");
            self.mode = OperatingMode::Manual;
            outputs.push(EngineOutput::ModeState(OperatingMode::Manual));
        }

        self.manual = Some(ManualCommand { appliance, on });
        outputs.extend(self.run_evaluation());
        self.notify_display(&mut outputs);
        outputs
    }

    /// Local toggle button; ignored outside `Manual` mode.
    pub fn manual_button_pressed(&mut self, appliance: Appliance) -> Vec<EngineOutput> {
        if self.mode != OperatingMode::Manual {
            debug!(
                appliance = appliance.as_str(),
                "manual button ignored outside manual mode"
            );
            return Vec::new();
        }
        let on = !self.appliances.is_on(appliance);
        self.set_manual_switch(appliance, on)
    }

    pub fn force_off(&mut self) -> Vec<EngineOutput> {
        info!("master off");
        self.set_mode(OperatingMode::Off)
    }

    /// Republishes registration, availability and the full current state.
    pub fn request_resync(&mut self) -> Vec<EngineOutput> {
        let mut outputs = vec![
            EngineOutput::Registration,
            EngineOutput::Availability {
                channel: AvailabilityChannel::Hvac,
                online: true,
            },
            EngineOutput::Availability {
                channel: AvailabilityChannel::Sensors,
                online: self.sensor_online.unwrap_or(false),
            },
            EngineOutput::ModeState(self.mode),
            EngineOutput::TargetState(self.setpoint.target),
        ];
        for appliance in Appliance::ALL {
            outputs.push(EngineOutput::ApplianceAction {
                appliance,
                on: self.appliances.is_on(appliance),
            });
        }
        outputs.push(EngineOutput::HvacAction(self.hvac_action()));
        self.push_full_state(&mut outputs);
        outputs
    }

    fn guard_active(&self) -> bool {
        self.config.min_cycle_secs > 0 && self.guard.remaining_secs > 0
    }

    fn sample_sensor(&mut self) -> Result<(), SensorError> {
        let reading = self.sensor.read()?;
        if !reading.temperature.is_finite() {
            return Err(SensorError::Invalid(format!(
                "temperature {}",
                reading.temperature
            )));
        }
        self.setpoint.actual = reading.temperature;
        self.has_reading = true;
        self.humidity = reading.humidity;
        self.pressure = reading.pressure;
        Ok(())
    }

    fn switch_appliance(&mut self, appliance: Appliance, on: bool, outputs: &mut Vec<EngineOutput>) {
        if self.appliances.is_on(appliance) == on {
            return;
        }
        self.appliances.set(appliance, on);

        let reported = if on {
            appliance.running_action()
        } else {
            HvacAction::Idle
        };
        outputs.push(EngineOutput::Relay { appliance, on });
        outputs.push(EngineOutput::ApplianceAction { appliance, on });
        outputs.push(EngineOutput::HvacAction(reported));
    }

    fn push_full_state(&self, outputs: &mut Vec<EngineOutput>) {
        if self.has_reading {
            outputs.push(EngineOutput::FullState(self.snapshot()));
        }
    }

    fn notify_display(&self, outputs: &mut Vec<EngineOutput>) {
        let notified = outputs
            .iter()
            .any(|output| matches!(output, EngineOutput::Display(_)));
        if !notified {
            outputs.push(EngineOutput::Display(self.display_state()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[derive(Debug, Default)]
    struct FakeSensor {
        temperature: Option<f32>,
    }

    impl SensorSource for FakeSensor {
        fn read(&mut self) -> Result<crate::types::SensorReading, SensorError> {
            self.temperature
                .map(|temperature| crate::types::SensorReading {
                    temperature,
                    humidity: Some(45.0),
                    pressure: Some(1013.0),
                })
                .ok_or(SensorError::NoReading)
        }
    }

    fn engine(min_cycle_secs: u32, cold_tolerance: f32) -> ClimateEngine<FakeSensor> {
        let config = ClimateConfig {
            min_cycle_secs,
            cold_tolerance,
            heat_tolerance: 0.5,
            ..ClimateConfig::default()
        };
        ClimateEngine::new(config, FakeSensor::default())
    }

    fn relays(outputs: &[EngineOutput]) -> Vec<(Appliance, bool)> {
        outputs
            .iter()
            .filter_map(|output| match output {
                EngineOutput::Relay { appliance, on } => Some((*appliance, *on)),
                _ => None,
            })
            .collect()
    }

    fn hvac_actions(outputs: &[EngineOutput]) -> Vec<HvacAction> {
        outputs
            .iter()
            .filter_map(|output| match output {
                EngineOutput::HvacAction(action) => Some(*action),
                _ => None,
            })
            .collect()
    }

    fn last_display(outputs: &[EngineOutput]) -> Option<&DisplayState> {
        outputs.iter().rev().find_map(|output| match output {
            EngineOutput::Display(state) => Some(state),
            _ => None,
        })
    }

    fn assert_exclusive(engine: &ClimateEngine<FakeSensor>) {
        let state = engine.appliances();
        let running = [state.heating(), state.cooling(), state.fan()]
            .iter()
            .filter(|on| **on)
            .count();
        assert!(running <= 1, "more than one appliance running: {state:?}");
    }

    #[test]
    fn starts_off_idle_with_default_target() {
        let engine = engine(300, 0.5);

        assert_eq!(engine.mode(), OperatingMode::Off);
        assert_eq!(engine.appliances(), ApplianceState::default());
        assert_eq!(engine.setpoint().target, 20.0);
        assert_eq!(engine.cycle_guard(), CycleGuard::default());
        assert_eq!(engine.pending_manual(), None);
    }

    #[test]
    fn auto_heats_below_target_and_stops_at_target() {
        let mut engine = engine(0, 0.0);
        engine.sensor_mut().temperature = Some(19.5);

        let outputs = engine.set_mode(OperatingMode::Auto);
        assert_eq!(relays(&outputs), vec![(Appliance::Heat, true)]);
        assert_eq!(hvac_actions(&outputs), vec![HvacAction::Heating]);
        assert!(engine.appliances().heating());

        engine.sensor_mut().temperature = Some(20.0);
        let outputs = engine.run_evaluation();
        assert_eq!(relays(&outputs), vec![(Appliance::Heat, false)]);
        assert_eq!(hvac_actions(&outputs), vec![HvacAction::Idle]);
        assert!(!engine.appliances().heating());
    }

    #[test]
    fn on_action_clears_other_appliances_first() {
        let mut engine = engine(0, 0.5);
        engine.sensor_mut().temperature = Some(20.0);
        engine.set_manual_switch(Appliance::Heat, true);
        assert!(engine.appliances().heating());

        let outputs = engine.apply_action(Action::FanOn);

        assert_eq!(
            relays(&outputs),
            vec![(Appliance::Heat, false), (Appliance::Fan, true)]
        );
        assert_eq!(
            hvac_actions(&outputs),
            vec![HvacAction::Idle, HvacAction::Fan]
        );
        assert!(engine.appliances().fan());
        assert_exclusive(&engine);
    }

    #[test]
    fn stale_action_changes_nothing_and_keeps_guard_idle() {
        let mut engine = engine(60, 0.5);

        let outputs = engine.apply_action(Action::HeatOff);

        assert!(relays(&outputs).is_empty());
        assert_eq!(engine.cycle_guard().remaining_secs, 0);
    }

    #[test]
    fn applied_action_arms_guard_and_suppresses_followups() {
        let mut engine = engine(10, 0.5);
        engine.sensor_mut().temperature = Some(18.0);
        engine.set_mode(OperatingMode::Heat);
        assert!(engine.appliances().heating());
        assert_eq!(engine.cycle_guard().remaining_secs, 10);

        let before = engine.appliances();
        for _ in 0..3 {
            let outputs = engine.apply_action(Action::CoolOn);
            assert!(relays(&outputs).is_empty());
            assert!(last_display(&outputs).unwrap().blink_pending);
        }
        assert_eq!(engine.appliances(), before);
        assert!(engine.cycle_guard().change_was_suppressed);
    }

    #[test]
    fn guard_expiry_without_pending_change_is_quiet() {
        let mut engine = engine(3, 0.5);
        engine.sensor_mut().temperature = Some(18.0);
        engine.set_mode(OperatingMode::Heat);

        let mut emitted = Vec::new();
        for _ in 0..5 {
            emitted.extend(engine.tick_second());
        }

        assert!(emitted.is_empty());
        assert_eq!(engine.cycle_guard().remaining_secs, 0);
        assert!(engine.appliances().heating());
    }

    #[test]
    fn deferred_change_applies_when_guard_expires() {
        let mut engine = engine(10, 0.5);
        engine.sensor_mut().temperature = Some(18.0);
        engine.set_mode(OperatingMode::Auto);
        assert!(engine.appliances().heating());

        engine.sensor_mut().temperature = Some(20.2);
        let outputs = engine.run_evaluation();
        assert!(relays(&outputs).is_empty());
        assert!(engine.cycle_guard().change_was_suppressed);

        for _ in 0..9 {
            assert!(engine.tick_second().is_empty());
            assert!(engine.appliances().heating());
        }

        let outputs = engine.tick_second();
        assert_eq!(relays(&outputs), vec![(Appliance::Heat, false)]);
        assert!(!engine.appliances().heating());
        assert!(!engine.cycle_guard().change_was_suppressed);
        assert_eq!(engine.cycle_guard().remaining_secs, 10);
        assert!(!last_display(&outputs).unwrap().blink_pending);
    }

    #[test]
    fn zero_cycle_applies_every_action_immediately() {
        let mut engine = engine(0, 0.5);
        engine.sensor_mut().temperature = Some(18.0);
        engine.set_mode(OperatingMode::Manual);

        for appliance in [Appliance::Heat, Appliance::Cool, Appliance::Fan, Appliance::Heat] {
            let outputs = engine.set_manual_switch(appliance, true);
            assert!(relays(&outputs).contains(&(appliance, true)));
            assert!(engine.appliances().is_on(appliance));
            assert!(!engine.cycle_guard().change_was_suppressed);
            assert_exclusive(&engine);
        }
        assert_eq!(engine.cycle_guard().remaining_secs, 0);
    }

    #[test]
    fn evaluate_is_idempotent_when_nothing_changes() {
        let mut engine = engine(0, 0.5);
        engine.sensor_mut().temperature = Some(18.0);
        engine.set_mode(OperatingMode::Auto);
        assert!(engine.appliances().heating());

        for _ in 0..5 {
            assert_eq!(engine.evaluate(), Action::None);
        }
    }

    #[test]
    fn force_off_turns_heat_off_regardless_of_temperature() {
        let mut engine = engine(0, 0.5);
        engine.sensor_mut().temperature = Some(10.0);
        engine.set_mode(OperatingMode::Heat);
        assert!(engine.appliances().heating());

        let outputs = engine.force_off();

        assert_eq!(outputs.first(), Some(&EngineOutput::ModeState(OperatingMode::Off)));
        assert_eq!(relays(&outputs), vec![(Appliance::Heat, false)]);
        assert_eq!(engine.mode(), OperatingMode::Off);
        assert_eq!(engine.appliances(), ApplianceState::default());
    }

    #[test]
    fn off_mode_with_guard_running_defers_shutdown() {
        let mut engine = engine(5, 0.5);
        engine.sensor_mut().temperature = Some(10.0);
        engine.set_mode(OperatingMode::Heat);

        engine.force_off();
        assert!(engine.appliances().heating());
        assert!(engine.cycle_guard().change_was_suppressed);

        let mut outputs = Vec::new();
        for _ in 0..5 {
            outputs.extend(engine.tick_second());
        }
        assert_eq!(relays(&outputs), vec![(Appliance::Heat, false)]);
        assert!(!engine.appliances().heating());
    }

    #[test]
    fn sensor_failure_keeps_last_temperature_and_skips_decision() {
        let mut engine = engine(0, 0.5);
        engine.sensor_mut().temperature = Some(22.0);
        engine.set_mode(OperatingMode::Off);
        assert_eq!(engine.setpoint().actual, 22.0);

        engine.sensor_mut().temperature = None;
        let outputs = engine.set_mode(OperatingMode::Cool);

        assert_eq!(engine.setpoint().actual, 22.0);
        assert!(relays(&outputs).is_empty());
        assert!(outputs.contains(&EngineOutput::Availability {
            channel: AvailabilityChannel::Sensors,
            online: false,
        }));

        engine.sensor_mut().temperature = Some(22.0);
        let outputs = engine.periodic_update();
        assert_eq!(relays(&outputs), vec![(Appliance::Cool, true)]);
        assert!(outputs.contains(&EngineOutput::Availability {
            channel: AvailabilityChannel::Sensors,
            online: true,
        }));
    }

    #[test]
    fn off_mode_shuts_down_without_a_sensor() {
        let mut engine = engine(0, 0.5);
        engine.sensor_mut().temperature = Some(12.0);
        engine.set_mode(OperatingMode::Heat);
        assert!(engine.appliances().heating());

        engine.sensor_mut().temperature = None;
        let outputs = engine.force_off();

        assert_eq!(relays(&outputs), vec![(Appliance::Heat, false)]);
        assert_eq!(engine.appliances(), ApplianceState::default());
        assert_eq!(engine.setpoint().actual, 12.0);
    }

    #[test]
    fn manual_switch_applies_without_a_sensor() {
        let mut engine = engine(0, 0.5);

        let outputs = engine.set_manual_switch(Appliance::Heat, true);

        assert_eq!(relays(&outputs), vec![(Appliance::Heat, true)]);
        assert!(engine.appliances().heating());
        assert_eq!(engine.pending_manual(), None);
    }

    #[test]
    fn combined_state_waits_for_first_reading() {
        let mut engine = engine(0, 0.5);

        let full_state = |outputs: &[EngineOutput]| {
            outputs
                .iter()
                .any(|output| matches!(output, EngineOutput::FullState(_)))
        };
        assert!(!full_state(&engine.request_resync()));
        assert!(!full_state(&engine.periodic_update()));

        engine.sensor_mut().temperature = Some(19.0);
        assert!(full_state(&engine.periodic_update()));

        engine.sensor_mut().temperature = None;
        assert!(full_state(&engine.periodic_update()));
        assert!(full_state(&engine.request_resync()));
    }

    #[test]
    fn off_display_shows_heat_still_held_by_guard() {
        let mut engine = engine(5, 0.5);
        engine.sensor_mut().temperature = Some(10.0);
        engine.set_mode(OperatingMode::Heat);

        let outputs = engine.force_off();
        let display = last_display(&outputs).unwrap();

        assert_eq!(display.mode, OperatingMode::Off);
        assert_eq!(display.action_label, "Heating");
        assert!(display.blink_pending);
    }

    #[test]
    fn target_is_rounded_clamped_and_echoed() {
        let mut engine = engine(0, 0.5);

        let outputs = engine.set_target(30.2);
        assert_eq!(outputs.first(), Some(&EngineOutput::TargetState(25.0)));
        assert_eq!(engine.setpoint().target, 25.0);

        engine.set_target_from_ui(17.6);
        assert_eq!(engine.setpoint().target, 18.0);
    }

    #[test]
    fn non_finite_target_is_ignored() {
        let mut engine = engine(0, 0.5);
        engine.set_target(22.0);

        assert!(engine.set_target(f32::NAN).is_empty());
        assert!(engine.set_target(f32::INFINITY).is_empty());
        assert_eq!(engine.setpoint().target, 22.0);
    }

    #[test]
    fn switch_command_promotes_to_manual() {
        let mut engine = engine(0, 0.5);
        engine.sensor_mut().temperature = Some(20.0);
        engine.set_mode(OperatingMode::Auto);

        let outputs = engine.set_manual_switch(Appliance::Cool, true);

        assert_eq!(outputs.first(), Some(&EngineOutput::ModeState(OperatingMode::Manual)));
        assert_eq!(engine.mode(), OperatingMode::Manual);
        assert!(engine.appliances().cooling());
        assert_eq!(engine.pending_manual(), None);
    }

    #[test]
    fn manual_command_survives_guard_and_applies_on_expiry() {
        let mut engine = engine(2, 0.5);
        engine.sensor_mut().temperature = Some(20.0);
        engine.set_manual_switch(Appliance::Heat, true);
        assert!(engine.appliances().heating());

        engine.set_manual_switch(Appliance::Heat, false);
        assert!(engine.appliances().heating());
        assert_eq!(
            engine.pending_manual(),
            Some(ManualCommand {
                appliance: Appliance::Heat,
                on: false
            })
        );

        engine.tick_second();
        let outputs = engine.tick_second();
        assert_eq!(relays(&outputs), vec![(Appliance::Heat, false)]);
        assert_eq!(engine.pending_manual(), None);
    }

    #[test]
    fn manual_button_toggles_only_in_manual_mode() {
        let mut engine = engine(0, 0.5);
        engine.sensor_mut().temperature = Some(20.0);

        assert!(engine.manual_button_pressed(Appliance::Fan).is_empty());
        assert!(!engine.appliances().fan());

        engine.set_mode(OperatingMode::Manual);
        engine.manual_button_pressed(Appliance::Fan);
        assert!(engine.appliances().fan());
        engine.manual_button_pressed(Appliance::Fan);
        assert!(!engine.appliances().fan());
    }

    #[test]
    fn leaving_manual_drops_queued_command() {
        let mut engine = engine(30, 0.5);
        engine.sensor_mut().temperature = Some(20.0);
        engine.set_manual_switch(Appliance::Heat, true);
        engine.set_manual_switch(Appliance::Cool, true);
        assert!(engine.pending_manual().is_some());

        engine.set_mode(OperatingMode::Heat);
        assert_eq!(engine.pending_manual(), None);
    }

    #[test]
    fn advance_mode_cycles_and_echoes() {
        let mut engine = engine(0, 0.5);
        engine.sensor_mut().temperature = Some(20.0);

        let outputs = engine.advance_mode();
        assert_eq!(outputs.first(), Some(&EngineOutput::ModeState(OperatingMode::Auto)));

        for _ in 0..5 {
            engine.advance_mode();
        }
        assert_eq!(engine.mode(), OperatingMode::Off);
    }

    #[test]
    fn resync_republishes_everything() {
        let mut engine = engine(0, 0.5);
        engine.sensor_mut().temperature = Some(18.0);
        engine.set_mode(OperatingMode::Heat);

        let outputs = engine.request_resync();

        assert_eq!(outputs.first(), Some(&EngineOutput::Registration));
        assert!(outputs.contains(&EngineOutput::Availability {
            channel: AvailabilityChannel::Hvac,
            online: true,
        }));
        assert!(outputs.contains(&EngineOutput::ModeState(OperatingMode::Heat)));
        assert!(outputs.contains(&EngineOutput::ApplianceAction {
            appliance: Appliance::Heat,
            on: true,
        }));
        assert!(outputs.contains(&EngineOutput::HvacAction(HvacAction::Heating)));
        assert_eq!(
            outputs.last(),
            Some(&EngineOutput::FullState(engine.snapshot()))
        );
        assert!(relays(&outputs).is_empty());
    }

    #[test]
    fn periodic_update_publishes_combined_state() {
        let mut engine = engine(0, 0.5);
        engine.sensor_mut().temperature = Some(21.0);
        engine.set_target(21.0);

        let outputs = engine.periodic_update();
        let snapshot = outputs
            .iter()
            .find_map(|output| match output {
                EngineOutput::FullState(snapshot) => Some(snapshot.clone()),
                _ => None,
            })
            .unwrap();

        assert_eq!(snapshot.temperature, 21.0);
        assert_eq!(snapshot.humidity, Some(45.0));
        assert_eq!(snapshot.pressure, Some(1013.0));
        assert_eq!(snapshot.target, 21.0);
        assert_eq!(snapshot.mode, OperatingMode::Off);
        assert_eq!(snapshot.action, HvacAction::Idle);
    }

    #[test]
    fn display_clamps_actual_to_display_range() {
        let mut engine = engine(0, 0.5);
        engine.sensor_mut().temperature = Some(48.0);
        engine.run_evaluation();

        assert_eq!(engine.setpoint().actual, 48.0);
        assert_eq!(engine.display_state().actual, 35.0);
    }
}
