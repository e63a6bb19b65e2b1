#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative simulation session for Neuroflight.
//!
//! A [`Simulation`] owns the drone, the collider registry, the chase camera
//! and the input router. Adapters mutate it exclusively through [`apply`]
//! and read it through the [`query`] module.

mod config;

use std::{sync::Arc, time::Duration};

pub use config::{ConfigError, SimulationConfig};

use neuroflight_core::{Collider, Command, Event, InputMode};
use neuroflight_system_camera::ChaseCamera;
use neuroflight_system_collision::CollisionRegistry;
use neuroflight_system_flight::FlightController;
use neuroflight_system_input::{
    CommandSlot, ExternalSource, InputRouter, InputSource, StartDebounce,
};

/// Length of one fixed simulation step.
pub const TICK: Duration = Duration::from_millis(16);

/// Most fixed steps executed for a single frame; excess time is discarded.
pub const MAX_STEPS_PER_FRAME: u32 = 5;

/// Mounted simulation session.
#[derive(Debug)]
pub struct Simulation {
    flight: FlightController,
    registry: CollisionRegistry,
    camera: ChaseCamera,
    router: InputRouter,
    accumulator: Duration,
    tick_index: u64,
}

impl Simulation {
    /// Mounts a session with the drone grounded at the origin and no colliders.
    #[must_use]
    pub fn new(config: SimulationConfig) -> Self {
        let external = ExternalSource::new(
            CommandSlot::new(),
            StartDebounce::new(config.start_hold_seconds),
        );
        let flight = FlightController::new(config.flight);
        let mut camera = ChaseCamera::new(config.camera);
        let drone = flight.state();
        camera.update(drone.position, drone.heading, 0.0);

        tracing::info!(mode = ?config.input_mode, "simulation mounted");
        Self {
            flight,
            registry: CollisionRegistry::new(),
            camera,
            router: InputRouter::new(config.input_mode, external),
            accumulator: Duration::ZERO,
            tick_index: 0,
        }
    }

    /// Handle that outside code writes external commands into.
    ///
    /// The handle stays valid for the lifetime of the session and can be
    /// written from any thread.
    #[must_use]
    pub fn command_slot(&self) -> CommandSlot {
        self.router.command_slot().clone()
    }

    fn step(&mut self, out_events: &mut Vec<Event>) {
        let dt = TICK.as_secs_f32();
        let command = self.router.poll(dt);
        let outcome = self.flight.tick(&command, &self.registry, dt, out_events);
        if outcome.took_off {
            self.router.acknowledge_start();
        }
        let drone = self.flight.state();
        self.camera.update(drone.position, drone.heading, dt);
        self.tick_index = self.tick_index.saturating_add(1);
    }

    fn install_colliders(&mut self, colliders: Arc<[Collider]>, out_events: &mut Vec<Event>) {
        let count = colliders.len();
        self.registry.install(colliders);
        out_events.push(Event::CollidersInstalled { count });
    }
}

impl Default for Simulation {
    fn default() -> Self {
        Self::new(SimulationConfig::default())
    }
}

/// Applies the provided command to the session, mutating state deterministically.
pub fn apply(simulation: &mut Simulation, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::Tick { dt } => {
            simulation.accumulator = simulation.accumulator.saturating_add(dt);
            let mut ticks = 0;
            while simulation.accumulator >= TICK && ticks < MAX_STEPS_PER_FRAME {
                simulation.accumulator -= TICK;
                simulation.step(out_events);
                ticks += 1;
            }
            if simulation.accumulator >= TICK {
                tracing::debug!(
                    dropped = ?simulation.accumulator,
                    "frame overran the step budget"
                );
                simulation.accumulator = Duration::ZERO;
            }
            if ticks > 0 {
                out_events.push(Event::TimeAdvanced {
                    dt: TICK * ticks,
                    ticks,
                });
            }
        }
        Command::SetKeyboard { state } => {
            let keyboard = simulation.router.keyboard_mut();
            keyboard.set_state(state);
            let edges = keyboard.take_edges();
            if edges.restart {
                simulation.flight.start_motors(out_events);
            }
            if edges.cut {
                simulation.flight.cut_motors(out_events);
            }
        }
        Command::SetInputMode { mode } => {
            if simulation.router.set_mode(mode) {
                out_events.push(Event::InputModeChanged { mode });
            }
        }
        Command::StartMotors => simulation.flight.start_motors(out_events),
        Command::CutMotors => simulation.flight.cut_motors(out_events),
        Command::InstallColliders { colliders } => {
            simulation.install_colliders(colliders, out_events);
        }
        Command::SetGroundContact { height } => {
            let previous = simulation.flight.ground_height();
            simulation.flight.set_ground_contact(height, out_events);
            let current = simulation.flight.ground_height();
            if current != previous {
                out_events.push(Event::GroundContactChanged { height: current });
            }
        }
    }
}

/// Read-only accessors over a [`Simulation`].
pub mod query {
    use neuroflight_core::{Collider, FlightPhase, InputMode};
    use neuroflight_system_camera::CameraPose;
    use neuroflight_system_flight::DroneState;
    use neuroflight_system_input::CommandSlot;

    use super::Simulation;

    /// Current drone state.
    #[must_use]
    pub fn drone(simulation: &Simulation) -> &DroneState {
        simulation.flight.state()
    }

    /// Current flight phase.
    #[must_use]
    pub fn flight_phase(simulation: &Simulation) -> FlightPhase {
        simulation.flight.phase()
    }

    /// Height at which the drone touches the ground.
    #[must_use]
    pub fn ground_height(simulation: &Simulation) -> f32 {
        simulation.flight.ground_height()
    }

    /// Current camera pose.
    #[must_use]
    pub fn camera_pose(simulation: &Simulation) -> CameraPose {
        simulation.camera.pose()
    }

    /// Source currently driving the drone.
    #[must_use]
    pub fn input_mode(simulation: &Simulation) -> InputMode {
        simulation.router.mode()
    }

    /// Number of colliders in the active list.
    #[must_use]
    pub fn collider_count(simulation: &Simulation) -> usize {
        simulation.registry.len()
    }

    /// Whether the generated collider list has been installed.
    #[must_use]
    pub fn colliders_ready(simulation: &Simulation) -> bool {
        simulation.registry.is_ready()
    }

    /// Active collider list.
    #[must_use]
    pub fn colliders(simulation: &Simulation) -> &[Collider] {
        simulation.registry.colliders()
    }

    /// Shared slot for the external command feed.
    #[must_use]
    pub fn command_slot(simulation: &Simulation) -> CommandSlot {
        simulation.command_slot()
    }

    /// Number of fixed steps executed since the session was mounted.
    #[must_use]
    pub fn tick_index(simulation: &Simulation) -> u64 {
        simulation.tick_index
    }
}

/// Convenience used by adapters that switch sources from a user toggle.
#[must_use]
pub fn toggled(mode: InputMode) -> InputMode {
    match mode {
        InputMode::Keyboard => InputMode::External,
        InputMode::External => InputMode::Keyboard,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use neuroflight_core::{FlightPhase, KeyboardState};

    #[test]
    fn tick_runs_whole_fixed_steps_and_carries_remainder() {
        let mut simulation = Simulation::default();
        let mut events = Vec::new();

        apply(
            &mut simulation,
            Command::Tick {
                dt: Duration::from_millis(40),
            },
            &mut events,
        );
        assert_eq!(query::tick_index(&simulation), 2);
        assert_eq!(
            events,
            vec![Event::TimeAdvanced {
                dt: Duration::from_millis(32),
                ticks: 2,
            }]
        );

        events.clear();
        apply(
            &mut simulation,
            Command::Tick {
                dt: Duration::from_millis(10),
            },
            &mut events,
        );
        assert_eq!(query::tick_index(&simulation), 3);
    }

    #[test]
    fn long_frames_are_capped() {
        let mut simulation = Simulation::default();
        let mut events = Vec::new();
        apply(
            &mut simulation,
            Command::Tick {
                dt: Duration::from_secs(2),
            },
            &mut events,
        );
        assert_eq!(query::tick_index(&simulation), u64::from(MAX_STEPS_PER_FRAME));

        apply(&mut simulation, Command::Tick { dt: Duration::ZERO }, &mut events);
        assert_eq!(query::tick_index(&simulation), u64::from(MAX_STEPS_PER_FRAME));
    }

    #[test]
    fn motor_keys_act_on_press_only() {
        let mut simulation = Simulation::default();
        let mut events = Vec::new();
        let held_f = KeyboardState {
            f: true,
            ..KeyboardState::default()
        };

        apply(&mut simulation, Command::SetKeyboard { state: held_f }, &mut events);
        assert_eq!(query::flight_phase(&simulation), FlightPhase::Lifting);

        apply(&mut simulation, Command::CutMotors, &mut events);
        apply(&mut simulation, Command::SetKeyboard { state: held_f }, &mut events);
        assert_eq!(query::flight_phase(&simulation), FlightPhase::Grounded);
    }

    #[test]
    fn installing_colliders_marks_registry_ready() {
        let mut simulation = Simulation::default();
        let mut events = Vec::new();
        apply(
            &mut simulation,
            Command::InstallColliders {
                colliders: Arc::from(Vec::new()),
            },
            &mut events,
        );

        assert!(query::colliders_ready(&simulation));
        assert_eq!(events, vec![Event::CollidersInstalled { count: 0 }]);
    }

    #[test]
    fn ground_contact_change_is_reported_once() {
        let mut simulation = Simulation::default();
        let mut events = Vec::new();
        apply(&mut simulation, Command::SetGroundContact { height: 0.3 }, &mut events);
        apply(&mut simulation, Command::SetGroundContact { height: 0.3 }, &mut events);

        assert_eq!(events, vec![Event::GroundContactChanged { height: 0.3 }]);
        assert_eq!(query::drone(&simulation).position.y, 0.3);
    }

    #[test]
    fn toggling_flips_between_sources() {
        assert_eq!(toggled(InputMode::Keyboard), InputMode::External);
        assert_eq!(toggled(toggled(InputMode::Keyboard)), InputMode::Keyboard);
    }
}
