#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Flight controller that advances the drone state machine one tick at a time.
//!
//! The controller owns the drone's kinematic state and exposes three entry
//! points: [`FlightController::tick`] for per-tick integration, and
//! [`FlightController::start_motors`] / [`FlightController::cut_motors`] for
//! the edge-triggered motor keys. Every tick ends clamped to the flyable
//! volume, and the reported [`FlightPhase`] is always derived from the state
//! after the tick.

mod config;

pub use config::FlightConfig;

use glam::Vec3;
use neuroflight_core::{Event, FlightPhase, InputCommand};
use neuroflight_system_collision::CollisionRegistry;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Snapshot of the drone's kinematic and cosmetic state.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DroneState {
    /// World-space centre of the drone body.
    pub position: Vec3,
    /// Displacement applied per tick.
    pub velocity: Vec3,
    /// Rotation about the vertical axis in radians.
    pub heading: f32,
    /// Body tilt about the X axis.
    pub pitch: f32,
    /// Body tilt about the Z axis.
    pub roll: f32,
    /// Whether the motors are powered.
    pub motors_on: bool,
    /// Height the takeoff climb is heading for, if one is in progress.
    pub lift_target: Option<f32>,
    /// Normalised rotor speed in `[0, 1]`.
    pub propeller_speed: f32,
    /// Accumulated rotor angle in radians.
    pub rotor_angle: f32,
    /// Seconds since the session started, drives the hover wobble.
    pub hover_time: f32,
    /// Seconds spent in the current fall, drives the fall acceleration.
    pub sink_time: f32,
    /// Whether the current fall already rebounded once.
    pub bounced_this_fall: bool,
    /// Pitch the drone settles into after a landing.
    pub landing_pitch: f32,
    /// Roll the drone settles into after a landing.
    pub landing_roll: f32,
}

impl DroneState {
    /// Drone resting at `ground` on the origin, motors off.
    #[must_use]
    pub fn grounded_at(ground: f32) -> Self {
        Self {
            position: Vec3::new(0.0, ground, 0.0),
            velocity: Vec3::ZERO,
            heading: 0.0,
            pitch: 0.0,
            roll: 0.0,
            motors_on: false,
            lift_target: None,
            propeller_speed: 0.0,
            rotor_angle: 0.0,
            hover_time: 0.0,
            sink_time: 0.0,
            bounced_this_fall: false,
            landing_pitch: 0.0,
            landing_roll: 0.0,
        }
    }

    /// Unit vector the drone faces along.
    #[must_use]
    pub fn forward(&self) -> Vec3 {
        forward(self.heading)
    }

    fn reset_fall(&mut self) {
        self.sink_time = 0.0;
        self.bounced_this_fall = false;
        self.landing_pitch = 0.0;
        self.landing_roll = 0.0;
    }
}

/// Unit forward vector for `heading`.
#[must_use]
pub fn forward(heading: f32) -> Vec3 {
    Vec3::new(-heading.sin(), 0.0, -heading.cos())
}

/// Unit right vector for `heading`.
#[must_use]
pub fn right(heading: f32) -> Vec3 {
    Vec3::new(heading.cos(), 0.0, -heading.sin())
}

/// Result of a single controller tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[must_use]
pub struct TickOutcome {
    /// The `start` directive triggered a takeoff during this tick.
    pub took_off: bool,
}

/// Deterministic drone flight state machine.
#[derive(Clone, Debug)]
pub struct FlightController {
    config: FlightConfig,
    state: DroneState,
    ground: f32,
    phase: FlightPhase,
    rng: ChaCha8Rng,
}

impl FlightController {
    /// Creates a controller with the drone resting at the default ground height.
    #[must_use]
    pub fn new(config: FlightConfig) -> Self {
        let ground = config.default_ground_height.max(config.min_ground_height);
        let rng = ChaCha8Rng::seed_from_u64(config.rng_seed);
        Self {
            state: DroneState::grounded_at(ground),
            ground,
            phase: FlightPhase::Grounded,
            rng,
            config,
        }
    }

    /// Current drone state.
    #[must_use]
    pub const fn state(&self) -> &DroneState {
        &self.state
    }

    /// Flight phase derived after the most recent mutation.
    #[must_use]
    pub const fn phase(&self) -> FlightPhase {
        self.phase
    }

    /// Height at which the drone touches the ground.
    #[must_use]
    pub const fn ground_height(&self) -> f32 {
        self.ground
    }

    /// Tuning used by the controller.
    #[must_use]
    pub const fn config(&self) -> &FlightConfig {
        &self.config
    }

    /// Updates the ground-contact height after the drone model loaded.
    ///
    /// A grounded drone is moved onto the new contact height.
    pub fn set_ground_contact(&mut self, height: f32, out: &mut Vec<Event>) {
        self.ground = height.max(self.config.min_ground_height);
        if self.phase == FlightPhase::Grounded {
            self.state.position.y = self.ground;
        }
        self.clamp_position();
        self.sync_phase(out);
    }

    /// Powers the motors and starts a takeoff climb from the current height.
    ///
    /// Has no effect while the motors are already on.
    pub fn start_motors(&mut self, out: &mut Vec<Event>) {
        if self.state.motors_on {
            return;
        }
        self.begin_takeoff();
        self.sync_phase(out);
    }

    /// Cuts motor power. An airborne drone starts falling.
    pub fn cut_motors(&mut self, out: &mut Vec<Event>) {
        if !self.state.motors_on {
            return;
        }
        self.state.motors_on = false;
        self.state.lift_target = None;
        self.state.velocity = Vec3::ZERO;
        self.sync_phase(out);
    }

    /// Advances the drone by one tick of `dt` seconds.
    pub fn tick(
        &mut self,
        input: &InputCommand,
        registry: &CollisionRegistry,
        dt: f32,
        out: &mut Vec<Event>,
    ) -> TickOutcome {
        let mut outcome = TickOutcome::default();
        self.state.hover_time += dt;
        let on_ground = self.is_on_ground();

        if input.start && on_ground && !self.state.motors_on {
            self.begin_takeoff();
            outcome.took_off = true;
        }

        if let Some(target) = self.active_lift_target() {
            self.lift(target, dt);
        } else if self.state.motors_on && !on_ground {
            self.state.lift_target = None;
            self.fly(input, registry, dt, out);
        } else {
            self.state.velocity = Vec3::ZERO;
            self.state.lift_target = None;
            if !self.state.motors_on && self.state.position.y > self.ground {
                self.fall(registry, dt, out);
            }
        }

        self.clamp_position();

        if self.state.motors_on && self.state.lift_target.is_none() && self.is_on_ground() {
            self.state.motors_on = false;
            self.state.position.y = self.ground;
            self.state.velocity = Vec3::ZERO;
            self.state.reset_fall();
        }

        self.update_attitude(on_ground);
        self.update_propellers(on_ground, dt);
        self.sync_phase(out);
        outcome
    }

    fn is_on_ground(&self) -> bool {
        self.state.position.y <= self.ground + self.config.ground_epsilon
    }

    fn active_lift_target(&self) -> Option<f32> {
        let target = self.state.lift_target?;
        let climbing = self.state.motors_on
            && self.state.position.y < target - self.config.lift_epsilon;
        climbing.then_some(target)
    }

    fn begin_takeoff(&mut self) {
        let state = &mut self.state;
        state.motors_on = true;
        state.reset_fall();
        state.velocity = Vec3::ZERO;
        state.lift_target = Some(
            (state.position.y.max(self.ground) + self.config.start_lift).min(self.config.ceiling),
        );
    }

    fn lift(&mut self, target: f32, dt: f32) {
        let state = &mut self.state;
        let step = (self.config.lift_anim_speed * dt).min(target - state.position.y);
        state.position.y += step;
        state.velocity = Vec3::ZERO;
        if state.position.y >= target - self.config.lift_epsilon {
            state.position.y = target;
            state.lift_target = None;
        }
    }

    fn fly(
        &mut self,
        input: &InputCommand,
        registry: &CollisionRegistry,
        dt: f32,
        out: &mut Vec<Event>,
    ) {
        let config = &self.config;
        let state = &mut self.state;

        if input.turn_left {
            state.heading += config.turn_speed * dt;
        } else if input.turn_right {
            state.heading -= config.turn_speed * dt;
        }

        let ahead = forward(state.heading);
        let side = right(state.heading);
        let mut acceleration = Vec3::ZERO;
        if input.forward {
            let combined = input.left || input.right || input.turn_left || input.turn_right;
            let speed = if combined {
                config.move_speed_turning
            } else {
                config.move_speed
            };
            acceleration += ahead * speed;
        }
        if input.back {
            acceleration -= ahead * config.move_speed;
        }
        if input.left {
            acceleration -= side * config.strafe_speed;
        }
        if input.right {
            acceleration += side * config.strafe_speed;
        }
        if input.up {
            acceleration.y += config.lift_speed;
        }
        if input.down {
            acceleration.y -= config.lift_speed;
        }

        state.velocity = (state.velocity + acceleration * dt) * config.drag;

        let resolution = registry.resolve_axis_separated(state.position, state.velocity);
        state.position = resolution.position;
        for axis in resolution.blocked_axes() {
            state.velocity *= Vec3::ONE - axis.unit();
            out.push(Event::AxisBlocked { axis });
        }
    }

    fn fall(&mut self, registry: &CollisionRegistry, dt: f32, out: &mut Vec<Event>) {
        self.state.sink_time += dt;
        let gravity = 1.0 + self.state.sink_time * self.config.sink_ramp;
        let fall_speed = self.config.sink_speed * gravity * dt;
        let mut next = self.state.position.y - fall_speed;

        let probe = Vec3::new(self.state.position.x, next, self.state.position.z);
        if registry.would_collide(probe) {
            return;
        }

        if next <= self.ground + self.config.ground_epsilon {
            if self.state.bounced_this_fall {
                next = self.ground;
                out.push(Event::Settled);
            } else {
                let rebound = (fall_speed * self.config.bounce_factor)
                    .clamp(self.config.bounce_min, self.config.bounce_max);
                next = self.ground + rebound;
                self.state.sink_time *= 0.3;
                self.state.bounced_this_fall = true;
                self.roll_landing_tilt();
                out.push(Event::Bounced { height: rebound });
            }
        }
        self.state.position.y = next;
    }

    fn roll_landing_tilt(&mut self) {
        if self.rng.gen::<f32>() >= self.config.landing_tilt_chance {
            return;
        }
        let amplitude = self.config.landing_tilt_amplitude;
        self.state.landing_pitch = (self.rng.gen::<f32>() - 0.5) * amplitude;
        self.state.landing_roll = (self.rng.gen::<f32>() - 0.5) * amplitude;
    }

    fn clamp_position(&mut self) {
        let bounds = self.config.bounds_xz;
        let position = &mut self.state.position;
        position.x = position.x.clamp(-bounds, bounds);
        position.y = position.y.clamp(self.ground, self.config.ceiling.max(self.ground));
        position.z = position.z.clamp(-bounds, bounds);
    }

    fn update_attitude(&mut self, on_ground: bool) {
        let config = &self.config;
        let state = &mut self.state;
        let velocity = state.velocity;

        let (pitch, roll, smoothing) = if !state.motors_on || on_ground {
            if state.motors_on {
                (0.0, 0.0, config.landing_smoothing)
            } else {
                (state.landing_pitch, state.landing_roll, config.landing_smoothing)
            }
        } else if velocity.x.abs() + velocity.y.abs() + velocity.z.abs() < config.idle_velocity {
            let amplitude = config.hover_tilt_amplitude;
            (
                amplitude * (state.hover_time * config.hover_tilt_freq_x).sin(),
                amplitude * 0.7 * (state.hover_time * config.hover_tilt_freq_z).cos(),
                config.hover_smoothing,
            )
        } else {
            let local_forward = velocity.dot(forward(state.heading));
            let local_right = velocity.dot(right(state.heading));
            (
                -config.movement_tilt * local_forward,
                config.movement_tilt * local_right,
                config.tilt_smoothing,
            )
        };

        state.pitch += (pitch - state.pitch) * smoothing;
        state.roll += (roll - state.roll) * smoothing;
    }

    fn update_propellers(&mut self, on_ground: bool, dt: f32) {
        let config = &self.config;
        let state = &mut self.state;
        state.propeller_speed = if state.motors_on && !on_ground {
            (state.propeller_speed + config.propeller_ramp_up * dt).min(1.0)
        } else {
            (state.propeller_speed - config.propeller_ramp_down * dt).max(0.0)
        };
        state.rotor_angle += config.propeller_spin_speed * state.propeller_speed * dt;
    }

    fn derive_phase(&self) -> FlightPhase {
        match (self.state.motors_on, self.state.lift_target) {
            (true, Some(_)) => FlightPhase::Lifting,
            (true, None) => FlightPhase::Flying,
            (false, _) if self.state.position.y > self.ground => FlightPhase::Falling,
            (false, _) => FlightPhase::Grounded,
        }
    }

    fn sync_phase(&mut self, out: &mut Vec<Event>) {
        let next = self.derive_phase();
        if next == self.phase {
            return;
        }
        tracing::debug!(from = ?self.phase, to = ?next, "flight phase changed");
        out.push(Event::FlightPhaseChanged {
            from: self.phase,
            to: next,
        });
        self.phase = next;
    }
}

impl Default for FlightController {
    fn default() -> Self {
        Self::new(FlightConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use neuroflight_core::{Aabb, Axis, Collider};

    const DT: f32 = 0.016;

    fn airborne(controller: &mut FlightController) {
        let mut events = Vec::new();
        controller.start_motors(&mut events);
        for _ in 0..200 {
            let _ = controller.tick(&InputCommand::IDLE, &CollisionRegistry::new(), DT, &mut events);
        }
        assert_eq!(controller.phase(), FlightPhase::Flying);
    }

    #[test]
    fn start_directive_lifts_off_from_the_ground() {
        let mut controller = FlightController::default();
        let mut events = Vec::new();
        let start = InputCommand {
            start: true,
            ..InputCommand::IDLE
        };

        let outcome = controller.tick(&start, &CollisionRegistry::new(), DT, &mut events);

        assert!(outcome.took_off);
        assert_eq!(controller.phase(), FlightPhase::Lifting);
        assert_eq!(
            events,
            vec![Event::FlightPhaseChanged {
                from: FlightPhase::Grounded,
                to: FlightPhase::Lifting,
            }]
        );
    }

    #[test]
    fn forward_moves_along_negative_z_at_zero_heading() {
        let mut controller = FlightController::default();
        airborne(&mut controller);
        let before = controller.state().position;
        let mut events = Vec::new();
        let command = InputCommand {
            forward: true,
            ..InputCommand::IDLE
        };
        for _ in 0..30 {
            let _ = controller.tick(&command, &CollisionRegistry::new(), DT, &mut events);
        }

        let after = controller.state().position;
        assert!(after.z < before.z);
        assert!((after.x - before.x).abs() < 1e-5);
    }

    #[test]
    fn turning_left_increases_heading() {
        let mut controller = FlightController::default();
        airborne(&mut controller);
        let mut events = Vec::new();
        let command = InputCommand {
            turn_left: true,
            turn_right: true,
            ..InputCommand::IDLE
        };
        let _ = controller.tick(&command, &CollisionRegistry::new(), DT, &mut events);
        assert!((controller.state().heading - 1.8 * DT).abs() < 1e-6);
    }

    #[test]
    fn blocked_axis_zeroes_only_its_velocity() {
        let mut controller = FlightController::default();
        airborne(&mut controller);
        let position = controller.state().position;
        let mut registry = CollisionRegistry::new();
        registry.install(Arc::from(vec![Collider::new(Aabb::new(
            Vec3::new(position.x + 0.32, 0.0, position.z - 0.3),
            Vec3::new(position.x + 1.3, 20.0, position.z + 0.3),
        ))]));

        let mut events = Vec::new();
        let command = InputCommand {
            right: true,
            up: true,
            ..InputCommand::IDLE
        };
        let _ = controller.tick(&command, &registry, DT, &mut events);

        let state = controller.state();
        assert_eq!(state.velocity.x, 0.0);
        assert!(state.velocity.y > 0.0);
        assert!(state.position.y > position.y);
        assert!(events.contains(&Event::AxisBlocked { axis: Axis::X }));
    }

    #[test]
    fn cutting_motors_mid_air_falls_and_settles() {
        let mut controller = FlightController::default();
        airborne(&mut controller);
        let mut events = Vec::new();
        controller.cut_motors(&mut events);
        assert_eq!(controller.phase(), FlightPhase::Falling);

        for _ in 0..400 {
            let _ = controller.tick(&InputCommand::IDLE, &CollisionRegistry::new(), DT, &mut events);
        }

        assert_eq!(controller.phase(), FlightPhase::Grounded);
        assert_eq!(controller.state().position.y, controller.ground_height());
        assert_eq!(
            events.iter().filter(|event| matches!(event, Event::Bounced { .. })).count(),
            1
        );
        assert!(events.contains(&Event::Settled));
    }

    #[test]
    fn ground_contact_moves_grounded_drone() {
        let mut controller = FlightController::default();
        let mut events = Vec::new();
        controller.set_ground_contact(0.01, &mut events);

        assert_eq!(controller.ground_height(), 0.05);
        assert_eq!(controller.state().position.y, 0.05);
        assert!(events.is_empty());
    }

    #[test]
    fn propellers_spin_up_in_flight_and_down_after_landing() {
        let mut controller = FlightController::default();
        airborne(&mut controller);
        assert_eq!(controller.state().propeller_speed, 1.0);

        let mut events = Vec::new();
        controller.cut_motors(&mut events);
        for _ in 0..400 {
            let _ = controller.tick(&InputCommand::IDLE, &CollisionRegistry::new(), DT, &mut events);
        }
        assert_eq!(controller.state().propeller_speed, 0.0);
    }

    #[test]
    fn config_parses_partial_toml() {
        let config: FlightConfig = toml::from_str("drag = 0.5\nrng_seed = 7\n").expect("parse");
        assert_eq!(config.drag, 0.5);
        assert_eq!(config.rng_seed, 7);
        assert_eq!(config.move_speed, FlightConfig::default().move_speed);
    }
}
